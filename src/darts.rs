use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use getopts::Options;
use simple_logger::SimpleLogger;

use darts::{DartsError, DartsResult, DoubleArray};

fn print_usage(program: &str, opts: Options) {
    println!("{}", opts.usage(&format!(
        "Usage:\n {} [options] <dic file> [<query file>]", program)));
}

/// 1行分の検索結果を書き出す
fn search_line<W: Write>(da: &DoubleArray, line: &[u8], exact: bool, out: &mut W) -> io::Result<()> {
    out.write_all(line)?;
    if exact {
        match da.exact_match_search(line) {
            Some(value) => writeln!(out, ": found, value = {}", value),
            None => writeln!(out, ": not found"),
        }
    } else {
        let results = da.common_prefix_search(line);
        if results.is_empty() {
            return writeln!(out, ": not found");
        }
        write!(out, ": found, num = {}", results.len())?;
        for m in &results {
            write!(out, " {}:{}", m.value, m.length)?;
        }
        writeln!(out)
    }
}

fn darts_cli<W: Write>(args: &[String], out: &mut W) -> DartsResult<i32> {
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optflag("e", "exact", "use exact match search instead of common prefix search.");
    opts.optflag("v", "verbose", "enable verbose mode.");
    opts.optflag("", "help", "show this usage message.");
    let matches = match opts.parse(&args[1..]) {
        Ok(m) => { m }
        Err(_) => {
            print_usage(&program, opts);
            return Ok(1);
        }
    };
    if matches.opt_present("help") {
        print_usage(&program, opts);
        return Ok(1);
    }
    if matches.opt_present("verbose") {
        SimpleLogger::new()
            .init()
            .map_err(|e| DartsError::InvalidInput(e.to_string()))?;
    }
    let exact = matches.opt_present("exact");
    let mut args = matches.free.into_iter();
    let dic_file = if let Some(s) = args.next() {
        s
    } else {
        print_usage(&program, opts);
        return Ok(1);
    };

    let da = DoubleArray::from_path(&dic_file)?;
    let input: Box<dyn BufRead> = match args.next() {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    for line in input.split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        search_line(&da, &line, exact, out)?;
    }
    out.flush()?;
    Ok(0)
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match darts_cli(&args, &mut out) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(error) => {
            out.flush().ok();
            eprintln!("Error: {}", error);
            std::process::exit(1)
        }
    }
}
