use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str;
use std::time::Instant;

use getopts::Options;
use log::info;
use simple_logger::SimpleLogger;

use darts::{Builder, DartsError, DartsResult};

fn print_usage(program: &str, opts: Options) {
    println!("{}", opts.usage(&format!(
        "Usage:\n {} [options] <key file> <dic file>", program)));
}

/// キーファイルを読み込む。`with_values`が真の場合は各行を`キー<TAB>値`として扱う
fn read_keys(path: &Path, with_values: bool) -> DartsResult<(Vec<Vec<u8>>, Vec<u32>)> {
    let reader = BufReader::new(File::open(path)?);
    let mut keys = Vec::new();
    let mut values = Vec::new();

    for (i, line) in reader.split(b'\n').enumerate() {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if !with_values {
            keys.push(line);
            continue;
        }

        let tab = line.iter().position(|&b| b == b'\t').ok_or_else(|| {
            DartsError::InvalidInput(format!("line {}: key must be terminated with a tab", i + 1))
        })?;
        let value = str::from_utf8(&line[tab + 1..])
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .ok_or_else(|| DartsError::InvalidInput(format!("line {}: invalid value", i + 1)))?;
        line.truncate(tab);
        keys.push(line);
        values.push(value);
    }

    Ok((keys, values))
}

/// キーでソートし、重複するキーは最初に現れたものだけを残す
fn sort_keys(keys: Vec<Vec<u8>>, values: Vec<u32>, with_values: bool) -> (Vec<Vec<u8>>, Vec<u32>) {
    if !with_values {
        let mut keys = keys;
        keys.sort();
        keys.dedup();
        return (keys, values);
    }

    let mut pairs: Vec<(Vec<u8>, u32)> = keys.into_iter().zip(values).collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs.dedup_by(|a, b| a.0 == b.0);
    pairs.into_iter().unzip()
}

fn build_darts_cli(args: &[String]) -> DartsResult<i32> {
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optflag("t", "tab", "read values following a tab on each line.");
    opts.optflag("s", "sort", "sort and deduplicate keys before building.");
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
    let with_values = matches.opt_present("tab");
    let sort = matches.opt_present("sort");
    let mut args = matches.free.into_iter();
    let key_file = if let Some(s) = args.next() {
        PathBuf::from(s)
    } else {
        print_usage(&program, opts);
        return Ok(1);
    };
    let dic_file = if let Some(s) = args.next() {
        PathBuf::from(s)
    } else {
        print_usage(&program, opts);
        return Ok(1);
    };

    let (mut keys, mut values) = read_keys(&key_file, with_values)?;
    info!("key_file: {}, keys: {}", key_file.display(), keys.len());
    if sort {
        let sorted = sort_keys(keys, values, with_values);
        keys = sorted.0;
        values = sorted.1;
    }

    let start_time = Instant::now();
    let mut builder = Builder::new(&keys).progress(|done, total| {
        if done % 10000 == 0 || done == total {
            eprint!("\rkeys: {}/{}", done, total);
        }
    });
    if with_values {
        builder = builder.values(&values);
    }
    let da = builder.build()?;
    eprintln!();
    da.save(&dic_file)?;

    let elapsed = start_time.elapsed();
    println!("keys: {}", keys.len());
    println!("units: {}", da.size());
    println!("size: {} bytes", da.total_size());
    println!("elapsed: {} ms", elapsed.as_millis());
    Ok(0)
}

fn main() {
    let args: Vec<String> = env::args().collect();
    match build_darts_cli(&args) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(error) => {
            eprintln!("Error: {}", error);
            std::process::exit(1)
        }
    }
}
