use std::error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum DartsError {
    /// 構築の入力がソート済み・重複なし・0バイトなしの条件を満たしていない
    InvalidInput(String),
    Io(io::Error),
    /// DoubleArrayとして解釈できない長さのバイト列やユニット列
    CorruptData(String),
    ValueOutOfRange {
        index: usize,
        value: u32,
    },
    /// ユニットで表現できる位置を超えて配列を拡張しようとした
    CapacityExceeded(usize),
}

pub type DartsResult<T> = Result<T, DartsError>;

impl fmt::Display for DartsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DartsError::InvalidInput(ref msg) => write!(f, "invalid input: {}", msg),
            DartsError::Io(ref err) => write!(f, "IO error: {}", err),
            DartsError::CorruptData(ref msg) => write!(f, "corrupt data: {}", msg),
            DartsError::ValueOutOfRange { index, value } => write!(
                f,
                "value {} of key #{} exceeds the encodable range",
                value, index
            ),
            DartsError::CapacityExceeded(size) => {
                write!(f, "double array cannot grow beyond {} units", size)
            }
        }
    }
}

impl error::Error for DartsError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            DartsError::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DartsError {
    fn from(e: io::Error) -> Self {
        DartsError::Io(e)
    }
}
