use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),

    #[error("unexpected byte {found:#04x} at offset {offset}: expected {expected}")]
    UnexpectedByte {
        offset: usize,
        found: u8,
        expected: &'static str,
    },

    #[error("invalid number at offset {0}")]
    InvalidNumber(usize),

    #[error("unknown keyword {keyword:?} at offset {offset}")]
    UnknownKeyword { offset: usize, keyword: String },

    #[error("objects nested too deeply at offset {0}")]
    NestingTooDeep(usize),

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("{filter} failed: {reason}")]
    FilterFailed { filter: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;
