use folio_codec::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XrefError {
    #[error("no startxref marker found")]
    MissingStartxref,

    #[error("cross-reference offset {offset} is beyond the end of the file ({len} bytes)")]
    OffsetOutOfRange { offset: u64, len: usize },

    #[error("malformed cross-reference section at offset {offset}: {reason}")]
    Malformed { offset: u64, reason: String },

    #[error("object at offset {0} is not a cross-reference stream")]
    NotAnXrefStream(u64),

    #[error("cross-reference chain revisits offset {0}")]
    CyclicChain(u64),

    #[error("compressed entry for object {0} cannot be written to a table")]
    CompressedInTable(u32),

    #[error("codec error at offset {offset}: {source}")]
    Codec {
        offset: u64,
        #[source]
        source: CodecError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type XrefResult<T> = Result<T, XrefError>;
