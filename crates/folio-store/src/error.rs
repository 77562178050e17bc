use std::path::PathBuf;

use folio_codec::CodecError;
use folio_types::ObjectReference;
use folio_xref::XrefError;

/// Errors from opening, mutating, or saving a document.
///
/// Read-path failures are not here: `File::get` reports them as a `Null`
/// carrying an [`folio_types::Unresolved`] diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file does not start with `%PDF-1.`.
    #[error("{} is not a PDF file: missing %PDF-1. header", path.display())]
    InvalidHeader { path: PathBuf },

    /// The cross-reference chain could not be loaded.
    #[error("failed to load cross-reference index: {0}")]
    IndexLoad(#[from] XrefError),

    /// The new cross-reference section could not be encoded.
    #[error("failed to write cross-reference index: {0}")]
    IndexWrite(XrefError),

    /// `add` was given a generation below what the slot already requires.
    /// `minimum` carries the corrected reference.
    #[error("generation of {requested} is too low; minimum is {minimum}")]
    GenerationTooLow {
        requested: ObjectReference,
        minimum: ObjectReference,
    },

    /// Object number 0 heads the free list and never holds an object.
    #[error("object number 0 is reserved")]
    ReservedObjectNumber,

    /// No object numbers are left to allocate.
    #[error("object numbers exhausted")]
    ObjectNumbersExhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Codec(#[from] CodecError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
