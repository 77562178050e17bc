use thiserror::Error;

use crate::reference::ObjectReference;

/// Why a lookup produced `Null` instead of a value.
///
/// Reads never fail hard; the diagnostic travels inside [`Object::Null`] so
/// that code walking an object graph can ignore it until it cares.
///
/// [`Object::Null`]: crate::Object::Null
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Unresolved {
    #[error("{0} not found")]
    NotFound(ObjectReference),

    #[error("{0} is a free object")]
    Free(ObjectReference),

    #[error("{0} freed after the file was loaded")]
    Freed(ObjectReference),

    #[error("error parsing {reference}: {reason}")]
    Parse {
        reference: ObjectReference,
        reason: String,
    },

    #[error("{reference} should be in object stream {container}: {reason}")]
    ObjectStream {
        reference: ObjectReference,
        container: u32,
        reason: String,
    },

    #[error("stream length of {reference} is unusable: {reason}")]
    Length {
        reference: ObjectReference,
        reason: String,
    },

    #[error("resolving {0} nested too deeply")]
    TooDeep(ObjectReference),
}

impl Unresolved {
    /// The reference whose lookup failed.
    pub fn reference(&self) -> ObjectReference {
        match self {
            Self::NotFound(r) | Self::Free(r) | Self::Freed(r) | Self::TooDeep(r) => *r,
            Self::Parse { reference, .. }
            | Self::ObjectStream { reference, .. }
            | Self::Length { reference, .. } => *reference,
        }
    }

    /// Returns `true` for the two "this object number is free" diagnostics.
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free(_) | Self::Freed(_))
    }
}
