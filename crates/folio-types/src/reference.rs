use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::Object;

/// Identifies an indirect object by object number and generation number.
///
/// Displays in the form it takes inside a file: `4 0 R`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObjectReference {
    /// Positive object number. Zero is the free-list head and never a real object.
    pub object_number: u32,
    /// Non-negative generation number.
    pub generation: u16,
}

impl ObjectReference {
    pub const fn new(object_number: u32, generation: u16) -> Self {
        Self {
            object_number,
            generation,
        }
    }

    /// Reference to generation 0 of `object_number`.
    pub const fn number(object_number: u32) -> Self {
        Self::new(object_number, 0)
    }

    /// Returns `true` for the unset reference `0 0 R`.
    pub fn is_null(&self) -> bool {
        self.object_number == 0 && self.generation == 0
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.object_number, self.generation)
    }
}

/// An [`Object`] made addressable through an [`ObjectReference`].
#[derive(Clone, Debug, PartialEq)]
pub struct IndirectObject {
    pub reference: ObjectReference,
    pub object: Object,
}

impl IndirectObject {
    pub fn new(reference: ObjectReference, object: impl Into<Object>) -> Self {
        Self {
            reference,
            object: object.into(),
        }
    }

    pub fn object_number(&self) -> u32 {
        self.reference.object_number
    }

    pub fn generation(&self) -> u16 {
        self.reference.generation
    }
}
