use serde::{Deserialize, Serialize};

/// One object number's record in one cross-reference section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum XrefEntry {
    /// Unused object number; `next` links to the next free number.
    Free { next: u32, generation: u16 },
    /// In-use object at a byte offset from the start of the file.
    Normal { offset: u64, generation: u16 },
    /// Object stored at `index` inside object stream `container`.
    Compressed { container: u32, index: u32 },
}

impl XrefEntry {
    /// Type field as written in a cross-reference stream.
    pub fn type_field(&self) -> u64 {
        match self {
            Self::Free { .. } => 0,
            Self::Normal { .. } => 1,
            Self::Compressed { .. } => 2,
        }
    }

    /// The three cross-reference stream fields for this entry.
    pub fn fields(&self) -> [u64; 3] {
        match *self {
            Self::Free { next, generation } => [0, next.into(), generation.into()],
            Self::Normal { offset, generation } => [1, offset, generation.into()],
            Self::Compressed { container, index } => [2, container.into(), index.into()],
        }
    }

    /// Parse stream fields. Unknown types and out-of-range values yield `None`.
    pub fn from_fields(kind: u64, field2: u64, field3: u64) -> Option<Self> {
        match kind {
            0 => Some(Self::Free {
                next: u32::try_from(field2).ok()?,
                generation: u16::try_from(field3).ok()?,
            }),
            1 => Some(Self::Normal {
                offset: field2,
                generation: u16::try_from(field3).ok()?,
            }),
            2 => Some(Self::Compressed {
                container: u32::try_from(field2).ok()?,
                index: u32::try_from(field3).ok()?,
            }),
            _ => None,
        }
    }

    /// Generation of the object number this entry describes.
    ///
    /// Objects in object streams always have generation 0.
    pub fn generation(&self) -> u16 {
        match *self {
            Self::Free { generation, .. } | Self::Normal { generation, .. } => generation,
            Self::Compressed { .. } => 0,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free { .. })
    }
}
