use folio_types::IndirectObject;
use folio_xref::XrefEntry;

/// State of one object number within an open document.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    /// As loaded from the cross-reference chain; not touched this session.
    Unmodified(XrefEntry),
    /// Added or overwritten in memory; written by the next save.
    Pending(IndirectObject),
    /// Freed this session; carries the generation for the next reuse.
    Freed(u16),
}

impl Slot {
    /// Lowest generation `add` accepts for this object number.
    pub fn min_generation(&self) -> u16 {
        match self {
            Self::Unmodified(XrefEntry::Normal { generation, .. })
            | Self::Unmodified(XrefEntry::Free { generation, .. }) => *generation,
            Self::Unmodified(XrefEntry::Compressed { .. }) => 0,
            Self::Pending(indirect) => indirect.generation(),
            Self::Freed(next_generation) => *next_generation,
        }
    }

    /// Generation recorded when this slot is freed, or `None` if it is
    /// already free.
    pub fn freed_generation(&self) -> Option<u16> {
        match self {
            Self::Unmodified(XrefEntry::Normal { generation, .. }) => {
                Some(generation.saturating_add(1))
            }
            // Objects in object streams always have generation 0.
            Self::Unmodified(XrefEntry::Compressed { .. }) => Some(1),
            Self::Pending(indirect) => Some(indirect.generation().saturating_add(1)),
            Self::Unmodified(XrefEntry::Free { .. }) | Self::Freed(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Free on disk or freed this session.
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Freed(_) | Self::Unmodified(XrefEntry::Free { .. }))
    }
}
