use std::collections::BTreeMap;

use crate::entry::XrefEntry;

/// Generation carried by the head of the free list, object 0.
pub const FREE_HEAD_GENERATION: u16 = 65535;

/// Free object numbers gathered for one revision, each with the
/// generation it will carry when reused.
#[derive(Clone, Debug, Default)]
pub struct FreeList {
    entries: BTreeMap<u32, u16>,
}

impl FreeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a free object number. Object 0 is the list head and is ignored.
    pub fn insert(&mut self, object_number: u32, next_generation: u16) {
        if object_number == 0 {
            return;
        }
        self.entries.insert(object_number, next_generation);
    }

    pub fn contains(&self, object_number: u32) -> bool {
        self.entries.contains_key(&object_number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Thread the list into cross-reference entries.
    ///
    /// The head (object 0, generation 65535) points at the lowest free
    /// number, each free number points at the next higher one, and the last
    /// points back to 0. With no free numbers the head points at itself.
    pub fn link(&self) -> Vec<(u32, XrefEntry)> {
        let mut linked = Vec::with_capacity(self.entries.len() + 1);
        let head_next = self.entries.keys().next().copied().unwrap_or(0);
        linked.push((
            0,
            XrefEntry::Free {
                next: head_next,
                generation: FREE_HEAD_GENERATION,
            },
        ));
        let mut iter = self.entries.iter().peekable();
        while let Some((&number, &generation)) = iter.next() {
            let next = iter.peek().map_or(0, |(&n, _)| n);
            linked.push((number, XrefEntry::Free { next, generation }));
        }
        linked
    }
}
