use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use folio_types::{IndirectObject, Object, ObjectReference};
use folio_xref::{load_chain, XrefEntry};
use memmap2::Mmap;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::slot::Slot;

/// Header written by [`File::create`].
pub(crate) const HEADER: &[u8] = b"%PDF-1.7\n";

/// Prefix every readable file must start with.
const HEADER_MAGIC: &[u8] = b"%PDF-1.";

/// Read-only view of the file as it was when opened.
///
/// Field order matters: the map is released before the handle.
pub(crate) struct Mapping {
    pub(crate) mmap: Mmap,
    pub(crate) file: fs::File,
}

/// An incrementally updatable PDF document.
///
/// Objects are read from the mapped original bytes, mutations are held in
/// memory, and [`save`](File::save) appends them as a new revision.
pub struct File {
    pub(crate) path: PathBuf,
    pub(crate) mapping: Option<Mapping>,
    pub(crate) slots: BTreeMap<u32, Slot>,
    pub(crate) size: u32,
    pub(crate) prev: u64,
    pub(crate) config: StoreConfig,

    /// The document catalog.
    pub root: ObjectReference,
    /// Encryption dictionary, carried through to every revision.
    pub encrypt: Option<Object>,
    /// Document information dictionary.
    pub info: Option<ObjectReference>,
    /// File identifier pair.
    pub id: Option<Vec<Object>>,
}

impl File {
    /// Open an existing file with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(path, StoreConfig::default())
    }

    /// Open an existing file, loading its whole cross-reference chain.
    pub fn open_with(path: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        if file.metadata()?.len() < HEADER_MAGIC.len() as u64 {
            return Err(StoreError::InvalidHeader { path });
        }

        // SAFETY: the map is read-only and this store only ever appends to the
        // file, so bytes inside the mapped range are not rewritten while it lives.
        let mmap = unsafe { Mmap::map(&file)? };
        if !mmap.starts_with(HEADER_MAGIC) {
            return Err(StoreError::InvalidHeader { path });
        }

        let index = load_chain(&mmap)?;
        let highest = index.entries.keys().next_back().map_or(0, |&n| n.saturating_add(1));
        let size = index.trailer.size.max(highest).max(1);
        let slots: BTreeMap<u32, Slot> = index
            .entries
            .into_iter()
            .map(|(number, entry)| (number, Slot::Unmodified(entry)))
            .collect();

        debug!(
            path = %path.display(),
            revisions = index.revisions,
            objects = slots.len(),
            size,
            startxref = index.startxref,
            "opened document"
        );

        Ok(Self {
            path,
            mapping: Some(Mapping { mmap, file }),
            slots,
            size,
            prev: index.startxref,
            config,
            root: index.trailer.root,
            encrypt: index.trailer.encrypt,
            info: index.trailer.info,
            id: index.trailer.id,
        })
    }

    /// Create (or truncate) a file holding only the header.
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::create_with(path, StoreConfig::default())
    }

    pub fn create_with(path: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        fs::write(&path, HEADER)?;
        debug!(path = %path.display(), "created document");
        Ok(Self {
            path,
            mapping: None,
            slots: BTreeMap::new(),
            size: 1,
            prev: 0,
            config,
            root: ObjectReference::default(),
            encrypt: None,
            info: None,
            id: None,
        })
    }

    /// Add an object.
    ///
    /// An [`Object::Indirect`] keeps its own reference and replaces whatever
    /// the slot held, provided its generation is not below the slot's
    /// minimum. Any other value gets the next free object number at
    /// generation 0.
    pub fn add(&mut self, object: impl Into<Object>) -> StoreResult<ObjectReference> {
        match object.into() {
            Object::Indirect(indirect) => self.add_indirect(*indirect),
            value => {
                let number = self.size;
                self.size = number
                    .checked_add(1)
                    .ok_or(StoreError::ObjectNumbersExhausted)?;
                let reference = ObjectReference::number(number);
                self.slots
                    .insert(number, Slot::Pending(IndirectObject::new(reference, value)));
                Ok(reference)
            }
        }
    }

    fn add_indirect(&mut self, indirect: IndirectObject) -> StoreResult<ObjectReference> {
        let requested = indirect.reference;
        let number = requested.object_number;
        if number == 0 {
            return Err(StoreError::ReservedObjectNumber);
        }
        if let Some(slot) = self.slots.get(&number) {
            let minimum = slot.min_generation();
            if requested.generation < minimum {
                return Err(StoreError::GenerationTooLow {
                    requested,
                    minimum: ObjectReference::new(number, minimum),
                });
            }
        }
        self.slots.insert(number, Slot::Pending(indirect));
        self.size = self.size.max(number.saturating_add(1));
        Ok(requested)
    }

    /// Mark an object number free. Freeing an absent or already free number
    /// does nothing.
    pub fn free(&mut self, object_number: u32) {
        if object_number == 0 {
            return;
        }
        let Some(slot) = self.slots.get_mut(&object_number) else {
            return;
        };
        if let Some(next_generation) = slot.freed_generation() {
            debug!(object_number, next_generation, "freed object");
            *slot = Slot::Freed(next_generation);
        }
    }

    /// Release the mapping and then the file handle.
    pub fn close(mut self) -> StoreResult<()> {
        if let Some(Mapping { mmap, file }) = self.mapping.take() {
            drop(mmap);
            drop(file);
        }
        debug!(path = %self.path.display(), "closed document");
        Ok(())
    }

    /// One past the highest object number in use.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Offset of the newest cross-reference section, 0 if none.
    pub fn prev(&self) -> u64 {
        self.prev
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Every object number with a slot, ascending.
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.keys().copied()
    }

    pub fn slot(&self, object_number: u32) -> Option<&Slot> {
        self.slots.get(&object_number)
    }

    /// Bytes of the file as opened; empty for a created file.
    pub(crate) fn bytes(&self) -> &[u8] {
        match &self.mapping {
            Some(mapping) => &mapping.mmap[..],
            None => &[],
        }
    }

    /// Entry a freshly loaded slot would carry for an in-use object.
    pub(crate) fn record_written(&mut self, object_number: u32, offset: u64) {
        self.slots.insert(
            object_number,
            Slot::Unmodified(XrefEntry::Normal {
                offset,
                generation: 0,
            }),
        );
    }
}
