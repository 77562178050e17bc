use std::collections::BTreeMap;
use std::io::Write;

use folio_codec::{flate_encode, Codec};
use folio_types::{IndirectObject, Name, Object, ObjectReference, Stream};
use serde::{Deserialize, Serialize};

use crate::entry::XrefEntry;
use crate::error::{XrefError, XrefResult};
use crate::free_list::FreeList;
use crate::section::{subsections, Subsection};
use crate::trailer::Trailer;

/// How a revision's cross-reference section is encoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XrefFormat {
    /// Classic `xref` table followed by a `trailer` dictionary.
    #[default]
    Table,
    /// A `/Type /XRef` stream object carrying the trailer keys.
    Stream,
}

/// Collects the entries of one revision and encodes them.
#[derive(Clone, Debug, Default)]
pub struct XrefWriter {
    entries: BTreeMap<u32, XrefEntry>,
}

impl XrefWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object_number: u32, entry: XrefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Add the threaded free list, including the head entry for object 0.
    pub fn link_free_list(&mut self, free: &FreeList) {
        for (number, entry) in free.link() {
            self.entries.insert(number, entry);
        }
    }

    pub fn entries(&self) -> &BTreeMap<u32, XrefEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn subsections(&self) -> Vec<Subsection> {
        subsections(self.entries.keys().copied())
    }

    /// Write an `xref` table and its trailer dictionary.
    ///
    /// Each entry line is exactly 20 bytes; compressed entries have no table
    /// form and are rejected.
    pub fn write_table<W: Write>(&self, trailer: &Trailer, out: &mut W) -> XrefResult<()> {
        out.write_all(b"xref\n")?;
        for subsection in self.subsections() {
            writeln!(out, "{} {}", subsection.first, subsection.count)?;
            for number in subsection.numbers() {
                match self.entries.get(&number) {
                    Some(XrefEntry::Normal { offset, generation }) => {
                        write!(out, "{offset:010} {generation:05} n\r\n")?;
                    }
                    Some(XrefEntry::Free { next, generation }) => {
                        write!(out, "{next:010} {generation:05} f\r\n")?;
                    }
                    Some(XrefEntry::Compressed { .. }) | None => {
                        return Err(XrefError::CompressedInTable(number));
                    }
                }
            }
        }
        out.write_all(b"trailer\n")?;
        Codec::encode(&Object::Dictionary(trailer.to_dictionary()), out)
            .map_err(|source| XrefError::Codec { offset: 0, source })?;
        out.write_all(b"\n")?;
        Ok(())
    }

    /// Build the cross-reference stream object for this revision.
    ///
    /// The stream describes itself: `object_number` is added as an in-use
    /// entry at `offset`, where the caller will write the returned object.
    pub fn into_stream(
        mut self,
        object_number: u32,
        offset: u64,
        trailer: &Trailer,
        compress: bool,
    ) -> XrefResult<IndirectObject> {
        self.insert(
            object_number,
            XrefEntry::Normal {
                offset,
                generation: 0,
            },
        );
        let widths = field_widths(self.entries.values());

        let row_len: usize = widths.iter().sum();
        let mut data = Vec::with_capacity(row_len * self.entries.len());
        for entry in self.entries.values() {
            for (value, &width) in entry.fields().iter().zip(&widths) {
                data.extend_from_slice(&value.to_be_bytes()[8 - width..]);
            }
        }

        let index: Vec<Object> = self
            .subsections()
            .into_iter()
            .flat_map(|s| [Object::Integer(s.first.into()), Object::Integer(s.count.into())])
            .collect();

        let mut dictionary = trailer.to_dictionary();
        dictionary.insert(Name::from("Type"), Object::Name(Name::from("XRef")));
        dictionary.insert(Name::from("Index"), Object::Array(index));
        dictionary.insert(
            Name::from("W"),
            Object::Array(widths.iter().map(|&w| Object::Integer(w as i64)).collect()),
        );
        if compress {
            data = flate_encode(&data).map_err(|source| XrefError::Codec { offset, source })?;
            dictionary.insert(Name::from("Filter"), Object::Name(Name::from("FlateDecode")));
        }
        dictionary.insert(Name::from("Length"), Object::Integer(data.len() as i64));

        Ok(IndirectObject::new(
            ObjectReference::number(object_number),
            Stream::new(dictionary, data),
        ))
    }
}

/// Write the `startxref` footer that closes every revision.
pub fn write_footer<W: Write>(xref_offset: u64, out: &mut W) -> XrefResult<()> {
    write!(out, "\nstartxref\n{xref_offset}\n%%EOF\n")?;
    Ok(())
}

/// Smallest big-endian byte widths that hold every field, at least 1 each.
fn field_widths<'a>(entries: impl Iterator<Item = &'a XrefEntry>) -> [usize; 3] {
    let mut max = [0u64; 3];
    for entry in entries {
        for (m, value) in max.iter_mut().zip(entry.fields()) {
            *m = (*m).max(value);
        }
    }
    max.map(bytes_needed)
}

fn bytes_needed(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}
