use std::fs::OpenOptions;
use std::io::Write;

use folio_codec::Codec;
use folio_xref::{write_footer, FreeList, Trailer, XrefEntry, XrefFormat, XrefWriter};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::file::File;
use crate::slot::Slot;

/// Separates a revision from what precedes it, and each body from the next.
const SEPARATOR: &[u8] = b"\n\n";

impl File {
    /// Append one revision holding every pending object and a new index.
    ///
    /// The revision is built in memory and written with a single append.
    /// Pending and freed slots stay as they are, so the store keeps reading
    /// the values it just wrote.
    pub fn save(&mut self) -> StoreResult<()> {
        let mut handle = OpenOptions::new().append(true).open(&self.path)?;
        let base = handle.metadata()?.len();

        let mut out = SEPARATOR.to_vec();
        let mut writer = XrefWriter::new();
        let mut free = FreeList::new();
        let mut written = 0usize;

        for (&number, slot) in &self.slots {
            match slot {
                Slot::Pending(indirect) => {
                    writer.insert(
                        number,
                        XrefEntry::Normal {
                            offset: base + out.len() as u64,
                            generation: indirect.generation(),
                        },
                    );
                    Codec::encode_indirect(indirect, &mut out)?;
                    out.extend_from_slice(SEPARATOR);
                    written += 1;
                }
                Slot::Freed(next_generation) => free.insert(number, *next_generation),
                Slot::Unmodified(XrefEntry::Free { generation, .. }) => {
                    free.insert(number, *generation)
                }
                Slot::Unmodified(_) => {}
            }
        }
        writer.link_free_list(&free);
        let entries = writer.len();

        let xref_offset = base + out.len() as u64;
        let mut trailer = Trailer {
            size: self.size,
            prev: Some(self.prev).filter(|&p| p != 0),
            root: self.root,
            encrypt: self.encrypt.clone(),
            info: self.info,
            id: self.id.clone(),
        };

        let stream_number = match self.config.xref_format {
            XrefFormat::Table => {
                writer
                    .write_table(&trailer, &mut out)
                    .map_err(StoreError::IndexWrite)?;
                None
            }
            XrefFormat::Stream => {
                // The stream takes the next unallocated number and lists itself.
                let number = self.size;
                trailer.size = number
                    .checked_add(1)
                    .ok_or(StoreError::ObjectNumbersExhausted)?;
                let object = writer
                    .into_stream(
                        number,
                        xref_offset,
                        &trailer,
                        self.config.compress_xref_stream,
                    )
                    .map_err(StoreError::IndexWrite)?;
                Codec::encode_indirect(&object, &mut out)?;
                Some(number)
            }
        };
        write_footer(xref_offset, &mut out).map_err(StoreError::IndexWrite)?;

        handle.write_all(&out)?;
        if self.config.sync_on_save {
            handle.sync_all()?;
        }

        if let Some(number) = stream_number {
            self.record_written(number, xref_offset);
            self.size = trailer.size;
        }
        self.prev = xref_offset;

        debug!(
            path = %self.path.display(),
            objects = written,
            free = free.len(),
            entries,
            xref_offset,
            size = self.size,
            format = ?self.config.xref_format,
            bytes = out.len(),
            "saved revision"
        );
        Ok(())
    }
}
