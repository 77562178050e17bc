use std::collections::{BTreeMap, HashSet};

use folio_codec::{decode_stream, Codec, Parser};
use folio_types::{Name, Object, Stream};
use tracing::debug;

use crate::entry::XrefEntry;
use crate::error::{XrefError, XrefResult};
use crate::trailer::Trailer;

/// How far back from the end of the file to look for `startxref`.
const STARTXREF_WINDOW: usize = 4096;

/// The merged index of every revision in a file.
#[derive(Clone, Debug, Default)]
pub struct LoadedIndex {
    /// Newest entry for every object number mentioned anywhere in the chain.
    pub entries: BTreeMap<u32, XrefEntry>,
    /// Newest trailer, with missing keys filled from older revisions.
    pub trailer: Trailer,
    /// Offset of the newest section; the next revision's `Prev`.
    pub startxref: u64,
    /// Number of sections followed.
    pub revisions: usize,
}

/// One cross-reference section and its trailer.
#[derive(Clone, Debug)]
pub struct Section {
    pub entries: BTreeMap<u32, XrefEntry>,
    pub trailer: Trailer,
}

/// Load the full revision chain, newest section first.
///
/// Entries from newer sections shadow older ones. A `Prev` that points back
/// at an already visited section is an error rather than a loop.
pub fn load_chain(data: &[u8]) -> XrefResult<LoadedIndex> {
    let startxref = find_startxref(data)?;
    let mut index = LoadedIndex {
        startxref,
        ..Default::default()
    };
    let mut visited = HashSet::new();
    let mut next = Some(startxref);

    while let Some(offset) = next {
        if !visited.insert(offset) {
            return Err(XrefError::CyclicChain(offset));
        }
        let section = read_section(data, offset)?;
        debug!(
            offset,
            entries = section.entries.len(),
            prev = ?section.trailer.prev,
            "loaded cross-reference section"
        );
        for (number, entry) in section.entries {
            index.entries.entry(number).or_insert(entry);
        }
        next = section.trailer.prev;
        if index.revisions == 0 {
            index.trailer = section.trailer;
        } else {
            index.trailer.inherit(&section.trailer);
        }
        index.revisions += 1;
    }

    index.trailer.prev = None;
    Ok(index)
}

/// Offset recorded after the last `startxref` keyword.
pub fn find_startxref(data: &[u8]) -> XrefResult<u64> {
    let window_start = data.len().saturating_sub(STARTXREF_WINDOW);
    let tail = &data[window_start..];
    let keyword = b"startxref";
    let position = tail
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or(XrefError::MissingStartxref)?;
    let mut parser = Parser::new(&tail[position + keyword.len()..]);
    parser.unsigned().map_err(|_| XrefError::MissingStartxref)
}

/// Read the section at `offset`, a classic table or a cross-reference stream.
pub fn read_section(data: &[u8], offset: u64) -> XrefResult<Section> {
    let rest = slice_from(data, offset)?;
    let mut parser = Parser::new(rest);
    if parser.eat_keyword(b"xref") {
        read_table(data, offset, parser)
    } else {
        read_stream(data, offset)
    }
}

fn slice_from(data: &[u8], offset: u64) -> XrefResult<&[u8]> {
    usize::try_from(offset)
        .ok()
        .and_then(|start| data.get(start..))
        .filter(|rest| !rest.is_empty())
        .ok_or(XrefError::OffsetOutOfRange {
            offset,
            len: data.len(),
        })
}

fn read_table(data: &[u8], offset: u64, mut parser: Parser<'_>) -> XrefResult<Section> {
    let codec = |source| XrefError::Codec { offset, source };
    let malformed = |reason: &str| XrefError::Malformed {
        offset,
        reason: reason.to_owned(),
    };

    let mut entries = BTreeMap::new();
    while !parser.eat_keyword(b"trailer") {
        let first = parser.unsigned().map_err(codec)?;
        let count = parser.unsigned().map_err(codec)?;
        for i in 0..count {
            let field = parser.unsigned().map_err(codec)?;
            let generation = u16::try_from(parser.unsigned().map_err(codec)?)
                .map_err(|_| malformed("generation out of range"))?;
            let number =
                u32::try_from(first + i).map_err(|_| malformed("object number out of range"))?;
            let entry = match parser.keyword().map_err(codec)? {
                b"n" => XrefEntry::Normal {
                    offset: field,
                    generation,
                },
                b"f" => XrefEntry::Free {
                    next: u32::try_from(field).map_err(|_| malformed("free link out of range"))?,
                    generation,
                },
                _ => return Err(malformed("entry type is neither 'n' nor 'f'")),
            };
            entries.insert(number, entry);
        }
    }

    let dictionary = match parser.object().map_err(codec)? {
        Object::Dictionary(dictionary) => dictionary,
        _ => return Err(malformed("trailer is not a dictionary")),
    };
    let trailer = Trailer::from_dictionary(&dictionary);

    // Hybrid files: the table wins over the stream it points to.
    if let Some(stm_offset) = dictionary
        .get(b"XRefStm".as_slice())
        .and_then(Object::as_integer)
        .and_then(|o| u64::try_from(o).ok())
    {
        let hidden = read_stream(data, stm_offset)?;
        debug!(
            offset,
            stm_offset,
            entries = hidden.entries.len(),
            "merged hybrid cross-reference stream"
        );
        for (number, entry) in hidden.entries {
            entries.entry(number).or_insert(entry);
        }
    }

    Ok(Section { entries, trailer })
}

fn read_stream(data: &[u8], offset: u64) -> XrefResult<Section> {
    let rest = slice_from(data, offset)?;
    let (indirect, _) =
        Codec::decode_indirect(rest).map_err(|source| XrefError::Codec { offset, source })?;
    let Object::Stream(stream) = indirect.object else {
        return Err(XrefError::NotAnXrefStream(offset));
    };
    let kind = stream
        .dictionary
        .get(b"Type".as_slice())
        .and_then(Object::as_name)
        .map(Name::as_bytes);
    if kind != Some(b"XRef".as_slice()) {
        return Err(XrefError::NotAnXrefStream(offset));
    }

    let entries = stream_entries(&stream, offset)?;
    let trailer = Trailer::from_dictionary(&stream.dictionary);
    Ok(Section { entries, trailer })
}

fn stream_entries(stream: &Stream, offset: u64) -> XrefResult<BTreeMap<u32, XrefEntry>> {
    let malformed = |reason: &str| XrefError::Malformed {
        offset,
        reason: reason.to_owned(),
    };

    let widths: Vec<usize> = stream
        .dictionary
        .get(b"W".as_slice())
        .and_then(Object::as_array)
        .ok_or_else(|| malformed("missing /W"))?
        .iter()
        .map(|w| w.as_integer().and_then(|w| usize::try_from(w).ok()))
        .collect::<Option<_>>()
        .ok_or_else(|| malformed("non-integer width in /W"))?;
    let [w_type, w2, w3] = <[usize; 3]>::try_from(widths.as_slice())
        .map_err(|_| malformed("/W must have three entries"))?;
    if w_type > 8 || w2 > 8 || w3 > 8 {
        return Err(malformed("field width over eight bytes"));
    }
    let row_len = w_type + w2 + w3;
    if row_len == 0 {
        return Err(malformed("all field widths are zero"));
    }

    let size = stream.integer("Size").unwrap_or(0).max(0) as u64;
    let ranges: Vec<(u64, u64)> = match stream.dictionary.get(b"Index".as_slice()).and_then(Object::as_array) {
        Some(items) => items
            .chunks_exact(2)
            .map(|pair| {
                let first = pair[0].as_integer().and_then(|v| u64::try_from(v).ok());
                let count = pair[1].as_integer().and_then(|v| u64::try_from(v).ok());
                first.zip(count)
            })
            .collect::<Option<_>>()
            .ok_or_else(|| malformed("non-integer value in /Index"))?,
        None => vec![(0, size)],
    };

    let payload = decode_stream(stream).map_err(|source| XrefError::Codec { offset, source })?;
    let mut rows = payload.chunks_exact(row_len);
    let mut entries = BTreeMap::new();
    for (first, count) in ranges {
        for number in first..first + count {
            let row = rows.next().ok_or_else(|| malformed("stream shorter than /Index"))?;
            let (type_bytes, rest) = row.split_at(w_type);
            let (field2, field3) = rest.split_at(w2);
            // A zero-width type field means every entry is in use.
            let kind = if w_type == 0 { 1 } else { be(type_bytes) };
            let number =
                u32::try_from(number).map_err(|_| malformed("object number out of range"))?;
            match XrefEntry::from_fields(kind, be(field2), be(field3)) {
                Some(entry) => {
                    entries.insert(number, entry);
                }
                None => debug!(offset, number, kind, "skipping unrecognised entry"),
            }
        }
    }
    Ok(entries)
}

fn be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::free_list::FreeList;
    use crate::writer::{write_footer, XrefWriter};
    use folio_types::ObjectReference;

    /// One-revision file with objects 1 and 2 and a classic table.
    fn table_file() -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let one = out.len() as u64;
        out.extend_from_slice(b"1 0 obj\n<</Type /Catalog>>\nendobj\n");
        let two = out.len() as u64;
        out.extend_from_slice(b"2 0 obj\n42\nendobj\n");
        let xref = out.len() as u64;
        let mut writer = XrefWriter::new();
        writer.link_free_list(&FreeList::new());
        writer.insert(1, XrefEntry::Normal { offset: one, generation: 0 });
        writer.insert(2, XrefEntry::Normal { offset: two, generation: 0 });
        let trailer = Trailer {
            size: 3,
            root: ObjectReference::number(1),
            ..Default::default()
        };
        writer.write_table(&trailer, &mut out).unwrap();
        write_footer(xref, &mut out).unwrap();
        out
    }

    #[test]
    fn loads_single_table() {
        let data = table_file();
        let index = load_chain(&data).unwrap();
        assert_eq!(index.revisions, 1);
        assert_eq!(index.trailer.size, 3);
        assert_eq!(index.trailer.root, ObjectReference::number(1));
        assert_eq!(index.entries.len(), 3);
        assert!(matches!(index.entries[&0], XrefEntry::Free { next: 0, generation: 65535 }));
        assert!(matches!(index.entries[&2], XrefEntry::Normal { generation: 0, .. }));
    }

    #[test]
    fn newer_section_shadows_older() {
        let mut data = table_file();
        let first_xref = find_startxref(&data).unwrap();

        let new_two = data.len() as u64;
        data.extend_from_slice(b"2 1 obj\n43\nendobj\n");
        let xref = data.len() as u64;
        let mut writer = XrefWriter::new();
        writer.insert(2, XrefEntry::Normal { offset: new_two, generation: 1 });
        let trailer = Trailer {
            size: 3,
            prev: Some(first_xref),
            root: ObjectReference::number(1),
            ..Default::default()
        };
        writer.write_table(&trailer, &mut data).unwrap();
        write_footer(xref, &mut data).unwrap();

        let index = load_chain(&data).unwrap();
        assert_eq!(index.revisions, 2);
        assert_eq!(index.startxref, xref);
        assert_eq!(
            index.entries[&2],
            XrefEntry::Normal { offset: new_two, generation: 1 }
        );
        assert!(index.entries.contains_key(&1));
        assert_eq!(index.trailer.prev, None);
    }

    #[test]
    fn detects_cyclic_prev() {
        let mut data = table_file();
        let xref = data.len() as u64;
        let mut writer = XrefWriter::new();
        writer.insert(1, XrefEntry::Normal { offset: 9, generation: 0 });
        let trailer = Trailer {
            size: 3,
            prev: Some(xref),
            ..Default::default()
        };
        writer.write_table(&trailer, &mut data).unwrap();
        write_footer(xref, &mut data).unwrap();
        assert!(matches!(load_chain(&data), Err(XrefError::CyclicChain(o)) if o == xref));
    }

    #[test]
    fn loads_xref_stream() {
        let mut data = b"%PDF-1.7\n".to_vec();
        let one = data.len() as u64;
        data.extend_from_slice(b"1 0 obj\n<</Type /Catalog>>\nendobj\n");
        let xref = data.len() as u64;
        let mut writer = XrefWriter::new();
        writer.link_free_list(&FreeList::new());
        writer.insert(1, XrefEntry::Normal { offset: one, generation: 0 });
        writer.insert(3, XrefEntry::Compressed { container: 5, index: 2 });
        let trailer = Trailer {
            size: 4,
            root: ObjectReference::number(1),
            ..Default::default()
        };
        let object = writer.into_stream(2, xref, &trailer, true).unwrap();
        Codec::encode_indirect(&object, &mut data).unwrap();
        write_footer(xref, &mut data).unwrap();

        let index = load_chain(&data).unwrap();
        assert_eq!(index.trailer.size, 4);
        assert_eq!(index.entries[&2], XrefEntry::Normal { offset: xref, generation: 0 });
        assert_eq!(index.entries[&3], XrefEntry::Compressed { container: 5, index: 2 });
    }

    #[test]
    fn zero_width_type_defaults_to_in_use() {
        let body = b"7 0 obj\n<</Type /XRef /Size 2 /W [0 1 1] /Length 4>>\nstream\n\x09\x00\x0a\x00\nendstream\nendobj\n";
        let mut data = b"%PDF-1.7\n".to_vec();
        let xref = data.len() as u64;
        data.extend_from_slice(body);
        write_footer(xref, &mut data).unwrap();
        let index = load_chain(&data).unwrap();
        assert_eq!(index.entries[&0], XrefEntry::Normal { offset: 9, generation: 0 });
        assert_eq!(index.entries[&1], XrefEntry::Normal { offset: 10, generation: 0 });
    }

    #[test]
    fn missing_startxref_is_reported() {
        assert!(matches!(
            load_chain(b"%PDF-1.7\nnothing here\n"),
            Err(XrefError::MissingStartxref)
        ));
    }

    #[test]
    fn offset_past_end_is_reported() {
        let data = b"%PDF-1.7\nstartxref\n9999\n%%EOF\n";
        assert!(matches!(
            load_chain(data),
            Err(XrefError::OffsetOutOfRange { offset: 9999, .. })
        ));
    }

    #[test]
    fn non_xref_object_is_rejected() {
        let mut data = b"%PDF-1.7\n".to_vec();
        let offset = data.len() as u64;
        data.extend_from_slice(b"1 0 obj\n<</Type /Catalog>>\nendobj\n");
        write_footer(offset, &mut data).unwrap();
        assert!(matches!(load_chain(&data), Err(XrefError::NotAnXrefStream(_))));
    }
}
