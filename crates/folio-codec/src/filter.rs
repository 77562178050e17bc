//! Stream filters (ISO 32000-1 §7.4).
//!
//! Only decoding is general; the writer side needs nothing but Flate for
//! compressed cross-reference streams.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use folio_types::{Dictionary, Name, Object, Stream};

use crate::error::{CodecError, CodecResult};
use crate::parser::{hex_value, is_whitespace};

/// Apply the stream's `Filter` chain and return the unfiltered payload.
pub fn decode_stream(stream: &Stream) -> CodecResult<Vec<u8>> {
    let filters = filter_names(stream.dictionary.get(b"Filter".as_slice()))?;
    let params = stream
        .dictionary
        .get(b"DecodeParms".as_slice())
        .or_else(|| stream.dictionary.get(b"DP".as_slice()));

    let mut data = stream.data.clone();
    for (i, filter) in filters.iter().enumerate() {
        let parms = match params {
            Some(Object::Array(items)) => items.get(i).and_then(Object::as_dictionary),
            Some(Object::Dictionary(dict)) if i == 0 => Some(dict),
            _ => None,
        };
        data = match filter.as_bytes() {
            b"FlateDecode" | b"Fl" => unpredict(inflate(&data)?, parms)?,
            b"ASCIIHexDecode" | b"AHx" => ascii_hex_decode(&data)?,
            b"ASCII85Decode" | b"A85" => ascii85_decode(&data)?,
            _ => {
                let name = String::from_utf8_lossy(filter.as_bytes()).into_owned();
                return Err(CodecError::UnsupportedFilter(name));
            }
        };
    }
    Ok(data)
}

/// Zlib-compress `data` for a `/Filter /FlateDecode` stream.
pub fn flate_encode(data: &[u8]) -> CodecResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn filter_names(filter: Option<&Object>) -> CodecResult<Vec<&Name>> {
    match filter {
        None | Some(Object::Null(_)) => Ok(Vec::new()),
        Some(Object::Name(name)) => Ok(vec![name]),
        Some(Object::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_name()
                    .ok_or_else(|| CodecError::UnsupportedFilter(item.type_name().to_owned()))
            })
            .collect(),
        Some(other) => Err(CodecError::UnsupportedFilter(other.type_name().to_owned())),
    }
}

fn inflate(data: &[u8]) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::FilterFailed {
            filter: "FlateDecode".into(),
            reason: e.to_string(),
        })?;
    Ok(out)
}

fn unpredict(data: Vec<u8>, parms: Option<&Dictionary>) -> CodecResult<Vec<u8>> {
    let Some(parms) = parms else {
        return Ok(data);
    };
    let int = |key: &str, default: i64| {
        parms
            .get(key.as_bytes())
            .and_then(Object::as_integer)
            .unwrap_or(default)
    };
    match int("Predictor", 1) {
        1 => Ok(data),
        10..=15 => png_unpredict(
            &data,
            int("Colors", 1),
            int("BitsPerComponent", 8),
            int("Columns", 1),
        ),
        other => Err(CodecError::UnsupportedFilter(format!("predictor {other}"))),
    }
}

fn png_unpredict(data: &[u8], colors: i64, bits: i64, columns: i64) -> CodecResult<Vec<u8>> {
    let bad_parameters = || CodecError::FilterFailed {
        filter: "FlateDecode".into(),
        reason: format!("bad predictor parameters {colors}/{bits}/{columns}"),
    };
    let positive = |value: i64| u64::try_from(value).ok().filter(|&v| v > 0);
    let (Some(colors), Some(bits), Some(columns)) = (positive(colors), positive(bits), positive(columns))
    else {
        return Err(bad_parameters());
    };
    let pixel_bits = colors.checked_mul(bits).ok_or_else(bad_parameters)?;
    let bpp = usize::try_from(pixel_bits.div_ceil(8)).map_err(|_| bad_parameters())?;
    let row_len = pixel_bits
        .checked_mul(columns)
        .and_then(|row_bits| usize::try_from(row_bits.div_ceil(8)).ok())
        .filter(|&len| len < usize::MAX)
        .ok_or_else(bad_parameters)?;

    let mut out = Vec::with_capacity(data.len());
    // No row can hold more bytes than the payload does.
    let mut prev = vec![0u8; row_len.min(data.len())];
    for chunk in data.chunks(row_len + 1) {
        let Some((&tag, row)) = chunk.split_first() else {
            break;
        };
        let mut cur = row.to_vec();
        for i in 0..cur.len() {
            let left = if i >= bpp { cur[i - bpp] } else { 0 };
            let up = prev[i];
            let upper_left = if i >= bpp { prev[i - bpp] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, upper_left),
                other => {
                    return Err(CodecError::FilterFailed {
                        filter: "FlateDecode".into(),
                        reason: format!("unknown PNG row filter {other}"),
                    })
                }
            };
            cur[i] = cur[i].wrapping_add(predicted);
        }
        out.extend_from_slice(&cur);
        prev[..cur.len()].copy_from_slice(&cur);
    }
    Ok(out)
}

fn paeth(left: u8, up: u8, upper_left: u8) -> u8 {
    let p = i16::from(left) + i16::from(up) - i16::from(upper_left);
    let pa = (p - i16::from(left)).abs();
    let pb = (p - i16::from(up)).abs();
    let pc = (p - i16::from(upper_left)).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        upper_left
    }
}

fn ascii_hex_decode(data: &[u8]) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;
    for &b in data {
        if b == b'>' {
            break;
        }
        if is_whitespace(b) {
            continue;
        }
        let value = hex_value(b).ok_or_else(|| CodecError::FilterFailed {
            filter: "ASCIIHexDecode".into(),
            reason: format!("invalid digit {b:#04x}"),
        })?;
        match high.take() {
            Some(h) => out.push(h << 4 | value),
            None => high = Some(value),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

fn ascii85_decode(data: &[u8]) -> CodecResult<Vec<u8>> {
    let fail = |reason: String| CodecError::FilterFailed {
        filter: "ASCII85Decode".into(),
        reason,
    };

    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut len = 0;
    for &b in data {
        match b {
            b'~' => break,
            b'z' if len == 0 => out.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[len] = b - b'!';
                len += 1;
                if len == 5 {
                    out.extend_from_slice(&ascii85_group(&group).ok_or_else(|| fail("group overflow".into()))?);
                    len = 0;
                }
            }
            _ if is_whitespace(b) => {}
            _ => return Err(fail(format!("invalid character {b:#04x}"))),
        }
    }
    match len {
        0 => {}
        1 => return Err(fail("dangling final character".into())),
        _ => {
            for slot in group.iter_mut().skip(len) {
                *slot = b'u' - b'!';
            }
            let bytes = ascii85_group(&group).ok_or_else(|| fail("group overflow".into()))?;
            out.extend_from_slice(&bytes[..len - 1]);
        }
    }
    Ok(out)
}

fn ascii85_group(group: &[u8; 5]) -> Option<[u8; 4]> {
    let value = group
        .iter()
        .fold(0u64, |acc, &digit| acc * 85 + u64::from(digit));
    u32::try_from(value).ok().map(u32::to_be_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::Name;

    fn stream_with(filter: Object, parms: Option<Object>, data: Vec<u8>) -> Stream {
        let mut dictionary = Dictionary::from([(Name::from("Filter"), filter)]);
        if let Some(parms) = parms {
            dictionary.insert(Name::from("DecodeParms"), parms);
        }
        Stream::new(dictionary, data)
    }

    #[test]
    fn unfiltered_stream_is_returned_as_is() {
        let stream = Stream::new(Dictionary::new(), b"raw".to_vec());
        assert_eq!(decode_stream(&stream).unwrap(), b"raw");
    }

    #[test]
    fn flate_roundtrip() {
        let payload = b"BT /F1 12 Tf 72 712 Td (Hello) Tj ET".repeat(20);
        let stream = stream_with(
            Object::Name(Name::from("FlateDecode")),
            None,
            flate_encode(&payload).unwrap(),
        );
        assert_eq!(decode_stream(&stream).unwrap(), payload);
    }

    #[test]
    fn png_up_predictor() {
        // Two rows of three columns, both using the Up filter.
        let rows = [2u8, 1, 2, 3, 2, 1, 1, 1];
        let stream = stream_with(
            Object::Name(Name::from("FlateDecode")),
            Some(Object::Dictionary(Dictionary::from([
                (Name::from("Predictor"), Object::Integer(12)),
                (Name::from("Columns"), Object::Integer(3)),
            ]))),
            flate_encode(&rows).unwrap(),
        );
        assert_eq!(decode_stream(&stream).unwrap(), vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn png_sub_and_paeth() {
        let decoded = png_unpredict(&[1, 5, 1, 1, 4, 0, 0, 0], 1, 8, 3).unwrap();
        assert_eq!(decoded, vec![5, 6, 7, 5, 6, 7]);
    }

    #[test]
    fn overflowing_predictor_columns_fail_cleanly() {
        let stream = stream_with(
            Object::Name(Name::from("FlateDecode")),
            Some(Object::Dictionary(Dictionary::from([
                (Name::from("Predictor"), Object::Integer(12)),
                (Name::from("Colors"), Object::Integer(4)),
                (Name::from("Columns"), Object::Integer(i64::MAX / 2)),
            ]))),
            flate_encode(b"\x02abc").unwrap(),
        );
        let err = decode_stream(&stream).unwrap_err();
        assert!(matches!(err, CodecError::FilterFailed { ref filter, .. } if filter == "FlateDecode"));
    }

    #[test]
    fn huge_predictor_row_is_bounded_by_payload() {
        // Fits in the arithmetic but is far larger than the data.
        let decoded = png_unpredict(&[2, 1, 2, 3], 1, 8, 1 << 40).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
        assert!(png_unpredict(&[2, 1], 0, 8, 3).is_err());
    }

    #[test]
    fn non_utf8_filter_name_is_unsupported() {
        let stream = stream_with(Object::Name(Name::new(vec![0xFF])), None, vec![]);
        assert!(matches!(decode_stream(&stream), Err(CodecError::UnsupportedFilter(_))));
    }

    #[test]
    fn chained_filters() {
        let hex = b"48656C6C6F>".to_vec();
        let stream = stream_with(
            Object::Array(vec![Object::Name(Name::from("AHx"))]),
            None,
            hex,
        );
        assert_eq!(decode_stream(&stream).unwrap(), b"Hello");
    }

    #[test]
    fn ascii85() {
        assert_eq!(ascii85_decode(b"87cURD]i,\"Ebo7~>").unwrap(), b"Hello World");
        assert_eq!(ascii85_decode(b"87cURD]i,\"Ebo80~>").unwrap(), b"Hello World!");
        assert_eq!(ascii85_decode(b"z~>").unwrap(), vec![0; 4]);
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let stream = stream_with(Object::Name(Name::from("LZWDecode")), None, vec![]);
        let err = decode_stream(&stream).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedFilter(name) if name == "LZWDecode"));
    }

    #[test]
    fn corrupt_flate_data() {
        let stream = stream_with(Object::Name(Name::from("FlateDecode")), None, b"not zlib".to_vec());
        let err = decode_stream(&stream).unwrap_err();
        assert!(matches!(err, CodecError::FilterFailed { .. }));
    }
}
