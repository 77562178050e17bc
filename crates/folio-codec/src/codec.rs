use std::io::Write;

use folio_types::{IndirectObject, Object};

use crate::encoder::{write_indirect, write_object};
use crate::error::CodecResult;
use crate::parser::Parser;

/// Entry point for turning bytes into objects and back.
pub struct Codec;

impl Codec {
    /// Decode one object from the start of `data`. Returns (object, bytes_consumed).
    pub fn decode(data: &[u8]) -> CodecResult<(Object, usize)> {
        let mut parser = Parser::new(data);
        let object = parser.object()?;
        Ok((object, parser.position()))
    }

    /// Decode `n g obj ... endobj` from the start of `data`.
    pub fn decode_indirect(data: &[u8]) -> CodecResult<(IndirectObject, usize)> {
        let mut parser = Parser::new(data);
        let object = parser.indirect_object()?;
        Ok((object, parser.position()))
    }

    /// Write the canonical form of `object`.
    pub fn encode<W: Write>(object: &Object, out: &mut W) -> CodecResult<()> {
        Ok(write_object(object, out)?)
    }

    /// Write `object` framed as `n g obj ... endobj`.
    pub fn encode_indirect<W: Write>(object: &IndirectObject, out: &mut W) -> CodecResult<()> {
        Ok(write_indirect(object, out)?)
    }

    /// Canonical form of `object` as a byte vector.
    pub fn to_bytes(object: &Object) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        write_object(object, &mut buf)?;
        Ok(buf)
    }
}
