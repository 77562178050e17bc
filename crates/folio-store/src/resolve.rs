use folio_codec::{decode_stream, Codec, Parser};
use folio_types::{Name, Object, ObjectReference, Stream, Unresolved};
use folio_xref::XrefEntry;
use tracing::warn;

use crate::file::File;
use crate::slot::Slot;

/// Nesting limit for container and `Length` lookups made while resolving.
const MAX_RESOLVE_DEPTH: usize = 8;

impl File {
    /// Resolve a reference to its current value.
    ///
    /// Never fails: anything that cannot be resolved comes back as `Null`
    /// carrying an [`Unresolved`] diagnostic. The generation in `reference`
    /// is not checked; the slot's current object is returned. Streams always
    /// come back with a direct integer `Length`.
    pub fn get(&self, reference: ObjectReference) -> Object {
        self.resolve(reference, 0)
    }

    fn resolve(&self, reference: ObjectReference, depth: usize) -> Object {
        if depth > MAX_RESOLVE_DEPTH {
            return unresolved(Unresolved::TooDeep(reference));
        }
        let object = match self.slots.get(&reference.object_number) {
            None => return Object::unresolved(Unresolved::NotFound(reference)),
            Some(Slot::Freed(_)) => return Object::unresolved(Unresolved::Freed(reference)),
            Some(Slot::Unmodified(XrefEntry::Free { .. })) => {
                return Object::unresolved(Unresolved::Free(reference))
            }
            Some(Slot::Pending(indirect)) => indirect.object.clone(),
            Some(Slot::Unmodified(XrefEntry::Normal { offset, .. })) => {
                match self.read_at(*offset) {
                    Ok(object) => object,
                    Err(reason) => return unresolved(Unresolved::Parse { reference, reason }),
                }
            }
            Some(Slot::Unmodified(XrefEntry::Compressed { container, index })) => {
                match self.read_compressed(reference, *container, *index, depth) {
                    Ok(object) => object,
                    Err(reason) => {
                        return unresolved(Unresolved::ObjectStream {
                            reference,
                            container: *container,
                            reason,
                        })
                    }
                }
            }
        };
        self.resolve_length(reference, object, depth)
    }

    /// Decode the indirect object starting at `offset` in the mapped bytes.
    fn read_at(&self, offset: u64) -> Result<Object, String> {
        let bytes = self.bytes();
        let rest = usize::try_from(offset)
            .ok()
            .and_then(|start| bytes.get(start..))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| format!("offset {offset} is beyond the loaded file"))?;
        let (indirect, _) = Codec::decode_indirect(rest).map_err(|e| e.to_string())?;
        Ok(indirect.object)
    }

    /// Find an object inside an object stream.
    ///
    /// The entry's index is tried first; if the header pair at that index
    /// names a different object, the whole header is scanned instead.
    fn read_compressed(
        &self,
        reference: ObjectReference,
        container: u32,
        index: u32,
        depth: usize,
    ) -> Result<Object, String> {
        let stream = match self.resolve(ObjectReference::number(container), depth + 1) {
            Object::Stream(stream) => stream,
            Object::Null(Some(reason)) => return Err(reason.to_string()),
            other => return Err(format!("container is a {}, not a stream", other.type_name())),
        };
        let count = stream
            .integer("N")
            .and_then(|n| usize::try_from(n).ok())
            .ok_or("container has no usable /N")?;
        let first = stream
            .integer("First")
            .and_then(|f| usize::try_from(f).ok())
            .ok_or("container has no usable /First")?;
        let payload = decode_stream(&stream).map_err(|e| e.to_string())?;

        let mut parser = Parser::new(&payload);
        // Each pair takes at least four bytes, whatever /N claims.
        let mut header = Vec::with_capacity(count.min(payload.len() / 4));
        for _ in 0..count {
            let number = parser.unsigned().map_err(|e| e.to_string())?;
            let relative = parser.unsigned().map_err(|e| e.to_string())?;
            header.push((number, relative));
        }

        let wanted = u64::from(reference.object_number);
        let hinted = usize::try_from(index)
            .ok()
            .and_then(|i| header.get(i))
            .filter(|(number, _)| *number == wanted);
        let (_, relative) = match hinted {
            Some(pair) => *pair,
            None => {
                let found = header
                    .iter()
                    .find(|(number, _)| *number == wanted)
                    .ok_or_else(|| format!("object {wanted} is not listed in the container"))?;
                warn!(
                    object = reference.object_number,
                    container,
                    index,
                    "object stream index out of sync; found object by scanning"
                );
                *found
            }
        };

        let start = usize::try_from(relative)
            .ok()
            .and_then(|r| first.checked_add(r))
            .filter(|&s| s < payload.len())
            .ok_or("object offset is beyond the container payload")?;
        let (object, _) = Codec::decode(&payload[start..]).map_err(|e| e.to_string())?;
        Ok(object)
    }

    /// Replace an indirect stream `Length` with the resolved integer and cut
    /// the payload to it. Other values pass through.
    fn resolve_length(&self, reference: ObjectReference, object: Object, depth: usize) -> Object {
        let stream = match object {
            Object::Stream(stream) => stream,
            other => return other,
        };
        let Some(length_reference) = stream.length_reference() else {
            return Object::Stream(stream);
        };
        let length = match self.resolve(length_reference, depth + 1) {
            Object::Integer(n) => n,
            Object::Null(Some(reason)) => {
                return unresolved(Unresolved::Length {
                    reference,
                    reason: reason.to_string(),
                })
            }
            other => {
                return unresolved(Unresolved::Length {
                    reference,
                    reason: format!("{length_reference} is a {}", other.type_name()),
                })
            }
        };
        match fit_length(stream, length) {
            Ok(stream) => Object::Stream(stream),
            Err(reason) => unresolved(Unresolved::Length { reference, reason }),
        }
    }
}

fn fit_length(mut stream: Stream, length: i64) -> Result<Stream, String> {
    let length = usize::try_from(length).map_err(|_| format!("negative length {length}"))?;
    if length > stream.data.len() {
        return Err(format!(
            "length {length} exceeds the {} byte payload",
            stream.data.len()
        ));
    }
    stream.data.truncate(length);
    stream
        .dictionary
        .insert(Name::from("Length"), Object::Integer(length as i64));
    Ok(stream)
}

/// `Null` for a failure worth logging; missing and free objects are routine.
fn unresolved(reason: Unresolved) -> Object {
    warn!(reference = %reason.reference(), %reason, "object could not be resolved");
    Object::unresolved(reason)
}
