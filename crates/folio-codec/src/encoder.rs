use std::io::{self, Write};

use folio_types::{Dictionary, IndirectObject, Name, Object, Stream};

use crate::parser::{is_delimiter, is_whitespace};

/// Write the canonical byte form of `object`.
pub fn write_object<W: Write>(object: &Object, out: &mut W) -> io::Result<()> {
    match object {
        Object::Boolean(true) => out.write_all(b"true"),
        Object::Boolean(false) => out.write_all(b"false"),
        Object::Integer(i) => write!(out, "{i}"),
        Object::Real(r) => write_real(*r, out),
        Object::String(bytes) => write_string(bytes, out),
        Object::Name(name) => write_name(name, out),
        Object::Array(items) => {
            out.write_all(b"[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_all(b" ")?;
                }
                write_object(item, out)?;
            }
            out.write_all(b"]")
        }
        Object::Dictionary(dictionary) => write_dictionary(dictionary, out),
        Object::Stream(stream) => write_stream(stream, out),
        Object::Null(_) => out.write_all(b"null"),
        Object::Reference(r) => write!(out, "{} {} R", r.object_number, r.generation),
        Object::Indirect(indirect) => write_indirect(indirect, out),
    }
}

/// Write `n g obj`, the value, and `endobj`.
pub fn write_indirect<W: Write>(indirect: &IndirectObject, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "{} {} obj",
        indirect.reference.object_number, indirect.reference.generation
    )?;
    write_object(&indirect.object, out)?;
    out.write_all(b"\nendobj")
}

fn write_real<W: Write>(r: f64, out: &mut W) -> io::Result<()> {
    if !r.is_finite() {
        return out.write_all(b"0.0");
    }
    let text = r.to_string();
    out.write_all(text.as_bytes())?;
    if !text.contains('.') {
        out.write_all(b".0")?;
    }
    Ok(())
}

fn write_string<W: Write>(bytes: &[u8], out: &mut W) -> io::Result<()> {
    out.write_all(b"(")?;
    for &b in bytes {
        match b {
            b'\\' => out.write_all(b"\\\\")?,
            b'(' => out.write_all(b"\\(")?,
            b')' => out.write_all(b"\\)")?,
            b'\r' => out.write_all(b"\\r")?,
            b'\n' => out.write_all(b"\\n")?,
            _ => out.write_all(&[b])?,
        }
    }
    out.write_all(b")")
}

fn write_name<W: Write>(name: &Name, out: &mut W) -> io::Result<()> {
    out.write_all(b"/")?;
    for &b in name.as_bytes() {
        if (b'!'..=b'~').contains(&b) && !is_delimiter(b) && !is_whitespace(b) && b != b'#' {
            out.write_all(&[b])?;
        } else {
            write!(out, "#{b:02X}")?;
        }
    }
    Ok(())
}

fn write_dictionary<W: Write>(dictionary: &Dictionary, out: &mut W) -> io::Result<()> {
    out.write_all(b"<<")?;
    for (i, (key, value)) in dictionary.iter().enumerate() {
        if i > 0 {
            out.write_all(b" ")?;
        }
        write_name(key, out)?;
        out.write_all(b" ")?;
        write_object(value, out)?;
    }
    out.write_all(b">>")
}

fn write_stream<W: Write>(stream: &Stream, out: &mut W) -> io::Result<()> {
    // A direct Length always describes the payload actually written.
    if stream.length_reference().is_some() {
        write_dictionary(&stream.dictionary, out)?;
    } else {
        let mut dictionary = stream.dictionary.clone();
        dictionary.insert(Name::from("Length"), Object::Integer(stream.data.len() as i64));
        write_dictionary(&dictionary, out)?;
    }
    out.write_all(b"\nstream\n")?;
    out.write_all(&stream.data)?;
    out.write_all(b"\nendstream")
}
