use folio_types::{Dictionary, IndirectObject, Name, Object, ObjectReference, Stream};
use tracing::debug;

use crate::error::{CodecError, CodecResult};

pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

pub(crate) fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// How many arrays, dictionaries and indirect objects may enclose a value.
pub const MAX_NESTING: usize = 256;

/// Cursor-based reader for the object grammar (ISO 32000-1 §7.2–7.3).
///
/// Offsets in errors are relative to the slice the parser was created with.
#[derive(Debug)]
pub struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns `true` when only whitespace and comments remain.
    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.data.len()
    }

    /// Skip whitespace and `%` comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek() {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn next_byte(&mut self) -> CodecResult<u8> {
        let b = self.peek().ok_or(CodecError::UnexpectedEof(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    /// Consume `keyword` if it is the next token.
    pub fn eat_keyword(&mut self, keyword: &[u8]) -> bool {
        self.skip_whitespace();
        let rest = &self.data[self.pos..];
        let bounded = rest
            .get(keyword.len())
            .map_or(true, |&b| !is_regular(b));
        if rest.starts_with(keyword) && bounded {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    /// Consume `keyword` or fail describing what was found instead.
    pub fn expect_keyword(&mut self, keyword: &'static str) -> CodecResult<()> {
        if self.eat_keyword(keyword.as_bytes()) {
            return Ok(());
        }
        let start = self.pos;
        let found: Vec<u8> = self.data[start..]
            .iter()
            .copied()
            .take_while(|&b| is_regular(b))
            .collect();
        match self.peek() {
            None => Err(CodecError::UnexpectedEof(start)),
            Some(b) if found.is_empty() => Err(CodecError::UnexpectedByte {
                offset: start,
                found: b,
                expected: keyword,
            }),
            Some(_) => Err(CodecError::UnknownKeyword {
                offset: start,
                keyword: String::from_utf8_lossy(&found).into_owned(),
            }),
        }
    }

    /// Read the next regular-character token.
    pub fn keyword(&mut self) -> CodecResult<&'a [u8]> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(is_regular) {
            self.pos += 1;
        }
        if start == self.pos {
            return match self.peek() {
                None => Err(CodecError::UnexpectedEof(start)),
                Some(found) => Err(CodecError::UnexpectedByte {
                    offset: start,
                    found,
                    expected: "a keyword",
                }),
            };
        }
        Ok(&self.data[start..self.pos])
    }

    /// Read an unsigned decimal integer (no sign, no fraction).
    pub fn unsigned(&mut self) -> CodecResult<u64> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return match self.peek() {
                None => Err(CodecError::UnexpectedEof(start)),
                Some(found) => Err(CodecError::UnexpectedByte {
                    offset: start,
                    found,
                    expected: "a digit",
                }),
            };
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(CodecError::InvalidNumber(start))
    }

    /// Read a numeric token that must be an integer.
    pub fn integer(&mut self) -> CodecResult<i64> {
        self.skip_whitespace();
        let start = self.pos;
        match self.number()? {
            Object::Integer(i) => Ok(i),
            _ => Err(CodecError::InvalidNumber(start)),
        }
    }

    /// Parse `n g obj <object> endobj`.
    pub fn indirect_object(&mut self) -> CodecResult<IndirectObject> {
        self.skip_whitespace();
        let start = self.pos;
        let number = u32::try_from(self.unsigned()?).map_err(|_| CodecError::InvalidNumber(start))?;
        let generation =
            u16::try_from(self.unsigned()?).map_err(|_| CodecError::InvalidNumber(start))?;
        self.expect_keyword("obj")?;
        let object = self.object()?;
        self.expect_keyword("endobj")?;
        Ok(IndirectObject::new(
            ObjectReference::new(number, generation),
            object,
        ))
    }

    /// Parse the next object.
    pub fn object(&mut self) -> CodecResult<Object> {
        self.skip_whitespace();
        let start = self.pos;
        let b = self.peek().ok_or(CodecError::UnexpectedEof(start))?;
        match b {
            b'/' => Ok(Object::Name(self.name()?)),
            b'(' => Ok(Object::String(self.literal_string()?)),
            b'<' if self.data.get(start + 1) == Some(&b'<') => {
                self.nested(Self::dictionary_or_stream)
            }
            b'<' => Ok(Object::String(self.hex_string()?)),
            b'[' => self.nested(Self::array),
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.number_or_reference(),
            _ if is_regular(b) => match self.keyword()? {
                b"true" => Ok(Object::Boolean(true)),
                b"false" => Ok(Object::Boolean(false)),
                b"null" => Ok(Object::null()),
                other => Err(CodecError::UnknownKeyword {
                    offset: start,
                    keyword: String::from_utf8_lossy(other).into_owned(),
                }),
            },
            found => Err(CodecError::UnexpectedByte {
                offset: start,
                found,
                expected: "an object",
            }),
        }
    }

    /// Run `parse` one container level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> CodecResult<T>) -> CodecResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(CodecError::NestingTooDeep(self.pos));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn number(&mut self) -> CodecResult<Object> {
        self.skip_whitespace();
        let start = self.pos;
        let mut end = start;
        if matches!(self.data.get(end), Some(b'+' | b'-')) {
            end += 1;
        }
        let mut digits = 0;
        let mut fractional = false;
        while let Some(&b) = self.data.get(end) {
            match b {
                b'0'..=b'9' => digits += 1,
                b'.' if !fractional => fractional = true,
                _ => break,
            }
            end += 1;
        }
        if digits == 0 {
            return Err(CodecError::InvalidNumber(start));
        }
        let text = std::str::from_utf8(&self.data[start..end])
            .map_err(|_| CodecError::InvalidNumber(start))?;
        self.pos = end;
        if fractional {
            text.parse()
                .map(Object::Real)
                .map_err(|_| CodecError::InvalidNumber(start))
        } else {
            text.parse()
                .map(Object::Integer)
                .map_err(|_| CodecError::InvalidNumber(start))
        }
    }

    fn number_or_reference(&mut self) -> CodecResult<Object> {
        let number = self.number()?;
        let Some(object_number) = number.as_integer().and_then(|n| u32::try_from(n).ok()) else {
            return Ok(number);
        };

        let checkpoint = self.pos;
        let generation = self
            .unsigned()
            .ok()
            .and_then(|g| u16::try_from(g).ok());
        if let Some(generation) = generation {
            let reference = ObjectReference::new(object_number, generation);
            if self.eat_keyword(b"R") {
                return Ok(Object::Reference(reference));
            }
            if self.eat_keyword(b"obj") {
                let object = self.nested(Self::object)?;
                self.expect_keyword("endobj")?;
                return Ok(IndirectObject::new(reference, object).into());
            }
        }
        self.pos = checkpoint;
        Ok(number)
    }

    fn name(&mut self) -> CodecResult<Name> {
        self.pos += 1;
        let mut bytes = Vec::new();
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            if b == b'#' {
                let escaped = self
                    .data
                    .get(self.pos + 1..self.pos + 3)
                    .and_then(|pair| Some(hex_value(pair[0])? << 4 | hex_value(pair[1])?));
                if let Some(value) = escaped {
                    bytes.push(value);
                    self.pos += 3;
                    continue;
                }
            }
            bytes.push(b);
            self.pos += 1;
        }
        Ok(Name::new(bytes))
    }

    fn literal_string(&mut self) -> CodecResult<Vec<u8>> {
        self.pos += 1;
        let mut depth = 1;
        let mut out = Vec::new();
        loop {
            match self.next_byte()? {
                b'(' => {
                    depth += 1;
                    out.push(b'(');
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b')');
                }
                b'\\' => match self.next_byte()? {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    d @ b'0'..=b'7' => {
                        let mut value = u32::from(d - b'0');
                        for _ in 0..2 {
                            match self.peek() {
                                Some(d @ b'0'..=b'7') => {
                                    value = value * 8 + u32::from(d - b'0');
                                    self.pos += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((value & 0xff) as u8);
                    }
                    // line continuation
                    b'\r' => {
                        if self.peek() == Some(b'\n') {
                            self.pos += 1;
                        }
                    }
                    b'\n' => {}
                    other => out.push(other),
                },
                b'\r' => {
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                b => out.push(b),
            }
        }
        Ok(out)
    }

    fn hex_string(&mut self) -> CodecResult<Vec<u8>> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut high: Option<u8> = None;
        loop {
            let offset = self.pos;
            let b = self.next_byte()?;
            if b == b'>' {
                break;
            }
            if is_whitespace(b) {
                continue;
            }
            let value = hex_value(b).ok_or(CodecError::UnexpectedByte {
                offset,
                found: b,
                expected: "a hex digit",
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

    fn array(&mut self) -> CodecResult<Object> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => items.push(self.object()?),
                None => return Err(CodecError::UnexpectedEof(self.pos)),
            }
        }
        Ok(Object::Array(items))
    }

    fn dictionary_or_stream(&mut self) -> CodecResult<Object> {
        self.pos += 2;
        let mut dictionary = Dictionary::new();
        loop {
            self.skip_whitespace();
            let offset = self.pos;
            match self.peek() {
                Some(b'>') if self.data.get(offset + 1) == Some(&b'>') => {
                    self.pos += 2;
                    break;
                }
                Some(b'/') => {
                    let key = self.name()?;
                    let value = self.object()?;
                    dictionary.insert(key, value);
                }
                Some(found) => {
                    return Err(CodecError::UnexpectedByte {
                        offset,
                        found,
                        expected: "a name key or '>>'",
                    })
                }
                None => return Err(CodecError::UnexpectedEof(offset)),
            }
        }

        let checkpoint = self.pos;
        if self.eat_keyword(b"stream") {
            self.stream_body(dictionary)
        } else {
            self.pos = checkpoint;
            Ok(Object::Dictionary(dictionary))
        }
    }

    /// Read a stream payload. A direct `Length` is trusted only when it lands
    /// on `endstream`; otherwise the payload runs up to the keyword and the
    /// direct `Length` is corrected to match it.
    fn stream_body(&mut self, mut dictionary: Dictionary) -> CodecResult<Object> {
        match self.peek() {
            Some(b'\r') => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
        let start = self.pos;

        let declared_end = dictionary
            .get(b"Length".as_slice())
            .and_then(Object::as_integer)
            .and_then(|len| usize::try_from(len).ok())
            .and_then(|len| start.checked_add(len))
            .filter(|&end| end <= self.data.len());
        let located = declared_end.and_then(|end| self.endstream_at(end).map(|resume| (end, resume)));

        let (end, resume) = match located {
            Some(found) => found,
            None => {
                debug!(offset = start, "stream Length unusable; scanning for endstream");
                let keyword = find(&self.data[start..], b"endstream")
                    .map(|i| start + i)
                    .ok_or(CodecError::UnexpectedEof(start))?;
                let mut end = keyword;
                // An indirect Length is applied later by the caller, which
                // needs the untrimmed payload.
                let indirect_length = dictionary
                    .get(b"Length".as_slice())
                    .and_then(Object::as_reference)
                    .is_some();
                if !indirect_length {
                    if end > start && self.data[end - 1] == b'\n' {
                        end -= 1;
                    }
                    if end > start && self.data[end - 1] == b'\r' {
                        end -= 1;
                    }
                    dictionary.insert(Name::from("Length"), Object::Integer((end - start) as i64));
                }
                (end, keyword + b"endstream".len())
            }
        };

        let data = self.data[start..end].to_vec();
        self.pos = resume;
        Ok(Object::Stream(Stream::new(dictionary, data)))
    }

    fn endstream_at(&self, at: usize) -> Option<usize> {
        let mut pos = at;
        while self.data.get(pos).copied().is_some_and(is_whitespace) {
            pos += 1;
        }
        self.data[pos..]
            .starts_with(b"endstream")
            .then_some(pos + b"endstream".len())
    }
}
