use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Unresolved;
use crate::reference::{IndirectObject, ObjectReference};

/// Associative table mapping names to objects (§7.3.7).
///
/// Ordered so that encoding is deterministic.
pub type Dictionary = BTreeMap<Name, Object>;

/// A PDF value (ISO 32000-1 §7.3).
///
/// `Reference` and `Indirect` are the two forms an object takes at the
/// boundary between objects; every other variant is a plain value.
#[derive(Clone, Debug, PartialEq)]
pub enum Object {
    /// Logical `true` / `false` (§7.3.2).
    Boolean(bool),
    /// Mathematical integer (§7.3.3).
    Integer(i64),
    /// Mathematical real number (§7.3.3).
    Real(f64),
    /// Zero or more raw bytes (§7.3.4).
    String(Vec<u8>),
    /// Atomic symbol (§7.3.5).
    Name(Name),
    /// Ordered sequence of objects (§7.3.6).
    Array(Vec<Object>),
    /// Name-keyed table (§7.3.7).
    Dictionary(Dictionary),
    /// Dictionary plus byte payload (§7.3.8).
    Stream(Stream),
    /// Absence of a value (§7.3.9). Carries a diagnostic when it stands in for
    /// a lookup that failed.
    Null(Option<Unresolved>),
    /// `n g R`: refers to an indirect object.
    Reference(ObjectReference),
    /// `n g obj ... endobj`: a value bound to a reference.
    Indirect(Box<IndirectObject>),
}

impl Object {
    /// A plain `null`.
    pub const fn null() -> Self {
        Self::Null(None)
    }

    /// A `null` explaining why a lookup produced nothing.
    pub fn unresolved(reason: Unresolved) -> Self {
        Self::Null(Some(reason))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// The diagnostic of a `Null` produced by a failed lookup.
    pub fn unresolved_reason(&self) -> Option<&Unresolved> {
        match self {
            Self::Null(reason) => reason.as_ref(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to reals.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(r) => Some(*r),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectReference> {
        match self {
            Self::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Short variant name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::String(_) => "string",
            Self::Name(_) => "name",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dictionary",
            Self::Stream(_) => "stream",
            Self::Null(_) => "null",
            Self::Reference(_) => "reference",
            Self::Indirect(_) => "indirect object",
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&[u8]> for Object {
    fn from(value: &[u8]) -> Self {
        Self::String(value.to_vec())
    }
}

impl From<Name> for Object {
    fn from(value: Name) -> Self {
        Self::Name(value)
    }
}

impl From<Vec<Object>> for Object {
    fn from(value: Vec<Object>) -> Self {
        Self::Array(value)
    }
}

impl From<Dictionary> for Object {
    fn from(value: Dictionary) -> Self {
        Self::Dictionary(value)
    }
}

impl From<Stream> for Object {
    fn from(value: Stream) -> Self {
        Self::Stream(value)
    }
}

impl From<ObjectReference> for Object {
    fn from(value: ObjectReference) -> Self {
        Self::Reference(value)
    }
}

impl From<IndirectObject> for Object {
    fn from(value: IndirectObject) -> Self {
        Self::Indirect(Box::new(value))
    }
}

/// A PDF name without its leading `/`.
///
/// Names are byte sequences; `#xx` escapes may decode to bytes that are not
/// UTF-8, so dictionaries are keyed by the raw bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Vec<u8>);

impl Name {
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        Self(name.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The name as text, when it is UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&[u8]> for Name {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<Vec<u8>> for Name {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", String::from_utf8_lossy(&self.0))
    }
}

/// A stream: its dictionary and the raw (still filtered) payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stream {
    pub dictionary: Dictionary,
    pub data: Vec<u8>,
}

impl Stream {
    pub fn new(dictionary: Dictionary, data: Vec<u8>) -> Self {
        Self { dictionary, data }
    }

    /// The `Length` entry when it is an indirect reference that still needs
    /// resolving.
    pub fn length_reference(&self) -> Option<ObjectReference> {
        self.dictionary
            .get(b"Length".as_slice())
            .and_then(Object::as_reference)
    }

    /// Look up an integer entry in the stream dictionary.
    pub fn integer(&self, key: &str) -> Option<i64> {
        self.dictionary
            .get(key.as_bytes())
            .and_then(Object::as_integer)
    }
}
