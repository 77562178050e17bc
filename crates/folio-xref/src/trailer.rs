use folio_types::{Dictionary, Name, Object, ObjectReference};

/// The trailer keys folio manages (ISO 32000-1 §7.5.5).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trailer {
    /// One past the highest object number.
    pub size: u32,
    /// Offset of the previous cross-reference section.
    pub prev: Option<u64>,
    /// The document catalog.
    pub root: ObjectReference,
    /// Encryption dictionary, carried through untouched.
    pub encrypt: Option<Object>,
    /// Document information dictionary.
    pub info: Option<ObjectReference>,
    /// Two byte-strings identifying the file.
    pub id: Option<Vec<Object>>,
}

impl Trailer {
    /// Read the managed keys; anything malformed is treated as absent.
    pub fn from_dictionary(dictionary: &Dictionary) -> Self {
        Self {
            size: dictionary
                .get(b"Size".as_slice())
                .and_then(Object::as_integer)
                .and_then(|s| u32::try_from(s).ok())
                .unwrap_or(0),
            prev: dictionary
                .get(b"Prev".as_slice())
                .and_then(Object::as_integer)
                .and_then(|p| u64::try_from(p).ok())
                .filter(|&p| p != 0),
            root: dictionary
                .get(b"Root".as_slice())
                .and_then(Object::as_reference)
                .unwrap_or_default(),
            encrypt: dictionary.get(b"Encrypt".as_slice()).cloned(),
            info: dictionary.get(b"Info".as_slice()).and_then(Object::as_reference),
            id: dictionary
                .get(b"ID".as_slice())
                .and_then(Object::as_array)
                .map(<[Object]>::to_vec),
        }
    }

    /// Build the dictionary written after a cross-reference section.
    pub fn to_dictionary(&self) -> Dictionary {
        let mut dictionary = Dictionary::new();
        dictionary.insert(Name::from("Size"), Object::Integer(self.size.into()));
        if let Some(prev) = self.prev.filter(|&p| p != 0) {
            dictionary.insert(Name::from("Prev"), Object::Integer(prev as i64));
        }
        dictionary.insert(Name::from("Root"), Object::Reference(self.root));
        if let Some(encrypt) = &self.encrypt {
            dictionary.insert(Name::from("Encrypt"), encrypt.clone());
        }
        if let Some(info) = self.info {
            dictionary.insert(Name::from("Info"), Object::Reference(info));
        }
        if let Some(id) = &self.id {
            dictionary.insert(Name::from("ID"), Object::Array(id.clone()));
        }
        dictionary
    }

    /// Fill keys this (newer) trailer lacks from an older revision's trailer.
    pub fn inherit(&mut self, older: &Trailer) {
        self.size = self.size.max(older.size);
        if self.root.is_null() {
            self.root = older.root;
        }
        if self.encrypt.is_none() {
            self.encrypt = older.encrypt.clone();
        }
        if self.info.is_none() {
            self.info = older.info;
        }
        if self.id.is_none() {
            self.id = older.id.clone();
        }
    }
}
