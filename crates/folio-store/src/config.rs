use folio_xref::XrefFormat;
use serde::{Deserialize, Serialize};

/// How a [`File`](crate::File) writes its revisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Encoding of the cross-reference section appended by each save.
    pub xref_format: XrefFormat,
    /// Flate-compress the cross-reference stream payload.
    /// Ignored for the table format.
    pub compress_xref_stream: bool,
    /// fsync the file after each save.
    pub sync_on_save: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            xref_format: XrefFormat::Table,
            compress_xref_stream: false,
            sync_on_save: false,
        }
    }
}

impl StoreConfig {
    /// Write cross-reference streams instead of tables.
    pub fn xref_stream() -> Self {
        Self {
            xref_format: XrefFormat::Stream,
            ..Self::default()
        }
    }
}
