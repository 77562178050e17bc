//! Incremental object store for PDF files.
//!
//! A [`File`] maps the original bytes read-only, resolves references through
//! the loaded cross-reference chain, and keeps additions and deletions in
//! memory as [`Slot`]s until [`File::save`] appends them as one new revision.
//!
//! ```no_run
//! use folio_store::File;
//! use folio_types::ObjectReference;
//!
//! # fn main() -> folio_store::StoreResult<()> {
//! let mut file = File::open("report.pdf")?;
//! let page = file.get(ObjectReference::number(4));
//! file.add(page)?;
//! file.free(9);
//! file.save()?;
//! file.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod file;
pub mod resolve;
pub mod save;
pub mod slot;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use file::File;
pub use folio_xref::XrefFormat;
pub use slot::Slot;
