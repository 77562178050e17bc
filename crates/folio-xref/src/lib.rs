//! Cross-reference index for folio.
//!
//! Maps object numbers to where their current revision lives. Loading walks
//! the `startxref`/`Prev` chain across classic tables, cross-reference streams
//! and hybrid files; writing produces one new section per saved revision in
//! either encoding, with the free list threaded through object 0.

pub mod entry;
pub mod error;
pub mod free_list;
pub mod reader;
pub mod section;
pub mod trailer;
pub mod writer;

pub use entry::XrefEntry;
pub use error::{XrefError, XrefResult};
pub use free_list::{FreeList, FREE_HEAD_GENERATION};
pub use reader::{find_startxref, load_chain, read_section, LoadedIndex, Section};
pub use section::{subsections, Subsection};
pub use trailer::Trailer;
pub use writer::{write_footer, XrefFormat, XrefWriter};
