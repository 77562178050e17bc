//! Object model for folio.
//!
//! This crate provides the value types shared by every other folio crate: the
//! closed set of PDF values, object references, and indirect objects. It has
//! no behavior beyond identity and conversions; the byte grammar lives in
//! `folio-codec`.
//!
//! # Key Types
//!
//! - [`Object`]: one of the PDF value variants (ISO 32000-1 §7.3)
//! - [`ObjectReference`]: object number + generation number pair
//! - [`IndirectObject`]: an [`Object`] bound to an [`ObjectReference`]
//! - [`Stream`]: a [`Dictionary`] plus a raw byte payload
//! - [`Unresolved`]: diagnostic carried by a `Null` that stands in for a
//!   value that could not be resolved

pub mod error;
pub mod object;
pub mod reference;

pub use error::Unresolved;
pub use object::{Dictionary, Name, Object, Stream};
pub use reference::{IndirectObject, ObjectReference};
