//! Byte grammar for folio.
//!
//! Turns raw PDF bytes into [`folio_types::Object`] values and back, and
//! removes stream filters so that object streams and cross-reference streams
//! can be read.
//!
//! - [`Codec`]: decode/encode entry points with `(object, bytes_consumed)`
//!   results
//! - [`Parser`]: cursor over a byte slice, also used directly by the
//!   cross-reference loader for table tokens
//! - [`decode_stream`] / [`flate_encode`]: the stream filter collaborator

pub mod codec;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod parser;

pub use codec::Codec;
pub use error::{CodecError, CodecResult};
pub use filter::{decode_stream, flate_encode};
pub use parser::Parser;
