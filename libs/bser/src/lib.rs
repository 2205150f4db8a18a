//! # Binary Serialization (BSER)
//!
//! Encoder and decoder for the compact, self-describing binary format used by
//! file-watching daemons to talk to their clients. Think JSON, but with binary
//! lengths and integers, and a template shortcut for arrays of similar objects.
//!
//! Every message is a frame: the marker `00 01`, the body length as an
//! integer, and then the body, which is exactly one value. Every value starts
//! with a tag byte:
//!
//! | tag    | value                                                    |
//! |--------|----------------------------------------------------------|
//! | `0x00` | array: integer count, then that many values              |
//! | `0x01` | object: integer count, then that many string-value pairs |
//! | `0x02` | string: integer length, then that many raw bytes         |
//! | `0x03` | int8                                                     |
//! | `0x04` | int16                                                    |
//! | `0x05` | int32                                                    |
//! | `0x06` | int64                                                    |
//! | `0x07` | real: 8 byte IEEE-754 double                             |
//! | `0x08` | true                                                     |
//! | `0x09` | false                                                    |
//! | `0x0a` | null                                                     |
//! | `0x0b` | template: see below                                      |
//! | `0x0c` | skip: absent field inside a template row                 |
//!
//! Multi-byte payloads are little-endian. Strings are byte strings and aren't
//! required to be valid UTF-8.
//!
//! A template is an array of strings naming the keys, the row count, and then
//! one value (or skip) per key for every row. It decodes to an array of
//! objects. This crate never encodes templates.
//!
//! There are two ways to use this crate:
//!
//! - Build a [`Value`] and use [`encode`] and [`decode`].
//! - Use any [`serde`] type with [`to_vec`] and [`from_slice`]. See [`ser`] for
//!   how Rust types map to the format.
//!
//! For streams, [`peek_total_length`] tells how many bytes a frame needs, and
//! [`read_pdu`] reads one frame from a blocking reader.

// for benchmarks
#[cfg(test)]
use criterion as _;

pub mod de;
pub mod decode;
pub mod encode;
pub mod error;
pub mod header;
mod read;
pub mod ser;
mod stream;
pub mod tag;
pub mod value;
pub mod varint;

pub use de::{from_reader, from_slice, from_value};
pub use decode::{DecodeOptions, decode, decode_with};
pub use encode::{encode, encode_to_writer};
pub use error::{Error, Result};
pub use header::{PduLength, peek_total_length};
pub use ser::{to_value, to_vec, to_writer};
pub use stream::{read_pdu, read_pdu_with};
pub use value::{Map, Value};
