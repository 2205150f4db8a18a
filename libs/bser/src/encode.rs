//! Encodes [`Value`]s into frames.

use std::io;

use crate::error::{Error, Result};
use crate::header;
use crate::tag::Tag;
use crate::value::Value;
use crate::varint;

/// Encodes a value as a complete frame, header included.
///
/// The resulting buffer is ready to be sent as-is.
///
/// # Errors
///
/// Returns [`Error::ValueTooLarge`] if the encoded body doesn't fit the
/// header's length field. No partial buffer is returned in that case.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut buf = header::begin_frame();
    Encoder::new(&mut buf).write_value(value)?;
    header::finish_frame(&mut buf)?;
    Ok(buf)
}

/// Encodes a value as a complete frame and writes it to a [`io::Write`].
///
/// The frame is built in memory first, so nothing is written if encoding
/// fails.
///
/// # Errors
///
/// Returns `Err` if encoding failed or writing to `writer` failed.
pub fn encode_to_writer<W: io::Write>(mut writer: W, value: &Value) -> Result<()> {
    let buf = encode(value)?;
    Ok(writer.write_all(&buf)?)
}

/// Writes individual values to a [`io::Write`], without any frame header.
///
/// This is the building block for [`encode`] and the
/// [`Serializer`](crate::ser::Serializer).
#[derive(Debug)]
pub struct Encoder<W> {
    writer: W,
}

impl<W: io::Write> Encoder<W> {
    /// Creates a new encoder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwraps the encoder into its inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_tag(&mut self, tag: Tag) -> Result<()> {
        Ok(self.writer.write_all(&[tag.into()])?)
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = i64::try_from(len).map_err(|_| Error::ValueTooLarge)?;
        varint::write(&mut self.writer, len)
    }

    /// # Errors
    ///
    /// Returns `Err` if writing failed.
    pub fn write_null(&mut self) -> Result<()> {
        self.write_tag(Tag::Null)
    }

    /// # Errors
    ///
    /// Returns `Err` if writing failed.
    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_tag(if v { Tag::True } else { Tag::False })
    }

    /// Writes an integer in its narrowest width.
    ///
    /// # Errors
    ///
    /// Returns `Err` if writing failed.
    pub fn write_int(&mut self, v: i64) -> Result<()> {
        varint::write(&mut self.writer, v)
    }

    /// # Errors
    ///
    /// Returns `Err` if writing failed.
    pub fn write_real(&mut self, v: f64) -> Result<()> {
        self.write_tag(Tag::Real)?;
        Ok(self.writer.write_all(&v.to_le_bytes())?)
    }

    /// Writes a string. The bytes are written as-is.
    ///
    /// # Errors
    ///
    /// Returns `Err` if writing failed.
    pub fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.write_tag(Tag::String)?;
        self.write_len(v.len())?;
        Ok(self.writer.write_all(v)?)
    }

    /// Starts an array. Exactly `len` values must follow.
    ///
    /// # Errors
    ///
    /// Returns `Err` if writing failed.
    pub fn write_array_header(&mut self, len: usize) -> Result<()> {
        self.write_tag(Tag::Array)?;
        self.write_len(len)
    }

    /// Starts an object. Exactly `len` pairs of a string key and a value
    /// must follow.
    ///
    /// # Errors
    ///
    /// Returns `Err` if writing failed.
    pub fn write_object_header(&mut self, len: usize) -> Result<()> {
        self.write_tag(Tag::Object)?;
        self.write_len(len)
    }

    /// Writes a whole value, recursively.
    ///
    /// Object entries are written in the map's iteration order.
    ///
    /// # Errors
    ///
    /// Returns `Err` if writing failed.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.write_null(),
            Value::Bool(b) => self.write_bool(*b),
            Value::Int(i) => self.write_int(*i),
            Value::Double(d) => self.write_real(*d),
            Value::Bytes(b) => self.write_bytes(b),
            Value::Array(items) => {
                self.write_array_header(items.len())?;
                items.iter().try_for_each(|v| self.write_value(v))
            }
            Value::Object(map) => {
                self.write_object_header(map.len())?;
                for (k, v) in map {
                    self.write_bytes(k)?;
                    self.write_value(v)?;
                }
                Ok(())
            }
        }
    }
}
