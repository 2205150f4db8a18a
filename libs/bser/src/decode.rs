//! Decodes frames into [`Value`]s.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::header::{self, HeaderState};
use crate::read::SliceRead;
use crate::tag::Tag;
use crate::value::{Map, Value};
use crate::varint;

/// The default for [`DecodeOptions::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// The default for [`DecodeOptions::max_template_expansion`], 64 MiB.
pub const DEFAULT_MAX_TEMPLATE_EXPANSION: usize = 64 << 20;

/// Caps preallocations for counts that aren't bounded by the input.
const PREALLOC_LIMIT: usize = 0x1000;

/// Limits applied while decoding.
///
/// This can be deserialized, f.e. as part of an application's config file.
/// Missing fields use their default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// How deeply arrays and objects may nest.
    ///
    /// The decoder recurses for every level, so this bounds its stack usage.
    pub max_depth: usize,
    /// The largest frame, header included, that will be accepted.
    ///
    /// [`None`] means no limit besides the input itself.
    pub max_length: Option<usize>,
    /// How many bytes template expansion may add on top of the frame.
    ///
    /// Every template row copies all schema keys, so a small frame can
    /// expand into a lot of memory. Each row is charged the summed length of
    /// the keys plus the size of one [`Value`]. This is shared by all
    /// templates in a frame.
    pub max_template_expansion: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_length: None,
            max_template_expansion: DEFAULT_MAX_TEMPLATE_EXPANSION,
        }
    }
}

impl DecodeOptions {
    /// Checks a frame length against [`Self::max_length`].
    pub(crate) fn check_length(&self, total: usize) -> Result<()> {
        match self.max_length {
            Some(max) if total > max => Err(Error::ValueTooLarge),
            _ => Ok(()),
        }
    }
}

/// Decodes a complete frame with the default [`DecodeOptions`].
///
/// # Errors
///
/// See [`decode_with`].
pub fn decode(buf: &[u8]) -> Result<Value> {
    decode_with(buf, &DecodeOptions::default())
}

/// Decodes a complete frame.
///
/// `buf` must hold exactly one frame: the length declared in the header must
/// match the length of `buf`, and the body must be exactly one value.
///
/// # Errors
///
/// Returns [`Error::TruncatedInput`] if `buf` is shorter than the header
/// declares, [`Error::LengthMismatch`] if it is longer or the body has
/// trailing bytes, and any other [`Error`] if the data is malformed.
pub fn decode_with(buf: &[u8], options: &DecodeOptions) -> Result<Value> {
    let res = decode_frame(buf, options);
    if let Err(why) = &res {
        log::debug!("rejected bser frame of {} bytes: {why}", buf.len());
    }

    res
}

fn decode_frame(buf: &[u8], options: &DecodeOptions) -> Result<Value> {
    let HeaderState::Complete(header) = header::read_header(buf)? else {
        return Err(Error::TruncatedInput);
    };

    let total = header.total_len();
    options.check_length(total)?;

    match total.cmp(&buf.len()) {
        Ordering::Greater => return Err(Error::TruncatedInput),
        Ordering::Less => {
            return Err(Error::LengthMismatch {
                declared: total,
                actual: buf.len(),
            });
        }
        Ordering::Equal => {}
    }

    let mut decoder = Decoder::new(&buf[header.header_len..], options);
    let value = decoder.read_value()?;

    let rest = decoder.remainder().len();
    if rest != 0 {
        return Err(Error::LengthMismatch {
            declared: total,
            actual: total - rest,
        });
    }

    Ok(value)
}

/// Reads values from a frame body, without any header.
///
/// This is what [`decode`] uses after checking the header. Use it directly
/// if the header is handled elsewhere or the body holds several values back
/// to back.
#[derive(Debug)]
pub struct Decoder<'de> {
    reader: SliceRead<'de>,
    max_depth: usize,
    depth: usize,
    expansion_left: usize,
}

impl<'de> Decoder<'de> {
    /// Creates a new decoder that reads values from the front of `body`.
    pub fn new(body: &'de [u8], options: &DecodeOptions) -> Self {
        Self {
            reader: SliceRead::new(body),
            max_depth: options.max_depth,
            depth: 0,
            expansion_left: options.max_template_expansion,
        }
    }

    /// Gets the remaining unread part of the body.
    pub fn remainder(&self) -> &'de [u8] {
        self.reader.remainder()
    }

    /// Reads the next value.
    ///
    /// On error, the position of the decoder is unspecified.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the data is malformed or ends early.
    pub fn read_value(&mut self) -> Result<Value> {
        let [tag] = self.reader.read_bytes()?;
        match Tag::from_byte(tag) {
            Some(Tag::Array) => self.nested(Self::read_array),
            Some(Tag::Object) => self.nested(Self::read_object),
            Some(Tag::Template) => self.nested(Self::read_template),
            Some(Tag::String) => Ok(Value::Bytes(self.read_string()?.to_vec())),
            Some(Tag::Int8 | Tag::Int16 | Tag::Int32 | Tag::Int64) => {
                varint::read_payload(&mut self.reader, tag).map(Value::Int)
            }
            Some(Tag::Real) => Ok(Value::Double(f64::from_le_bytes(
                self.reader.read_bytes()?,
            ))),
            Some(Tag::True) => Ok(Value::Bool(true)),
            Some(Tag::False) => Ok(Value::Bool(false)),
            Some(Tag::Null) => Ok(Value::Null),
            Some(Tag::Skip) | None => Err(Error::UnknownTag(tag)),
        }
    }

    /// Runs `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(Error::DepthLimitExceeded(self.max_depth));
        }

        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    /// Reads a count of items, each taking up at least `min_size` bytes.
    ///
    /// Counts that can't possibly fit into the rest of the input are rejected
    /// here, so they are safe to preallocate for.
    fn read_count(&mut self, min_size: usize) -> Result<usize> {
        let count = self.reader.read_len()?;
        if count.saturating_mul(min_size) > self.reader.remainder().len() {
            return Err(Error::TruncatedInput);
        }

        Ok(count)
    }

    /// Reads the length and data of a string whose tag was already consumed.
    fn read_string(&mut self) -> Result<&'de [u8]> {
        let len = self.reader.read_len()?;
        self.reader.read_bytes_borrow(len)
    }

    fn read_array(&mut self) -> Result<Value> {
        let len = self.read_count(1)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.read_value()?);
        }

        Ok(Value::Array(items))
    }

    fn read_object(&mut self) -> Result<Value> {
        // string tag, length, and at least a one byte value
        let len = self.read_count(4)?;
        let mut map = Map::with_capacity(len);
        for _ in 0..len {
            let [tag] = self.reader.read_bytes()?;
            if tag != u8::from(Tag::String) {
                return Err(Error::MalformedObjectKey(tag));
            }

            let key = self.read_string()?.to_vec();
            let value = self.read_value()?;
            map.insert(key, value);
        }

        Ok(Value::Object(map))
    }

    /// Reads a template and expands it into an array of objects.
    ///
    /// The template starts with an array of strings naming the keys, followed
    /// by the row count. Every row then holds one value per key, in key order,
    /// or a [`Tag::Skip`] for keys that aren't present in that row.
    ///
    /// The expanded size is charged against the template expansion budget
    /// before any row is read.
    fn read_template(&mut self) -> Result<Value> {
        let keys = self.read_template_keys()?;

        // rows take up at least a byte per key, but rows of an empty schema
        // take up nothing at all
        let rows = if keys.is_empty() {
            self.reader.read_len()?
        } else {
            self.read_count(keys.len())?
        };

        self.charge_expansion(&keys, rows)?;

        let mut items = Vec::with_capacity(rows.min(PREALLOC_LIMIT));
        for _ in 0..rows {
            let row = self.nested(|this| this.read_template_row(&keys))?;
            items.push(Value::Object(row));
        }

        Ok(Value::Array(items))
    }

    fn charge_expansion(&mut self, keys: &[&[u8]], rows: usize) -> Result<()> {
        let per_row = keys
            .iter()
            .fold(size_of::<Value>(), |acc, key| acc.saturating_add(key.len()));

        let cost = rows.saturating_mul(per_row);
        if cost > self.expansion_left {
            log::debug!(
                "template of {rows} rows would expand to {cost} bytes, {} left",
                self.expansion_left
            );
            return Err(Error::ValueTooLarge);
        }

        self.expansion_left -= cost;
        Ok(())
    }

    fn read_template_keys(&mut self) -> Result<Vec<&'de [u8]>> {
        let [tag] = self.reader.read_bytes()?;
        if tag != u8::from(Tag::Array) {
            return Err(Error::MalformedTemplate(tag));
        }

        let len = self.read_count(2)?;
        let mut keys = Vec::with_capacity(len);
        for _ in 0..len {
            let [tag] = self.reader.read_bytes()?;
            if tag != u8::from(Tag::String) {
                return Err(Error::MalformedTemplate(tag));
            }

            keys.push(self.read_string()?);
        }

        Ok(keys)
    }

    fn read_template_row(&mut self, keys: &[&[u8]]) -> Result<Map> {
        let mut row = Map::with_capacity(keys.len());
        for &key in keys {
            if self.reader.peek_byte() == Some(Tag::Skip.into()) {
                self.reader.read_bytes::<1>()?;
                continue;
            }

            let value = self.read_value()?;
            row.insert(key.to_vec(), value);
        }

        Ok(row)
    }
}
