//! Width-tagged signed integers.
//!
//! Every integer in the format, including string lengths, container counts,
//! and the frame length in the header, is a tag byte selecting one of four
//! widths followed by the two's complement value in that many bytes:
//!
//! | tag    | width   |
//! |--------|---------|
//! | `0x03` | 1 byte  |
//! | `0x04` | 2 bytes |
//! | `0x05` | 4 bytes |
//! | `0x06` | 8 bytes |
//!
//! Writing always picks the narrowest width that holds the value exactly.
//! Payloads are little-endian.

use std::io;

use crate::error::{Error, Result};
use crate::read::SliceRead;
use crate::tag::Tag;

/// Largest possible encoded integer: one tag byte and 8 payload bytes.
pub const MAX_ENCODED_LEN: usize = 9;

/// Gets the narrowest integer tag that can hold `x`.
pub fn int_tag(x: i64) -> Tag {
    if i8::try_from(x).is_ok() {
        Tag::Int8
    } else if i16::try_from(x).is_ok() {
        Tag::Int16
    } else if i32::try_from(x).is_ok() {
        Tag::Int32
    } else {
        Tag::Int64
    }
}

/// Gets the number of bytes [`write`] emits for `x`, including the tag.
pub fn encoded_len(x: i64) -> usize {
    1 + payload_width(int_tag(x))
}

fn payload_width(tag: Tag) -> usize {
    // int_tag only ever returns integer tags
    tag.int_width().unwrap_or(8)
}

/// Encodes `x` into the front of `buf` and returns the used length.
fn encode_into(buf: &mut [u8; MAX_ENCODED_LEN], x: i64) -> usize {
    let tag = int_tag(x);
    let width = payload_width(tag);

    // the low bytes of the little-endian form are exactly the narrower
    // two's complement value, given it fits
    let (head, payload) = buf.split_at_mut(1);
    head[0] = tag.into();
    payload[..width].copy_from_slice(&x.to_le_bytes()[..width]);
    1 + width
}

/// Writes `x` with its width tag.
///
/// # Errors
///
/// Returns `Err` if writing to `writer` failed.
pub fn write<W: io::Write>(mut writer: W, x: i64) -> Result<()> {
    let mut buf = [0u8; MAX_ENCODED_LEN];
    let len = encode_into(&mut buf, x);
    Ok(writer.write_all(&buf[..len])?)
}

/// Decodes an integer from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
///
/// # Errors
///
/// Returns [`Error::BadTag`] if the first byte is not an integer tag and
/// [`Error::TruncatedInput`] if the buffer ends before the payload does.
pub fn decode(buf: &[u8]) -> Result<(i64, usize)> {
    let mut reader = SliceRead::new(buf);
    let value = read(&mut reader)?;
    Ok((value, buf.len() - reader.remainder().len()))
}

pub(crate) fn read(reader: &mut SliceRead<'_>) -> Result<i64> {
    let [tag] = reader.read_bytes()?;
    read_payload(reader, tag)
}

/// Reads the payload for an already consumed integer tag.
pub(crate) fn read_payload(reader: &mut SliceRead<'_>, tag: u8) -> Result<i64> {
    Ok(match Tag::from_byte(tag) {
        Some(Tag::Int8) => i8::from_le_bytes(reader.read_bytes()?).into(),
        Some(Tag::Int16) => i16::from_le_bytes(reader.read_bytes()?).into(),
        Some(Tag::Int32) => i32::from_le_bytes(reader.read_bytes()?).into(),
        Some(Tag::Int64) => i64::from_le_bytes(reader.read_bytes()?),
        _ => return Err(Error::BadTag(tag)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(x: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        write(&mut buf, x).expect("writing to a vec can't fail");
        buf
    }

    #[test]
    fn narrowest_width() {
        const CASES: &[(i64, usize)] = &[
            (0, 1),
            (127, 1),
            (128, 2),
            (32767, 2),
            (32768, 4),
            (2147483647, 4),
            (2147483648, 8),
            (-128, 1),
            (-129, 2),
            (-32768, 2),
            (-32769, 4),
            (-2147483648, 4),
            (-2147483649, 8),
            (i64::MIN, 8),
            (i64::MAX, 8),
        ];

        for &(x, width) in CASES {
            let buf = encode(x);
            assert_eq!(buf.len(), 1 + width, "wrong width for {x}");
            assert_eq!(encoded_len(x), buf.len(), "encoded_len disagrees for {x}");

            let (rev, used) = decode(&buf).expect("decoding must work");
            assert_eq!(rev, x, "value must round-trip");
            assert_eq!(used, buf.len(), "must consume the whole encoding");
        }
    }

    #[test]
    fn exact_bytes() {
        assert_eq!(encode(0), [0x03, 0x00], "int8 zero");
        assert_eq!(encode(-1), [0x03, 0xff], "int8 minus one");
        assert_eq!(encode(0x1234), [0x04, 0x34, 0x12], "int16 little-endian");
        assert_eq!(
            encode(0x0102_0304),
            [0x05, 0x04, 0x03, 0x02, 0x01],
            "int32 little-endian"
        );
        assert_eq!(
            encode(-2147483649),
            [0x06, 0xff, 0xff, 0xff, 0x7f, 0xff, 0xff, 0xff, 0xff],
            "int64 sign-extended"
        );
    }

    #[test]
    fn sign_extends() {
        let (x, _) = decode(&[0x04, 0x00, 0x80]).expect("valid int16");
        assert_eq!(x, -32768, "int16 payload must sign-extend");
    }

    #[test]
    fn decode_ignores_trailing() {
        let (x, used) = decode(&[0x03, 0x05, 0xaa, 0xbb]).expect("valid int8");
        assert_eq!((x, used), (5, 2), "must stop after the payload");
    }

    #[test]
    fn bad_tag() {
        let res = decode(&[0x02, 0x00]);
        assert!(
            matches!(res, Err(Error::BadTag(0x02))),
            "string tag is not an int: {res:?}"
        );
    }

    #[test]
    fn truncated() {
        let cases: [&[u8]; 4] = [
            &[],
            &[0x04, 0x00],
            &[0x05, 0, 0, 0],
            &[0x06, 0, 0, 0, 0, 0, 0, 0],
        ];

        for buf in cases {
            let res = decode(buf);
            assert!(
                matches!(res, Err(Error::TruncatedInput)),
                "{buf:02x?} must be truncated: {res:?}"
            );
        }
    }
}
