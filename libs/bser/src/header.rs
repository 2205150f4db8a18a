//! Frame header handling.
//!
//! A frame (or PDU) is the two byte [`MAGIC`] marker, followed by the length of
//! the body as an integer, followed by the body: exactly one encoded value.
//!
//! Transports should call [`peek_total_length`] on whatever they have received
//! so far to learn how much they need to buffer before decoding.

use crate::error::{Error, Result};
use crate::read::SliceRead;
use crate::tag::Tag;

/// The format marker at the start of every frame.
pub const MAGIC: [u8; 2] = [0x00, 0x01];

/// The header the encoder starts a frame with.
///
/// The length is always written as an int32 so it can be patched in place once
/// the body is complete, which the decoder doesn't care about.
pub const LENGTH_PLACEHOLDER: [u8; 7] = [MAGIC[0], MAGIC[1], Tag::Int32 as u8, 0, 0, 0, 0];

/// The smallest possible header: the marker and an int8 length.
const MIN_HEADER_LEN: usize = MAGIC.len() + 2;

/// The result of [`peek_total_length`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PduLength {
    /// The total length of the frame, including the header and any bytes
    /// already received.
    Complete(usize),
    /// The header itself is incomplete. At least this many more bytes are
    /// needed to tell the frame length.
    NeedMoreBytes(usize),
}

/// Computes how many bytes the frame starting at `prefix` spans in total.
///
/// Only the header is inspected, so `prefix` may be any leading part of the
/// frame. If it does not even hold the full header, returns
/// [`PduLength::NeedMoreBytes`] with the minimum amount of bytes still
/// missing. Reading exactly that many more bytes is always safe: it never
/// reaches past the end of the frame.
///
/// # Errors
///
/// Returns [`Error::BadMagic`] if the marker is wrong, [`Error::BadTag`] if the
/// length isn't tagged as an integer, [`Error::NegativeLength`] if the
/// declared length is negative, and [`Error::ValueTooLarge`] if the total
/// doesn't fit into [`usize`].
pub fn peek_total_length(prefix: &[u8]) -> Result<PduLength> {
    Ok(match read_header(prefix)? {
        HeaderState::Complete(header) => {
            let total = header.total_len();
            log::trace!("bser frame header declares {total} bytes");
            PduLength::Complete(total)
        }
        HeaderState::Incomplete(missing) => PduLength::NeedMoreBytes(missing),
    })
}

/// A parsed and validated frame header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    pub header_len: usize,
    pub body_len: usize,
}

impl Header {
    pub fn total_len(self) -> usize {
        self.header_len + self.body_len
    }
}

pub(crate) enum HeaderState {
    Complete(Header),
    Incomplete(usize),
}

pub(crate) fn read_header(buf: &[u8]) -> Result<HeaderState> {
    if let Some(&marker) = buf.first_chunk::<2>()
        && marker != MAGIC
    {
        return Err(Error::BadMagic(marker));
    }

    let Some(&tag) = buf.get(MAGIC.len()) else {
        return Ok(HeaderState::Incomplete(MIN_HEADER_LEN - buf.len()));
    };

    let width = Tag::from_byte(tag)
        .and_then(Tag::int_width)
        .ok_or(Error::BadTag(tag))?;

    let header_len = MAGIC.len() + 1 + width;
    if buf.len() < header_len {
        return Ok(HeaderState::Incomplete(header_len - buf.len()));
    }

    let mut reader = SliceRead::new(&buf[MAGIC.len()..]);
    let body_len = reader.read_len()?;

    // make sure the total can always be computed without overflow
    if body_len > usize::MAX - header_len {
        return Err(Error::ValueTooLarge);
    }

    Ok(HeaderState::Complete(Header {
        header_len,
        body_len,
    }))
}

/// Starts a new frame buffer with a placeholder header.
pub(crate) fn begin_frame() -> Vec<u8> {
    let mut buf = Vec::with_capacity(0x100);
    buf.extend_from_slice(&LENGTH_PLACEHOLDER);
    buf
}

/// Patches the body length into a buffer started by [`begin_frame`].
pub(crate) fn finish_frame(buf: &mut [u8]) -> Result<()> {
    let body_len = buf.len() - LENGTH_PLACEHOLDER.len();
    let body_len = i32::try_from(body_len).map_err(|_| Error::ValueTooLarge)?;
    buf[MAGIC.len() + 1..LENGTH_PLACEHOLDER.len()].copy_from_slice(&body_len.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn need_more_bytes() {
        assert_eq!(
            peek_total_length(&[]).expect("empty is fine"),
            PduLength::NeedMoreBytes(4),
            "empty input needs the minimal header"
        );
        assert_eq!(
            peek_total_length(&[0x00]).expect("partial marker is fine"),
            PduLength::NeedMoreBytes(3),
            "1 byte input needs 3 more"
        );
        assert_eq!(
            peek_total_length(&[0x00, 0x01]).expect("marker alone is fine"),
            PduLength::NeedMoreBytes(2),
            "the length tag and an int8 are still missing"
        );
        assert_eq!(
            peek_total_length(&[0x00, 0x01, 0x04]).expect("int16 tag alone is fine"),
            PduLength::NeedMoreBytes(2),
            "int16 length needs 2 more bytes"
        );
        assert_eq!(
            peek_total_length(&[0x00, 0x01, 0x05, 0x10]).expect("partial int32 is fine"),
            PduLength::NeedMoreBytes(3),
            "int32 length needs 3 more bytes"
        );
    }

    #[test]
    fn complete() {
        assert_eq!(
            peek_total_length(&[0x00, 0x01, 0x03, 0x02]).expect("valid header"),
            PduLength::Complete(6),
            "int8 header"
        );
        assert_eq!(
            peek_total_length(&[0x00, 0x01, 0x04, 0x00, 0x01, 0xaa]).expect("valid header"),
            PduLength::Complete(5 + 256),
            "int16 header, trailing bytes ignored"
        );
    }

    #[test]
    fn bad_magic() {
        let res = peek_total_length(&[0x01, 0x00, 0x03, 0x00]);
        assert!(
            matches!(res, Err(Error::BadMagic([0x01, 0x00]))),
            "swapped marker must be rejected: {res:?}"
        );
    }

    #[test]
    fn bad_length_tag() {
        let res = peek_total_length(&[0x00, 0x01, 0x07]);
        assert!(
            matches!(res, Err(Error::BadTag(0x07))),
            "real tag is not a valid length: {res:?}"
        );
    }

    #[test]
    fn negative_length() {
        let res = peek_total_length(&[0x00, 0x01, 0x03, 0x80]);
        assert!(
            matches!(res, Err(Error::NegativeLength(-128))),
            "negative lengths must be rejected: {res:?}"
        );
    }

    #[test]
    fn patch_placeholder() {
        let mut buf = begin_frame();
        buf.extend_from_slice(&[0x0a; 300]);
        finish_frame(&mut buf).expect("300 bytes fit into i32");

        assert_eq!(
            &buf[..7],
            &[0x00, 0x01, 0x05, 0x2c, 0x01, 0x00, 0x00],
            "length must be patched little-endian"
        );
        assert_eq!(
            peek_total_length(&buf).expect("valid header"),
            PduLength::Complete(buf.len()),
            "patched header must describe the buffer"
        );
    }
}
