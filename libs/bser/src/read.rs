//! Exposes the cursor the decoder reads through.

use crate::error::{Error, Result};
use crate::varint;

/// Wraps a slice so values can be read from its front.
///
/// Every read checks the remaining length first. If not enough bytes remain,
/// the read fails with [`Error::TruncatedInput`] and the cursor is not
/// advanced.
#[derive(Debug, Clone)]
pub(crate) struct SliceRead<'de> {
    slice: &'de [u8],
}

impl<'de> SliceRead<'de> {
    pub fn new(slice: &'de [u8]) -> Self {
        Self { slice }
    }

    /// Gets the remaining unread part of the slice.
    pub fn remainder(&self) -> &'de [u8] {
        self.slice
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.slice.first().copied()
    }

    /// Reads a constant size chunk of bytes.
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let (out, rem) = self
            .slice
            .split_first_chunk::<N>()
            .ok_or(Error::TruncatedInput)?;
        self.slice = rem;
        Ok(*out)
    }

    /// Reads a chunk of bytes, borrowing from the underlying slice.
    pub fn read_bytes_borrow(&mut self, len: usize) -> Result<&'de [u8]> {
        let (out, rem) = self
            .slice
            .split_at_checked(len)
            .ok_or(Error::TruncatedInput)?;
        self.slice = rem;
        Ok(out)
    }

    /// Reads a length or count.
    ///
    /// These use the same encoding as any other integer, so they may well be
    /// negative on the wire.
    pub fn read_len(&mut self) -> Result<usize> {
        let len = varint::read(self)?;
        if len < 0 {
            return Err(Error::NegativeLength(len));
        }

        // can only fail on targets narrower than 64 bits, and no slice there
        // could hold that many bytes anyways
        usize::try_from(len).map_err(|_| Error::TruncatedInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_does_not_advance() {
        let mut read = SliceRead::new(&[1, 2, 3]);
        let res = read.read_bytes::<4>();
        assert!(
            matches!(res, Err(Error::TruncatedInput)),
            "4 bytes from 3 must fail"
        );
        assert_eq!(read.remainder(), &[1, 2, 3], "cursor must not move");

        let res = read.read_bytes_borrow(5);
        assert!(
            matches!(res, Err(Error::TruncatedInput)),
            "5 bytes from 3 must fail"
        );
        assert_eq!(read.remainder(), &[1, 2, 3], "cursor must not move");
    }

    #[test]
    fn reads_advance() {
        let mut read = SliceRead::new(&[1, 2, 3, 4]);
        assert_eq!(read.read_bytes::<1>().expect("must read"), [1], "first byte");
        assert_eq!(read.read_bytes_borrow(2).expect("must read"), &[2, 3], "next two");
        assert_eq!(read.peek_byte(), Some(4), "peek must see the last byte");
        assert_eq!(read.remainder(), &[4], "one byte must remain");
    }

    #[test]
    fn negative_len() {
        let mut read = SliceRead::new(&[0x03, 0xff]);
        let res = read.read_len();
        assert!(
            matches!(res, Err(Error::NegativeLength(-1))),
            "length -1 must be rejected: {res:?}"
        );
    }
}
