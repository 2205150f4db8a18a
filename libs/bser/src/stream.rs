//! Reads whole frames from blocking readers.

use std::io::{self, Read as _};

use crate::decode::DecodeOptions;
use crate::error::{Error, Result};
use crate::header::{PduLength, peek_total_length};

/// Returns an [`io::Error`] with kind [`io::ErrorKind::UnexpectedEof`].
fn eof() -> Error {
    io::Error::from(io::ErrorKind::UnexpectedEof).into()
}

/// Reads exactly one frame from `reader` with the default [`DecodeOptions`].
///
/// # Errors
///
/// See [`read_pdu_with`].
pub fn read_pdu<R: io::Read>(reader: R) -> Result<Vec<u8>> {
    read_pdu_with(reader, &DecodeOptions::default())
}

/// Reads exactly one frame from `reader`.
///
/// The returned buffer holds the whole frame, header included, and is ready
/// to be passed to [`decode`](crate::decode). Nothing past the end of the
/// frame is read, so further frames can be read from the same reader.
///
/// Only [`DecodeOptions::max_length`] is checked here. It is checked before
/// the body is read.
///
/// # Errors
///
/// Returns [`Error::Io`] if reading fails or the reader ends before the frame
/// does, [`Error::ValueTooLarge`] if the frame is longer than allowed, and any
/// error [`peek_total_length`] returns for a bad header.
pub fn read_pdu_with<R: io::Read>(mut reader: R, options: &DecodeOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(0x10);

    let total = loop {
        match peek_total_length(&buf)? {
            PduLength::Complete(total) => break total,
            PduLength::NeedMoreBytes(n) => fill(&mut reader, &mut buf, n)?,
        }
    };

    options.check_length(total)?;
    log::trace!("reading bser frame of {total} bytes");

    // don't trust the header with the allocation size
    let missing = total - buf.len();
    buf.reserve(missing.min(0x1000));
    fill(&mut reader, &mut buf, missing)?;
    Ok(buf)
}

/// Appends exactly `len` bytes from `reader` to `buf`.
fn fill<R: io::Read>(reader: &mut R, buf: &mut Vec<u8>, len: usize) -> Result<()> {
    let limit = u64::try_from(len).map_err(|_| Error::ValueTooLarge)?;
    let read = reader.by_ref().take(limit).read_to_end(buf)?;
    if read == len { Ok(()) } else { Err(eof()) }
}
