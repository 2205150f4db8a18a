//! Error handling types.
//!
//! Encoding, decoding, and the serde adapters all share this one error type.
//! Any error means the buffer is unusable. For a stream, the framing is lost
//! as well, since the format has no way to resynchronize.

use std::{fmt, io};

use serde::{de, ser};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Potential errors to encounter when encoding or decoding BSER data.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Another reason provided by a [`ser::Serialize`] or [`de::Deserialize`]
    /// implementation.
    #[error("{0}")]
    Custom(String),
    /// The error originated from the [`io::Write`] or [`io::Read`]
    /// implementation.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The first two bytes of a frame are not the format marker.
    #[error("invalid bser header {0:02x?}")]
    BadMagic([u8; 2]),
    /// A declared length or width implies bytes past the end of the input.
    #[error("input buffer too small for declared length")]
    TruncatedInput,
    /// A declared length or count is negative.
    #[error("negative length {0} in bser data")]
    NegativeLength(i64),
    /// The frame length declared by the header disagrees with the actual
    /// amount of data.
    #[error("bser data len {actual} != header len {declared}")]
    LengthMismatch {
        /// Total frame length according to the header.
        declared: usize,
        /// Total frame length actually present.
        actual: usize,
    },
    /// An integer was expected, but the tag byte is not an integer tag.
    #[error("invalid bser int encoding 0x{0:02x}")]
    BadTag(u8),
    /// A value was expected, but the tag byte is not a known value tag.
    #[error("unhandled bser opcode 0x{0:02x}")]
    UnknownTag(u8),
    /// An object key was not encoded as a string.
    #[error("object key must be a string, found tag 0x{0:02x}")]
    MalformedObjectKey(u8),
    /// A template was not followed by an array of strings.
    #[error("expected array of strings to follow template, found tag 0x{0:02x}")]
    MalformedTemplate(u8),

    /// The value has no representation in this format.
    #[error("unsupported value type: {0}")]
    UnsupportedType(&'static str),
    /// An integer or length does not fit the range the format can express, or
    /// a frame exceeds a limit set in [`DecodeOptions`].
    ///
    /// [`DecodeOptions`]: crate::DecodeOptions
    #[error("value too large to represent")]
    ValueTooLarge,
    /// Containers were nested deeper than the decoder allows.
    #[error("nesting exceeds the maximum depth of {0}")]
    DepthLimitExceeded(usize),
    /// A sequence or map tried to serialize itself without a length hint.
    #[error("sequences and maps must provide a length hint")]
    LengthRequired,
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::Custom(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::Custom(msg.to_string())
    }
}
