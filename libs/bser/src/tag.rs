//! The type tags that prefix every encoded value.

/// Leading byte of an encoded value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Array = 0x00,
    Object = 0x01,
    String = 0x02,
    Int8 = 0x03,
    Int16 = 0x04,
    Int32 = 0x05,
    Int64 = 0x06,
    Real = 0x07,
    True = 0x08,
    False = 0x09,
    Null = 0x0a,
    Template = 0x0b,
    /// Marks an absent field inside a template row. Not a value by itself.
    Skip = 0x0c,
}

impl Tag {
    /// Maps a byte to its tag, if it is one.
    pub const fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0x00 => Self::Array,
            0x01 => Self::Object,
            0x02 => Self::String,
            0x03 => Self::Int8,
            0x04 => Self::Int16,
            0x05 => Self::Int32,
            0x06 => Self::Int64,
            0x07 => Self::Real,
            0x08 => Self::True,
            0x09 => Self::False,
            0x0a => Self::Null,
            0x0b => Self::Template,
            0x0c => Self::Skip,
            _ => return None,
        })
    }

    /// For integer tags, the number of payload bytes that follow the tag.
    pub const fn int_width(self) -> Option<usize> {
        match self {
            Self::Int8 => Some(1),
            Self::Int16 => Some(2),
            Self::Int32 => Some(4),
            Self::Int64 => Some(8),
            _ => None,
        }
    }

    pub const fn is_int(self) -> bool {
        self.int_width().is_some()
    }
}

impl From<Tag> for u8 {
    fn from(value: Tag) -> Self {
        value as Self
    }
}
