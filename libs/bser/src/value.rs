//! The in-memory representation of any encodable value.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Unexpected};
use serde::ser::{self, SerializeMap as _};

/// Map type used by [`Value::Object`].
///
/// Entries keep their insertion order. The encoder writes them in that order
/// and the decoder inserts them in the order they appear in the data.
pub type Map = IndexMap<Vec<u8>, Value>;

/// Any value that can be represented in this format.
///
/// Strings are byte strings. The format doesn't care about their encoding, so
/// neither does this type. [`Value::as_str`] is available for convenience.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Bytes(Vec<u8>),
    Array(Vec<Self>),
    Object(Map),
}

impl Value {
    /// Creates an object from key-value pairs.
    ///
    /// Later duplicates of a key replace the earlier value.
    pub fn object<K, I>(iter: I) -> Self
    where
        K: Into<Vec<u8>>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Object(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Gets the value as a float. Integers are converted.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Double(d) => Some(d),
            Self::Int(i) => Some(i as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Gets the value as a string, if it is a byte string holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Looks up a key if this is an object.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&Self> {
        self.as_object().and_then(|o| o.get(key.as_ref()))
    }

    /// Describes the value for serde error messages.
    pub(crate) fn unexpected(&self) -> Unexpected<'_> {
        match self {
            Self::Null => Unexpected::Unit,
            Self::Bool(b) => Unexpected::Bool(*b),
            Self::Int(i) => Unexpected::Signed(*i),
            Self::Double(d) => Unexpected::Float(*d),
            Self::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => Unexpected::Str(s),
                Err(_) => Unexpected::Bytes(b),
            },
            Self::Array(_) => Unexpected::Seq,
            Self::Object(_) => Unexpected::Map,
        }
    }
}

macro_rules! impl_from {
    ($($Ty:ty => $Variant:ident),* $(,)?) => { $(
        impl From<$Ty> for Value {
            fn from(value: $Ty) -> Self {
                Self::$Variant(value.into())
            }
        }
    )* };
}

impl_from!(
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Double,
    f64 => Double,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    String => Bytes,
    &str => Bytes,
    Vec<Value> => Array,
    Map => Object,
);

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::Array(iter.into_iter().map(Into::into).collect())
    }
}

/// Serializes bytes as a string if they are valid UTF-8.
///
/// Keeps text readable for human-readable formats. This crate's serializer
/// writes both the same way.
struct Text<'a>(&'a [u8]);

impl ser::Serialize for Text<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match std::str::from_utf8(self.0) {
            Ok(s) => serializer.serialize_str(s),
            Err(_) => serializer.serialize_bytes(self.0),
        }
    }
}

impl ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Double(d) => serializer.serialize_f64(*d),
            Self::Bytes(b) => Text(b).serialize(serializer),
            Self::Array(a) => a.serialize(serializer),
            Self::Object(o) => {
                let mut map = serializer.serialize_map(Some(o.len()))?;
                for (k, v) in o {
                    map.serialize_entry(&Text(k), v)?;
                }
                map.end()
            }
        }
    }
}

/// Object key accepting either strings or bytes.
struct KeyBuf(Vec<u8>);

impl<'de> de::Deserialize<'de> for KeyBuf {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct Visitor;

        impl de::Visitor<'_> for Visitor {
            type Value = KeyBuf;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a string key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(KeyBuf(v.as_bytes().to_vec()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(KeyBuf(v.into_bytes()))
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(KeyBuf(v.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(KeyBuf(v))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

impl<'de> de::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("any bser value")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Value::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(Value::Int)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(Value::Double(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(Value::Bytes(v.as_bytes().to_vec()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(Value::Bytes(v.into_bytes()))
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(Value::Bytes(v.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(Value::Bytes(v))
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                de::Deserialize::deserialize(deserializer)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                // don't trust the size hint too much
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(0x1000));
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }

                Ok(Value::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut out = Map::with_capacity(map.size_hint().unwrap_or(0).min(0x1000));
                while let Some((KeyBuf(k), v)) = map.next_entry()? {
                    out.insert(k, v);
                }

                Ok(Value::Object(out))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}
