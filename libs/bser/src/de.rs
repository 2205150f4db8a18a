//! Exposes deserialization helper methods.
//!
//! Deserialization goes through [`Value`]: the frame is decoded first, which
//! also expands templates, and the resulting value is then handed to the
//! [`de::Deserialize`] implementation. [`Value`] implements
//! [`de::Deserializer`] for that purpose, so it can also be used on its own.
//!
//! The format is self-describing, so `deserialize_any` is supported. Strings
//! are visited as [`String`] when they hold valid UTF-8 and as bytes otherwise.

use std::io;

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, IntoDeserializer, Unexpected};
use serde::forward_to_deserialize_any;

use crate::decode::decode;
use crate::error::{Error, Result};
use crate::stream::read_pdu;
use crate::value::{Map, Value};

/// Deserializes a value from a complete frame.
///
/// # Errors
///
/// Returns `Err` if decoding the frame fails or the data doesn't match `T`.
pub fn from_slice<T>(buf: &[u8]) -> Result<T>
where
    T: de::DeserializeOwned,
{
    from_value(decode(buf)?)
}

/// Deserializes a value from the next frame in a [`io::Read`].
///
/// Exactly one frame is consumed. The reader may still have bytes available
/// when this function returns successfully.
///
/// # Errors
///
/// Returns [`Error::Io`] if reading fails or the reader ends before the frame
/// does, and otherwise the same as [`from_slice`].
pub fn from_reader<T, R>(reader: R) -> Result<T>
where
    T: de::DeserializeOwned,
    R: io::Read,
{
    from_slice(&read_pdu(reader)?)
}

/// Deserializes a value from a [`Value`].
///
/// # Errors
///
/// Returns `Err` if the value doesn't match `T`.
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: de::DeserializeOwned,
{
    T::deserialize(value)
}

impl IntoDeserializer<'_, Error> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

fn visit_array<'de, V, I>(items: I, visitor: V) -> Result<V::Value>
where
    V: de::Visitor<'de>,
    I: IntoIterator<Item: IntoDeserializer<'de, Error>>,
{
    let mut seq = SeqDeserializer::<_, Error>::new(items.into_iter());
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

fn visit_object<'de, V>(map: Map, visitor: V) -> Result<V::Value>
where
    V: de::Visitor<'de>,
{
    let entries = map.into_iter().map(|(k, v)| (Value::Bytes(k), v));
    let mut map = MapDeserializer::<_, Error>::new(entries);
    let value = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(value)
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self {
            Self::Null => visitor.visit_unit(),
            Self::Bool(b) => visitor.visit_bool(b),
            Self::Int(i) => visitor.visit_i64(i),
            Self::Double(d) => visitor.visit_f64(d),
            Self::Bytes(b) => match String::from_utf8(b) {
                Ok(s) => visitor.visit_string(s),
                Err(err) => visitor.visit_byte_buf(err.into_bytes()),
            },
            Self::Array(a) => visit_array(a, visitor),
            Self::Object(o) => visit_object(o, visitor),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self {
            Self::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self {
            Self::Bytes(b) => visitor.visit_byte_buf(b),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        // lets byte strings fill `Vec<u8>` and similar
        match self {
            Self::Bytes(b) => visit_array(b, visitor),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self {
            Self::Null => visitor.visit_unit(),
            _ => Err(de::Error::invalid_type(self.unexpected(), &visitor)),
        }
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let (variant, value) = match self {
            Self::Bytes(b) => (b, None),
            Self::Object(o) => {
                let mut entries = o.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((k, v)), None) => (k, Some(v)),
                    _ => {
                        return Err(de::Error::invalid_value(
                            Unexpected::Map,
                            &"object with a single key",
                        ));
                    }
                }
            }
            other => {
                return Err(de::Error::invalid_type(
                    other.unexpected(),
                    &"string or object",
                ));
            }
        };

        visitor.visit_enum(EnumDeserializer { variant, value })
    }

    fn is_human_readable(&self) -> bool {
        false
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        tuple tuple_struct map struct identifier ignored_any
    }
}

/// Accesses an enum encoded as a string or single-key object.
struct EnumDeserializer {
    variant: Vec<u8>,
    value: Option<Value>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(Value::Bytes(self.variant))?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

/// Accesses the data of an enum variant.
struct VariantDeserializer {
    value: Option<Value>,
}

impl VariantDeserializer {
    fn data(self, expected: &'static str) -> Result<Value> {
        self.value
            .ok_or_else(|| de::Error::invalid_type(Unexpected::UnitVariant, &expected))
    }
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Some(value) => de::Deserialize::deserialize(value),
            None => Ok(()),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(self.data("newtype variant")?)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.data("tuple variant")? {
            Value::Array(a) => visit_array(a, visitor),
            other => Err(de::Error::invalid_type(other.unexpected(), &visitor)),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.data("struct variant")? {
            Value::Object(o) => visit_object(o, visitor),
            other => Err(de::Error::invalid_type(other.unexpected(), &visitor)),
        }
    }
}
