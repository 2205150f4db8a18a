//! Exposes a serializer and serialization helper methods.
//!
//! Rust types map to the format as follows:
//!
//! - `bool`: true or false
//! - integers: the narrowest integer width that holds the value. [`u64`],
//!   [`i128`], and [`u128`] values outside the [`i64`] range are rejected.
//! - floats: real
//! - [`str`], [`char`], and byte slices: string
//! - [`None`], `()`, and unit structs: null
//! - sequences, tuples, and tuple structs: array
//! - maps and structs: object. Map keys must be strings or bytes.
//! - enums: unit variants are their name as a string. Other variants are an
//!   object with the variant name as the single key.

use std::io;

use serde::ser;

use crate::decode::{DecodeOptions, decode_with};
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::header;
use crate::value::Value;

/// Serializes a value as a complete frame, header included.
///
/// # Errors
///
/// Returns `Err` if the value can't be represented in this format, or if the
/// [`ser::Serialize`] implementation fails.
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + ser::Serialize,
{
    let mut buf = header::begin_frame();
    value.serialize(&mut Serializer::new(&mut buf))?;
    header::finish_frame(&mut buf)?;
    Ok(buf)
}

/// Serializes a value as a complete frame to a [`io::Write`].
///
/// The frame is built in memory first, so nothing is written if
/// serialization fails.
///
/// # Errors
///
/// Returns `Err` if serialization failed or writing to `writer` failed.
pub fn to_writer<T, W>(mut writer: W, value: &T) -> Result<()>
where
    T: ?Sized + ser::Serialize,
    W: io::Write,
{
    let buf = to_vec(value)?;
    Ok(writer.write_all(&buf)?)
}

/// Converts a value into a [`Value`].
///
/// The result is exactly what decoding the output of [`to_vec`] would give.
/// No depth limit applies, since the value was already nested that deeply.
///
/// # Errors
///
/// Returns `Err` under the same conditions as [`to_vec`].
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + ser::Serialize,
{
    let options = DecodeOptions {
        max_depth: usize::MAX,
        ..DecodeOptions::default()
    };
    decode_with(&to_vec(value)?, &options)
}

/// A [`Serializer`] for this crate's format. The trait is only implemented
/// by `&mut`.
///
/// This writes a single value without any frame header. Use [`to_vec`] or
/// [`to_writer`] to get complete frames.
///
/// [`Serializer`]: serde::ser::Serializer
#[derive(Debug)]
pub struct Serializer<W> {
    encoder: Encoder<W>,
}

impl<W: io::Write> Serializer<W> {
    /// Creates a new serializer that writes values to a [`io::Write`].
    pub fn new(writer: W) -> Self {
        Self {
            encoder: Encoder::new(writer),
        }
    }

    /// Unwraps the serializer into its inner writer.
    pub fn into_inner(self) -> W {
        self.encoder.into_inner()
    }

    /// Writes the `{ variant: ... }` prefix of an enum variant with data.
    fn write_variant_key(&mut self, variant: &'static str) -> Result<()> {
        self.encoder.write_object_header(1)?;
        self.encoder.write_bytes(variant.as_bytes())
    }
}

// integers wider than i64 are rejected instead of being truncated
fn narrow<T: TryInto<i64>>(v: T) -> Result<i64> {
    v.try_into().map_err(|_| Error::ValueTooLarge)
}

impl<'a, W: io::Write> ser::Serializer for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = SerializeArray<'a, W>;
    type SerializeTuple = SerializeArray<'a, W>;
    type SerializeTupleStruct = SerializeArray<'a, W>;
    type SerializeTupleVariant = SerializeArray<'a, W>;
    type SerializeMap = SerializeObject<'a, W>;
    type SerializeStruct = SerializeObject<'a, W>;
    type SerializeStructVariant = SerializeObject<'a, W>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.encoder.write_bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.encoder.write_int(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.encoder.write_int(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.encoder.write_int(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.encoder.write_int(v)
    }

    fn serialize_i128(self, v: i128) -> Result<()> {
        self.encoder.write_int(narrow(v)?)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.encoder.write_int(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.encoder.write_int(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.encoder.write_int(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.encoder.write_int(narrow(v)?)
    }

    fn serialize_u128(self, v: u128) -> Result<()> {
        self.encoder.write_int(narrow(v)?)
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.encoder.write_real(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.encoder.write_real(v)
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.encoder.write_bytes(v.encode_utf8(&mut buf).as_bytes())
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.encoder.write_bytes(v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.encoder.write_bytes(v)
    }

    fn serialize_none(self) -> Result<()> {
        self.encoder.write_null()
    }

    fn serialize_some<T>(self, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.encoder.write_null()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.encoder.write_null()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.encoder.write_bytes(variant.as_bytes())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        self.write_variant_key(variant)?;
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        let len = len.ok_or(Error::LengthRequired)?;
        self.encoder.write_array_header(len)?;
        Ok(SerializeArray(self))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.encoder.write_array_header(len)?;
        Ok(SerializeArray(self))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.encoder.write_array_header(len)?;
        Ok(SerializeArray(self))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.write_variant_key(variant)?;
        self.encoder.write_array_header(len)?;
        Ok(SerializeArray(self))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        let len = len.ok_or(Error::LengthRequired)?;
        self.encoder.write_object_header(len)?;
        Ok(SerializeObject(self))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        self.encoder.write_object_header(len)?;
        Ok(SerializeObject(self))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.write_variant_key(variant)?;
        self.encoder.write_object_header(len)?;
        Ok(SerializeObject(self))
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

/// Allows serializing a sequence of elements as an array.
#[doc(hidden)]
pub struct SerializeArray<'a, W>(&'a mut Serializer<W>);

/// Allows serializing key-value pairs as an object.
#[doc(hidden)]
pub struct SerializeObject<'a, W>(&'a mut Serializer<W>);

macro_rules! impl_array {
    ($($Trait:ident :: $method:ident),*) => { $(
        impl<W: io::Write> ser::$Trait for SerializeArray<'_, W> {
            type Ok = ();
            type Error = Error;

            fn $method<T>(&mut self, value: &T) -> Result<()>
            where
                T: ?Sized + ser::Serialize,
            {
                value.serialize(&mut *self.0)
            }

            fn end(self) -> Result<()> {
                Ok(())
            }
        }
    )* };
}

impl_array!(
    SerializeSeq::serialize_element,
    SerializeTuple::serialize_element,
    SerializeTupleStruct::serialize_field,
    SerializeTupleVariant::serialize_field
);

impl<W: io::Write> ser::SerializeMap for SerializeObject<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        key.serialize(MapKeySerializer(&mut self.0.encoder))
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        value.serialize(&mut *self.0)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<W: io::Write> ser::SerializeStruct for SerializeObject<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        self.0.encoder.write_bytes(key.as_bytes())?;
        value.serialize(&mut *self.0)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<W: io::Write> ser::SerializeStructVariant for SerializeObject<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        ser::SerializeStruct::serialize_field(self, key, value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Serializes object keys, which must be strings.
struct MapKeySerializer<'a, W>(&'a mut Encoder<W>);

macro_rules! reject_key {
    ($($method:ident($($arg:ty),*) => $what:literal;)*) => { $(
        fn $method(self, $(_: $arg),*) -> Result<()> {
            Err(Error::UnsupportedType(concat!($what, " as object key")))
        }
    )* };
}

impl<W: io::Write> ser::Serializer for MapKeySerializer<'_, W> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = ser::Impossible<(), Error>;
    type SerializeTuple = ser::Impossible<(), Error>;
    type SerializeTupleStruct = ser::Impossible<(), Error>;
    type SerializeTupleVariant = ser::Impossible<(), Error>;
    type SerializeMap = ser::Impossible<(), Error>;
    type SerializeStruct = ser::Impossible<(), Error>;
    type SerializeStructVariant = ser::Impossible<(), Error>;

    fn serialize_str(self, v: &str) -> Result<()> {
        self.0.write_bytes(v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.0.write_bytes(v)
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.0.write_bytes(v.encode_utf8(&mut buf).as_bytes())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.0.write_bytes(variant.as_bytes())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        value.serialize(self)
    }

    reject_key! {
        serialize_bool(bool) => "bool";
        serialize_i8(i8) => "integer";
        serialize_i16(i16) => "integer";
        serialize_i32(i32) => "integer";
        serialize_i64(i64) => "integer";
        serialize_i128(i128) => "integer";
        serialize_u8(u8) => "integer";
        serialize_u16(u16) => "integer";
        serialize_u32(u32) => "integer";
        serialize_u64(u64) => "integer";
        serialize_u128(u128) => "integer";
        serialize_f32(f32) => "float";
        serialize_f64(f64) => "float";
        serialize_none() => "none";
        serialize_unit() => "unit";
        serialize_unit_struct(&'static str) => "unit struct";
    }

    fn serialize_some<T>(self, _value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        Err(Error::UnsupportedType("option as object key"))
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        Err(Error::UnsupportedType("enum variant with data as object key"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(Error::UnsupportedType("sequence as object key"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(Error::UnsupportedType("tuple as object key"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(Error::UnsupportedType("tuple struct as object key"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(Error::UnsupportedType("enum variant with data as object key"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(Error::UnsupportedType("map as object key"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(Error::UnsupportedType("struct as object key"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(Error::UnsupportedType("enum variant with data as object key"))
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use super::*;

    fn body<T: Serialize>(value: &T) -> Vec<u8> {
        let buf = to_vec(value).expect("serializing must work");
        buf[header::LENGTH_PLACEHOLDER.len()..].to_vec()
    }

    #[test]
    fn integers_use_narrowest_width() {
        assert_eq!(body(&5u64), [0x03, 0x05], "u64 small");
        assert_eq!(body(&-200i32), [0x04, 0x38, 0xff], "i32 as int16");
        assert_eq!(
            body(&i128::from(i64::MIN)),
            [0x06, 0, 0, 0, 0, 0, 0, 0, 0x80],
            "i128 in range"
        );
    }

    #[test]
    fn integers_out_of_range() {
        let res = to_vec(&u64::MAX);
        assert!(
            matches!(res, Err(Error::ValueTooLarge)),
            "u64::MAX doesn't fit i64: {res:?}"
        );

        let res = to_vec(&(i128::from(i64::MIN) - 1));
        assert!(
            matches!(res, Err(Error::ValueTooLarge)),
            "below i64::MIN: {res:?}"
        );
    }

    #[test]
    fn enum_shapes() {
        #[derive(Serialize)]
        enum Shape {
            Dot,
            Circle(u8),
            Line(u8, u8),
            Rect { w: u8 },
        }

        assert_eq!(body(&Shape::Dot), [0x02, 0x03, 0x03, b'D', b'o', b't'], "unit");
        assert_eq!(
            body(&Shape::Circle(1)),
            [0x01, 0x03, 0x01, 0x02, 0x03, 0x06, b'C', b'i', b'r', b'c', b'l', b'e', 0x03, 0x01],
            "newtype"
        );
        assert_eq!(
            body(&Shape::Line(1, 2)),
            [
                0x01, 0x03, 0x01, 0x02, 0x03, 0x04, b'L', b'i', b'n', b'e', // { "Line":
                0x00, 0x03, 0x02, 0x03, 0x01, 0x03, 0x02, // [1, 2] }
            ],
            "tuple"
        );
        assert_eq!(
            body(&Shape::Rect { w: 3 }),
            [
                0x01, 0x03, 0x01, 0x02, 0x03, 0x04, b'R', b'e', b'c', b't', // { "Rect":
                0x01, 0x03, 0x01, 0x02, 0x03, 0x01, b'w', 0x03, 0x03, // { "w": 3 } }
            ],
            "struct"
        );
    }

    #[test]
    fn length_required() {
        struct Unsized;

        impl Serialize for Unsized {
            fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_seq((0..3u8).filter(|&i| i != 1))
            }
        }

        let res = to_vec(&Unsized);
        assert!(
            matches!(res, Err(Error::LengthRequired)),
            "filtered iterators have no exact length: {res:?}"
        );
    }

    #[test]
    fn map_keys_must_be_strings() {
        let map = BTreeMap::from([(1u8, "one")]);
        let res = to_vec(&map);
        assert!(
            matches!(res, Err(Error::UnsupportedType(_))),
            "integer keys must be rejected: {res:?}"
        );

        let map = BTreeMap::from([('k', 1u8)]);
        assert_eq!(
            body(&map),
            [0x01, 0x03, 0x01, 0x02, 0x03, 0x01, b'k', 0x03, 0x01],
            "char keys are strings"
        );
    }

    #[test]
    fn failed_serialize_writes_nothing() {
        let mut out = Vec::new();
        let res = to_writer(&mut out, &[1u64, u64::MAX]);
        res.expect_err("u64::MAX must fail");
        assert!(out.is_empty(), "no partial frame may be written");
    }

    #[test]
    fn to_value_matches_decode() {
        let value = to_value(&(Some("x"), None::<u8>, 1.5f32)).expect("must convert");
        assert_eq!(
            value,
            Value::Array(vec![Value::from("x"), Value::Null, Value::Double(1.5)]),
            "tuple must become an array"
        );
    }

    #[test]
    fn to_value_has_no_depth_limit() {
        let depth = crate::decode::DEFAULT_MAX_DEPTH + 100;

        // debug builds use a lot of stack per level
        let res = std::thread::Builder::new()
            .stack_size(32 << 20)
            .spawn(move || {
                let mut value = Value::Null;
                for _ in 0..depth {
                    value = Value::Array(vec![value]);
                }

                to_value(&value).map(|converted| converted == value)
            })
            .expect("thread must spawn")
            .join()
            .expect("conversion must not panic");

        assert!(
            res.expect("deep values must convert"),
            "deep value must survive"
        );
    }
}
