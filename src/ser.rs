//! Serializing Rust values into boxed DBus values and messages.

use crate::argument::{Argument, ArgumentRef};
use crate::boxing::BoxingPolicy;
use crate::error::{Error, Result};
use crate::marshal::Marshaller;
use crate::message::Message;
use crate::value::{Value, Variant};

use byteorder::LE;
use serde::ser::{self, Serialize};

pub mod serializer_policy;

use serializer_policy::{DefaultSerializerPolicy, SerializerPolicy, StructSerializationStyle};

/// This is the entry point to the serializer. The default
/// serialization policy, [`DefaultSerializerPolicy`],
/// serializes tuples and tuple structs in "struct" style,
/// e.g. a tuple with two `i32`s and a `String` becomes
/// `(iis)`. Structs with named fields are serialized in dictionary
/// style, as `a{sv}` where the keys of the dictionary are the names
/// of the fields, and the values are the values of those fields,
/// wrapped in variants.
///
/// Sequences become arrays of their element type. When the elements have no
/// common type, e.g. because some are empty sequences or `None`, each element
/// is wrapped in a variant and the sequence becomes `av`. Maps become arrays of
/// dict entries whose values are variants. Unit enum variants become their
/// name; other enum variants become a `(sv)` pair of their name and their
/// contents.
///
/// To always use struct-style serialization, use
/// [`StronglyTypedSerializerPolicy`], or implement [`SerializerPolicy`] to
/// decide per struct.
///
/// [`StronglyTypedSerializerPolicy`]: serializer_policy::StronglyTypedSerializerPolicy
pub fn to_value_with_policy(value: impl Serialize, policy: impl SerializerPolicy) -> Result<Value> {
    value.serialize(Serializer { policy })
}

/// Calls [`to_value_with_policy`] with the default policy.
pub fn to_value(value: impl Serialize) -> Result<Value> {
    to_value_with_policy(value, DefaultSerializerPolicy)
}

/// Serializes a value into a little-endian message body holding one
/// complete type.
pub fn serialize_with_policy(value: impl Serialize, policy: impl SerializerPolicy) -> Result<Message> {
    let value = to_value_with_policy(value, policy)?;
    let arg = Argument::from_signature(&signature_of(&value)?)?;
    let mut message = Message::new();
    marshal_standard(arg.root(), &value, &mut message)?;
    Ok(message)
}

/// Calls [`serialize_with_policy`] with the default policy.
pub fn serialize(value: impl Serialize) -> Result<Message> {
    serialize_with_policy(value, DefaultSerializerPolicy)
}

fn marshal_standard(arg: ArgumentRef<'_>, value: &Value, message: &mut Message) -> Result<()> {
    let policy = BoxingPolicy::standard();
    Marshaller::new(&policy).marshal_value(arg, value, &mut message.writer::<LE>())
}

/// Signature of a serialized value. An empty sequence has no element type
/// to infer, and is taken to be `av`.
fn signature_of(value: &Value) -> Result<String> {
    match value {
        Value::Array(items) if items.is_empty() => Ok("av".to_owned()),
        value => value.signature(),
    }
}

fn variant_of(value: Value) -> Result<Value> {
    let ty = Argument::from_signature(&signature_of(&value)?)?;
    Ok(Variant::with_type(ty, value).into())
}

/// Type of the variant standing in for `None` inside an `av` sequence: an
/// empty byte array. Empty sequences are typed `av`, so the two stay apart.
pub(crate) const ABSENT_SIGNATURE: &str = "ay";

// Unit and `None` serialize to the empty struct, which DBus cannot carry.
fn is_absent(value: &Value) -> bool {
    match value {
        Value::Struct(fields) => fields.is_empty(),
        _ => false,
    }
}

fn element_variant(value: Value) -> Result<Value> {
    if is_absent(&value) {
        let ty = Argument::from_signature(ABSENT_SIGNATURE)?;
        return Ok(Variant::with_type(ty, Value::Array(vec![])).into());
    }
    variant_of(value)
}

fn has_element_type(items: &[Value]) -> bool {
    match items.split_first() {
        Some((first, rest)) => match first.signature() {
            Ok(element) => rest
                .iter()
                .all(|item| item.signature().map_or(false, |other| other == element)),
            Err(_) => false,
        },
        None => true,
    }
}

#[derive(Clone)]
struct Serializer<C: SerializerPolicy> {
    policy: C,
}

impl<C: SerializerPolicy> Serializer<C> {
    fn nested(&self) -> Self {
        self.clone()
    }
}

impl<C: SerializerPolicy> ser::Serializer for Serializer<C> {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeSeq<C>;
    type SerializeTuple = SerializeTuple<C>;
    type SerializeTupleStruct = SerializeTuple<C>;
    type SerializeTupleVariant = SerializeTupleVariant<C>;
    type SerializeMap = SerializeMap<C>;
    type SerializeStruct = SerializeStruct<C>;
    type SerializeStructVariant = SerializeStructVariant<C>;

    fn serialize_bool(self, val: bool) -> Result<Value> {
        Ok(Value::Boolean(val))
    }

    fn serialize_i8(self, val: i8) -> Result<Value> {
        Ok(Value::Int16(val.into()))
    }

    fn serialize_i16(self, val: i16) -> Result<Value> {
        Ok(Value::Int16(val))
    }

    fn serialize_i32(self, val: i32) -> Result<Value> {
        Ok(Value::Int32(val))
    }

    fn serialize_i64(self, val: i64) -> Result<Value> {
        Ok(Value::Int64(val))
    }

    fn serialize_u8(self, val: u8) -> Result<Value> {
        Ok(Value::Byte(val))
    }

    fn serialize_u16(self, val: u16) -> Result<Value> {
        Ok(Value::UInt16(val))
    }

    fn serialize_u32(self, val: u32) -> Result<Value> {
        Ok(Value::UInt32(val))
    }

    fn serialize_u64(self, val: u64) -> Result<Value> {
        Ok(Value::UInt64(val))
    }

    fn serialize_f32(self, val: f32) -> Result<Value> {
        Ok(Value::Double(val.into()))
    }

    fn serialize_f64(self, val: f64) -> Result<Value> {
        Ok(Value::Double(val))
    }

    fn serialize_char(self, val: char) -> Result<Value> {
        Ok(Value::UInt32(val.into()))
    }

    fn serialize_str(self, val: &str) -> Result<Value> {
        Ok(Value::String(val.to_owned()))
    }

    fn serialize_bytes(self, val: &[u8]) -> Result<Value> {
        Ok(Value::Array(val.iter().copied().map(Value::Byte).collect()))
    }

    fn serialize_none(self) -> Result<Value> {
        self.serialize_unit()
    }

    fn serialize_some<T>(self, val: &T) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        val.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Struct(Vec::new()))
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<Value> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, variant: &'static str) -> Result<Value> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T>(self, _: &'static str, value: &T) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        let contents = value.serialize(self)?;
        Ok(Value::Struct(vec![variant.into(), variant_of(contents)?]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(SerializeSeq {
            items: Vec::with_capacity(len.unwrap_or(0)),
            ser: self,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        Ok(SerializeTuple {
            fields: Vec::with_capacity(len),
            ser: self,
        })
    }

    fn serialize_tuple_struct(self, _: &'static str, len: usize) -> Result<Self::SerializeTupleStruct> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Ok(SerializeTupleVariant {
            name: variant,
            fields: SerializeTuple {
                fields: Vec::with_capacity(len),
                ser: self,
            },
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(SerializeMap {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            key: None,
            ser: self,
        })
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        Ok(SerializeStruct {
            style: self.policy.query_struct_name(name),
            fields: Vec::with_capacity(len),
            ser: self,
        })
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Ok(SerializeStructVariant {
            name: variant,
            fields: self.serialize_struct(variant, len)?,
        })
    }
}

struct SerializeSeq<C: SerializerPolicy> {
    items: Vec<Value>,
    ser: Serializer<C>,
}

impl<C: SerializerPolicy> ser::SerializeSeq for SerializeSeq<C> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.items.push(value.serialize(self.ser.nested())?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        if has_element_type(&self.items) {
            return Ok(Value::Array(self.items));
        }
        let items = self
            .items
            .into_iter()
            .map(element_variant)
            .collect::<Result<_>>()?;
        Ok(Value::Array(items))
    }
}

struct SerializeTuple<C: SerializerPolicy> {
    fields: Vec<Value>,
    ser: Serializer<C>,
}

impl<C: SerializerPolicy> ser::SerializeTuple for SerializeTuple<C> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.fields.push(value.serialize(self.ser.nested())?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Struct(self.fields))
    }
}

impl<C: SerializerPolicy> ser::SerializeTupleStruct for SerializeTuple<C> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeTuple::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeTuple::end(self)
    }
}

struct SerializeTupleVariant<C: SerializerPolicy> {
    name: &'static str,
    fields: SerializeTuple<C>,
}

impl<C: SerializerPolicy> ser::SerializeTupleVariant for SerializeTupleVariant<C> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeTuple::serialize_element(&mut self.fields, value)
    }

    fn end(self) -> Result<Value> {
        let contents = ser::SerializeTuple::end(self.fields)?;
        Ok(Value::Struct(vec![self.name.into(), variant_of(contents)?]))
    }
}

struct SerializeMap<C: SerializerPolicy> {
    entries: Vec<Value>,
    key: Option<Value>,
    ser: Serializer<C>,
}

impl<C: SerializerPolicy> ser::SerializeMap for SerializeMap<C> {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = value.serialize(self.ser.nested())?;
        match key {
            Value::Array(_) | Value::Struct(_) | Value::DictEntry(_, _) | Value::Variant(_) => {
                Err(Error::Serializing(format!(
                    "map keys must be basic types, found {}",
                    key.type_name()
                )))
            }
            key => {
                self.key = Some(key);
                Ok(())
            }
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self
            .key
            .take()
            .ok_or_else(|| Error::Serializing("map value without a key".to_owned()))?;
        let value = value.serialize(self.ser.nested())?;
        if !is_absent(&value) {
            self.entries.push(Value::dict_entry(key, variant_of(value)?));
        }
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Array(self.entries))
    }
}

struct SerializeStruct<C: SerializerPolicy> {
    style: StructSerializationStyle,
    fields: Vec<Value>,
    ser: Serializer<C>,
}

impl<C: SerializerPolicy> ser::SerializeStruct for SerializeStruct<C> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let value = value.serialize(self.ser.nested())?;
        match self.style {
            StructSerializationStyle::Dict => {
                if !is_absent(&value) {
                    self.fields.push(Value::dict_entry(name, variant_of(value)?));
                }
            }
            StructSerializationStyle::StronglyTyped => self.fields.push(value),
        }
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(match self.style {
            StructSerializationStyle::Dict => Value::Array(self.fields),
            StructSerializationStyle::StronglyTyped => Value::Struct(self.fields),
        })
    }
}

struct SerializeStructVariant<C: SerializerPolicy> {
    name: &'static str,
    fields: SerializeStruct<C>,
}

impl<C: SerializerPolicy> ser::SerializeStructVariant for SerializeStructVariant<C> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeStruct::serialize_field(&mut self.fields, name, value)
    }

    fn end(self) -> Result<Value> {
        let contents = ser::SerializeStruct::end(self.fields)?;
        Ok(Value::Struct(vec![self.name.into(), variant_of(contents)?]))
    }
}

#[cfg(test)]
mod tests {
    use crate::argument::Argument;
    use crate::de::from_message;
    use crate::error::Result;
    use crate::message::Message;
    use crate::ser::serializer_policy::{PerStructSerializerPolicy, StronglyTypedSerializerPolicy};
    use crate::ser::{serialize, serialize_with_policy, to_value, to_value_with_policy};
    use crate::value::{Value, Variant};
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use test_log::test;

    #[test]
    fn serialize_int() -> Result<()> {
        let i = 37i32;
        let message = serialize(&i)?;
        let correct_message = Message {
            data: vec![37, 0, 0, 0],
            signature: "i".as_bytes().to_vec(),
        };
        assert_eq!(
            correct_message, message,
            "i32 message serialized incorrectly"
        );
        Ok(())
    }

    #[test]
    fn serialize_tuple() -> Result<()> {
        let data = ("Hi", 0.2f64, ("Hello", 8.3f64));
        let message = serialize(&data)?;
        let correct_message = Message {
            data: vec![
                2u8, 0u8, 0u8, 0u8, 72u8, 105u8, 0u8, 0u8, 154u8, 153u8, 153u8, 153u8, 153u8,
                153u8, 201u8, 63u8, 5u8, 0u8, 0u8, 0u8, 72u8, 101u8, 108u8, 108u8, 111u8, 0u8, 0u8,
                0u8, 0u8, 0u8, 0u8, 0u8, 154u8, 153u8, 153u8, 153u8, 153u8, 153u8, 32u8, 64u8,
            ],
            signature: "(sd(sd))".as_bytes().to_vec(),
        };
        assert_eq!(
            correct_message, message,
            "struct message serialized incorrectly"
        );
        Ok(())
    }

    #[test]
    fn serialize_strongly_typed_struct() -> Result<()> {
        #[derive(Clone, Debug, Serialize)]
        struct StructSerialize {
            pub a: String,
            pub b: f64,
            pub c: (String, f64),
        }

        let data = StructSerialize {
            a: "Hi".to_owned(),
            b: 0.2,
            c: ("Hello".to_owned(), 8.3),
        };
        let message = serialize_with_policy(&data, StronglyTypedSerializerPolicy)?;
        assert_eq!(message, serialize(("Hi", 0.2f64, ("Hello", 8.3f64)))?);
        assert_eq!(message.signature, b"(sd(sd))");
        Ok(())
    }

    #[test]
    fn serialize_dict() -> Result<()> {
        #[derive(Clone, Debug, Serialize)]
        struct StructSerialize {
            pub a: String,
            pub b: f64,
            pub c: (String, f64),
        }

        let data = StructSerialize {
            a: "Hi".to_owned(),
            b: 0.2,
            c: ("Hello".to_owned(), 8.3),
        };

        let message = serialize(&data)?;
        let correct_message = Message {
            data: vec![
                88u8, 0u8, 0u8, 0u8, // 88 bytes of array
                0u8, 0u8, 0u8, 0u8, // padding(8)
                1u8, 0u8, 0u8, 0u8, // 1 byte string
                97u8, 0u8, // "a"
                1u8, // 1 byte signature
                115u8, 0u8, // 's'
                0u8, 0u8, 0u8, // padding(4)
                2u8, 0u8, 0u8, 0u8, // 2 byte string
                72u8, 105u8, 0u8, // "Hi"
                0u8, 0u8, 0u8, 0u8, 0u8, // padding(8)
                1u8, 0u8, 0u8, 0u8, // 1 byte string
                98u8, 0u8, // "b"
                1u8, // 1 byte signature
                100u8, 0u8, // "d"
                0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, // padding(8)
                154u8, 153u8, 153u8, 153u8, 153u8, 153u8, 201u8, 63u8, // double 0.2
                1u8, 0u8, 0u8, 0u8, // 1 byte string
                99u8, 0u8, // "c"
                4u8, // 4 byte signature
                40u8, 115u8, 100u8, 41u8, 0u8, // "(sd)"
                0u8, 0u8, 0u8, 0u8, // padding(8)
                5u8, 0u8, 0u8, 0u8, // 5 byte string
                72u8, 101u8, 108u8, 108u8, 111u8, 0u8, // "Hello"
                0u8, 0u8, 0u8, 0u8, 0u8, 0u8, // padding(8)
                154u8, 153u8, 153u8, 153u8, 153u8, 153u8, 32u8, 64u8, // double 8.3
            ],
            signature: "a{sv}".as_bytes().to_vec(),
        };
        assert_eq!(
            correct_message, message,
            "dict message serialized incorrectly"
        );
        Ok(())
    }

    #[test]
    fn optional_fields() -> Result<()> {
        #[derive(Clone, Debug, Serialize)]
        struct WithOptionalField {
            a: String,
            b: Option<String>,
            c: String,
        }

        #[derive(Clone, Debug, Serialize)]
        struct WithoutOptionalField {
            a: String,
            c: String,
        }

        let data_with = WithOptionalField {
            a: "a".to_owned(),
            b: None,
            c: "c".to_owned(),
        };
        let data_without = WithoutOptionalField {
            a: "a".to_owned(),
            c: "c".to_owned(),
        };

        assert_eq!(serialize(data_with.clone())?, serialize(data_without)?);
        // A struct has nowhere to leave the field out.
        assert!(serialize_with_policy(data_with, StronglyTypedSerializerPolicy).is_err());
        Ok(())
    }

    #[test]
    fn sequences_are_typed_arrays() -> Result<()> {
        assert_eq!(serialize(vec![1u16, 2])?.signature, b"aq");
        assert_eq!(serialize(Vec::<u16>::new())?.signature, b"av");
        assert_eq!(
            to_value(&b"hi"[..])?,
            Value::Array(vec![Value::Byte(b'h'), Value::Byte(b'i')])
        );
        Ok(())
    }

    #[test]
    fn untyped_sequences_hold_variants() -> Result<()> {
        let nested = vec![vec![1u32], vec![]];
        assert_eq!(
            to_value(&nested)?,
            Value::Array(vec![
                Variant::new(vec![1u32])?.into(),
                Variant::with_type(Argument::from_signature("av")?, Value::Array(vec![])).into(),
            ])
        );
        let message = serialize(&nested)?;
        assert_eq!(message.signature, b"av");
        let decoded: Vec<Vec<u32>> = from_message(&message)?;
        assert_eq!(decoded, nested);

        let optional = vec![None, Some(1u32)];
        let message = serialize(&optional)?;
        assert_eq!(message.signature, b"av");
        let decoded: Vec<Option<u32>> = from_message(&message)?;
        assert_eq!(decoded, optional);

        let mixed = (vec![Some("a")], vec![None::<&str>]);
        let decoded: (Vec<Option<String>>, Vec<Option<String>>) = from_message(&serialize(mixed)?)?;
        assert_eq!(decoded, (vec![Some("a".to_owned())], vec![None]));
        Ok(())
    }

    #[test]
    fn dict_fields_with_untyped_sequences() -> Result<()> {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Tagged {
            name: String,
            tags: Vec<Vec<String>>,
        }

        let data = Tagged {
            name: "x".to_owned(),
            tags: vec![vec![], vec!["a".to_owned()]],
        };
        let message = serialize(&data)?;
        assert_eq!(message.signature, b"a{sv}");
        assert_eq!(from_message::<Tagged>(&message)?, data);
        Ok(())
    }

    #[test]
    fn maps_hold_variants() -> Result<()> {
        let mut map = BTreeMap::new();
        map.insert("one", 1u32);
        map.insert("two", 2);
        assert_eq!(
            to_value(&map)?,
            Value::Array(vec![
                Value::dict_entry("one", Variant::new(1u32)?),
                Value::dict_entry("two", Variant::new(2u32)?),
            ])
        );

        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], 1u8);
        assert!(to_value(&bad).is_err());
        Ok(())
    }

    #[test]
    fn enums() -> Result<()> {
        #[derive(Serialize)]
        enum Shape {
            Empty,
            Circle(f64),
            Rect(u32, u32),
        }

        assert_eq!(to_value(Shape::Empty)?, Value::from("Empty"));
        assert_eq!(
            to_value(Shape::Circle(1.5))?,
            Value::Struct(vec!["Circle".into(), Variant::new(1.5)?.into()])
        );
        assert_eq!(serialize(Shape::Rect(2, 3))?.signature, b"(sv)");
        Ok(())
    }

    #[test]
    fn per_struct_policy() -> Result<()> {
        #[derive(Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }

        #[derive(Serialize)]
        struct Labelled {
            label: String,
            at: Point,
        }

        let data = Labelled {
            label: "origin".to_owned(),
            at: Point { x: 0, y: 0 },
        };
        let policy = PerStructSerializerPolicy::new().strongly_typed("Point");
        let value = to_value_with_policy(&data, policy)?;
        assert_eq!(
            value,
            Value::Array(vec![
                Value::dict_entry("label", Variant::new("origin")?),
                Value::dict_entry("at", Variant::new(Value::Struct(vec![0i32.into(), 0i32.into()]))?),
            ])
        );
        Ok(())
    }
}
