//! Deserializing Rust values from boxed DBus values and messages.

use byteorder::LE;
use log::trace;
use serde::de::value::BorrowedStrDeserializer;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::{forward_to_deserialize_any, Deserialize};

use crate::boxing::BoxingPolicy;
use crate::error::{Error, Result};
use crate::marshal::Marshaller;
use crate::message::Message;
use crate::ser::ABSENT_SIGNATURE;
use crate::signature::parse_signature;
use crate::value::Value;

/// Deserializes a little-endian message body. A body holding a single
/// complete type deserializes as that value; any other body deserializes as
/// a struct of its values, so an empty body is `()`.
pub fn from_message<T: DeserializeOwned>(mesg: &Message) -> Result<T> {
    let value = message_value(mesg)?;
    from_value(&value)
}

/// Deserializes a boxed value. Variants are looked through, so a field of
/// an `a{sv}` dictionary deserializes as its contents.
pub fn from_value<'de, T: Deserialize<'de>>(value: &'de Value) -> Result<T> {
    T::deserialize(Deserializer::new(value))
}

fn message_value(mesg: &Message) -> Result<Value> {
    let policy = BoxingPolicy::standard();
    let marshaller = Marshaller::new(&policy);
    let args = parse_signature(mesg.signature_str()?)?;
    trace!(
        "deserializing {} values of '{}'",
        args.len(),
        mesg.signature_str()?
    );

    let mut reader = mesg.reader::<LE>()?;
    let mut values = Vec::with_capacity(args.len());
    for arg in &args {
        values.push(marshaller.unmarshal_value(arg.root(), &reader)?);
        reader.next()?;
    }
    reader.finish()?;

    Ok(if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Struct(values)
    })
}

struct Deserializer<'de> {
    value: &'de Value,
}

impl<'de> Deserializer<'de> {
    fn new(value: &'de Value) -> Self {
        Deserializer { value }
    }

    fn unwrapped(&self) -> &'de Value {
        let mut value = self.value;
        while let Value::Variant(variant) = value {
            value = variant.value();
        }
        value
    }

    /// Whether the value stands for `None`: the empty struct, or the empty
    /// byte array variant a sequence uses in its place.
    fn is_absent(&self) -> bool {
        let mut value = self.value;
        loop {
            match value {
                Value::Struct(fields) => return fields.is_empty(),
                Value::Variant(variant) if variant.signature() == ABSENT_SIGNATURE => {
                    return matches!(variant.value(), Value::Array(items) if items.is_empty());
                }
                Value::Variant(variant) => value = variant.value(),
                _ => return false,
            }
        }
    }
}

impl<'de> de::Deserializer<'de> for Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.unwrapped() {
            Value::Byte(n) => visitor.visit_u8(*n),
            Value::Boolean(b) => visitor.visit_bool(*b),
            Value::Int16(n) => visitor.visit_i16(*n),
            Value::UInt16(n) => visitor.visit_u16(*n),
            Value::Int32(n) => visitor.visit_i32(*n),
            Value::UInt32(n) => visitor.visit_u32(*n),
            Value::Int64(n) => visitor.visit_i64(*n),
            Value::UInt64(n) => visitor.visit_u64(*n),
            Value::Double(n) => visitor.visit_f64(*n),
            Value::String(s) | Value::ObjectPath(s) | Value::Signature(s) => {
                visitor.visit_borrowed_str(s)
            }
            Value::Array(items) if is_dictionary(items) => visitor.visit_map(MapDeserializer {
                entries: items.iter(),
                value: None,
            }),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer(items.iter())),
            Value::Struct(fields) if fields.is_empty() => visitor.visit_unit(),
            Value::Struct(fields) => visitor.visit_seq(SeqDeserializer(fields.iter())),
            Value::DictEntry(key, value) => visitor.visit_seq(SeqDeserializer(
                std::iter::once(&**key).chain(std::iter::once(&**value)),
            )),
            Value::Variant(variant) => {
                Deserializer::new(variant.value()).deserialize_any(visitor)
            }
        }
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.unwrapped() {
            Value::UInt32(n) => match std::char::from_u32(*n) {
                Some(c) => visitor.visit_char(c),
                None => Err(Error::mismatch("unicode scalar value", n)),
            },
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.unwrapped() {
            Value::String(s) => visitor.visit_borrowed_bytes(s.as_bytes()),
            Value::Array(items) => {
                let bytes = items
                    .iter()
                    .map(|item| match item {
                        Value::Byte(b) => Ok(*b),
                        other => Err(Error::mismatch("byte", other.type_name())),
                    })
                    .collect::<Result<Vec<u8>>>()?;
                visitor.visit_byte_buf(bytes)
            }
            other => Err(Error::mismatch("byte array", other.type_name())),
        }
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.is_absent() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V>(self, _: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        _: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.unwrapped() {
            Value::String(variant) => visitor.visit_enum(EnumDeserializer {
                variant,
                content: None,
            }),
            Value::Struct(fields) => match fields.as_slice() {
                [Value::String(variant), content] => visitor.visit_enum(EnumDeserializer {
                    variant,
                    content: Some(content),
                }),
                _ => Err(Error::mismatch(
                    format!("(sv) for enum {}", name),
                    "struct",
                )),
            },
            other => Err(Error::mismatch(
                format!("enum {}", name),
                other.type_name(),
            )),
        }
    }

    // An empty array has no entries to tell a dictionary from a sequence.
    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.unwrapped() {
            Value::Array(items) if items.is_empty() => visitor.visit_map(MapDeserializer {
                entries: items.iter(),
                value: None,
            }),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V>(
        self,
        _: &'static str,
        _: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 str string
        unit unit_struct seq tuple tuple_struct identifier ignored_any
    }
}

fn is_dictionary(items: &[Value]) -> bool {
    !items.is_empty()
        && items
            .iter()
            .all(|item| matches!(item, Value::DictEntry(_, _)))
}

struct SeqDeserializer<I>(I);

impl<'de, I> SeqAccess<'de> for SeqDeserializer<I>
where
    I: Iterator<Item = &'de Value>,
{
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.0.next() {
            Some(value) => seed.deserialize(Deserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.0.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer<'de> {
    entries: std::slice::Iter<'de, Value>,
    value: Option<&'de Value>,
}

impl<'de> MapAccess<'de> for MapDeserializer<'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.entries.next() {
            Some(Value::DictEntry(key, value)) => {
                self.value = Some(&**value);
                seed.deserialize(Deserializer::new(key)).map(Some)
            }
            Some(other) => Err(Error::mismatch("dict entry", other.type_name())),
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        let value = self
            .value
            .take()
            .ok_or_else(|| Error::Deserializing("map value requested before its key".to_owned()))?;
        seed.deserialize(Deserializer::new(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct EnumDeserializer<'de> {
    variant: &'de str,
    content: Option<&'de Value>,
}

impl<'de> EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(BorrowedStrDeserializer::<Error>::new(self.variant))?;
        Ok((variant, self))
    }
}

impl<'de> EnumDeserializer<'de> {
    fn content(&self) -> Result<Deserializer<'de>> {
        self.content
            .map(Deserializer::new)
            .ok_or_else(|| Error::mismatch(format!("contents of {}", self.variant), "unit variant"))
    }
}

impl<'de> VariantAccess<'de> for EnumDeserializer<'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.content {
            None => Ok(()),
            Some(content) => Err(Error::mismatch(
                format!("unit variant {}", self.variant),
                content.type_name(),
            )),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.content()?)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self.content()?, visitor)
    }

    fn struct_variant<V>(self, _: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_any(self.content()?, visitor)
    }
}
