//! Moving values between wire cursors and native call records.
//!
//! A [`Marshaller`] works on one [`Argument`](crate::argument::Argument) node
//! at a time. Reading never advances the caller's cursor; writing appends
//! exactly one value. Callers compose calls for several arguments, stepping
//! their reader with [`WireReader::next`] in between.

use std::convert::TryFrom;
use std::str::from_utf8;

use byteorder::ByteOrder;
use log::trace;

use crate::argument::{Argument, ArgumentRef};
use crate::boxing::{BoxingPolicy, NativeType, Unboxed, Word};
use crate::error::{Error, Result};
use crate::signature::{self, TypeCode};
use crate::value::{is_valid_object_path, Value, Variant};
use crate::wire::{WireReader, WireWriter};

mod record;

pub use record::{CallRecord, Slot, RETURN_INDEX};

/// Default limit on container nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Encodes and decodes single arguments according to a [`BoxingPolicy`].
#[derive(Clone, Copy, Debug)]
pub struct Marshaller<'p> {
    policy: &'p BoxingPolicy,
    max_depth: usize,
}

fn word_to_value(code: TypeCode, word: Word) -> Result<Value> {
    let value = match code {
        TypeCode::Byte => Value::Byte(word.to_u8()),
        TypeCode::Boolean => Value::Boolean(word.to_bool()),
        TypeCode::Int16 => Value::Int16(word.to_i16()),
        TypeCode::UInt16 => Value::UInt16(word.to_u16()),
        TypeCode::Int32 => Value::Int32(word.to_i32()),
        TypeCode::UInt32 => Value::UInt32(word.to_u32()),
        TypeCode::Int64 => Value::Int64(word.to_i64()),
        TypeCode::UInt64 => Value::UInt64(word.to_u64()),
        TypeCode::Double => Value::Double(word.to_f64()),
        other => return Err(Error::mismatch(other, "scalar")),
    };
    Ok(value)
}

fn str_to_value(code: TypeCode, s: &str) -> Result<Value> {
    let value = match code {
        TypeCode::String => Value::String(s.to_owned()),
        TypeCode::ObjectPath => Value::ObjectPath(s.to_owned()),
        TypeCode::Signature => Value::Signature(s.to_owned()),
        other => return Err(Error::mismatch(other, "string")),
    };
    Ok(value)
}

fn scalar_code(native: &NativeType) -> Result<TypeCode> {
    let code = match native {
        NativeType::Byte => TypeCode::Byte,
        NativeType::Bool => TypeCode::Boolean,
        NativeType::I16 => TypeCode::Int16,
        NativeType::U16 => TypeCode::UInt16,
        NativeType::I32 => TypeCode::Int32,
        NativeType::U32 => TypeCode::UInt32,
        NativeType::I64 => TypeCode::Int64,
        NativeType::U64 => TypeCode::UInt64,
        NativeType::F64 => TypeCode::Double,
        other => return Err(Error::mismatch("scalar native type", other)),
    };
    Ok(code)
}

/// Converts a wire scalar to the word of a native scalar type, range
/// checked.
fn native_word(native: &NativeType, value: &Value) -> Result<Word> {
    let mismatch = || Error::mismatch(native, value.type_name());
    match (native, value) {
        (NativeType::Bool, Value::Boolean(b)) => return Ok(Word::from_bool(*b)),
        (NativeType::F64, Value::Double(d)) => return Ok(Word::from_f64(*d)),
        _ => {}
    }
    let n = value.as_integer().ok_or_else(mismatch)?;
    let word = match native {
        NativeType::Byte => u8::try_from(n).ok().map(Word::from_u8),
        NativeType::I16 => i16::try_from(n).ok().map(Word::from_i16),
        NativeType::U16 => u16::try_from(n).ok().map(Word::from_u16),
        NativeType::I32 => i32::try_from(n).ok().map(Word::from_i32),
        NativeType::U32 => u32::try_from(n).ok().map(Word::from_u32),
        NativeType::I64 => i64::try_from(n).ok().map(Word::from_i64),
        NativeType::U64 => u64::try_from(n).ok().map(Word::from_u64),
        NativeType::F64 => Some(Word::from_f64(n as f64)),
        _ => None,
    };
    word.ok_or_else(mismatch)
}

fn check_str(code: TypeCode, s: &str) -> Result<()> {
    match code {
        TypeCode::ObjectPath if !is_valid_object_path(s) => {
            Err(Error::mismatch("object path", format!("{:?}", s)))
        }
        TypeCode::Signature => signature::validate(s),
        _ => Ok(()),
    }
}

fn child<'a>(arg: ArgumentRef<'a>, n: usize) -> Result<ArgumentRef<'a>> {
    arg.child(n)
        .ok_or_else(|| Error::mismatch(format!("child {} of '{}'", n, arg.wire_signature()), "none"))
}

fn expect_code<B: ByteOrder>(arg: ArgumentRef<'_>, reader: &WireReader<'_, B>) -> Result<TypeCode> {
    let found = reader.current_type().ok_or(Error::CursorExhausted)?;
    if found != arg.code() {
        return Err(Error::mismatch(arg.code(), found));
    }
    Ok(found)
}

impl<'p> Marshaller<'p> {
    pub fn new(policy: &'p BoxingPolicy) -> Self {
        Marshaller {
            policy,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn policy(&self) -> &'p BoxingPolicy {
        self.policy
    }

    fn enter(&self, depth: usize) -> Result<usize> {
        if depth >= self.max_depth {
            return Err(Error::DepthExceeded(self.max_depth));
        }
        Ok(depth + 1)
    }

    /// Unboxes a value for a basic argument through the policy's unboxer.
    pub fn unbox_value(&self, arg: ArgumentRef<'_>, value: &Value) -> Result<Unboxed> {
        if arg.is_container() {
            return Err(Error::mismatch("basic type", arg.wire_signature()));
        }
        let unbox = self.policy.unboxer(arg.code())?;
        unbox(value).ok_or_else(|| Error::mismatch(arg.code(), value.type_name()))
    }

    /// Wraps an unboxed value into the boxed form of a basic argument.
    pub fn boxed_value(&self, arg: ArgumentRef<'_>, unboxed: &Unboxed) -> Result<Value> {
        self.policy.boxed_type(arg)?;
        match unboxed {
            Unboxed::Word(word) => word_to_value(arg.code(), *word),
            Unboxed::Str(s) => str_to_value(arg.code(), s),
        }
    }

    /// Reads the value under the cursor as a boxed value.
    pub fn unmarshal_value<B: ByteOrder>(
        &self,
        arg: ArgumentRef<'_>,
        reader: &WireReader<'_, B>,
    ) -> Result<Value> {
        self.read_value(arg, reader, 0)
    }

    /// Reads the value under the cursor into slot `index` of `record`, boxed
    /// or unboxed. Containers are always boxed.
    ///
    /// Unboxed scalars are stored as the native type the policy registers
    /// for the wire type, e.g. an `i` registered as [`NativeType::I64`]
    /// fills the slot with a sign-extended 64-bit word.
    pub fn unmarshal_into_record<B: ByteOrder>(
        &self,
        arg: ArgumentRef<'_>,
        reader: &WireReader<'_, B>,
        record: &mut CallRecord,
        index: isize,
        boxing: bool,
    ) -> Result<()> {
        let slot = if boxing || arg.is_container() {
            Slot::Value(self.read_value(arg, reader, 0)?)
        } else {
            match self.read_unboxed(arg, reader)? {
                Unboxed::Word(word) => Slot::Word(word),
                Unboxed::Str(s) => Slot::Str(s),
            }
        };
        *record.slot_mut(index)? = slot;
        Ok(())
    }

    fn read_unboxed<B: ByteOrder>(
        &self,
        arg: ArgumentRef<'_>,
        reader: &WireReader<'_, B>,
    ) -> Result<Unboxed> {
        let entry = self.policy.entry(arg.code())?;
        let code = expect_code(arg, reader)?;
        match &entry.unboxed {
            NativeType::Str if !code.is_fixed() => {
                let s = reader.get_str()?;
                check_str(code, s)?;
                Ok(Unboxed::Str(s.to_owned()))
            }
            native if native.is_scalar() && code.is_fixed() => {
                let wire = word_to_value(code, reader.get_word()?)?;
                Ok(Unboxed::Word(native_word(native, &wire)?))
            }
            native => Err(Error::mismatch(format!("unboxed form of '{}'", code), native)),
        }
    }

    fn read_value<B: ByteOrder>(
        &self,
        arg: ArgumentRef<'_>,
        reader: &WireReader<'_, B>,
        depth: usize,
    ) -> Result<Value> {
        self.policy.entry(arg.code())?;
        let code = expect_code(arg, reader)?;
        trace!("unmarshal '{}' at {}", code, reader.position());

        match code {
            TypeCode::Array => {
                let element = child(arg, 0)?;
                let depth = self.enter(depth)?;
                let mut items = reader.recurse()?;
                let mut values = Vec::new();
                while items.current_type().is_some() {
                    values.push(self.read_value(element, &items, depth)?);
                    items.next()?;
                }
                Ok(Value::Array(values))
            }
            TypeCode::Struct => {
                let depth = self.enter(depth)?;
                let mut fields = reader.recurse()?;
                let mut values = Vec::new();
                for field in arg.children() {
                    values.push(self.read_value(field, &fields, depth)?);
                    fields.next()?;
                }
                Ok(Value::Struct(values))
            }
            TypeCode::DictEntry => {
                let depth = self.enter(depth)?;
                let mut entry = reader.recurse()?;
                let key = self.read_value(child(arg, 0)?, &entry, depth)?;
                entry.next()?;
                let value = self.read_value(child(arg, 1)?, &entry, depth)?;
                Ok(Value::dict_entry(key, value))
            }
            TypeCode::Variant => {
                let depth = self.enter(depth)?;
                let contents = reader.recurse()?;
                let text = from_utf8(contents.signature())?;
                let nodes = signature::parse_single(text).map_err(|reason| {
                    Error::MalformedVariant {
                        signature: text.to_owned(),
                        reason,
                    }
                })?;
                let ty = Argument::from_nodes(nodes);
                let value = self.read_value(ty.root(), &contents, depth)?;
                Ok(Value::variant(Variant::with_type(ty, value)))
            }
            code if code.is_fixed() => word_to_value(code, reader.get_word()?),
            code => {
                let s = reader.get_str()?;
                check_str(code, s)?;
                str_to_value(code, s)
            }
        }
    }

    /// Appends a boxed value as one argument.
    pub fn marshal_value<B: ByteOrder>(
        &self,
        arg: ArgumentRef<'_>,
        value: &Value,
        writer: &mut WireWriter<'_, B>,
    ) -> Result<()> {
        self.write_value(arg, value, writer, 0)
    }

    /// Appends the contents of slot `index` of `record` as one argument.
    pub fn marshal_from_record<B: ByteOrder>(
        &self,
        arg: ArgumentRef<'_>,
        record: &CallRecord,
        index: isize,
        writer: &mut WireWriter<'_, B>,
    ) -> Result<()> {
        match record.slot(index)? {
            Slot::Value(value) => self.write_value(arg, value, writer, 0),
            Slot::Word(_) if arg.is_container() => {
                Err(Error::mismatch(arg.wire_signature(), "scalar slot"))
            }
            Slot::Word(word) => {
                let entry = self.policy.entry(arg.code())?;
                let value = word_to_value(scalar_code(&entry.unboxed)?, *word)?;
                self.write_value(arg, &value, writer, 0)
            }
            Slot::Str(s) => {
                self.policy.entry(arg.code())?;
                check_str(arg.code(), s)?;
                writer.append_str(arg.code(), s)
            }
            Slot::Empty => Err(Error::mismatch(arg.code(), "empty slot")),
        }
    }

    fn write_value<B: ByteOrder>(
        &self,
        arg: ArgumentRef<'_>,
        value: &Value,
        writer: &mut WireWriter<'_, B>,
        depth: usize,
    ) -> Result<()> {
        let code = arg.code();
        self.policy.entry(code)?;
        trace!("marshal '{}' from {}", code, value.type_name());

        match (code, value) {
            (TypeCode::Array, Value::Array(items)) => {
                let element = child(arg, 0)?;
                let depth = self.enter(depth)?;
                let mut contents = writer.open_array(&element.wire_signature())?;
                for item in items {
                    self.write_value(element, item, &mut contents, depth)?;
                }
                contents.close()
            }
            (TypeCode::Struct, Value::Struct(fields)) => {
                let expected = arg.children().count();
                if fields.len() != expected {
                    return Err(Error::mismatch(
                        format!("{} struct fields", expected),
                        format!("{} struct fields", fields.len()),
                    ));
                }
                let depth = self.enter(depth)?;
                let mut contents = writer.open_struct(&arg.wire_signature())?;
                for (field, value) in arg.children().zip(fields) {
                    self.write_value(field, value, &mut contents, depth)?;
                }
                contents.close()
            }
            (TypeCode::DictEntry, Value::DictEntry(key, value)) => {
                let depth = self.enter(depth)?;
                let mut contents = writer.open_dict_entry()?;
                self.write_value(child(arg, 0)?, key, &mut contents, depth)?;
                self.write_value(child(arg, 1)?, value, &mut contents, depth)?;
                contents.close()
            }
            (TypeCode::Variant, value) => {
                let inferred;
                let variant = match value {
                    Value::Variant(variant) => &**variant,
                    other => {
                        inferred = Variant::new(other.clone())?;
                        &inferred
                    }
                };
                let depth = self.enter(depth)?;
                let mut contents = writer.open_variant(&variant.signature())?;
                self.write_value(variant.argument().root(), variant.value(), &mut contents, depth)?;
                contents.close()
            }
            (code, value) if code.is_container() => {
                Err(Error::mismatch(arg.wire_signature(), value.type_name()))
            }
            (code, value) => match self.unbox_value(arg, value)? {
                Unboxed::Word(word) => writer.append_word(code, word),
                Unboxed::Str(s) => writer.append_str(code, &s),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CallRecord, Marshaller, Slot, RETURN_INDEX};
    use crate::argument::Argument;
    use crate::boxing::{
        BoxedType, BoxingPolicy, NativeSignature, NativeType, TypeEntry, Unboxed, Word,
    };
    use crate::error::{Error, Result};
    use crate::message::Message;
    use crate::signature::TypeCode;
    use crate::value::{Value, Variant};
    use byteorder::LE;
    use test_log::test;

    fn marshal(sig: &str, value: &Value) -> Result<Message> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy);
        let arg = Argument::from_signature(sig)?;
        let mut message = Message::new();
        marshaller.marshal_value(arg.root(), value, &mut message.writer::<LE>())?;
        Ok(message)
    }

    fn unmarshal(sig: &str, message: &Message) -> Result<Value> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy);
        let arg = Argument::from_signature(sig)?;
        let reader = message.reader::<LE>()?;
        marshaller.unmarshal_value(arg.root(), &reader)
    }

    #[test]
    fn unbox_then_box() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy);
        let arg = Argument::from_signature("i")?;
        assert_eq!(arg.root().unboxed_size(), 4);

        let unboxed = marshaller.unbox_value(arg.root(), &Value::Int32(42))?;
        assert_eq!(unboxed, Unboxed::Word(Word::from_i32(42)));
        assert_eq!(marshaller.boxed_value(arg.root(), &unboxed)?, Value::Int32(42));

        assert!(matches!(
            marshaller.unbox_value(arg.root(), &Value::String("42".into())),
            Err(Error::TypeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn every_basic_type_unboxes_and_boxes() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy);
        let cases = vec![
            ("y", Value::Byte(200)),
            ("b", Value::Boolean(true)),
            ("n", Value::Int16(-2)),
            ("q", Value::UInt16(u16::MAX)),
            ("i", Value::Int32(-7)),
            ("u", Value::UInt32(4_000_000_000)),
            ("x", Value::Int64(i64::MIN)),
            ("t", Value::UInt64(u64::MAX)),
            ("d", Value::Double(-0.5)),
            ("s", Value::String("h\u{e9}llo".into())),
            ("o", Value::ObjectPath("/org/example".into())),
            ("g", Value::Signature("a{sv}".into())),
        ];

        for (sig, value) in cases {
            let arg = Argument::from_signature(sig)?;
            let unboxed = marshaller.unbox_value(arg.root(), &value)?;
            assert_eq!(marshaller.boxed_value(arg.root(), &unboxed)?, value);

            // and the same through the wire and an unboxed record slot
            let message = marshal(sig, &value)?;
            let reader = message.reader::<LE>()?;
            let native = policy.native_type(arg.root(), false)?;
            let mut record = CallRecord::new(NativeSignature::new(vec![native], NativeType::Void));
            marshaller.unmarshal_into_record(arg.root(), &reader, &mut record, 0, false)?;
            let mut out = Message::new();
            marshaller.marshal_from_record(arg.root(), &record, 0, &mut out.writer::<LE>())?;
            assert_eq!(out, message);
        }
        Ok(())
    }

    #[test]
    fn reads_validate_paths_and_signatures() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy);

        let path = Message::from_parts(vec![3, 0, 0, 0, b'a', b'/', b'b', 0], "o");
        assert!(matches!(
            unmarshal("o", &path),
            Err(Error::TypeMismatch { .. })
        ));
        let arg = Argument::from_signature("o")?;
        let sig = NativeSignature::new(vec![NativeType::Str], NativeType::Void);
        let mut record = CallRecord::new(sig);
        assert!(matches!(
            marshaller.unmarshal_into_record(arg.root(), &path.reader::<LE>()?, &mut record, 0, false),
            Err(Error::TypeMismatch { .. })
        ));

        let signature = Message::from_parts(vec![2, b'a', b'{', 0], "g");
        assert!(matches!(
            unmarshal("g", &signature),
            Err(Error::MalformedSignature { .. })
        ));

        let text = Message::from_parts(vec![3, 0, 0, 0, b'a', 0, b'b', 0], "s");
        assert!(matches!(
            unmarshal("s", &text),
            Err(Error::TypeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn registered_native_types_shape_record_slots() -> Result<()> {
        let standard = BoxingPolicy::standard();
        let mut policy = BoxingPolicy::standard();
        policy.register(
            TypeCode::Int32,
            TypeEntry::new(
                NativeType::I64,
                Some(BoxedType::Number),
                Some(standard.unboxer(TypeCode::Int32)?),
            ),
        );
        let marshaller = Marshaller::new(&policy);
        let arg = Argument::from_signature("i")?;
        let message = Message::from_parts(vec![0xdb, 0xff, 0xff, 0xff], "i");
        let sig = NativeSignature::new(vec![NativeType::I64], NativeType::Void);
        let mut record = CallRecord::new(sig);

        marshaller.unmarshal_into_record(arg.root(), &message.reader::<LE>()?, &mut record, 0, false)?;
        assert_eq!(record.slot(0)?, &Slot::Word(Word::from_i64(-37)));

        let mut out = Message::new();
        marshaller.marshal_from_record(arg.root(), &record, 0, &mut out.writer::<LE>())?;
        assert_eq!(out, message);

        // wider than the wire type
        record.set(0, Slot::Word(Word::from_i64(1 << 40)))?;
        let mut out = Message::new();
        assert!(matches!(
            marshaller.marshal_from_record(arg.root(), &record, 0, &mut out.writer::<LE>()),
            Err(Error::TypeMismatch { .. })
        ));

        let mut as_text = BoxingPolicy::standard();
        as_text.register(TypeCode::Int32, TypeEntry::new(NativeType::Str, None, None));
        let marshaller = Marshaller::new(&as_text);
        assert!(matches!(
            marshaller.unmarshal_into_record(arg.root(), &message.reader::<LE>()?, &mut record, 0, false),
            Err(Error::TypeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn array_order_is_preserved() -> Result<()> {
        let data = vec![12, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0];
        let message = Message::from_parts(data.clone(), "ai");
        let value = unmarshal("ai", &message)?;
        assert_eq!(value, Value::from(vec![1i32, 2, 3]));
        assert_eq!(marshal("ai", &value)?.data, data);
        Ok(())
    }

    #[test]
    fn empty_arrays() -> Result<()> {
        let message = Message::from_parts(vec![0, 0, 0, 0], "ai");
        assert_eq!(unmarshal("ai", &message)?, Value::Array(vec![]));
        assert_eq!(marshal("ai", &Value::Array(vec![]))?.data, vec![0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn round_trips() -> Result<()> {
        let dict = Value::Array(vec![
            Value::dict_entry("b", Variant::new(2u8)?),
            Value::dict_entry("a", Variant::new("x")?),
            Value::dict_entry("b", Variant::new(vec![1u16, 2])?),
        ]);
        let cases = vec![
            ("y", Value::Byte(9)),
            ("b", Value::Boolean(true)),
            ("n", Value::Int16(-3)),
            ("t", Value::UInt64(u64::MAX)),
            ("d", Value::Double(0.2)),
            ("o", Value::ObjectPath("/org/example".into())),
            ("g", Value::Signature("a{sv}".into())),
            ("a{sv}", dict),
            ("(sd(yx))", Value::Struct(vec![
                "Hi".into(),
                0.5.into(),
                Value::Struct(vec![1u8.into(), 7i64.into()]),
            ])),
            ("aai", Value::Array(vec![vec![1i32].into(), Value::Array(vec![])])),
        ];

        for (sig, value) in cases {
            let message = marshal(sig, &value)?;
            assert_eq!(message.signature_str()?, sig);
            assert_eq!(unmarshal(sig, &message)?, value);
            let remarshalled = marshal(sig, &unmarshal(sig, &message)?)?;
            assert_eq!(remarshalled, message);
        }
        Ok(())
    }

    #[test]
    fn variants_accept_plain_values() -> Result<()> {
        let message = marshal("v", &Value::Int32(37))?;
        assert_eq!(message.data, vec![1, b'i', 0, 0, 37, 0, 0, 0]);
        assert_eq!(
            unmarshal("v", &message)?,
            Value::variant(Variant::new(37i32)?)
        );
        Ok(())
    }

    #[test]
    fn malformed_variant() {
        let message = Message::from_parts(vec![2, b'i', b'i', 0, 37, 0, 0, 0], "v");
        assert!(matches!(
            unmarshal("v", &message),
            Err(Error::MalformedVariant { .. })
        ));
    }

    #[test]
    fn depth_limit() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy).with_max_depth(2);
        let arg = Argument::from_signature("aai")?;
        let nested = Value::Array(vec![Value::Array(vec![Value::Array(vec![])])]);
        let arg3 = Argument::from_signature("aaai")?;
        let mut message = Message::new();
        assert_eq!(
            marshaller.marshal_value(arg3.root(), &nested, &mut message.writer::<LE>()),
            Err(Error::DepthExceeded(2))
        );

        let mut message = Message::new();
        let shallow = Value::Array(vec![Value::Array(vec![1i32.into()])]);
        marshaller.marshal_value(arg.root(), &shallow, &mut message.writer::<LE>())?;
        Ok(())
    }

    #[test]
    fn unregistered_types() -> Result<()> {
        let policy = BoxingPolicy::empty();
        let marshaller = Marshaller::new(&policy);
        let arg = Argument::from_signature("i")?;
        let mut message = Message::new();
        assert_eq!(
            marshaller.marshal_value(arg.root(), &Value::Int32(1), &mut message.writer::<LE>()),
            Err(Error::UnregisteredType(TypeCode::Int32))
        );
        Ok(())
    }

    #[test]
    fn records() -> Result<()> {
        let policy = BoxingPolicy::standard();
        let marshaller = Marshaller::new(&policy);
        let int = Argument::from_signature("i")?;
        let text = Argument::from_signature("s")?;

        let message = Message::from_parts(vec![37, 0, 0, 0, 2, 0, 0, 0, b'H', b'i', 0], "is");
        let mut reader = message.reader::<LE>()?;
        let sig = NativeSignature::new(vec![NativeType::I32, NativeType::Str], NativeType::Void);
        let mut record = CallRecord::new(sig);
        marshaller.unmarshal_into_record(int.root(), &reader, &mut record, 0, false)?;
        // reading does not advance
        marshaller.unmarshal_into_record(int.root(), &reader, &mut record, RETURN_INDEX, true)?;
        reader.next()?;
        marshaller.unmarshal_into_record(text.root(), &reader, &mut record, 1, false)?;
        assert_eq!(record.slot(0)?, &Slot::Word(Word::from_i32(37)));
        assert_eq!(record.slot(1)?, &Slot::Str("Hi".into()));
        assert_eq!(record.ret(), &Slot::Value(Value::Int32(37)));

        let mut out = Message::new();
        let mut writer = out.writer::<LE>();
        marshaller.marshal_from_record(int.root(), &record, 0, &mut writer)?;
        marshaller.marshal_from_record(text.root(), &record, 1, &mut writer)?;
        assert_eq!(out, message);

        // the reader now sits on the string
        assert!(matches!(
            marshaller.unmarshal_into_record(int.root(), &reader, &mut record, 0, false),
            Err(Error::TypeMismatch { .. })
        ));

        let out_of_range = Error::IndexOutOfRange {
            index: 2,
            inputs: 2,
            outputs: 0,
        };
        let start = message.reader::<LE>()?;
        assert_eq!(
            marshaller.unmarshal_into_record(int.root(), &start, &mut record, 2, false),
            Err(out_of_range.clone())
        );
        let mut out = Message::new();
        assert_eq!(
            marshaller.marshal_from_record(int.root(), &record, 2, &mut out.writer::<LE>()),
            Err(out_of_range)
        );
        Ok(())
    }

    #[test]
    fn wire_type_must_match() -> Result<()> {
        let message = Message::from_parts(vec![37, 0, 0, 0], "u");
        assert!(matches!(
            unmarshal("i", &message),
            Err(Error::TypeMismatch { .. })
        ));
        Ok(())
    }
}
