use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;

use log::debug;

use crate::argument::ArgumentRef;
use crate::error::{Error, Result};
use crate::signature::{self, TypeCode};
use crate::value::{is_valid_object_path, Value};

use super::{BoxedType, BoxingState, NativeType, Unboxed, Word};

/// Turns a boxed value back into its unboxed form, `None` if the value does
/// not convert to the registered wire type.
pub type Unboxer = fn(&Value) -> Option<Unboxed>;

/// Boxing policy table entry for one wire type.
#[derive(Clone)]
pub struct TypeEntry {
    /// Native form used without boxing.
    pub unboxed: NativeType,
    /// Wrapper kind used with full boxing, if the type can be boxed.
    pub boxed: Option<BoxedType>,
    /// Unboxing accessor. Containers have none.
    pub unboxer: Option<Unboxer>,
}

impl TypeEntry {
    pub fn new(unboxed: NativeType, boxed: Option<BoxedType>, unboxer: Option<Unboxer>) -> Self {
        Self {
            unboxed,
            boxed,
            unboxer,
        }
    }

    fn standard(code: TypeCode) -> Self {
        let (unboxed, boxed, unboxer): (NativeType, BoxedType, Option<Unboxer>) = match code {
            TypeCode::Byte => (NativeType::Byte, BoxedType::Number, Some(unbox_byte)),
            TypeCode::Boolean => (NativeType::Bool, BoxedType::Boolean, Some(unbox_boolean)),
            TypeCode::Int16 => (NativeType::I16, BoxedType::Number, Some(unbox_int16)),
            TypeCode::UInt16 => (NativeType::U16, BoxedType::Number, Some(unbox_uint16)),
            TypeCode::Int32 => (NativeType::I32, BoxedType::Number, Some(unbox_int32)),
            TypeCode::UInt32 => (NativeType::U32, BoxedType::Number, Some(unbox_uint32)),
            TypeCode::Int64 => (NativeType::I64, BoxedType::Number, Some(unbox_int64)),
            TypeCode::UInt64 => (NativeType::U64, BoxedType::Number, Some(unbox_uint64)),
            TypeCode::Double => (NativeType::F64, BoxedType::Number, Some(unbox_double)),
            TypeCode::String => (NativeType::Str, BoxedType::String, Some(unbox_string)),
            TypeCode::ObjectPath => (NativeType::Str, BoxedType::ObjectPath, Some(unbox_object_path)),
            TypeCode::Signature => (NativeType::Str, BoxedType::Signature, Some(unbox_signature)),
            TypeCode::Array => (NativeType::Boxed(BoxedType::Array), BoxedType::Array, None),
            TypeCode::Struct => (NativeType::Boxed(BoxedType::Struct), BoxedType::Struct, None),
            TypeCode::DictEntry => (NativeType::Boxed(BoxedType::Struct), BoxedType::Struct, None),
            TypeCode::Variant => (NativeType::Boxed(BoxedType::Variant), BoxedType::Variant, None),
        };
        TypeEntry::new(unboxed, Some(boxed), unboxer)
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("unboxed", &self.unboxed)
            .field("boxed", &self.boxed)
            .field("unboxer", &self.unboxer.is_some())
            .finish()
    }
}

/// Table mapping each wire type to its native representations.
///
/// The table is plain data handed to whoever marshals with it; build it once
/// during setup and share it read-only afterwards.
#[derive(Clone, Debug)]
pub struct BoxingPolicy {
    entries: HashMap<TypeCode, TypeEntry>,
}

impl Default for BoxingPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl BoxingPolicy {
    /// A policy without any registered types.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// A policy with every wire type registered.
    pub fn standard() -> Self {
        let entries = TypeCode::ALL
            .iter()
            .map(|&code| (code, TypeEntry::standard(code)))
            .collect();
        Self { entries }
    }

    /// Registers a whole entry, replacing and returning any previous one.
    pub fn register(&mut self, code: TypeCode, entry: TypeEntry) -> Option<TypeEntry> {
        debug!("registering boxing entry for '{}': {:?}", code, entry);
        self.entries.insert(code, entry)
    }

    /// Registers the unboxing accessor for a wire type. The last registration
    /// wins; the replaced accessor is returned.
    ///
    /// A type without an entry gets the standard native representations.
    pub fn register_unboxer(&mut self, code: TypeCode, unboxer: Unboxer) -> Option<Unboxer> {
        debug!("registering unboxer for '{}'", code);
        let entry = self
            .entries
            .entry(code)
            .or_insert_with(|| TypeEntry {
                unboxer: None,
                ..TypeEntry::standard(code)
            });
        entry.unboxer.replace(unboxer)
    }

    pub fn is_registered(&self, code: TypeCode) -> bool {
        self.entries.contains_key(&code)
    }

    pub fn entry(&self, code: TypeCode) -> Result<&TypeEntry> {
        self.entries
            .get(&code)
            .ok_or(Error::UnregisteredType(code))
    }

    pub fn unboxer(&self, code: TypeCode) -> Result<Unboxer> {
        self.entry(code)?
            .unboxer
            .ok_or(Error::UnregisteredType(code))
    }

    /// Wrapper kind for an argument; arrays of dict entries are dictionaries.
    pub fn boxed_type(&self, arg: ArgumentRef<'_>) -> Result<BoxedType> {
        let kind = self
            .entry(arg.code())?
            .boxed
            .ok_or(Error::NoBoxedRepresentation(arg.code()))?;
        Ok(match kind {
            BoxedType::Array if arg.is_dictionary() => BoxedType::Dictionary,
            kind => kind,
        })
    }

    /// Native type of an argument, boxed or unboxed.
    pub fn native_type(&self, arg: ArgumentRef<'_>, boxed: bool) -> Result<NativeType> {
        if boxed || arg.is_container() {
            return Ok(NativeType::Boxed(self.boxed_type(arg)?));
        }
        Ok(self.entry(arg.code())?.unboxed.clone())
    }

    /// Compares a native type against an argument. Containers must match
    /// their wrapper kind, or a typed wrapper whose contents match child for
    /// child.
    pub fn boxing_state(&self, arg: ArgumentRef<'_>, native: &NativeType) -> BoxingState {
        if arg.is_container() {
            return if self.matches_container(arg, native) {
                BoxingState::Boxed
            } else {
                BoxingState::Invalid
            };
        }

        let entry = match self.entries.get(&arg.code()) {
            Some(entry) => entry,
            None => return BoxingState::Invalid,
        };
        match native {
            NativeType::Boxed(kind) if entry.boxed == Some(*kind) => BoxingState::Boxed,
            native if *native == entry.unboxed => BoxingState::Unboxed,
            _ => BoxingState::Invalid,
        }
    }

    fn matches_container(&self, arg: ArgumentRef<'_>, native: &NativeType) -> bool {
        match native {
            NativeType::Boxed(kind) => self.boxed_type(arg).map_or(false, |k| k == *kind),
            NativeType::Array(element) => match arg.element() {
                Some(child) if !arg.is_dictionary() && self.is_registered(arg.code()) => {
                    self.boxing_state(child, element).is_valid()
                }
                _ => false,
            },
            NativeType::Dict(key, value) => {
                match arg.element().and_then(|e| Some((e.key()?, e.value()?))) {
                    Some((k, v)) if self.is_registered(arg.code()) => {
                        self.boxing_state(k, key).is_valid()
                            && self.boxing_state(v, value).is_valid()
                    }
                    _ => false,
                }
            }
            NativeType::Struct(fields) => {
                arg.code() == TypeCode::Struct
                    && self.is_registered(arg.code())
                    && arg.children().count() == fields.len()
                    && arg
                        .children()
                        .zip(fields)
                        .all(|(child, field)| self.boxing_state(child, field).is_valid())
            }
            _ => false,
        }
    }
}

macro_rules! integral_unboxer {
    ($($name:ident: $type:ty => $ctor:ident;)*) => {
        $(
            fn $name(value: &Value) -> Option<Unboxed> {
                let n = value.as_integer()?;
                <$type>::try_from(n).ok().map(|n| Unboxed::Word(Word::$ctor(n)))
            }
        )*
    };
}

integral_unboxer! {
    unbox_byte: u8 => from_u8;
    unbox_int16: i16 => from_i16;
    unbox_uint16: u16 => from_u16;
    unbox_int32: i32 => from_i32;
    unbox_uint32: u32 => from_u32;
    unbox_int64: i64 => from_i64;
    unbox_uint64: u64 => from_u64;
}

fn unbox_boolean(value: &Value) -> Option<Unboxed> {
    match value {
        Value::Boolean(b) => Some(Unboxed::Word(Word::from_bool(*b))),
        _ => None,
    }
}

fn unbox_double(value: &Value) -> Option<Unboxed> {
    let d = match value {
        Value::Double(d) => *d,
        other => other.as_integer()? as f64,
    };
    Some(Unboxed::Word(Word::from_f64(d)))
}

fn unbox_string(value: &Value) -> Option<Unboxed> {
    match value {
        Value::String(s) => Some(Unboxed::Str(s.clone())),
        _ => None,
    }
}

fn unbox_object_path(value: &Value) -> Option<Unboxed> {
    match value {
        Value::ObjectPath(s) | Value::String(s) if is_valid_object_path(s) => {
            Some(Unboxed::Str(s.clone()))
        }
        _ => None,
    }
}

fn unbox_signature(value: &Value) -> Option<Unboxed> {
    match value {
        Value::Signature(s) | Value::String(s) if signature::validate(s).is_ok() => {
            Some(Unboxed::Str(s.clone()))
        }
        _ => None,
    }
}
