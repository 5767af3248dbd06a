//! Boxed values.

use std::fmt;

use crate::argument::Argument;
use crate::boxing::BoxedType;
use crate::error::{Error, Result};

/// A fully boxed DBus value.
///
/// Arrays and dictionaries are ordered sequences; a dictionary is an array
/// whose elements are [`Value::DictEntry`]s, kept in wire order with
/// duplicates preserved.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Byte(u8),
    Boolean(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
    ObjectPath(String),
    Signature(String),
    Array(Vec<Value>),
    Struct(Vec<Value>),
    DictEntry(Box<Value>, Box<Value>),
    Variant(Box<Variant>),
}

impl Value {
    pub fn dict_entry(key: impl Into<Value>, value: impl Into<Value>) -> Value {
        Value::DictEntry(Box::new(key.into()), Box::new(value.into()))
    }

    pub fn variant(variant: Variant) -> Value {
        Value::Variant(Box::new(variant))
    }

    /// Short name of the value's kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Byte(_) => "byte",
            Value::Boolean(_) => "boolean",
            Value::Int16(_) => "int16",
            Value::UInt16(_) => "uint16",
            Value::Int32(_) => "int32",
            Value::UInt32(_) => "uint32",
            Value::Int64(_) => "int64",
            Value::UInt64(_) => "uint64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::ObjectPath(_) => "object path",
            Value::Signature(_) => "signature",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::DictEntry(_, _) => "dict entry",
            Value::Variant(_) => "variant",
        }
    }

    pub fn boxed_type(&self) -> BoxedType {
        match self {
            Value::Boolean(_) => BoxedType::Boolean,
            Value::String(_) => BoxedType::String,
            Value::ObjectPath(_) => BoxedType::ObjectPath,
            Value::Signature(_) => BoxedType::Signature,
            Value::Array(items) => match items.first() {
                Some(Value::DictEntry(_, _)) => BoxedType::Dictionary,
                _ => BoxedType::Array,
            },
            Value::Struct(_) | Value::DictEntry(_, _) => BoxedType::Struct,
            Value::Variant(_) => BoxedType::Variant,
            _ => BoxedType::Number,
        }
    }

    /// The value of any integral kind, widened.
    pub fn as_integer(&self) -> Option<i128> {
        let n = match *self {
            Value::Byte(n) => n.into(),
            Value::Int16(n) => n.into(),
            Value::UInt16(n) => n.into(),
            Value::Int32(n) => n.into(),
            Value::UInt32(n) => n.into(),
            Value::Int64(n) => n.into(),
            Value::UInt64(n) => n.into(),
            _ => return None,
        };
        Some(n)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::ObjectPath(s) | Value::Signature(s) => Some(s),
            _ => None,
        }
    }

    /// Infers the signature of a single complete type describing this value.
    ///
    /// Empty arrays and arrays whose elements disagree have no inferable
    /// element type.
    pub fn signature(&self) -> Result<String> {
        let mut out = String::new();
        self.write_signature(&mut out)?;
        Ok(out)
    }

    fn write_signature(&self, out: &mut String) -> Result<()> {
        match self {
            Value::Byte(_) => out.push('y'),
            Value::Boolean(_) => out.push('b'),
            Value::Int16(_) => out.push('n'),
            Value::UInt16(_) => out.push('q'),
            Value::Int32(_) => out.push('i'),
            Value::UInt32(_) => out.push('u'),
            Value::Int64(_) => out.push('x'),
            Value::UInt64(_) => out.push('t'),
            Value::Double(_) => out.push('d'),
            Value::String(_) => out.push('s'),
            Value::ObjectPath(_) => out.push('o'),
            Value::Signature(_) => out.push('g'),
            Value::Variant(_) => out.push('v'),
            Value::Array(items) => {
                let first = items
                    .first()
                    .ok_or_else(|| Error::mismatch("array with an element type", "empty array"))?;
                let element = first.signature()?;
                for item in &items[1..] {
                    let other = item.signature()?;
                    if other != element {
                        return Err(Error::mismatch(
                            format!("array element {}", element),
                            format!("array element {}", other),
                        ));
                    }
                }
                out.push('a');
                out.push_str(&element);
            }
            Value::Struct(fields) => {
                if fields.is_empty() {
                    return Err(Error::mismatch("struct with fields", "empty struct"));
                }
                out.push('(');
                for field in fields {
                    field.write_signature(out)?;
                }
                out.push(')');
            }
            Value::DictEntry(key, value) => {
                out.push('{');
                key.write_signature(out)?;
                value.write_signature(out)?;
                out.push('}');
            }
        }
        Ok(())
    }
}

macro_rules! value_from {
    ($($type:ty => $variant:ident;)*) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Value {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    u8 => Byte;
    bool => Boolean;
    i16 => Int16;
    u16 => UInt16;
    i32 => Int32;
    u32 => UInt32;
    i64 => Int64;
    u64 => UInt64;
    f64 => Double;
    String => String;
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.to_owned())
    }
}

impl From<Variant> for Value {
    fn from(v: Variant) -> Value {
        Value::variant(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Value {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

/// A value together with the type it is marshalled as.
#[derive(Clone, Debug, PartialEq)]
pub struct Variant {
    ty: Argument,
    value: Value,
}

impl Variant {
    /// Wraps a value, inferring its type.
    pub fn new(value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let ty = Argument::from_signature(&value.signature()?)?;
        Ok(Variant { ty, value })
    }

    /// Wraps a value with an explicit type, e.g. for empty arrays.
    pub fn with_type(ty: Argument, value: impl Into<Value>) -> Self {
        Variant {
            ty,
            value: value.into(),
        }
    }

    pub fn argument(&self) -> &Argument {
        &self.ty
    }

    pub fn signature(&self) -> String {
        self.ty.signature()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> {:?}", self.signature(), self.value)
    }
}

/// Object paths are `/` or `/`-separated non-empty elements of
/// `[A-Za-z0-9_]`, without a trailing `/`.
pub fn is_valid_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    match path.strip_prefix('/') {
        Some(rest) => rest.split('/').all(|element| {
            !element.is_empty()
                && element
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        }),
        None => false,
    }
}
