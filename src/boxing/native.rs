use std::fmt;
use std::mem::size_of;

/// Kind of wrapper used for a fully boxed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoxedType {
    Number,
    Boolean,
    String,
    ObjectPath,
    Signature,
    Array,
    Dictionary,
    Struct,
    Variant,
}

impl fmt::Display for BoxedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoxedType::Number => "Number",
            BoxedType::Boolean => "Boolean",
            BoxedType::String => "String",
            BoxedType::ObjectPath => "ObjectPath",
            BoxedType::Signature => "Signature",
            BoxedType::Array => "Array",
            BoxedType::Dictionary => "Dictionary",
            BoxedType::Struct => "Struct",
            BoxedType::Variant => "Variant",
        };
        f.write_str(name)
    }
}

/// A type as it appears in a native call signature.
///
/// Scalars and [`NativeType::Str`] are the unboxed forms. Everything else is
/// carried as a boxed [`Value`]; the `Array`, `Struct` and `Dict` forms
/// additionally describe their contents so they can be checked child for
/// child against an argument tree.
///
/// [`Value`]: crate::value::Value
#[derive(Clone, Debug, PartialEq)]
pub enum NativeType {
    Void,
    Byte,
    Bool,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F64,
    Str,
    Boxed(BoxedType),
    Array(Box<NativeType>),
    Struct(Vec<NativeType>),
    Dict(Box<NativeType>, Box<NativeType>),
}

impl NativeType {
    /// Width of the native slot in bytes. References and boxed values are a
    /// single pointer.
    pub fn size(&self) -> usize {
        match self {
            NativeType::Void => 0,
            NativeType::Byte | NativeType::Bool => 1,
            NativeType::I16 | NativeType::U16 => 2,
            NativeType::I32 | NativeType::U32 => 4,
            NativeType::I64 | NativeType::U64 | NativeType::F64 => 8,
            _ => size_of::<usize>(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, NativeType::Void | NativeType::Str) && !self.is_boxed()
    }

    pub fn is_boxed(&self) -> bool {
        matches!(
            self,
            NativeType::Boxed(_)
                | NativeType::Array(_)
                | NativeType::Struct(_)
                | NativeType::Dict(_, _)
        )
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Void => f.write_str("()"),
            NativeType::Byte => f.write_str("u8"),
            NativeType::Bool => f.write_str("bool"),
            NativeType::I16 => f.write_str("i16"),
            NativeType::U16 => f.write_str("u16"),
            NativeType::I32 => f.write_str("i32"),
            NativeType::U32 => f.write_str("u32"),
            NativeType::I64 => f.write_str("i64"),
            NativeType::U64 => f.write_str("u64"),
            NativeType::F64 => f.write_str("f64"),
            NativeType::Str => f.write_str("&str"),
            NativeType::Boxed(kind) => write!(f, "{}", kind),
            NativeType::Array(element) => write!(f, "Array<{}>", element),
            NativeType::Struct(fields) => {
                f.write_str("(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                f.write_str(")")
            }
            NativeType::Dict(key, value) => write!(f, "Dictionary<{}, {}>", key, value),
        }
    }
}

/// Parameter and return types of a native callable.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeSignature {
    pub args: Vec<NativeType>,
    pub ret: NativeType,
}

impl NativeSignature {
    pub fn new(args: Vec<NativeType>, ret: NativeType) -> Self {
        Self { args, ret }
    }
}

impl fmt::Display for NativeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::{BoxedType, NativeSignature, NativeType};

    #[test]
    fn widths_fit_a_word() {
        for ty in &[
            NativeType::Byte,
            NativeType::Bool,
            NativeType::I16,
            NativeType::U64,
            NativeType::F64,
            NativeType::Str,
            NativeType::Boxed(BoxedType::Struct),
        ] {
            assert!(ty.size() <= 8, "{} is wider than a word", ty);
        }
        assert_eq!(NativeType::Void.size(), 0);
    }

    #[test]
    fn display() {
        let sig = NativeSignature::new(
            vec![
                NativeType::I32,
                NativeType::Str,
                NativeType::Dict(
                    Box::new(NativeType::Str),
                    Box::new(NativeType::Boxed(BoxedType::Variant)),
                ),
            ],
            NativeType::Struct(vec![NativeType::Byte, NativeType::Bool]),
        );
        assert_eq!(
            sig.to_string(),
            "(i32, &str, Dictionary<&str, Variant>) -> (u8, bool)"
        );
    }
}
