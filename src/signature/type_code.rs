use std::fmt;

/// A single code of the DBus type grammar.
///
/// Struct and dict-entry types are identified by their opening bracket, which
/// is how they appear in a signature. Closing brackets are grammar tokens and
/// not types of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeCode {
    Byte = b'y',
    Boolean = b'b',
    Int16 = b'n',
    UInt16 = b'q',
    Int32 = b'i',
    UInt32 = b'u',
    Int64 = b'x',
    UInt64 = b't',
    Double = b'd',
    String = b's',
    ObjectPath = b'o',
    Signature = b'g',
    Array = b'a',
    Struct = b'(',
    DictEntry = b'{',
    Variant = b'v',
}

impl TypeCode {
    pub const ALL: [TypeCode; 16] = [
        TypeCode::Byte,
        TypeCode::Boolean,
        TypeCode::Int16,
        TypeCode::UInt16,
        TypeCode::Int32,
        TypeCode::UInt32,
        TypeCode::Int64,
        TypeCode::UInt64,
        TypeCode::Double,
        TypeCode::String,
        TypeCode::ObjectPath,
        TypeCode::Signature,
        TypeCode::Array,
        TypeCode::Struct,
        TypeCode::DictEntry,
        TypeCode::Variant,
    ];

    pub fn from_byte(b: u8) -> Option<TypeCode> {
        let code = match b {
            b'y' => TypeCode::Byte,
            b'b' => TypeCode::Boolean,
            b'n' => TypeCode::Int16,
            b'q' => TypeCode::UInt16,
            b'i' => TypeCode::Int32,
            b'u' => TypeCode::UInt32,
            b'x' => TypeCode::Int64,
            b't' => TypeCode::UInt64,
            b'd' => TypeCode::Double,
            b's' => TypeCode::String,
            b'o' => TypeCode::ObjectPath,
            b'g' => TypeCode::Signature,
            b'a' => TypeCode::Array,
            b'(' => TypeCode::Struct,
            b'{' => TypeCode::DictEntry,
            b'v' => TypeCode::Variant,
            _ => return None,
        };
        Some(code)
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn as_char(self) -> char {
        self as u8 as char
    }

    /// Arrays, structs, dict entries and variants.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            TypeCode::Array | TypeCode::Struct | TypeCode::DictEntry | TypeCode::Variant
        )
    }

    /// Types with a fixed wire width of at most 8 bytes.
    pub fn is_fixed(self) -> bool {
        matches!(
            self,
            TypeCode::Byte
                | TypeCode::Boolean
                | TypeCode::Int16
                | TypeCode::UInt16
                | TypeCode::Int32
                | TypeCode::UInt32
                | TypeCode::Int64
                | TypeCode::UInt64
                | TypeCode::Double
        )
    }

    /// Types carried by reference: strings, object paths and signatures.
    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            TypeCode::String | TypeCode::ObjectPath | TypeCode::Signature
        )
    }

    pub fn is_basic(self) -> bool {
        !self.is_container()
    }

    /// The closing bracket matching an opening one.
    pub(crate) fn closing(self) -> Option<u8> {
        match self {
            TypeCode::Struct => Some(b')'),
            TypeCode::DictEntry => Some(b'}'),
            _ => None,
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
