//! Boxed and unboxed representations of wire values.
//!
//! Every basic wire type has an *unboxed* native form: a scalar of at most 8
//! bytes held in a [`Word`], or a string reference. When full boxing is
//! requested the value is wrapped in a [`Value`] instead. Containers are
//! always boxed. Which native forms are used, and how a boxed value is turned
//! back into its unboxed form, is configured by a [`BoxingPolicy`].
//!
//! [`Value`]: crate::value::Value

use std::fmt;

mod native;
mod policy;

pub use native::{BoxedType, NativeSignature, NativeType};
pub use policy::{BoxingPolicy, TypeEntry, Unboxer};

/// The 8-byte slot holding an unboxed scalar.
///
/// Values narrower than 8 bytes occupy the low bits, zero-extended.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Word(u64);

macro_rules! word_conversions {
    ($($from:ident / $to:ident: $type:ty as $bits:ty;)*) => {
        $(
            pub fn $from(v: $type) -> Word {
                Word(v as $bits as u64)
            }

            pub fn $to(self) -> $type {
                self.0 as $bits as $type
            }
        )*
    };
}

impl Word {
    pub const fn from_bits(bits: u64) -> Word {
        Word(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    word_conversions! {
        from_u8 / to_u8: u8 as u8;
        from_i16 / to_i16: i16 as u16;
        from_u16 / to_u16: u16 as u16;
        from_i32 / to_i32: i32 as u32;
        from_u32 / to_u32: u32 as u32;
        from_i64 / to_i64: i64 as u64;
        from_u64 / to_u64: u64 as u64;
    }

    pub fn from_bool(v: bool) -> Word {
        Word(v as u64)
    }

    pub fn to_bool(self) -> bool {
        self.0 != 0
    }

    pub fn from_f64(v: f64) -> Word {
        Word(v.to_bits())
    }

    pub fn to_f64(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({:#018x})", self.0)
    }
}

/// An unboxed value: a scalar word, or a string for string-like types.
#[derive(Clone, Debug, PartialEq)]
pub enum Unboxed {
    Word(Word),
    Str(String),
}

/// How a native type relates to an argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxingState {
    Unboxed,
    Boxed,
    Invalid,
}

impl BoxingState {
    pub fn is_valid(self) -> bool {
        self != BoxingState::Invalid
    }

    pub fn is_boxed(self) -> bool {
        self == BoxingState::Boxed
    }
}
