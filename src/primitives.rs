use crate::boxing::Word;
use crate::error::{Error, Result};
use crate::signature::TypeCode;

use byteorder::ByteOrder;

/// A scalar with a fixed-width wire encoding.
pub(crate) trait FixedPrimitive: Sized {
    const SIZE: usize;

    fn read<B: ByteOrder>(bytes: &[u8]) -> Result<Self>;
    fn write<B: ByteOrder>(&self, out: &mut [u8]);
    fn into_word(self) -> Word;
    fn from_word(word: Word) -> Self;
}

macro_rules! basic_primitive {
    ($type:ident, $read:ident, $write:ident, $from:ident, $to:ident) => {
        impl FixedPrimitive for $type {
            const SIZE: usize = std::mem::size_of::<$type>();

            fn read<B: ByteOrder>(bytes: &[u8]) -> Result<Self> {
                Ok(B::$read(bytes))
            }

            fn write<B: ByteOrder>(&self, out: &mut [u8]) {
                B::$write(out, *self)
            }

            fn into_word(self) -> Word {
                Word::$from(self)
            }

            fn from_word(word: Word) -> Self {
                word.$to()
            }
        }
    };
}

basic_primitive!(i16, read_i16, write_i16, from_i16, to_i16);
basic_primitive!(u16, read_u16, write_u16, from_u16, to_u16);
basic_primitive!(i32, read_i32, write_i32, from_i32, to_i32);
basic_primitive!(u32, read_u32, write_u32, from_u32, to_u32);
basic_primitive!(i64, read_i64, write_i64, from_i64, to_i64);
basic_primitive!(u64, read_u64, write_u64, from_u64, to_u64);
basic_primitive!(f64, read_f64, write_f64, from_f64, to_f64);

impl FixedPrimitive for u8 {
    const SIZE: usize = 1;

    fn read<B: ByteOrder>(bytes: &[u8]) -> Result<Self> {
        Ok(bytes[0])
    }

    fn write<B: ByteOrder>(&self, out: &mut [u8]) {
        out[0] = *self;
    }

    fn into_word(self) -> Word {
        Word::from_u8(self)
    }

    fn from_word(word: Word) -> Self {
        word.to_u8()
    }
}

// Booleans travel as a 4 byte integer that must be 0 or 1.
impl FixedPrimitive for bool {
    const SIZE: usize = 4;

    fn read<B: ByteOrder>(bytes: &[u8]) -> Result<Self> {
        match B::read_u32(bytes) {
            0 => Ok(false),
            1 => Ok(true),
            i => Err(Error::InvalidBoolValue(i)),
        }
    }

    fn write<B: ByteOrder>(&self, out: &mut [u8]) {
        B::write_u32(out, *self as u32)
    }

    fn into_word(self) -> Word {
        Word::from_bool(self)
    }

    fn from_word(word: Word) -> Self {
        word.to_bool()
    }
}

macro_rules! dispatch_fixed {
    ($code:expr, $p:ident => $body:expr, $other:expr) => {
        match $code {
            TypeCode::Byte => {
                type $p = u8;
                $body
            }
            TypeCode::Boolean => {
                type $p = bool;
                $body
            }
            TypeCode::Int16 => {
                type $p = i16;
                $body
            }
            TypeCode::UInt16 => {
                type $p = u16;
                $body
            }
            TypeCode::Int32 => {
                type $p = i32;
                $body
            }
            TypeCode::UInt32 => {
                type $p = u32;
                $body
            }
            TypeCode::Int64 => {
                type $p = i64;
                $body
            }
            TypeCode::UInt64 => {
                type $p = u64;
                $body
            }
            TypeCode::Double => {
                type $p = f64;
                $body
            }
            _ => $other,
        }
    };
}

/// Wire width of a fixed type, `None` for variable-width types.
pub(crate) fn fixed_size(code: TypeCode) -> Option<usize> {
    dispatch_fixed!(code, P => Some(<P as FixedPrimitive>::SIZE), None)
}

/// Decodes a fixed-width value from the start of `bytes`, which must hold at
/// least [`fixed_size`] bytes.
pub(crate) fn read_word<B: ByteOrder>(code: TypeCode, bytes: &[u8]) -> Result<Word> {
    dispatch_fixed!(
        code,
        P => Ok(<P as FixedPrimitive>::read::<B>(bytes)?.into_word()),
        Err(Error::mismatch("fixed-width type", code))
    )
}

/// Encodes a fixed-width value into `out`, which must be exactly
/// [`fixed_size`] bytes long.
pub(crate) fn write_word<B: ByteOrder>(code: TypeCode, word: Word, out: &mut [u8]) -> Result<()> {
    dispatch_fixed!(
        code,
        P => {
            <P as FixedPrimitive>::from_word(word).write::<B>(out);
            Ok(())
        },
        Err(Error::mismatch("fixed-width type", code))
    )
}

#[cfg(test)]
mod tests {
    use super::{fixed_size, read_word, write_word};
    use crate::boxing::Word;
    use crate::error::{Error, Result};
    use crate::signature::TypeCode;
    use byteorder::{BE, LE};

    #[test]
    fn encodes_little_and_big_endian() -> Result<()> {
        let mut out = [0u8; 4];
        write_word::<LE>(TypeCode::Int32, Word::from_i32(37), &mut out)?;
        assert_eq!(out, [37, 0, 0, 0]);
        write_word::<BE>(TypeCode::Int32, Word::from_i32(37), &mut out)?;
        assert_eq!(out, [0, 0, 0, 37]);
        assert_eq!(read_word::<BE>(TypeCode::Int32, &out)?.to_i32(), 37);
        Ok(())
    }

    #[test]
    fn booleans_must_be_zero_or_one() {
        assert_eq!(
            read_word::<LE>(TypeCode::Boolean, &[2, 0, 0, 0]),
            Err(Error::InvalidBoolValue(2))
        );
        assert_eq!(
            read_word::<LE>(TypeCode::Boolean, &[1, 0, 0, 0]),
            Ok(Word::from_bool(true))
        );
    }

    #[test]
    fn sizes() {
        assert_eq!(fixed_size(TypeCode::Byte), Some(1));
        assert_eq!(fixed_size(TypeCode::Boolean), Some(4));
        assert_eq!(fixed_size(TypeCode::Double), Some(8));
        assert_eq!(fixed_size(TypeCode::String), None);
    }
}
