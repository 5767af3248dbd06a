use std::fmt::Display;
use std::str::Utf8Error;

use serde::{de, ser};

use crate::signature::{SignatureError, TypeCode};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Error serializing: {0}")]
    Serializing(String),
    #[error("Error deserializing: {0}")]
    Deserializing(String),

    #[error("malformed signature {signature:?}: {reason}")]
    MalformedSignature {
        signature: String,
        reason: SignatureError,
    },
    #[error("malformed variant signature {signature:?}: {reason}")]
    MalformedVariant {
        signature: String,
        reason: SignatureError,
    },
    #[error("no boxing policy entry for type '{0}'")]
    UnregisteredType(TypeCode),
    #[error("type '{0}' has no boxed representation")]
    NoBoxedRepresentation(TypeCode),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("argument index {index} out of range ({inputs} in, {outputs} out)")]
    IndexOutOfRange {
        index: isize,
        inputs: usize,
        outputs: usize,
    },
    #[error("incompatible native signature: {0}")]
    IncompatibleSignature(String),
    #[error("{0} output arguments cannot be returned without boxing")]
    UnrepresentableReturn(usize),
    #[error("container nesting exceeds maximum depth of {0}")]
    DepthExceeded(usize),

    #[error("index {0} is out of bounds")]
    IndexOutOfBounds(usize),
    #[error("invalid boolean value {0}")]
    InvalidBoolValue(u32),
    #[error("cursor has no more values")]
    CursorExhausted,
    #[error("string at {0} is not nul terminated")]
    MissingNulTerminator(usize),
    #[error("array of {0} bytes exceeds the maximum array length")]
    ArrayTooLong(usize),
    #[error("{0} bytes of leftover data")]
    LeftoverData(usize),
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] Utf8Error),
}

impl Error {
    pub(crate) fn mismatch(expected: impl Display, found: impl Display) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Serializing(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Deserializing(msg.to_string())
    }
}
