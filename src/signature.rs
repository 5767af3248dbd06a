//! The DBus type signature grammar.
//!
//! A signature is a sequence of *complete types*: a single basic type code,
//! or a container whose brackets and children are fully matched.
//! [`parse_signature`] turns a signature into one [`Argument`] tree per
//! complete type, while [`Argument::from_signature`] insists on exactly one.
//!
//! [`Argument`]: crate::argument::Argument
//! [`Argument::from_signature`]: crate::argument::Argument::from_signature

use crate::argument::{Argument, Node};
use crate::error::{Error, Result};

mod parser;
mod type_code;

use parser::Parser;
pub use type_code::TypeCode;

/// Longest signature the wire format can carry.
pub const MAX_SIGNATURE_LEN: usize = 255;

/// Maximum nesting of arrays, and separately of structs and dict entries.
pub const MAX_CONTAINER_DEPTH: usize = 32;

/// Detailed reason a signature was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature is empty")]
    Empty,
    #[error("signature of {0} bytes is too long")]
    TooLong(usize),
    #[error("unknown type code {0:?}")]
    UnknownTypeCode(char),
    #[error("missing array element type")]
    MissingArrayElementType,
    #[error("struct ended but not started")]
    StructEndedButNotStarted,
    #[error("dict entry ended but not started")]
    DictEntryEndedButNotStarted,
    #[error("struct started but not ended")]
    StructStartedButNotEnded,
    #[error("dict entry started but not ended")]
    DictEntryStartedButNotEnded,
    #[error("struct has no fields")]
    StructHasNoFields,
    #[error("dict entry has no fields")]
    DictEntryHasNoFields,
    #[error("dict entry has only one field")]
    DictEntryHasOnlyOneField,
    #[error("dict entry has too many fields")]
    DictEntryHasTooManyFields,
    #[error("dict key must be a basic type")]
    DictKeyMustBeBasicType,
    #[error("dict entry not inside array")]
    DictEntryNotInsideArray,
    #[error("exceeded maximum array recursion")]
    ExceededMaximumArrayRecursion,
    #[error("exceeded maximum struct recursion")]
    ExceededMaximumStructRecursion,
    #[error("expected a single complete type")]
    MultipleCompleteTypes,
}

fn malformed(signature: &str, reason: SignatureError) -> Error {
    Error::MalformedSignature {
        signature: signature.to_owned(),
        reason,
    }
}

fn check_length(signature: &str) -> std::result::Result<(), SignatureError> {
    if signature.len() > MAX_SIGNATURE_LEN {
        return Err(SignatureError::TooLong(signature.len()));
    }
    Ok(())
}

/// Parses every complete type of `signature`, in order.
///
/// The empty signature is valid here and yields no arguments, which is what a
/// method without arguments declares.
pub fn parse_signature(signature: &str) -> Result<Vec<Argument>> {
    check_length(signature).map_err(|reason| malformed(signature, reason))?;

    let mut parser = Parser::new(signature.as_bytes());
    let mut arguments = Vec::new();
    while !parser.is_done() {
        let nodes = parser
            .next_complete_type()
            .map_err(|reason| malformed(signature, reason))?;
        arguments.push(Argument::from_nodes(nodes));
    }
    Ok(arguments)
}

/// Checks that `signature` is a sequence of complete types.
pub fn validate(signature: &str) -> Result<()> {
    parse_signature(signature).map(drop)
}

/// Parses a signature that must hold exactly one complete type.
pub(crate) fn parse_single(signature: &str) -> std::result::Result<Vec<Node>, SignatureError> {
    check_length(signature)?;

    let mut parser = Parser::new(signature.as_bytes());
    let nodes = parser.next_complete_type()?;
    if !parser.is_done() {
        return Err(SignatureError::MultipleCompleteTypes);
    }
    Ok(nodes)
}
