use std::convert::TryFrom;

use crate::boxing::{NativeSignature, NativeType, Word};
use crate::error::{Error, Result};
use crate::value::Value;

/// One argument or return slot of a [`CallRecord`].
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    Empty,
    /// An unboxed scalar.
    Word(Word),
    /// An unboxed string, object path or signature.
    Str(String),
    /// A boxed value.
    Value(Value),
}

impl Default for Slot {
    fn default() -> Self {
        Slot::Empty
    }
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        *self == Slot::Empty
    }

    pub fn as_word(&self) -> Option<Word> {
        match self {
            Slot::Word(word) => Some(*word),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Slot::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Slot::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Arguments and return slot of a bound native call.
///
/// Slots are addressed by signed index: `0..n` are the arguments and `-1` is
/// the return slot.
#[derive(Clone, Debug, PartialEq)]
pub struct CallRecord {
    signature: NativeSignature,
    args: Vec<Slot>,
    ret: Slot,
}

pub const RETURN_INDEX: isize = -1;

impl CallRecord {
    /// An empty record shaped after `signature`.
    pub fn new(signature: NativeSignature) -> Self {
        let args = vec![Slot::Empty; signature.args.len()];
        CallRecord {
            signature,
            args,
            ret: Slot::Empty,
        }
    }

    pub fn signature(&self) -> &NativeSignature {
        &self.signature
    }

    pub fn args(&self) -> &[Slot] {
        &self.args
    }

    pub fn ret(&self) -> &Slot {
        &self.ret
    }

    fn out_of_range(&self, index: isize) -> Error {
        let outputs = if self.signature.ret == NativeType::Void { 0 } else { 1 };
        Error::IndexOutOfRange {
            index,
            inputs: self.args.len(),
            outputs,
        }
    }

    /// Native type declared for a slot.
    pub fn native_type(&self, index: isize) -> Result<&NativeType> {
        if index == RETURN_INDEX {
            return Ok(&self.signature.ret);
        }
        usize_index(index)
            .and_then(|i| self.signature.args.get(i))
            .ok_or_else(|| self.out_of_range(index))
    }

    pub fn slot(&self, index: isize) -> Result<&Slot> {
        if index == RETURN_INDEX {
            return Ok(&self.ret);
        }
        match usize_index(index).and_then(|i| self.args.get(i)) {
            Some(slot) => Ok(slot),
            None => Err(self.out_of_range(index)),
        }
    }

    pub fn slot_mut(&mut self, index: isize) -> Result<&mut Slot> {
        if index == RETURN_INDEX {
            return Ok(&mut self.ret);
        }
        match usize_index(index) {
            Some(i) if i < self.args.len() => Ok(&mut self.args[i]),
            _ => Err(self.out_of_range(index)),
        }
    }

    /// Stores a slot, returning what it held before.
    pub fn set(&mut self, index: isize, slot: Slot) -> Result<Slot> {
        Ok(std::mem::replace(self.slot_mut(index)?, slot))
    }

    pub fn take(&mut self, index: isize) -> Result<Slot> {
        self.set(index, Slot::Empty)
    }
}

fn usize_index(index: isize) -> Option<usize> {
    usize::try_from(index).ok()
}
