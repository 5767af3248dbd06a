//! Message bodies.

use byteorder::ByteOrder;

use crate::error::Result;
use crate::wire::{WireReader, WireWriter};

/// A DBus message body along with its signature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(data: Vec<u8>, signature: impl Into<Vec<u8>>) -> Self {
        Message {
            data,
            signature: signature.into(),
        }
    }

    pub fn signature_str(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.signature)?)
    }

    /// A reader positioned at the start of the body.
    pub fn reader<B: ByteOrder>(&self) -> Result<WireReader<'_, B>> {
        WireReader::new(&self.data, &self.signature)
    }

    /// A writer appending to the body and its signature.
    pub fn writer<B: ByteOrder>(&mut self) -> WireWriter<'_, B> {
        WireWriter::new(&mut self.data, &mut self.signature)
    }
}
