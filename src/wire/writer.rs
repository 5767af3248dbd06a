use std::marker::PhantomData;

use byteorder::ByteOrder;
use log::trace;

use crate::align::{align, alignment_of};
use crate::boxing::Word;
use crate::error::{Error, Result};
use crate::primitives::{fixed_size, write_word};
use crate::signature::{self, SignatureError, TypeCode, MAX_SIGNATURE_LEN};

use super::{MAX_ARRAY_LEN, MAX_NESTING_DEPTH};

#[derive(Debug)]
struct ArrayFrame {
    length_at: usize,
    start: usize,
}

/// An append position in a message body.
///
/// Containers are written through a nested writer returned by one of the
/// `open_*` methods, which must be [`close`](WireWriter::close)d before the
/// parent is used again. Arrays only get their length once closed.
#[derive(Debug)]
pub struct WireWriter<'a, B: ByteOrder> {
    data: &'a mut Vec<u8>,
    // Only the top level writer records signature codes.
    signature: Option<&'a mut Vec<u8>>,
    array: Option<ArrayFrame>,
    depth: usize,
    phantom: PhantomData<B>,
}

impl<'a, B: ByteOrder> WireWriter<'a, B> {
    pub fn new(data: &'a mut Vec<u8>, signature: &'a mut Vec<u8>) -> Self {
        Self {
            data,
            signature: Some(signature),
            array: None,
            depth: 0,
            phantom: PhantomData,
        }
    }

    fn record(&mut self, sig: &[u8]) {
        if let Some(signature) = self.signature.as_mut() {
            signature.extend_from_slice(sig);
        }
    }

    fn align_to(&mut self, alignment: usize) {
        let len = align(self.data.len(), alignment);
        self.data.resize(len, 0);
    }

    fn prepare_write(&mut self, size: usize) -> &mut [u8] {
        let start = self.data.len();
        self.data.resize(start + size, 0);
        &mut self.data[start..]
    }

    fn nested(&mut self, array: Option<ArrayFrame>) -> Result<WireWriter<'_, B>> {
        if self.depth == MAX_NESTING_DEPTH {
            return Err(Error::DepthExceeded(MAX_NESTING_DEPTH));
        }
        Ok(WireWriter {
            data: &mut *self.data,
            signature: None,
            array,
            depth: self.depth + 1,
            phantom: PhantomData,
        })
    }

    /// Bytes written to the body so far, including enclosing containers.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn append_word(&mut self, code: TypeCode, word: Word) -> Result<()> {
        let size =
            fixed_size(code).ok_or_else(|| Error::mismatch("fixed-width type", code))?;
        self.align_to(alignment_of(code));
        trace!("Write signature '{}', {} bytes, at {}", code, size, self.data.len());
        write_word::<B>(code, word, self.prepare_write(size))?;
        self.record(&[code.as_byte()]);
        Ok(())
    }

    pub fn append_str(&mut self, code: TypeCode, s: &str) -> Result<()> {
        if s.as_bytes().contains(&0) {
            return Err(Error::mismatch("string without nul bytes", format!("{:?}", s)));
        }
        match code {
            TypeCode::String | TypeCode::ObjectPath => {
                self.align_to(4);
                B::write_u32(self.prepare_write(4), s.len() as u32);
            }
            TypeCode::Signature => {
                if s.len() > MAX_SIGNATURE_LEN {
                    return Err(Error::MalformedSignature {
                        signature: s.to_owned(),
                        reason: SignatureError::TooLong(s.len()),
                    });
                }
                self.data.push(s.len() as u8);
            }
            other => return Err(Error::mismatch("string-like type", other)),
        }
        trace!("write string at {}, size is {}", self.data.len(), s.len());
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self.record(&[code.as_byte()]);
        Ok(())
    }

    /// Starts an array of the given element type. Elements are appended to
    /// the returned writer; closing it fills in the length.
    pub fn open_array(&mut self, element_signature: &str) -> Result<WireWriter<'_, B>> {
        let element = element_signature
            .bytes()
            .next()
            .and_then(TypeCode::from_byte)
            .ok_or_else(|| Error::MalformedSignature {
                signature: element_signature.to_owned(),
                reason: SignatureError::MissingArrayElementType,
            })?;
        self.record(b"a");
        self.record(element_signature.as_bytes());

        self.align_to(4);
        let length_at = self.data.len();
        self.prepare_write(4);
        self.align_to(alignment_of(element));
        let start = self.data.len();
        trace!("array of '{}' at {}", element_signature, length_at);
        self.nested(Some(ArrayFrame { length_at, start }))
    }

    /// Starts a struct; `signature` is the whole struct type, parentheses
    /// included.
    pub fn open_struct(&mut self, signature: &str) -> Result<WireWriter<'_, B>> {
        self.record(signature.as_bytes());
        self.align_to(8);
        self.nested(None)
    }

    /// Starts a dict entry. Dict entries only occur as array elements, whose
    /// type was recorded by [`open_array`](WireWriter::open_array).
    pub fn open_dict_entry(&mut self) -> Result<WireWriter<'_, B>> {
        self.align_to(8);
        self.nested(None)
    }

    /// Writes a variant's signature and returns a writer for its value.
    pub fn open_variant(&mut self, contained: &str) -> Result<WireWriter<'_, B>> {
        signature::parse_single(contained).map_err(|reason| Error::MalformedVariant {
            signature: contained.to_owned(),
            reason,
        })?;
        self.record(b"v");
        trace!("variant of '{}' at {}", contained, self.data.len());
        self.data.push(contained.len() as u8);
        self.data.extend_from_slice(contained.as_bytes());
        self.data.push(0);
        self.nested(None)
    }

    /// Finishes a container writer, back-filling an array's byte length.
    pub fn close(self) -> Result<()> {
        if let Some(frame) = self.array {
            let len = self.data.len() - frame.start;
            if len > MAX_ARRAY_LEN {
                return Err(Error::ArrayTooLong(len));
            }
            let data = self.data;
            B::write_u32(&mut data[frame.length_at..frame.length_at + 4], len as u32);
        }
        Ok(())
    }
}
