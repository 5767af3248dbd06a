use std::marker::PhantomData;
use std::str::from_utf8;

use byteorder::ByteOrder;
use log::{error, trace};

use crate::align::{align, alignment_of};
use crate::boxing::Word;
use crate::error::{Error, Result};
use crate::primitives::{fixed_size, read_word};
use crate::signature::{self, SignatureError, TypeCode};

use super::{MAX_ARRAY_LEN, MAX_NESTING_DEPTH};

/// A type-directed read position in a message body.
///
/// Reads through `&self` never move the cursor; [`next`](WireReader::next)
/// steps past the current value and [`recurse`](WireReader::recurse) opens a
/// cursor over the contents of the current container.
#[derive(Clone, Debug)]
pub struct WireReader<'a, B: ByteOrder> {
    data: &'a [u8],
    pos: usize,
    end: usize,
    sig: &'a [u8],
    sig_ix: usize,
    // Array cursors repeat their element signature until `end`.
    repeat: bool,
    depth: usize,
    phantom: PhantomData<B>,
}

/// End of the complete type starting at `start`.
fn single_type_end(sig: &[u8], start: usize) -> Result<usize> {
    let mut nesting = 0usize;
    for (i, &b) in sig.iter().enumerate().skip(start) {
        match b {
            b'(' | b'{' => nesting += 1,
            b')' | b'}' => nesting = nesting.saturating_sub(1),
            b'a' => continue,
            _ => {}
        }
        if nesting == 0 {
            return Ok(i + 1);
        }
    }

    Err(Error::MalformedSignature {
        signature: String::from_utf8_lossy(sig).into_owned(),
        reason: SignatureError::StructStartedButNotEnded,
    })
}

impl<'a, B: ByteOrder> WireReader<'a, B> {
    /// A cursor over a body with the given signature, which is validated.
    pub fn new(data: &'a [u8], signature: &'a [u8]) -> Result<Self> {
        signature::validate(from_utf8(signature)?)?;
        Ok(Self {
            data,
            pos: 0,
            end: data.len(),
            sig: signature,
            sig_ix: 0,
            repeat: false,
            depth: 0,
            phantom: PhantomData,
        })
    }

    fn nested(&self, pos: usize, end: usize, sig: &'a [u8], repeat: bool) -> Result<Self> {
        if self.depth == MAX_NESTING_DEPTH {
            return Err(Error::DepthExceeded(MAX_NESTING_DEPTH));
        }
        Ok(Self {
            data: self.data,
            pos,
            end,
            sig,
            sig_ix: 0,
            repeat,
            depth: self.depth + 1,
            phantom: PhantomData,
        })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// The signature this cursor walks; for a variant's contents, the
    /// embedded signature.
    pub fn signature(&self) -> &'a [u8] {
        self.sig
    }

    /// Type of the value under the cursor, `None` once exhausted.
    pub fn current_type(&self) -> Option<TypeCode> {
        if self.repeat && self.pos >= self.end {
            return None;
        }
        self.sig
            .get(self.sig_ix)
            .and_then(|&b| TypeCode::from_byte(b))
    }

    /// Signature of the single complete type under the cursor.
    pub fn current_signature(&self) -> Result<&'a [u8]> {
        self.require()?;
        let end = single_type_end(self.sig, self.sig_ix)?;
        Ok(&self.sig[self.sig_ix..end])
    }

    fn require(&self) -> Result<TypeCode> {
        self.current_type().ok_or(Error::CursorExhausted)
    }

    fn slice(&self, start: usize, len: usize) -> Result<&'a [u8]> {
        let end = start.checked_add(len).ok_or(Error::IndexOutOfBounds(start))?;
        if end > self.data.len() {
            error!("Index out of bounds");
            return Err(Error::IndexOutOfBounds(end));
        }
        Ok(&self.data[start..end])
    }

    /// Reads the fixed-width value under the cursor.
    pub fn get_word(&self) -> Result<Word> {
        let code = self.require()?;
        let size =
            fixed_size(code).ok_or_else(|| Error::mismatch("fixed-width value", code))?;
        let start = align(self.pos, alignment_of(code));
        trace!("Read signature '{}', {} bytes, at {}", code, size, start);
        read_word::<B>(code, self.slice(start, size)?)
    }

    /// Reads the string, object path or signature under the cursor.
    pub fn get_str(&self) -> Result<&'a str> {
        let code = self.require()?;
        let (start, len) = self.string_extent(code)?;
        trace!("read string at {}, size is {}", start, len);
        let bytes = self.slice(start, len + 1)?;
        if bytes[len] != 0 {
            return Err(Error::MissingNulTerminator(start + len));
        }
        let text = from_utf8(&bytes[..len])?;
        if bytes[..len].contains(&0) {
            return Err(Error::mismatch("string without nul bytes", format!("{:?}", text)));
        }
        Ok(text)
    }

    fn string_extent(&self, code: TypeCode) -> Result<(usize, usize)> {
        match code {
            TypeCode::String | TypeCode::ObjectPath => {
                let at = align(self.pos, 4);
                let len = B::read_u32(self.slice(at, 4)?) as usize;
                Ok((at + 4, len))
            }
            TypeCode::Signature => {
                let len = self.slice(self.pos, 1)?[0] as usize;
                Ok((self.pos + 1, len))
            }
            other => Err(Error::mismatch("string-like value", other)),
        }
    }

    /// Opens a cursor over the contents of the container under the cursor.
    pub fn recurse(&self) -> Result<WireReader<'a, B>> {
        let code = self.require()?;
        match code {
            TypeCode::Array => {
                let at = align(self.pos, 4);
                let len = B::read_u32(self.slice(at, 4)?) as usize;
                if len > MAX_ARRAY_LEN {
                    return Err(Error::ArrayTooLong(len));
                }

                let element_start = self.sig_ix + 1;
                let element_end = single_type_end(self.sig, element_start)?;
                let element = &self.sig[element_start..element_end];
                let alignment = TypeCode::from_byte(element[0]).map_or(1, alignment_of);

                let start = align(at + 4, alignment);
                self.slice(start, len)?;
                self.nested(start, start + len, element, true)
            }
            TypeCode::Struct | TypeCode::DictEntry => {
                let close = single_type_end(self.sig, self.sig_ix)?;
                let inner = &self.sig[self.sig_ix + 1..close - 1];
                let start = align(self.pos, 8);
                if start > self.data.len() {
                    return Err(Error::IndexOutOfBounds(start));
                }
                self.nested(start, self.data.len(), inner, false)
            }
            TypeCode::Variant => {
                let len = self.slice(self.pos, 1)?[0] as usize;
                let bytes = self.slice(self.pos + 1, len + 1)?;
                if bytes[len] != 0 {
                    return Err(Error::MissingNulTerminator(self.pos + 1 + len));
                }
                let embedded = &bytes[..len];
                let text = from_utf8(embedded)?;
                signature::parse_single(text).map_err(|reason| Error::MalformedVariant {
                    signature: text.to_owned(),
                    reason,
                })?;
                trace!("variant of '{}' at {}", text, self.pos);
                self.nested(self.pos + len + 2, self.data.len(), embedded, false)
            }
            other => Err(Error::mismatch("container", other)),
        }
    }

    /// Steps past the value under the cursor. Returns whether another value
    /// follows.
    pub fn next(&mut self) -> Result<bool> {
        let code = self.require()?;
        self.pos = self.value_end(code)?;
        self.sig_ix = single_type_end(self.sig, self.sig_ix)?;
        if self.repeat {
            if self.pos > self.end {
                return Err(Error::IndexOutOfBounds(self.pos));
            }
            self.sig_ix = 0;
        }
        Ok(self.current_type().is_some())
    }

    fn value_end(&self, code: TypeCode) -> Result<usize> {
        if let Some(size) = fixed_size(code) {
            let start = align(self.pos, alignment_of(code));
            self.slice(start, size)?;
            return Ok(start + size);
        }

        match code {
            TypeCode::String | TypeCode::ObjectPath | TypeCode::Signature => {
                let (start, len) = self.string_extent(code)?;
                self.slice(start, len + 1)?;
                Ok(start + len + 1)
            }
            TypeCode::Array => Ok(self.recurse()?.end),
            _ => {
                let mut contents = self.recurse()?;
                while contents.current_type().is_some() {
                    contents.next()?;
                }
                Ok(contents.pos)
            }
        }
    }

    /// Checks that every byte of the body has been consumed.
    pub fn finish(self) -> Result<()> {
        let leftover_data = self.data.len().saturating_sub(self.pos);
        if leftover_data != 0 {
            return Err(Error::LeftoverData(leftover_data));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::WireReader;
    use crate::error::{Error, Result};
    use crate::signature::TypeCode;
    use byteorder::LE;
    use test_log::test;

    #[test]
    fn reads_do_not_advance() -> Result<()> {
        let data = [37, 0, 0, 0, 2, 0, 0, 0, b'H', b'i', 0];
        let mut reader = WireReader::<LE>::new(&data, b"is")?;
        assert_eq!(reader.current_type(), Some(TypeCode::Int32));
        assert_eq!(reader.get_word()?.to_i32(), 37);
        assert_eq!(reader.get_word()?.to_i32(), 37);
        assert!(reader.next()?);
        assert_eq!(reader.get_str()?, "Hi");
        assert!(!reader.next()?);
        assert_eq!(reader.current_type(), None);
        reader.finish()
    }

    #[test]
    fn arrays_iterate_elements() -> Result<()> {
        let data = [12, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0];
        let reader = WireReader::<LE>::new(&data, b"ai")?;
        let mut items = reader.recurse()?;
        let mut values = Vec::new();
        while items.current_type().is_some() {
            values.push(items.get_word()?.to_i32());
            items.next()?;
        }
        assert_eq!(values, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn skips_nested_containers() -> Result<()> {
        // (sd) followed by a byte
        let data = [
            2, 0, 0, 0, b'H', b'i', 0, 0, 154, 153, 153, 153, 153, 153, 201, 63, 9,
        ];
        let mut reader = WireReader::<LE>::new(&data, b"(sd)y")?;
        assert_eq!(reader.current_signature()?, b"(sd)");
        assert!(reader.next()?);
        assert_eq!(reader.get_word()?.to_u8(), 9);
        assert!(!reader.next()?);
        reader.finish()
    }

    #[test]
    fn variants_carry_their_signature() -> Result<()> {
        let data = [1, b'i', 0, 0, 37, 0, 0, 0];
        let reader = WireReader::<LE>::new(&data, b"v")?;
        let contents = reader.recurse()?;
        assert_eq!(contents.signature(), b"i");
        assert_eq!(contents.get_word()?.to_i32(), 37);

        let bad = [2, b'i', b'i', 0, 37, 0, 0, 0];
        let reader = WireReader::<LE>::new(&bad, b"v")?;
        assert!(matches!(reader.recurse(), Err(Error::MalformedVariant { .. })));
        Ok(())
    }

    #[test]
    fn truncated_data() -> Result<()> {
        let data = [37, 0];
        let reader = WireReader::<LE>::new(&data, b"i")?;
        assert_eq!(reader.get_word(), Err(Error::IndexOutOfBounds(4)));
        assert!(WireReader::<LE>::new(&data, b"a").is_err());
        Ok(())
    }

    #[test]
    fn rejects_embedded_nul() -> Result<()> {
        let data = [3, 0, 0, 0, b'a', 0, b'b', 0];
        let reader = WireReader::<LE>::new(&data, b"s")?;
        assert!(matches!(reader.get_str(), Err(Error::TypeMismatch { .. })));
        Ok(())
    }

    #[test]
    fn leftover_data() -> Result<()> {
        let data = [1, 2];
        let reader = WireReader::<LE>::new(&data, b"y")?;
        assert_eq!(reader.finish(), Err(Error::LeftoverData(2)));
        Ok(())
    }
}
