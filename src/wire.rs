//! Type-directed cursors over DBus message bodies.
//!
//! A [`WireReader`] walks a body according to its signature and can open
//! nested readers for container contents. A [`WireWriter`] appends values,
//! padding each to its alignment, and records the body signature as it goes.

mod reader;
mod writer;

pub use reader::WireReader;
pub use writer::WireWriter;

/// Largest array body, in bytes, that DBus allows.
pub const MAX_ARRAY_LEN: usize = 1 << 26;

/// Deepest container nesting a cursor will open.
pub const MAX_NESTING_DEPTH: usize = 64;

#[cfg(test)]
mod tests {
    use super::{WireReader, WireWriter};
    use crate::boxing::Word;
    use crate::error::Result;
    use crate::signature::TypeCode;
    use byteorder::LE;
    use test_log::test;

    #[test]
    fn written_dictionaries_read_back() -> Result<()> {
        let (mut data, mut sig) = (Vec::new(), Vec::new());
        let mut writer = WireWriter::<LE>::new(&mut data, &mut sig);
        let mut entries = writer.open_array("{sv}")?;
        for (key, n) in &[("a", 1u8), ("b", 2)] {
            let mut entry = entries.open_dict_entry()?;
            entry.append_str(TypeCode::String, key)?;
            let mut value = entry.open_variant("y")?;
            value.append_word(TypeCode::Byte, Word::from_u8(*n))?;
            value.close()?;
            entry.close()?;
        }
        entries.close()?;
        assert_eq!(sig, b"a{sv}");

        let mut reader = WireReader::<LE>::new(&data, &sig)?;
        let mut entries = reader.recurse()?;
        let mut seen = Vec::new();
        while entries.current_type().is_some() {
            let mut entry = entries.recurse()?;
            let key = entry.get_str()?.to_owned();
            entry.next()?;
            let value = entry.recurse()?;
            seen.push((key, value.get_word()?.to_u8()));
            entries.next()?;
        }
        assert_eq!(seen, vec![("a".to_owned(), 1), ("b".to_owned(), 2)]);
        assert!(!reader.next()?);
        reader.finish()
    }
}
