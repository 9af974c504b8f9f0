use std::ffi::CStr;

use crate::io::BlockRead;
use crate::ByteOrder;
use crate::Class;
use crate::ElfRead;
use crate::Error;

/// A table of NUL-terminated strings, as found in `.dynstr` / `.shstrtab`.
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub struct StringTable(Vec<u8>);

impl StringTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self(vec![0])
    }

    /// Get a reference to a string at `offset`.
    ///
    /// Returns `None` if the offset is out-of-bounds or isn't NUL-terminated.
    pub fn get_string(&self, offset: usize) -> Option<&CStr> {
        let c_str_bytes = self.0.get(offset..)?;
        CStr::from_bytes_until_nul(c_str_bytes).ok()
    }

    /// Read the table from the `reader`.
    pub fn read<R: ElfRead>(reader: &mut R, len: u64) -> Result<Self, Error> {
        let mut strings = vec![0_u8; len as usize];
        reader.read_bytes(&mut strings[..])?;
        Ok(Self(strings))
    }
}

impl BlockRead for StringTable {
    fn read<R: ElfRead>(
        reader: &mut R,
        _class: Class,
        _byte_order: ByteOrder,
        len: u64,
    ) -> Result<Self, Error> {
        Self::read(reader, len)
    }
}

impl From<Vec<u8>> for StringTable {
    fn from(mut strings: Vec<u8>) -> Self {
        if strings.is_empty() {
            return Self::new();
        }
        if strings.first().copied() != Some(0) {
            strings.insert(0, 0);
        }
        Self(strings)
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_string() {
        let table: StringTable = b"\0hello\0world\0".to_vec().into();
        assert_eq!(Some(c"hello"), table.get_string(1));
        assert_eq!(Some(c"world"), table.get_string(7));
        assert_eq!(None, table.get_string(100));
    }
}
