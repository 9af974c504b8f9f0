use crate::constants::*;
use crate::ByteOrder;
use crate::Class;
use crate::ElfRead;
use crate::Error;
use crate::FileKind;
use crate::Machine;
use crate::OsAbi;

/// ELF header.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Header {
    /// Bitness.
    pub class: Class,
    /// Data format.
    pub byte_order: ByteOrder,
    /// Operating system ABI.
    pub os_abi: OsAbi,
    /// ABI version
    pub abi_version: u8,
    /// File type.
    pub kind: FileKind,
    /// Architecture.
    pub machine: Machine,
    /// Architecture-specific flags.
    pub flags: u32,
    /// Program entry point.
    pub entry_point: u64,
    /// Program header (the list of segments) offset within the file.
    pub program_header_offset: u64,
    /// The length of each segment's metadata entry.
    pub segment_len: u16,
    /// The number of segments.
    pub num_segments: u16,
    /// Section header (the list of sections) offset within the file.
    pub section_header_offset: u64,
    /// The length of each section's metadata entry.
    pub section_len: u16,
    /// The number of sections.
    pub num_sections: u16,
    /// The index of the section in the section header that stores the names of sections.
    pub section_names_index: u16,
    /// The length of the ELF header.
    pub len: u16,
}

impl Header {
    /// Read header from `reader`.
    pub fn read<R: ElfRead>(reader: &mut R) -> Result<Self, Error> {
        let mut magic = [0_u8; MAGIC.len()];
        reader.read_bytes(&mut magic[..])?;
        if magic != MAGIC {
            return Err(Error::NotElf);
        }
        let class: Class = reader.read_u8()?.try_into()?;
        let byte_order: ByteOrder = reader.read_u8()?.try_into()?;
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(Error::InvalidVersion(version));
        }
        let os_abi = reader.read_u8()?.into();
        let abi_version = reader.read_u8()?;
        reader.read_bytes(&mut [0_u8; 7])?;
        let kind: FileKind = reader.read_u16(byte_order)?.into();
        let machine = reader.read_u16(byte_order)?.into();
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(Error::InvalidVersion(version));
        }
        reader.read_bytes(&mut [0_u8; 3])?;
        let entry_point = reader.read_word(class, byte_order)?;
        let program_header_offset = reader.read_word(class, byte_order)?;
        let section_header_offset = reader.read_word(class, byte_order)?;
        let flags = reader.read_u32(byte_order)?;
        let real_header_len = reader.read_u16(byte_order)?;
        let segment_len = reader.read_u16(byte_order)?;
        let num_segments = reader.read_u16(byte_order)?;
        let section_len = reader.read_u16(byte_order)?;
        let num_sections = reader.read_u16(byte_order)?;
        let section_names_index = reader.read_u16(byte_order)?;
        let ret = Self {
            class,
            byte_order,
            os_abi,
            abi_version,
            kind,
            machine,
            flags,
            entry_point,
            program_header_offset,
            segment_len,
            num_segments,
            section_header_offset,
            section_len,
            num_sections,
            section_names_index,
            len: real_header_len,
        };
        Ok(ret)
    }

    /// The size in bytes of the program header (the list of segments).
    pub const fn program_header_len(&self) -> u64 {
        self.segment_len as u64 * self.num_segments as u64
    }

    /// The size in bytes of the section header (the list of sections).
    pub const fn section_header_len(&self) -> u64 {
        self.section_len as u64 * self.num_sections as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    // First 52 bytes of a little-endian 32-bit ELF header, followed by a
    // minimal (all-zero) program/section header layout.
    const HEADER_32: [u8; 52] = [
        0x7f, b'E', b'L', b'F', 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 0, 3, 0, 1, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 52, 0, 32, 0, 0, 0, 40, 0, 0, 0, 0,
    ];

    #[test]
    fn reads_minimal_header() {
        let mut cursor = Cursor::new(&HEADER_32[..]);
        let header = Header::read(&mut cursor).unwrap();
        assert_eq!(Class::Elf32, header.class);
        assert_eq!(ByteOrder::LittleEndian, header.byte_order);
        assert_eq!(FileKind::Shared, header.kind);
        assert_eq!(0, header.num_segments);
        assert_eq!(0, header.num_sections);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = HEADER_32;
        bytes[0] = 0;
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(matches!(Header::read(&mut cursor), Err(Error::NotElf)));
    }

    #[test]
    fn rejects_truncated_file() {
        let mut cursor = Cursor::new(&HEADER_32[..4]);
        assert!(matches!(Header::read(&mut cursor), Err(Error::NotElf)));
    }
}
