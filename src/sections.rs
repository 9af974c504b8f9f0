use std::ops::Deref;
use std::ops::Range;

use crate::BlockRead;
use crate::ByteOrder;
use crate::Class;
use crate::ElfRead;
use crate::ElfSeek;
use crate::Error;
use crate::SectionFlags;
use crate::SectionKind;

/// Sections (the section header table).
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct SectionHeader {
    entries: Vec<Section>,
}

impl SectionHeader {
    /// Read the table from the `reader`.
    pub fn read<R: ElfRead>(
        reader: &mut R,
        class: Class,
        byte_order: ByteOrder,
        len: u64,
    ) -> Result<Self, Error> {
        let num_sections = len / class.section_len() as u64;
        let mut entries = Vec::with_capacity(num_sections as usize);
        for _ in 0..num_sections {
            let entry = Section::read(reader, class, byte_order)?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    /// Find the first section of a given `kind`.
    pub fn find_by_kind(&self, kind: SectionKind) -> Option<&Section> {
        self.entries.iter().find(|section| section.kind == kind)
    }

    /// Find the first section whose name (resolved via `names`) matches `name`.
    pub fn find_by_name<'a>(
        &'a self,
        names: &crate::StringTable,
        name: &std::ffi::CStr,
    ) -> Option<&'a Section> {
        self.entries.iter().find(|section| {
            names
                .get_string(section.name_offset as usize)
                .is_some_and(|s| s == name)
        })
    }
}

impl Deref for SectionHeader {
    type Target = Vec<Section>;
    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

/// A section.
///
/// Sections carry most of the data this crate reads: `.dynstr`, `.dynamic`,
/// `.gnu.version_d` and `.gnu.version_r`.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Section {
    /// Offset of the section name in the string table that stores section names.
    pub name_offset: u32,
    /// Section type.
    pub kind: SectionKind,
    /// Section flags.
    pub flags: SectionFlags,
    /// Virtual address (in-memory offset).
    pub virtual_address: u64,
    /// In-file offset.
    pub offset: u64,
    /// Section size.
    pub size: u64,
    /// Optional index of the related section.
    pub link: u32,
    /// Extra information. Meaning depends on the section type.
    pub info: u32,
    /// Alignment.
    pub align: u64,
    /// The size of one entry, for sections that hold a table.
    pub entry_len: u64,
}

impl Section {
    fn read<R: ElfRead>(reader: &mut R, class: Class, byte_order: ByteOrder) -> Result<Self, Error> {
        let name_offset = reader.read_u32(byte_order)?;
        let kind: SectionKind = reader.read_u32(byte_order)?.into();
        let flags = reader.read_word(class, byte_order)?;
        let virtual_address = reader.read_word(class, byte_order)?;
        let offset = reader.read_word(class, byte_order)?;
        let size = reader.read_word(class, byte_order)?;
        let link = reader.read_u32(byte_order)?;
        let info = reader.read_u32(byte_order)?;
        let align = reader.read_word(class, byte_order)?;
        let entry_len = reader.read_word(class, byte_order)?;
        Ok(Self {
            name_offset,
            kind,
            flags: SectionFlags::from_bits_retain(flags),
            virtual_address,
            offset,
            size,
            link,
            info,
            align,
            entry_len,
        })
    }

    /// Read the section's content, decoded as `T`.
    pub fn read_content<R: ElfRead + ElfSeek, T: BlockRead>(
        &self,
        reader: &mut R,
        class: Class,
        byte_order: ByteOrder,
    ) -> Result<T, Error> {
        reader.seek(self.offset)?;
        T::read(reader, class, byte_order, self.size)
    }

    /// In-file location of the section.
    pub const fn file_offset_range(&self) -> Range<u64> {
        if matches!(self.kind, SectionKind::NoBits) {
            return self.offset..self.offset;
        }
        let start = self.offset;
        let end = start + self.size;
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_dynstr_section() {
        // name_offset=1, kind=SHT_STRTAB(3), flags=0x20(STRINGS), vaddr=0,
        // offset=0x200, size=0x40, link=0, info=0, align=1, entsize=0.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&0x20u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&0x200u64.to_le_bytes());
        bytes.extend_from_slice(&0x40u64.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        let mut cursor = std::io::Cursor::new(bytes);
        let section = Section::read(&mut cursor, Class::Elf64, ByteOrder::LittleEndian).unwrap();
        assert_eq!(SectionKind::StringTable, section.kind);
        assert_eq!(0x200..0x240, section.file_offset_range());
    }
}
