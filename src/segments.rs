use std::ops::Deref;
use std::ops::Range;

use crate::ByteOrder;
use crate::Class;
use crate::ElfRead;
use crate::ElfSeek;
use crate::EntityRead;
use crate::Error;

/// Segments (the program header table).
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct ProgramHeader {
    entries: Vec<Segment>,
}

impl ProgramHeader {
    /// Read the table from the `reader`.
    pub fn read<R: ElfRead>(
        reader: &mut R,
        class: Class,
        byte_order: ByteOrder,
        len: u64,
    ) -> Result<Self, Error> {
        let num_segments = len / class.segment_len() as u64;
        let mut entries = Vec::with_capacity(num_segments as usize);
        for _ in 0..num_segments {
            let entry = Segment::read(reader, class, byte_order)?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }
}

impl Deref for ProgramHeader {
    type Target = Vec<Segment>;
    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

/// A segment.
///
/// Dynamic loaders map segments into the virtual address space of a program.
/// Of these, [`SegmentKind::Dynamic`](crate::SegmentKind::Dynamic) and
/// [`SegmentKind::Interpreter`](crate::SegmentKind::Interpreter) carry the
/// data this crate cares about.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Segment {
    /// Segment type.
    pub kind: crate::SegmentKind,
    /// Flags.
    pub flags: crate::SegmentFlags,
    /// In-file offset.
    pub offset: u64,
    /// Virtual address (in-memory offset).
    pub virtual_address: u64,
    /// Physical address (in-memory offset).
    pub physical_address: u64,
    /// In-file size.
    pub file_size: u64,
    /// In-memory size.
    pub memory_size: u64,
    /// Alignment.
    pub align: u64,
}

impl EntityRead for Segment {
    fn read<R: ElfRead>(reader: &mut R, class: Class, byte_order: ByteOrder) -> Result<Self, Error> {
        let kind: crate::SegmentKind = reader.read_u32(byte_order)?.into();
        let mut flags = 0;
        if class == Class::Elf64 {
            flags = reader.read_u32(byte_order)?;
        }
        let offset = reader.read_word(class, byte_order)?;
        let virtual_address = reader.read_word(class, byte_order)?;
        let physical_address = reader.read_word(class, byte_order)?;
        let file_size = reader.read_word(class, byte_order)?;
        let memory_size = reader.read_word(class, byte_order)?;
        if class == Class::Elf32 {
            flags = reader.read_u32(byte_order)?;
        }
        let align = reader.read_word(class, byte_order)?;
        Ok(Self {
            kind,
            flags: crate::SegmentFlags::from_bits_retain(flags),
            offset,
            virtual_address,
            physical_address,
            file_size,
            memory_size,
            align,
        })
    }
}

impl Segment {
    /// Read the segment's own content (the bytes it covers in the file).
    pub fn read_content<R: ElfRead + ElfSeek>(&self, reader: &mut R) -> Result<Vec<u8>, Error> {
        reader.seek(self.offset)?;
        let n: usize = self
            .file_size
            .try_into()
            .map_err(|_| Error::TooBig("in-file size"))?;
        let mut buf = vec![0_u8; n];
        reader.read_bytes(&mut buf[..])?;
        Ok(buf)
    }

    /// In-file location of the segment.
    pub const fn file_offset_range(&self) -> Range<u64> {
        let start = self.offset;
        let end = start + self.file_size;
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_dynamic_segment() {
        // kind=PT_DYNAMIC(2), flags=6(RW), offset=0x100, vaddr=0x100,
        // paddr=0x100, filesz=0x50, memsz=0x50, align=8 (Elf64, LE).
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&6u32.to_le_bytes());
        bytes.extend_from_slice(&0x100u64.to_le_bytes());
        bytes.extend_from_slice(&0x100u64.to_le_bytes());
        bytes.extend_from_slice(&0x100u64.to_le_bytes());
        bytes.extend_from_slice(&0x50u64.to_le_bytes());
        bytes.extend_from_slice(&0x50u64.to_le_bytes());
        bytes.extend_from_slice(&8u64.to_le_bytes());
        let mut cursor = std::io::Cursor::new(bytes);
        let segment = Segment::read(&mut cursor, Class::Elf64, ByteOrder::LittleEndian).unwrap();
        assert_eq!(crate::SegmentKind::Dynamic, segment.kind);
        assert_eq!(0x100..0x150, segment.file_offset_range());
    }
}
