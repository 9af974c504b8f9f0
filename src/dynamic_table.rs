use crate::ByteOrder;
use crate::Class;
use crate::DynamicTag;
use crate::ElfRead;
use crate::ElfSeek;
use crate::Error;
use crate::Segment;

/// The dynamic table (`PT_DYNAMIC` / `.dynamic`).
///
/// Holds `NEEDED`, `SONAME`, `RPATH` and `RUNPATH` entries among others.
#[derive(Debug)]
pub struct DynamicTable {
    entries: Vec<(DynamicTag, u64)>,
}

impl DynamicTable {
    /// Read the table out of the dynamic segment's content.
    pub fn read<R: ElfRead + ElfSeek>(
        reader: &mut R,
        segment: &Segment,
        class: Class,
        byte_order: ByteOrder,
    ) -> Result<Self, Error> {
        let content = segment.read_content(reader)?;
        let mut slice = &content[..];
        let word_len = class.word_len();
        let step = 2 * word_len;
        let mut entries = Vec::with_capacity(content.len() / step.max(1));
        while slice.len() >= step {
            let tag: DynamicTag = read_word(&mut slice, class, byte_order)?.try_into()?;
            let value = read_word(&mut slice, class, byte_order)?;
            if tag == DynamicTag::Null {
                break;
            }
            entries.push((tag, value));
        }
        Ok(Self { entries })
    }

    /// Get the value of the first entry with the given `tag`.
    pub fn get(&self, tag: DynamicTag) -> Option<u64> {
        self.entries
            .iter()
            .find_map(|(k, value)| (*k == tag).then_some(*value))
    }

    /// Iterate over every `(tag, value)` pair, in file order.
    pub fn iter(&self) -> impl Iterator<Item = &(DynamicTag, u64)> {
        self.entries.iter()
    }
}

fn read_word(slice: &mut &[u8], class: Class, byte_order: ByteOrder) -> Result<u64, Error> {
    let word_len = class.word_len();
    let (word, rest) = slice
        .split_at_checked(word_len)
        .ok_or(Error::Malformed("truncated dynamic table entry"))?;
    *slice = rest;
    let value = match (class, byte_order) {
        (Class::Elf32, ByteOrder::LittleEndian) => {
            u32::from_le_bytes(word.try_into().unwrap()) as u64
        }
        (Class::Elf32, ByteOrder::BigEndian) => {
            u32::from_be_bytes(word.try_into().unwrap()) as u64
        }
        (Class::Elf64, ByteOrder::LittleEndian) => u64::from_le_bytes(word.try_into().unwrap()),
        (Class::Elf64, ByteOrder::BigEndian) => u64::from_be_bytes(word.try_into().unwrap()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic_segment(content: Vec<u8>) -> (Segment, Vec<u8>) {
        let segment = Segment {
            kind: crate::SegmentKind::Dynamic,
            flags: crate::SegmentFlags::from_bits_retain(6),
            offset: 0,
            virtual_address: 0,
            physical_address: 0,
            file_size: content.len() as u64,
            memory_size: content.len() as u64,
            align: 8,
        };
        (segment, content)
    }

    #[test]
    fn reads_needed_and_soname() {
        let mut content = Vec::new();
        // DT_NEEDED = 1, value = 7
        content.extend_from_slice(&1u64.to_le_bytes());
        content.extend_from_slice(&7u64.to_le_bytes());
        // DT_SONAME = 14, value = 20
        content.extend_from_slice(&14u64.to_le_bytes());
        content.extend_from_slice(&20u64.to_le_bytes());
        // DT_NULL terminator.
        content.extend_from_slice(&0u64.to_le_bytes());
        content.extend_from_slice(&0u64.to_le_bytes());
        let (segment, bytes) = dynamic_segment(content);
        let mut cursor = std::io::Cursor::new(bytes);
        let table =
            DynamicTable::read(&mut cursor, &segment, Class::Elf64, ByteOrder::LittleEndian)
                .unwrap();
        assert_eq!(Some(7), table.get(DynamicTag::Needed));
        assert_eq!(Some(20), table.get(DynamicTag::SharedObjectName));
        assert_eq!(None, table.get(DynamicTag::Rpath));
    }
}
