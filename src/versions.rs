use crate::BlockRead;
use crate::ByteOrder;
use crate::Class;
use crate::ElfRead;
use crate::Error;

/// One entry of `.gnu.version_d`: a version this shared object defines.
///
/// `names[0]` is the defined version's own name (e.g. `GLIBC_2.34`);
/// `names[1..]` are the versions it inherits from (`vd_cnt > 1`, rare).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionDefinition {
    /// `VER_FLG_*` flags, notably `VER_FLG_BASE` for the file's own soname entry.
    pub flags: u16,
    /// The version index referenced from symbol version tables.
    pub index: u16,
    /// String table offsets of the names carried by this definition.
    pub names: Vec<u32>,
}

/// Parsed `.gnu.version_d` section: every version this shared object defines.
#[derive(Debug)]
pub struct VersionDefinitions {
    entries: Vec<VersionDefinition>,
}

impl VersionDefinitions {
    /// Iterate over the definitions, in file order.
    pub fn iter(&self) -> impl Iterator<Item = &VersionDefinition> {
        self.entries.iter()
    }
}

impl BlockRead for VersionDefinitions {
    fn read<R: ElfRead>(
        reader: &mut R,
        class: Class,
        byte_order: ByteOrder,
        len: u64,
    ) -> Result<Self, Error> {
        let bytes = <Vec<u8> as BlockRead>::read(reader, class, byte_order, len)?;
        let mut entries = Vec::new();
        let mut offset = 0_usize;
        loop {
            let flags = read_u16(&bytes, offset + 2, byte_order)?;
            let index = read_u16(&bytes, offset + 4, byte_order)?;
            let aux_count = read_u16(&bytes, offset + 6, byte_order)?;
            let aux_offset = read_u32(&bytes, offset + 12, byte_order)? as usize;
            let next = read_u32(&bytes, offset + 16, byte_order)?;

            let mut names = Vec::with_capacity(aux_count as usize);
            let mut aux_pos = offset + aux_offset;
            for _ in 0..aux_count {
                names.push(read_u32(&bytes, aux_pos, byte_order)?);
                let aux_next = read_u32(&bytes, aux_pos + 4, byte_order)?;
                if aux_next == 0 {
                    break;
                }
                aux_pos += aux_next as usize;
            }
            entries.push(VersionDefinition {
                flags,
                index,
                names,
            });
            if next == 0 {
                break;
            }
            offset += next as usize;
        }
        Ok(Self { entries })
    }
}

/// One entry of `.gnu.version_r`: the versions required from a single `NEEDED` library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionNeed {
    /// String table offset of the needed library's filename (its `SONAME`).
    pub file: u32,
    /// String table offsets of the specific versions required from that library.
    pub names: Vec<u32>,
}

/// Parsed `.gnu.version_r` section: per-NEEDED-library version requirements.
#[derive(Debug)]
pub struct VersionNeeds {
    entries: Vec<VersionNeed>,
}

impl VersionNeeds {
    /// Iterate over the requirements, in file order.
    pub fn iter(&self) -> impl Iterator<Item = &VersionNeed> {
        self.entries.iter()
    }
}

impl BlockRead for VersionNeeds {
    fn read<R: ElfRead>(
        reader: &mut R,
        class: Class,
        byte_order: ByteOrder,
        len: u64,
    ) -> Result<Self, Error> {
        let bytes = <Vec<u8> as BlockRead>::read(reader, class, byte_order, len)?;
        let mut entries = Vec::new();
        let mut offset = 0_usize;
        loop {
            let file = read_u32(&bytes, offset + 4, byte_order)?;
            let aux_count = read_u16(&bytes, offset + 2, byte_order)?;
            let aux_offset = read_u32(&bytes, offset + 8, byte_order)? as usize;
            let next = read_u32(&bytes, offset + 12, byte_order)?;

            let mut names = Vec::with_capacity(aux_count as usize);
            let mut aux_pos = offset + aux_offset;
            for _ in 0..aux_count {
                names.push(read_u32(&bytes, aux_pos + 8, byte_order)?);
                let aux_next = read_u32(&bytes, aux_pos + 12, byte_order)?;
                if aux_next == 0 {
                    break;
                }
                aux_pos += aux_next as usize;
            }
            entries.push(VersionNeed { file, names });
            if next == 0 {
                break;
            }
            offset += next as usize;
        }
        Ok(Self { entries })
    }
}

fn read_u16(bytes: &[u8], offset: usize, byte_order: ByteOrder) -> Result<u16, Error> {
    let slice = bytes
        .get(offset..offset + 2)
        .ok_or(Error::Malformed("truncated version record"))?;
    let array: [u8; 2] = slice.try_into().unwrap();
    Ok(match byte_order {
        ByteOrder::LittleEndian => u16::from_le_bytes(array),
        ByteOrder::BigEndian => u16::from_be_bytes(array),
    })
}

fn read_u32(bytes: &[u8], offset: usize, byte_order: ByteOrder) -> Result<u32, Error> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or(Error::Malformed("truncated version record"))?;
    let array: [u8; 4] = slice.try_into().unwrap();
    Ok(match byte_order {
        ByteOrder::LittleEndian => u32::from_le_bytes(array),
        ByteOrder::BigEndian => u32::from_be_bytes(array),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_single_version_definition() {
        // One Verdef (20 bytes) + one Verdaux (8 bytes): GLIBC_2.34 at index 2.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_le_bytes()); // vd_version
        bytes.extend_from_slice(&1u16.to_le_bytes()); // vd_flags = VER_FLG_BASE
        bytes.extend_from_slice(&2u16.to_le_bytes()); // vd_ndx
        bytes.extend_from_slice(&1u16.to_le_bytes()); // vd_cnt
        bytes.extend_from_slice(&0u32.to_le_bytes()); // vd_hash
        bytes.extend_from_slice(&20u32.to_le_bytes()); // vd_aux (relative)
        bytes.extend_from_slice(&0u32.to_le_bytes()); // vd_next (last entry)
        bytes.extend_from_slice(&123u32.to_le_bytes()); // vda_name
        bytes.extend_from_slice(&0u32.to_le_bytes()); // vda_next

        let mut cursor = Cursor::new(bytes.clone());
        let defs = VersionDefinitions::read(
            &mut cursor,
            Class::Elf64,
            ByteOrder::LittleEndian,
            bytes.len() as u64,
        )
        .unwrap();
        let entries: Vec<_> = defs.iter().collect();
        assert_eq!(1, entries.len());
        assert_eq!(2, entries[0].index);
        assert_eq!(vec![123], entries[0].names);
    }

    #[test]
    fn reads_single_version_need() {
        // One Verneed (16 bytes) + one Vernaux (16 bytes): one required version
        // from libc.so.6.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_le_bytes()); // vn_version
        bytes.extend_from_slice(&1u16.to_le_bytes()); // vn_cnt
        bytes.extend_from_slice(&456u32.to_le_bytes()); // vn_file (libc.so.6)
        bytes.extend_from_slice(&16u32.to_le_bytes()); // vn_aux (relative)
        bytes.extend_from_slice(&0u32.to_le_bytes()); // vn_next (last entry)
        bytes.extend_from_slice(&0u32.to_le_bytes()); // vna_hash
        bytes.extend_from_slice(&0u16.to_le_bytes()); // vna_flags
        bytes.extend_from_slice(&0u16.to_le_bytes()); // vna_other
        bytes.extend_from_slice(&789u32.to_le_bytes()); // vna_name (GLIBC_2.34)
        bytes.extend_from_slice(&0u32.to_le_bytes()); // vna_next

        let mut cursor = Cursor::new(bytes.clone());
        let needs = VersionNeeds::read(
            &mut cursor,
            Class::Elf64,
            ByteOrder::LittleEndian,
            bytes.len() as u64,
        )
        .unwrap();
        let entries: Vec<_> = needs.iter().collect();
        assert_eq!(1, entries.len());
        assert_eq!(456, entries[0].file);
        assert_eq!(vec![789], entries[0].names);
    }
}
