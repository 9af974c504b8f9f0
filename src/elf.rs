use std::ffi::CStr;
use std::ffi::CString;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::constants::*;
use crate::DynamicTable;
use crate::ElfRead;
use crate::ElfSeek;
use crate::Error;
use crate::Header;
use crate::ProgramHeader;
use crate::SectionHeader;
use crate::SectionKind;
use crate::SegmentKind;
use crate::StringTable;
use crate::VersionDefinitions;
use crate::VersionNeeds;

/// A parsed ELF file: header plus the segment and section tables.
///
/// Actual section/segment contents (strings, the dynamic table, symbol
/// version tables) are read on demand via the `read_*` methods, since most
/// callers only need a handful of them per file.
#[derive(Debug)]
pub struct Elf {
    /// File header.
    pub header: Header,
    /// Program header (the segment list).
    pub segments: ProgramHeader,
    /// Section header (the section list).
    pub sections: SectionHeader,
}

impl Elf {
    /// Read the header, segments and sections from `reader`.
    pub fn read<R: ElfRead + ElfSeek>(reader: &mut R) -> Result<Self, Error> {
        reader.seek(0)?;
        let header = Header::read(reader)?;
        reader.seek(header.program_header_offset)?;
        let segments = ProgramHeader::read(
            reader,
            header.class,
            header.byte_order,
            header.program_header_len(),
        )?;
        reader.seek(header.section_header_offset)?;
        let sections = SectionHeader::read(
            reader,
            header.class,
            header.byte_order,
            header.section_header_len(),
        )?;
        Ok(Self {
            header,
            segments,
            sections,
        })
    }

    /// Open `path` and read its ELF structure.
    pub fn read_path(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read(&mut reader)
    }

    /// Read the string table containing section names (`.shstrtab`).
    pub fn read_section_names<F: ElfRead + ElfSeek>(
        &self,
        file: &mut F,
    ) -> Result<Option<StringTable>, Error> {
        let Some(section) = self.sections.get(self.header.section_names_index as usize) else {
            return Ok(None);
        };
        Ok(Some(section.read_content(
            file,
            self.header.class,
            self.header.byte_order,
        )?))
    }

    /// Read the dynamic table out of the `PT_DYNAMIC` segment.
    pub fn read_dynamic_table<F: ElfRead + ElfSeek>(
        &self,
        file: &mut F,
    ) -> Result<Option<DynamicTable>, Error> {
        let Some(segment) = self
            .segments
            .iter()
            .find(|segment| segment.kind == SegmentKind::Dynamic)
        else {
            return Ok(None);
        };
        let table = DynamicTable::read(file, segment, self.header.class, self.header.byte_order)?;
        Ok(Some(table))
    }

    /// Read the dynamic string table (`.dynstr`).
    pub fn read_dynamic_string_table<F: ElfRead + ElfSeek>(
        &self,
        file: &mut F,
    ) -> Result<Option<StringTable>, Error> {
        self.read_section_by_name(DYNSTR_SECTION, file)
    }

    /// Read the interpreter path out of `.interp` / `PT_INTERP`.
    pub fn read_interpreter<F: ElfRead + ElfSeek>(&self, file: &mut F) -> Result<Option<CString>, Error> {
        let Some(segment) = self
            .segments
            .iter()
            .find(|segment| segment.kind == SegmentKind::Interpreter)
        else {
            return Ok(None);
        };
        let mut bytes = segment.read_content(file)?;
        if bytes.last() != Some(&0) {
            bytes.push(0);
        }
        Ok(Some(
            CString::from_vec_with_nul(bytes).map_err(|_| Error::Malformed("PT_INTERP"))?,
        ))
    }

    /// Read `.gnu.version_d` (the versions this shared object defines).
    pub fn read_version_definitions<F: ElfRead + ElfSeek>(
        &self,
        file: &mut F,
    ) -> Result<Option<VersionDefinitions>, Error> {
        let Some(section) = self.sections.find_by_kind(SectionKind::Other(0x6fff_fffd)) else {
            return Ok(None);
        };
        Ok(Some(section.read_content(
            file,
            self.header.class,
            self.header.byte_order,
        )?))
    }

    /// Read `.gnu.version_r` (the versions this shared object requires from its NEEDED entries).
    pub fn read_version_needs<F: ElfRead + ElfSeek>(
        &self,
        file: &mut F,
    ) -> Result<Option<VersionNeeds>, Error> {
        let Some(section) = self.sections.find_by_kind(SectionKind::Other(0x6fff_fffe)) else {
            return Ok(None);
        };
        Ok(Some(section.read_content(
            file,
            self.header.class,
            self.header.byte_order,
        )?))
    }

    fn read_section_by_name<F: ElfRead + ElfSeek>(
        &self,
        name: &CStr,
        file: &mut F,
    ) -> Result<Option<StringTable>, Error> {
        let Some(names) = self.read_section_names(file)? else {
            return Ok(None);
        };
        let Some(section) = self.sections.find_by_name(&names, name) else {
            return Ok(None);
        };
        Ok(Some(section.read_content(
            file,
            self.header.class,
            self.header.byte_order,
        )?))
    }
}

/// Quick best-effort check for whether `path` names an ELF file.
///
/// Returns `false` on any I/O error or malformed/missing magic, never errors:
/// this mirrors how bulk host-library discovery filters out non-ELF files.
pub fn is_elf(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut magic = [0_u8; MAGIC.len()];
    use std::io::Read;
    file.read_exact(&mut magic).is_ok() && magic == MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_elf_rejects_missing_file() {
        assert!(!is_elf(Path::new("/nonexistent/path/to/nothing")));
    }
}
