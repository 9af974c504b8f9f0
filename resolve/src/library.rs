use std::collections::BTreeSet;
use std::os::unix::ffi::OsStringExt;
use std::path::Path;
use std::path::PathBuf;

use ldshim::DynamicTag;
use ldshim::Elf;

use crate::Error;

/// Which side of the container boundary a [`Library`] was discovered on.
///
/// Immutable after construction: a `Library` read from a host path is always
/// `Host`, one deserialized from the in-container analysis payload is always
/// `Guest`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Origin {
    /// Read from the host filesystem.
    Host,
    /// Reported by the container's analysis step.
    Guest,
}

/// A shared object or executable, plus everything the selector and import
/// planner need to reason about it.
#[derive(Clone, Debug)]
pub struct Library {
    /// Absolute filesystem path the library was read from.
    pub binary_path: PathBuf,
    /// `DT_SONAME`, if present. Absent for most executables.
    pub soname: Option<String>,
    /// `DT_NEEDED` entries, in file order.
    pub needed: Vec<String>,
    /// `DT_RPATH`, colon-joined, as found in the dynamic section.
    pub rpath: Option<String>,
    /// `DT_RUNPATH`, colon-joined, as found in the dynamic section.
    pub runpath: Option<String>,
    /// Symbol-version labels this object defines (`.gnu.version_d`).
    pub defined_versions: BTreeSet<String>,
    /// Symbol-version labels this object requires from its dependencies (`.gnu.version_r`).
    pub required_versions: BTreeSet<String>,
    /// `PT_INTERP`, if present: the absolute path of the dynamic linker this
    /// object was built to run under.
    pub interpreter: Option<PathBuf>,
    /// Host or Guest. Set at construction and never mutated.
    pub origin: Origin,
}

impl Library {
    /// Read a `Library` out of an ELF file on the host filesystem.
    ///
    /// Returns `Ok(None)` for files the ELF reader classifies as `NotElf`;
    /// any other parse failure is a hard error (the spec's `MalformedElf`).
    pub fn read_host(path: &Path) -> Result<Option<Self>, Error> {
        if !ldshim::is_elf(path) {
            return Ok(None);
        }
        let mut file = std::fs::File::open(path).map_err(Error::Io)?;
        let elf = Elf::read(&mut file).map_err(|e| Error::Elf(e, path.to_path_buf()))?;
        let dynstr = elf
            .read_dynamic_string_table(&mut file)
            .map_err(|e| Error::Elf(e, path.to_path_buf()))?;
        let dynamic = elf
            .read_dynamic_table(&mut file)
            .map_err(|e| Error::Elf(e, path.to_path_buf()))?;

        let mut soname = None;
        let mut needed = Vec::new();
        let mut rpath = None;
        let mut runpath = None;
        if let (Some(dynamic), Some(dynstr)) = (dynamic.as_ref(), dynstr.as_ref()) {
            for (tag, value) in dynamic.iter() {
                match *tag {
                    DynamicTag::SharedObjectName => {
                        soname = dynstr
                            .get_string(*value as usize)
                            .and_then(|s| s.to_str().ok())
                            .map(String::from);
                    }
                    DynamicTag::Needed => {
                        if let Some(s) = dynstr
                            .get_string(*value as usize)
                            .and_then(|s| s.to_str().ok())
                        {
                            needed.push(s.to_string());
                        }
                    }
                    DynamicTag::Rpath => {
                        rpath = dynstr
                            .get_string(*value as usize)
                            .and_then(|s| s.to_str().ok())
                            .map(String::from);
                    }
                    DynamicTag::Runpath => {
                        runpath = dynstr
                            .get_string(*value as usize)
                            .and_then(|s| s.to_str().ok())
                            .map(String::from);
                    }
                    _ => {}
                }
            }
        }

        let defined_versions = elf
            .read_version_definitions(&mut file)
            .map_err(|e| Error::Elf(e, path.to_path_buf()))?
            .map(|defs| {
                defs.iter()
                    .flat_map(|def| def.names.iter().copied())
                    .filter_map(|offset| {
                        dynstr
                            .as_ref()
                            .and_then(|t| t.get_string(offset as usize))
                            .and_then(|s| s.to_str().ok())
                            .map(String::from)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let required_versions = elf
            .read_version_needs(&mut file)
            .map_err(|e| Error::Elf(e, path.to_path_buf()))?
            .map(|needs| {
                needs
                    .iter()
                    .flat_map(|need| need.names.iter().copied())
                    .filter_map(|offset| {
                        dynstr
                            .as_ref()
                            .and_then(|t| t.get_string(offset as usize))
                            .and_then(|s| s.to_str().ok())
                            .map(String::from)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let interpreter = elf
            .read_interpreter(&mut file)
            .map_err(|e| Error::Elf(e, path.to_path_buf()))?
            .map(|c_string| {
                PathBuf::from(std::ffi::OsString::from_vec(c_string.into_bytes()))
            });

        Ok(Some(Self {
            binary_path: path.to_path_buf(),
            soname,
            needed,
            rpath,
            runpath,
            defined_versions,
            required_versions,
            interpreter,
            origin: Origin::Host,
        }))
    }

    /// The key used to identify this library within a [`crate::LibrarySet`]:
    /// its SONAME when present, otherwise its binary path.
    pub fn key(&self) -> &str {
        self.soname
            .as_deref()
            .unwrap_or_else(|| self.binary_path.to_str().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_prefers_soname_over_path() {
        let lib = Library {
            binary_path: PathBuf::from("/lib/libfoo.so.1.2.3"),
            soname: Some("libfoo.so.1".to_string()),
            needed: Vec::new(),
            rpath: None,
            runpath: None,
            defined_versions: BTreeSet::new(),
            required_versions: BTreeSet::new(),
            interpreter: None,
            origin: Origin::Host,
        };
        assert_eq!("libfoo.so.1", lib.key());
    }

    #[test]
    fn key_falls_back_to_path_without_soname() {
        let lib = Library {
            binary_path: PathBuf::from("/usr/bin/mpirun"),
            soname: None,
            needed: Vec::new(),
            rpath: None,
            runpath: None,
            defined_versions: BTreeSet::new(),
            required_versions: BTreeSet::new(),
            interpreter: None,
            origin: Origin::Host,
        };
        assert_eq!("/usr/bin/mpirun", lib.key());
    }

    #[test]
    fn read_host_rejects_non_elf() {
        let dir = std::env::temp_dir();
        let path = dir.join("ldshim-resolve-test-not-elf.txt");
        std::fs::write(&path, b"not an elf file").unwrap();
        let result = Library::read_host(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Ok(None)));
    }
}
