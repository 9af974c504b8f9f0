use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Library;
use crate::LibrarySet;
use crate::Origin;
use crate::Version;

/// One entry of the `libraries` array in the analysis JSON document (§6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireLibrary {
    pub soname: Option<String>,
    pub binary_path: PathBuf,
    pub needed: Vec<String>,
    pub rpath: Option<String>,
    pub runpath: Option<String>,
    pub defined_versions: BTreeSet<String>,
    pub required_versions: BTreeSet<String>,
}

impl From<&Library> for WireLibrary {
    fn from(library: &Library) -> Self {
        Self {
            soname: library.soname.clone(),
            binary_path: library.binary_path.clone(),
            needed: library.needed.clone(),
            rpath: library.rpath.clone(),
            runpath: library.runpath.clone(),
            defined_versions: library.defined_versions.clone(),
            required_versions: library.required_versions.clone(),
        }
    }
}

impl WireLibrary {
    /// Tag this entry as `Guest` and turn it into a [`Library`].
    ///
    /// PT_INTERP isn't carried over the wire: the guest's analysis step runs
    /// inside a container whose own interpreter is irrelevant to the
    /// selector, which only ever asks `linkers()` about the host-seeded set.
    pub fn into_guest_library(self) -> Library {
        Library {
            binary_path: self.binary_path,
            soname: self.soname,
            needed: self.needed,
            rpath: self.rpath,
            runpath: self.runpath,
            defined_versions: self.defined_versions,
            required_versions: self.required_versions,
            interpreter: None,
            origin: Origin::Guest,
        }
    }
}

/// The JSON document the in-container analysis subcommand writes to its
/// inherited pipe (§6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub libc_version: String,
    pub libraries: Vec<WireLibrary>,
}

impl AnalysisPayload {
    /// Build the payload an analysis subcommand would emit for `set`.
    pub fn from_library_set(set: &LibrarySet, libc_version: &Version) -> Self {
        Self {
            libc_version: libc_version.to_string(),
            libraries: set.iter().map(WireLibrary::from).collect(),
        }
    }

    /// Parse a document read from the analysis pipe.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Serialize for writing to the analysis pipe.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// The guest C-runtime version.
    pub fn libc_version(&self) -> Version {
        Version::parse(&self.libc_version)
    }

    /// Every library in this payload, tagged `Guest`.
    pub fn into_library_set(self) -> LibrarySet {
        let mut set = LibrarySet::new();
        for library in self.libraries {
            set.insert(library.into_guest_library());
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let payload = AnalysisPayload {
            libc_version: "2.31".to_string(),
            libraries: vec![WireLibrary {
                soname: Some("libmpi.so.12".to_string()),
                binary_path: PathBuf::from("/opt/mpi/lib/libmpi.so.12"),
                needed: vec!["libc.so.6".to_string()],
                rpath: None,
                runpath: Some("/opt/mpi/lib".to_string()),
                defined_versions: BTreeSet::from(["MPI_1.0".to_string()]),
                required_versions: BTreeSet::from(["GLIBC_2.17".to_string()]),
            }],
        };
        let bytes = payload.to_json().unwrap();
        let parsed = AnalysisPayload::from_json(&bytes).unwrap();
        assert_eq!(payload.libc_version, parsed.libc_version);
        assert_eq!(payload.libraries[0].soname, parsed.libraries[0].soname);
        assert_eq!(payload.libraries[0].needed, parsed.libraries[0].needed);
    }

    #[test]
    fn deserialized_entries_are_tagged_guest() {
        let wire = WireLibrary {
            soname: Some("libmpi.so.12".to_string()),
            binary_path: PathBuf::from("/lib/libmpi.so.12"),
            needed: Vec::new(),
            rpath: None,
            runpath: None,
            defined_versions: BTreeSet::new(),
            required_versions: BTreeSet::new(),
        };
        let library = wire.into_guest_library();
        assert_eq!(Origin::Guest, library.origin);
    }

    #[test]
    fn libc_version_is_parsed() {
        let payload = AnalysisPayload {
            libc_version: "2.34".to_string(),
            libraries: Vec::new(),
        };
        assert_eq!(Some(2), payload.libc_version().major());
        assert_eq!(Some(34), payload.libc_version().minor());
    }
}
