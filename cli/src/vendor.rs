use std::ffi::OsStr;

use ldshim_resolve::classify_library;
use ldshim_resolve::Library;
use ldshim_resolve::Version;

/// Vendor/version guess for a set of resolved MPI libraries. Purely
/// informational: not persisted, only attached to debug output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileHint {
    pub vendor: String,
    pub version: String,
}

const BANNERS: &[&str] = &["Open MPI", "MPICH", "Intel(R) MPI", "MVAPICH", "Spectrum MPI"];

/// Scan each MPI-classified library's on-disk bytes for one of [`BANNERS`]
/// and extract a trailing version token.
///
/// This is a static-string substitute for the `dlopen`+`MPI_Get_library_version`
/// trick: loading a foreign MPI runtime into this process to ask it its own
/// name is out of scope (non-goal: "interpreting library semantics beyond
/// symbol-version names"). Returns `None` if no library yields a banner, or
/// if libraries disagree on vendor.
pub fn detect_vendor<'a>(libraries: impl IntoIterator<Item = &'a Library>) -> Option<ProfileHint> {
    let mut found: Option<ProfileHint> = None;
    for library in libraries {
        let filename = library
            .binary_path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default();
        if classify_library(library.soname.as_deref(), filename).is_none() {
            continue;
        }
        let Ok(contents) = fs_err::read(&library.binary_path) else {
            continue;
        };
        let text = String::from_utf8_lossy(&contents);
        let Some(hint) = scan(&text) else {
            continue;
        };
        match &found {
            None => found = Some(hint),
            Some(existing) if existing.vendor != hint.vendor => return None,
            Some(_) => {}
        }
    }
    found
}

fn scan(text: &str) -> Option<ProfileHint> {
    for banner in BANNERS {
        if let Some(pos) = text.find(banner) {
            let version = Version::parse(&text[pos..]).to_string();
            return Some(ProfileHint {
                vendor: (*banner).to_string(),
                version,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_extracts_banner_and_trailing_version() {
        let hint = scan("noise MPICH Version: 4.1.2 more noise").unwrap();
        assert_eq!("MPICH", hint.vendor);
        assert_eq!("4.1.2", hint.version);
    }

    #[test]
    fn scan_returns_none_without_a_known_banner() {
        assert!(scan("nothing interesting here").is_none());
    }
}
