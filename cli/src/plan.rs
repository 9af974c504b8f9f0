use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;

use regex::Regex;

use ldshim_resolve::classify;
use ldshim_resolve::classify_library;
use ldshim_resolve::Family;
use ldshim_resolve::Library;

/// Locate every symbolic link in `library`'s directory whose realpath
/// equals its realpath, so whatever spelling the guest resolver asks for is
/// satisfied (spec §4.6's "symlink fan-out").
///
/// Handles both the classical `libfoo.so -> libfoo.so.N.M` chain and the
/// `libc-2.XX.so <-> libc.so.6` special case, where the on-disk filename
/// does not share a prefix with the SONAME.
pub fn library_links(library: &Library) -> BTreeSet<PathBuf> {
    let path = &library.binary_path;
    let Some(filename) = path.file_name().and_then(OsStr::to_str) else {
        return BTreeSet::from([path.clone()]);
    };
    if !filename.contains(".so") {
        return BTreeSet::from([path.clone()]);
    }
    let Ok(real) = path.canonicalize() else {
        return BTreeSet::from([path.clone()]);
    };
    let Some(dir) = real.parent() else {
        return BTreeSet::from([path.clone()]);
    };

    let mut cleared = BTreeSet::new();
    let prefix = filename.split(".so").next().unwrap_or(filename);
    glob_links(dir, prefix, &real, &mut cleared);
    if let Some(glib_prefix) = versioned_glib_prefix(prefix) {
        glob_links(dir, &glib_prefix, &real, &mut cleared);
    }
    if cleared.is_empty() {
        cleared.insert(path.clone());
    }
    cleared
}

fn glob_links(dir: &Path, prefix: &str, real: &Path, cleared: &mut BTreeSet<PathBuf>) {
    let pattern = format!("{}/{}.so*", dir.display(), prefix);
    let Ok(entries) = glob::glob(&pattern) else {
        return;
    };
    for entry in entries.flatten() {
        if entry.canonicalize().as_deref().ok() == Some(real) {
            cleared.insert(entry);
        }
    }
}

/// `libc-2.34` (a versioned glibc implementation filename) maps back to the
/// bare `libc` prefix so its `libc.so.6`-style links are also picked up.
fn versioned_glib_prefix(prefix: &str) -> Option<String> {
    let re = Regex::new(r"^(lib[a-z]+)-2\.[0-9]+$").expect("valid regex");
    re.captures(prefix)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Conservative MPICH-family SONAME aliasing (spec §4.6): for each library
/// classified into an MPI family, bind it under every guest SONAME in the
/// same family present in the container's cache.
///
/// Returns `(host_source, guest_soname)` pairs; the caller binds each under
/// `IMPORT_LIBRARY_DIR/guest_soname`.
pub fn alias_mpi_families<'a>(
    libraries: impl IntoIterator<Item = &'a Library>,
    guest_cache: &BTreeMap<String, PathBuf>,
) -> Vec<(PathBuf, String)> {
    let mut by_mpi = Vec::new();
    let mut by_fort = Vec::new();
    let mut by_cxx = Vec::new();
    for soname in guest_cache.keys() {
        match classify(soname) {
            Some(Family::Mpi) => by_mpi.push(soname.as_str()),
            Some(Family::MpiFort) => by_fort.push(soname.as_str()),
            Some(Family::MpiCxx) => by_cxx.push(soname.as_str()),
            None => {}
        }
    }

    let mut aliases = Vec::new();
    for library in libraries {
        let filename = library
            .binary_path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default();
        let family = classify_library(library.soname.as_deref(), filename);
        let guest_sonames: &[&str] = match family {
            Some(Family::Mpi) => &by_mpi,
            Some(Family::MpiFort) => &by_fort,
            Some(Family::MpiCxx) => &by_cxx,
            None => continue,
        };
        for &guest_soname in guest_sonames {
            aliases.push((library.binary_path.clone(), guest_soname.to_string()));
        }
    }
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldshim_resolve::Origin;
    use std::collections::BTreeSet as Set;

    fn lib(soname: &str, path: &str) -> Library {
        Library {
            binary_path: PathBuf::from(path),
            soname: Some(soname.to_string()),
            needed: Vec::new(),
            rpath: None,
            runpath: None,
            defined_versions: Set::new(),
            required_versions: Set::new(),
            interpreter: None,
            origin: Origin::Host,
        }
    }

    #[test]
    fn versioned_glib_prefix_matches_libc_dash_version() {
        assert_eq!(Some("libc".to_string()), versioned_glib_prefix("libc-2.34"));
        assert_eq!(None, versioned_glib_prefix("libmpi"));
    }

    #[test]
    fn alias_mpi_families_matches_same_family_only() {
        let library = lib("libmpi.so.12", "/opt/mpich/lib/libmpi.so.12.1.1");
        let mut cache = BTreeMap::new();
        cache.insert("libmpich.so.12".to_string(), PathBuf::from("/usr/lib/libmpich.so.12"));
        cache.insert("libmpichcxx.so.12".to_string(), PathBuf::from("/usr/lib/libmpichcxx.so.12"));
        let aliases = alias_mpi_families(std::iter::once(&library), &cache);
        assert_eq!(1, aliases.len());
        assert_eq!("libmpich.so.12", aliases[0].1);
    }

    #[test]
    fn alias_mpi_families_skips_open_mpi() {
        let library = lib("libmpi.so.40", "/opt/openmpi/lib/libmpi.so.40");
        let mut cache = BTreeMap::new();
        cache.insert("libmpich.so.12".to_string(), PathBuf::from("/usr/lib/libmpich.so.12"));
        let aliases = alias_mpi_families(std::iter::once(&library), &cache);
        assert!(aliases.is_empty());
    }

    #[test]
    fn library_links_falls_back_to_bare_path_without_so_in_name() {
        let library = lib("", "/usr/bin/mpirun");
        let mut library = library;
        library.soname = None;
        let links = library_links(&library);
        assert_eq!(Set::from([PathBuf::from("/usr/bin/mpirun")]), links);
    }
}
