use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;

use log::debug;
use log::trace;

use crate::Error;
use crate::Library;
use crate::Origin;
use crate::Version;

/// SONAMEs belonging to glibc's C-runtime family.
///
/// Used by [`LibrarySet::glib`] and by overlay seeding. A library is glib iff
/// its SONAME is in this list OR it is a dynamic linker (see
/// [`LibrarySet::linkers`]).
pub const GLIB_SONAMES: &[&str] = &[
    "libc.so.6",
    "libdl.so.2",
    "libcrypt.so.1",
    "libm.so.6",
    "libmvec.so.1",
    "libnsl.so.1",
    "libnss_compat.so.2",
    "libnss_db.so.2",
    "libnss_dns.so.2",
    "libnss_files.so.2",
    "libnss_hesiod.so.2",
    "libpthread.so.0",
    "libresolv.so.2",
    "librt.so.1",
];

/// A set of [`Library`] keyed by `(origin, soname-or-path)`.
///
/// SONAME collisions within the same origin are resolved last-write-wins:
/// [`LibrarySet::insert`] replaces the previous member and logs at debug
/// level, matching the bind-directive override rule the rest of the system
/// follows.
#[derive(Debug, Default)]
pub struct LibrarySet {
    members: BTreeMap<(Origin, String), Library>,
}

impl LibrarySet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `library`, superseding any existing member with the same
    /// `(origin, key)`.
    pub fn insert(&mut self, library: Library) {
        let key = (library.origin, library.key().to_string());
        if self.members.contains_key(&key) {
            debug!("library set: overriding existing member {:?}", key);
        }
        self.members.insert(key, library);
    }

    /// `true` iff a member with this origin and key is already present.
    pub fn contains(&self, origin: Origin, key: &str) -> bool {
        self.members.contains_key(&(origin, key.to_string()))
    }

    /// Iterate over every member.
    pub fn iter(&self) -> impl Iterator<Item = &Library> {
        self.members.values()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` iff the set has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Look a member up by SONAME, among either origin.
    pub fn get_by_soname(&self, soname: &str) -> Option<&Library> {
        self.iter().find(|lib| lib.soname.as_deref() == Some(soname))
    }

    /// Seed a set from host filesystem paths and complete the transitive
    /// closure of `DT_NEEDED` over `resolve`.
    ///
    /// `resolve` is expected to be [`crate::linker::resolve`] or an
    /// equivalent; it is passed in rather than called directly so tests can
    /// supply a fake search order.
    pub fn create_from<F>(paths: &[impl AsRef<Path>], mut resolve: F) -> Result<Self, Error>
    where
        F: FnMut(&str, Option<&str>, Option<&str>, Option<&Path>) -> Option<std::path::PathBuf>,
    {
        let mut set = Self::new();
        let mut queue: Vec<std::path::PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        let mut seen_paths: BTreeSet<std::path::PathBuf> = BTreeSet::new();
        while let Some(path) = queue.pop() {
            if !seen_paths.insert(path.clone()) {
                continue;
            }
            let Some(library) = Library::read_host(&path)? else {
                continue;
            };
            let rpath = library.rpath.clone();
            let runpath = library.runpath.clone();
            let needed = library.needed.clone();
            let interpreter = library.interpreter.clone();
            let key = library.key().to_string();
            let dependent_dir = library.binary_path.parent().map(Path::to_path_buf);
            if set.contains(Origin::Host, &key) {
                continue;
            }
            set.insert(library);
            for soname in needed {
                if set.contains(Origin::Host, &soname) {
                    continue;
                }
                match resolve(&soname, rpath.as_deref(), runpath.as_deref(), dependent_dir.as_deref()) {
                    Some(found) => queue.push(found),
                    None => trace!("could not resolve {:?}, recording as missing", soname),
                }
            }
            // PT_INTERP is an absolute path resolved directly by the kernel,
            // not searched via the dynamic linker's own rules.
            if let Some(interpreter) = interpreter {
                queue.push(interpreter);
            }
        }
        Ok(set)
    }

    /// SONAMEs present in the set (members without a SONAME are excluded).
    pub fn sonames(&self) -> BTreeSet<&str> {
        self.iter().filter_map(|lib| lib.soname.as_deref()).collect()
    }

    /// SONAMEs referenced in some member's `needed` but satisfied by no
    /// member's `soname`.
    pub fn missing_libraries(&self) -> BTreeSet<&str> {
        let present = self.sonames();
        self.iter()
            .flat_map(|lib| lib.needed.iter())
            .map(String::as_str)
            .filter(|n| !present.contains(n))
            .collect()
    }

    /// Members whose SONAME does not appear in any other member's `needed`.
    pub fn top_level(&self) -> Vec<&Library> {
        let referenced: BTreeSet<&str> = self
            .iter()
            .flat_map(|lib| lib.needed.iter())
            .map(String::as_str)
            .collect();
        self.iter()
            .filter(|lib| match lib.soname.as_deref() {
                Some(soname) => !referenced.contains(soname),
                None => true,
            })
            .collect()
    }

    /// Members whose SONAME is in [`GLIB_SONAMES`] or who are a dynamic
    /// linker (see [`LibrarySet::linkers`]).
    pub fn glib(&self) -> Vec<&Library> {
        let linker_paths: BTreeSet<&Path> =
            self.linkers().into_iter().map(|lib| lib.binary_path.as_path()).collect();
        self.iter()
            .filter(|lib| {
                lib.soname.as_deref().is_some_and(|s| GLIB_SONAMES.contains(&s))
                    || linker_paths.contains(lib.binary_path.as_path())
            })
            .collect()
    }

    /// Members whose SONAME matches `ld-*.so*`, plus any member whose
    /// `binary_path` is recorded as some other member's `PT_INTERP`.
    pub fn linkers(&self) -> Vec<&Library> {
        let interpreters: BTreeSet<&Path> = self
            .iter()
            .filter_map(|lib| lib.interpreter.as_deref())
            .collect();
        self.iter()
            .filter(|lib| {
                lib.soname
                    .as_deref()
                    .is_some_and(|s| s.starts_with("ld-") && s.contains(".so"))
                    || interpreters.contains(lib.binary_path.as_path())
            })
            .collect()
    }

    /// Concatenation of every member's `rpath`, in iteration order.
    pub fn rpath(&self) -> Vec<&str> {
        self.iter().filter_map(|lib| lib.rpath.as_deref()).collect()
    }

    /// Concatenation of every member's `runpath`, in iteration order.
    pub fn runpath(&self) -> Vec<&str> {
        self.iter().filter_map(|lib| lib.runpath.as_deref()).collect()
    }

    /// Union of `self` and `other`, preserving origin tags. Where both sets
    /// have a member with the same `(origin, key)`, `other`'s wins.
    pub fn union(mut self, other: Self) -> Self {
        for (_, library) in other.members {
            self.insert(library);
        }
        self
    }

    /// `self` minus every member of `other` sharing the same `(origin, key)`.
    pub fn difference(mut self, other: &Self) -> Self {
        self.members
            .retain(|key, _| !other.members.contains_key(key));
        self
    }

    /// The C-runtime version: the greatest `major=2` symbol-version label
    /// `libc.so.6` defines, per spec.md §4.4.
    pub fn libc_version(&self) -> Option<Version> {
        let libc = self.get_by_soname("libc.so.6")?;
        libc.defined_versions
            .iter()
            .map(|label| Version::parse(label))
            .filter(|v| v.major() == Some(2))
            .max()
    }

    /// Human-readable resolution of each NEEDED edge, in the style of `ldd`.
    ///
    /// Not part of the core contract; intended for diagnostics only.
    pub fn ldd_format(&self) -> String {
        let mut out = String::new();
        for lib in self.iter() {
            for needed in &lib.needed {
                match self.get_by_soname(needed) {
                    Some(found) => {
                        out.push_str(&format!("\t{} => {}\n", needed, found.binary_path.display()))
                    }
                    None => out.push_str(&format!("\t{} => not found\n", needed)),
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn lib(soname: &str, needed: &[&str], origin: Origin) -> Library {
        Library {
            binary_path: PathBuf::from(format!("/lib/{soname}")),
            soname: Some(soname.to_string()),
            needed: needed.iter().map(|s| s.to_string()).collect(),
            rpath: None,
            runpath: None,
            defined_versions: Default::default(),
            required_versions: Default::default(),
            interpreter: None,
            origin,
        }
    }

    #[test]
    fn top_level_excludes_transitive_dependencies() {
        let mut set = LibrarySet::new();
        set.insert(lib("libmpi.so.12", &["libc.so.6"], Origin::Host));
        set.insert(lib("libc.so.6", &[], Origin::Host));
        let top = set.top_level();
        assert_eq!(1, top.len());
        assert_eq!(Some("libmpi.so.12"), top[0].soname.as_deref());
    }

    #[test]
    fn missing_libraries_tracks_unsatisfied_needed() {
        let mut set = LibrarySet::new();
        set.insert(lib("libmpi.so.12", &["libc.so.6"], Origin::Host));
        assert_eq!(BTreeSet::from(["libc.so.6"]), set.missing_libraries());
    }

    #[test]
    fn glib_matches_hardcoded_list() {
        let mut set = LibrarySet::new();
        set.insert(lib("libc.so.6", &[], Origin::Host));
        set.insert(lib("libmpi.so.12", &[], Origin::Host));
        let names: BTreeSet<&str> = set.glib().into_iter().filter_map(|l| l.soname.as_deref()).collect();
        assert_eq!(BTreeSet::from(["libc.so.6"]), names);
    }

    #[test]
    fn linkers_matches_ld_prefix() {
        let mut set = LibrarySet::new();
        set.insert(lib("ld-linux-x86-64.so.2", &[], Origin::Host));
        set.insert(lib("libc.so.6", &[], Origin::Host));
        assert_eq!(1, set.linkers().len());
    }

    #[test]
    fn union_lets_other_win_on_conflict() {
        let mut a = LibrarySet::new();
        a.insert(lib("libc.so.6", &["libold.so"], Origin::Host));
        let mut b = LibrarySet::new();
        b.insert(lib("libc.so.6", &["libnew.so"], Origin::Host));
        let merged = a.union(b);
        let found = merged.get_by_soname("libc.so.6").unwrap();
        assert_eq!(vec!["libnew.so".to_string()], found.needed);
    }

    #[test]
    fn libc_version_picks_greatest_major_2_label() {
        let mut set = LibrarySet::new();
        let mut libc = lib("libc.so.6", &[], Origin::Host);
        libc.defined_versions = BTreeSet::from([
            "GLIBC_2.2.5".to_string(),
            "GLIBC_2.34".to_string(),
            "GLIBC_PRIVATE".to_string(),
        ]);
        set.insert(libc);
        let version = set.libc_version().unwrap();
        assert_eq!(Some(2), version.major());
        assert_eq!(Some(34), version.minor());
    }

    #[test]
    fn difference_removes_shared_keys() {
        let mut a = LibrarySet::new();
        a.insert(lib("libc.so.6", &[], Origin::Host));
        a.insert(lib("libmpi.so.12", &[], Origin::Host));
        let mut b = LibrarySet::new();
        b.insert(lib("libc.so.6", &[], Origin::Host));
        let result = a.difference(&b);
        assert_eq!(1, result.len());
        assert!(result.get_by_soname("libmpi.so.12").is_some());
    }
}
