use std::path::Path;
use std::path::PathBuf;

use crate::libraryset::GLIB_SONAMES;
use crate::linker;
use crate::Error;
use crate::Library;
use crate::LibrarySet;
use crate::Origin;
use crate::Version;

/// What the selector needs from the container runtime's facade.
///
/// Kept narrow and crate-local so `resolve` doesn't depend on whichever
/// concrete backend the CLI layer wires up; the CLI's `Backend`/container
/// handle implements this trait.
pub trait Container {
    /// The guest's C-runtime version, already resolved by the in-container
    /// analysis step.
    fn guest_libc_version(&self) -> &Version;
    /// Absolute in-container path for `soname`, if the guest's dynamic
    /// linker cache already has it.
    fn cache_lookup(&self, soname: &str) -> Option<&Path>;
    /// In-container directory where host executables (shell, linker) are
    /// bound.
    fn import_binary_dir(&self) -> &Path;
}

/// The outcome of [`select`]: the library set to import, plus bind
/// directives the overlay strategy requires outside the returned set
/// (the shell binary and, when present, an explicit dynamic linker).
pub struct Selection {
    /// Libraries to bind into `import_library_dir`.
    pub libraries: LibrarySet,
    /// Host dynamic linker to bind into `import_binary_dir` and invoke the
    /// command through, set only by the overlay strategy. Carries the
    /// source `Library` (not just a destination path) so the caller can
    /// actually issue the bind.
    pub linker: Option<Library>,
    /// Host shell binary to bind at `<import_binary_dir>/bash`, set only by
    /// the overlay strategy.
    pub shell: Option<Library>,
    /// glib-family host libraries to bind as overrides over the guest's own
    /// copy (destination given by `Container::cache_lookup`), set only by
    /// the overlay strategy. See §4.5.2.
    pub glib_overrides: Vec<Library>,
}

/// Compare host and guest C-runtime versions and dispatch to the filter or
/// overlay strategy, per spec.md §4.5.
///
/// `host_shell` seeds the overlay strategy's `bash_top`/`bash_requirements`
/// computation; it is ignored by the filter strategy.
pub fn select(
    host_set: LibrarySet,
    container: &impl Container,
    host_shell: &[PathBuf],
) -> Result<Selection, Error> {
    let host_libc = host_set.libc_version();
    let overlay = match &host_libc {
        Some(host_libc) => host_libc > container.guest_libc_version(),
        None => false,
    };
    if overlay {
        overlay_strategy(host_set, container, host_shell)
    } else {
        Ok(Selection {
            libraries: filter(host_set),
            linker: None,
            shell: None,
            glib_overrides: Vec::new(),
        })
    }
}

/// Drop every `glib` member (C-runtime family plus the dynamic linker) from
/// `set`. The guest supplies these; the rest of the host stack is retained.
pub fn filter(set: LibrarySet) -> LibrarySet {
    let drop: std::collections::BTreeSet<String> = set
        .glib()
        .into_iter()
        .map(|lib| lib.key().to_string())
        .collect();
    let mut kept = LibrarySet::new();
    for lib in set.iter() {
        if !drop.contains(lib.key()) {
            kept.insert(lib.clone());
        }
    }
    kept
}

fn overlay_strategy(
    input: LibrarySet,
    container: &impl Container,
    host_shell: &[PathBuf],
) -> Result<Selection, Error> {
    let bash_set = LibrarySet::create_from(host_shell, |soname, rpath, runpath, dependent_dir| {
        linker::resolve(soname, rpath, runpath, dependent_dir)
    })?;
    // `bash_top` is exactly the shell binaries passed in: nothing in
    // `host_shell` is itself a NEEDED dependency of another seed, but the
    // dynamic linker pulled in via PT_INTERP would otherwise also read as
    // "unreferenced", so the root set is the seed paths themselves rather
    // than a generic top_level() query.
    let bash_top_keys: std::collections::BTreeSet<String> = host_shell
        .iter()
        .filter_map(|path| path.to_str())
        .map(str::to_string)
        .collect();
    let shell = bash_set
        .iter()
        .find(|lib| bash_top_keys.contains(lib.binary_path.to_str().unwrap_or_default()))
        .cloned();
    let mut bash_requirements = LibrarySet::new();
    for lib in bash_set.iter() {
        if !bash_top_keys.contains(lib.binary_path.to_str().unwrap_or_default()) {
            bash_requirements.insert(lib.clone());
        }
    }

    let glib_paths: Vec<PathBuf> = GLIB_SONAMES
        .iter()
        .filter_map(|soname| linker::resolve(soname, None, None, None))
        .collect();
    let glib_set = LibrarySet::create_from(&glib_paths, |soname, rpath, runpath, dependent_dir| {
        linker::resolve(soname, rpath, runpath, dependent_dir)
    })?;

    let merged = input.union(bash_requirements).union_glib(&glib_set);

    let linkers = merged.linkers();
    if linkers.len() != 1 {
        return Err(Error::InconsistentLinkerSet(linkers.len()));
    }
    let linker_library = linkers[0].clone();
    let linker_key = linker_library.key().to_string();

    let mut result = LibrarySet::new();
    let mut glib_overrides = Vec::new();
    for lib in merged.iter() {
        let is_glib_family = lib
            .soname
            .as_deref()
            .is_some_and(|s| GLIB_SONAMES.contains(&s));
        if is_glib_family || lib.key() == linker_key {
            // glib-family libraries are bound as overrides over the guest's
            // own copy rather than imported into import_library_dir, and the
            // linker itself is bound separately under import_binary_dir;
            // see §4.5.2.
            if is_glib_family
                && lib
                    .soname
                    .as_deref()
                    .is_some_and(|soname| container.cache_lookup(soname).is_some())
            {
                glib_overrides.push(lib.clone());
            }
            continue;
        }
        result.insert(lib.clone());
    }

    let _ = container.cache_lookup("libc.so.6").ok_or(Error::LibcMissing)?;

    Ok(Selection {
        libraries: result,
        linker: Some(linker_library),
        shell,
        glib_overrides,
    })
}

trait LibrarySetExt {
    fn union_glib(self, glib_set: &LibrarySet) -> LibrarySet;
}

impl LibrarySetExt for LibrarySet {
    fn union_glib(self, glib_set: &LibrarySet) -> LibrarySet {
        let mut merged = self;
        for lib in glib_set.iter() {
            if lib.origin == Origin::Host {
                merged.insert(lib.clone());
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    struct FakeContainer {
        libc_v: Version,
        cache: std::collections::BTreeMap<String, PathBuf>,
        import_binary_dir: PathBuf,
    }

    impl Container for FakeContainer {
        fn guest_libc_version(&self) -> &Version {
            &self.libc_v
        }
        fn cache_lookup(&self, soname: &str) -> Option<&Path> {
            self.cache.get(soname).map(PathBuf::as_path)
        }
        fn import_binary_dir(&self) -> &Path {
            &self.import_binary_dir
        }
    }

    fn lib(soname: &str, needed: &[&str]) -> Library {
        Library {
            binary_path: PathBuf::from(format!("/lib/{soname}")),
            soname: Some(soname.to_string()),
            needed: needed.iter().map(|s| s.to_string()).collect(),
            rpath: None,
            runpath: None,
            defined_versions: BTreeSet::new(),
            required_versions: BTreeSet::new(),
            interpreter: None,
            origin: Origin::Host,
        }
    }

    #[test]
    fn filter_drops_every_glib_member() {
        let mut set = LibrarySet::new();
        set.insert(lib("libmpi.so.12", &["libc.so.6", "libpthread.so.0"]));
        set.insert(lib("libc.so.6", &[]));
        set.insert(lib("libpthread.so.0", &[]));
        let filtered = filter(set);
        assert!(filtered.glib().is_empty());
        assert!(filtered.get_by_soname("libmpi.so.12").is_some());
    }

    #[test]
    fn overlay_strategy_overrides_cached_glib_library() {
        let mut libc = lib("libc.so.6", &[]);
        libc.defined_versions = BTreeSet::from(["GLIBC_2.34".to_string()]);
        let mut input = LibrarySet::new();
        input.insert(libc);
        input.insert(lib("libmpi.so.12", &["libc.so.6"]));
        let container = FakeContainer {
            libc_v: Version::parse("2.31"),
            cache: std::collections::BTreeMap::from([("libc.so.6".to_string(), PathBuf::from("/guest/lib/libc.so.6"))]),
            import_binary_dir: PathBuf::from("/opt/import/bin"),
        };
        let selection = overlay_strategy(input, &container, &[]).unwrap();
        assert!(selection.glib_overrides.iter().any(|lib| lib.key() == "libc.so.6"));
        assert!(selection.libraries.get_by_soname("libc.so.6").is_none());
    }

    #[test]
    fn select_uses_filter_when_host_libc_does_not_dominate() {
        let mut set = LibrarySet::new();
        let mut libc = lib("libc.so.6", &[]);
        libc.defined_versions = BTreeSet::from(["GLIBC_2.31".to_string()]);
        set.insert(libc);
        set.insert(lib("libmpi.so.12", &["libc.so.6"]));
        let container = FakeContainer {
            libc_v: Version::parse("2.34"),
            cache: Default::default(),
            import_binary_dir: PathBuf::from("/opt/import/bin"),
        };
        let selection = select(set, &container, &[]).unwrap();
        assert!(selection.linker.is_none());
        assert!(selection.shell.is_none());
    }
}
