use std::collections::BTreeMap;
use std::env::split_paths;
use std::ffi::OsStr;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::OnceLock;

use log::trace;

/// Directories consulted after `RPATH`/`RUNPATH`/`LD_LIBRARY_PATH` have been
/// exhausted.
const FALLBACK_DIRS: &[&str] = &["/lib", "/usr/lib", "/lib64", "/usr/lib64"];

/// Resolve `soname` to an absolute, symlink-canonicalized path, following the
/// host dynamic linker's search order:
///
/// 1. `rpath`, consulted unconditionally before `LD_LIBRARY_PATH` (the spec
///    deliberately simplifies away the RUNPATH-present-disables-RPATH rule
///    the dynamic-linker manual describes; see DESIGN.md).
/// 2. The colon-separated entries of `LD_LIBRARY_PATH`.
/// 3. `runpath`.
/// 4. The host's SONAME→path cache, built from `ld.so.conf`/musl path files
///    plus the fallback directories, and memoized for the life of the
///    process.
/// 5. [`FALLBACK_DIRS`] directly, in case the cache missed a directory that
///    exists but holds no indexed file named `soname` (e.g. it was added to
///    the filesystem after the cache was built).
///
/// `dependent_dir`, when given, is used to expand `$ORIGIN` in `rpath` and
/// `runpath` entries to the directory containing the library that referenced
/// `soname`. Without it, `$ORIGIN` entries are treated as a literal
/// (non-existent) path component and contribute nothing.
pub fn resolve(
    soname: &str,
    rpath: Option<&str>,
    runpath: Option<&str>,
    dependent_dir: Option<&Path>,
) -> Option<PathBuf> {
    for dir in interpolated_dirs(rpath, dependent_dir) {
        if let Some(found) = try_dir(&dir, soname) {
            return Some(found);
        }
    }
    for dir in split_paths(&std::env::var_os("LD_LIBRARY_PATH").unwrap_or_default()) {
        if let Some(found) = try_dir(&dir, soname) {
            return Some(found);
        }
    }
    for dir in interpolated_dirs(runpath, dependent_dir) {
        if let Some(found) = try_dir(&dir, soname) {
            return Some(found);
        }
    }
    if let Some(found) = host_libraries().get(soname) {
        return Some(found.clone());
    }
    for dir in FALLBACK_DIRS {
        if let Some(found) = try_dir(Path::new(dir), soname) {
            return Some(found);
        }
    }
    None
}

fn interpolated_dirs(colon_joined: Option<&str>, dependent_dir: Option<&Path>) -> Vec<PathBuf> {
    let Some(colon_joined) = colon_joined else {
        return Vec::new();
    };
    split_paths(colon_joined)
        .map(|dir| interpolate(&dir, dependent_dir))
        .collect()
}

fn try_dir(dir: &Path, soname: &str) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }
    let candidate = dir.join(soname);
    if !candidate.exists() {
        return None;
    }
    candidate.canonicalize().ok()
}

/// Expand `$ORIGIN`, `$LIB` and `$PLATFORM` (and their `${...}` forms) in one
/// RPATH/RUNPATH entry.
///
/// `$LIB` resolves to `lib64` (this crate only targets 64-bit hosts) and
/// `$PLATFORM` to `x86_64`, matching the overwhelming majority of hosts this
/// tool runs on; both are best-effort since the spec's `resolve` signature
/// doesn't carry the dependent's ELF class/machine fields.
fn interpolate(dir: &Path, dependent_dir: Option<&Path>) -> PathBuf {
    let mut interpolated = PathBuf::new();
    for comp in dir.components() {
        match comp {
            Component::Normal(comp) if comp == "$ORIGIN" || comp == "${ORIGIN}" => {
                match dependent_dir {
                    Some(dir) => interpolated.push(dir),
                    None => interpolated.push(comp),
                }
            }
            Component::Normal(comp) if comp == "$LIB" || comp == "${LIB}" => {
                interpolated.push(OsStr::new("lib64"));
            }
            Component::Normal(comp) if comp == "$PLATFORM" || comp == "${PLATFORM}" => {
                interpolated.push(OsStr::new("x86_64"));
            }
            comp => interpolated.push(comp),
        }
    }
    interpolated
}

/// The host's SONAME→path cache: every regular file directly inside a
/// system library directory, indexed by filename.
///
/// Built once per process from glibc's `/etc/ld.so.conf` (including
/// `include` directives) when the `glibc` feature is enabled, from musl's
/// `/etc/ld-musl-<arch>.path` when `musl` is enabled, and always includes
/// [`FALLBACK_DIRS`]. A filename match is an approximation of a true SONAME
/// match, but the two coincide for the overwhelming majority of installed
/// libraries and this cache is consulted only after RPATH/RUNPATH/
/// LD_LIBRARY_PATH have already missed.
fn host_libraries() -> &'static BTreeMap<String, PathBuf> {
    static CACHE: OnceLock<BTreeMap<String, PathBuf>> = OnceLock::new();
    CACHE.get_or_init(build_host_libraries)
}

fn build_host_libraries() -> BTreeMap<String, PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    #[cfg(feature = "glibc")]
    dirs.extend(crate::glibc::get_search_dirs().unwrap_or_default());
    #[cfg(feature = "musl")]
    dirs.extend(crate::musl::get_search_dirs(std::env::consts::ARCH).unwrap_or_default());
    dirs.extend(FALLBACK_DIRS.iter().map(PathBuf::from));
    dirs.sort();
    dirs.dedup();

    let mut cache = BTreeMap::new();
    for dir in dirs {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() && !file_type.is_symlink() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            cache.entry(name.to_string()).or_insert_with(|| entry.path());
        }
    }
    trace!("host library cache: {} entries", cache.len());
    cache
}
