use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;

/// Presence of Wi4MPI in the calling environment, detected from
/// `WI4MPI_ROOT`/`WI4MPI_FROM` (spec §6).
pub struct Wi4Mpi {
    root: PathBuf,
    from: String,
}

/// Env vars Wi4MPI uses to `dlopen` its target MPI library; rewritten from
/// host paths to in-container ones (spec §6).
const RUN_LIB_VARS: &[(&str, &str)] = &[
    ("WI4MPI_RUN_MPI_C_LIB", "WI4MPI_RUN_MPIIO_C_LIB"),
    ("WI4MPI_RUN_MPI_F_LIB", "WI4MPI_RUN_MPIIO_F_LIB"),
];

impl Wi4Mpi {
    /// Detect Wi4MPI from the process environment, if active.
    pub fn detect() -> Option<Self> {
        let root = std::env::var_os("WI4MPI_ROOT")?;
        let from = std::env::var("WI4MPI_FROM").unwrap_or_default().to_uppercase();
        Some(Self {
            root: PathBuf::from(root),
            from,
        })
    }

    fn fakelib_dir(&self) -> PathBuf {
        self.root.join("libexec").join("wi4mpi").join(format!("fakelib{}", self.from))
    }

    /// `(source, dest_filename)` pairs to bind under `IMPORT_LIBRARY_DIR`:
    /// each fakelib file under its own name, plus its MPICH-style alias.
    pub fn aliases(&self) -> Vec<(PathBuf, String)> {
        let dir = self.fakelib_dir();
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(OsStr::to_str) else {
                continue;
            };
            let Some((base, suffix)) = split_versioned(name) else {
                continue;
            };
            let mpich_base = match base {
                "libmpi.so" => "libmpich.so",
                "libmpifort.so" => "libmpichfort.so",
                "libmpicxx.so" => "libmpichcxx.so",
                _ => continue,
            };
            let alias_name = format!("{mpich_base}{suffix}");
            out.push((path.clone(), name.to_string()));
            out.push((path, alias_name));
        }
        out
    }

    /// Rewrite `WI4MPI_RUN_MPI_{C,F}_LIB` and their `MPIIO` counterparts from
    /// host paths to `import_library_dir` paths, returning the host source
    /// paths that must also be bound.
    pub fn rewrite_run_libs(&self, import_library_dir: &Path) -> (BTreeMap<String, String>, Vec<PathBuf>) {
        let mut extra_env = BTreeMap::new();
        let mut binds = Vec::new();
        for (run_var, io_var) in RUN_LIB_VARS {
            let Some(host_path) = std::env::var(run_var).ok().filter(|s| !s.is_empty()) else {
                continue;
            };
            let host_path = PathBuf::from(host_path);
            let Some(name) = host_path.file_name() else {
                continue;
            };
            let dest = import_library_dir.join(name).to_string_lossy().into_owned();
            extra_env.insert((*run_var).to_string(), dest.clone());
            extra_env.insert((*io_var).to_string(), dest);
            binds.push(host_path);
        }
        (extra_env, binds)
    }
}

fn split_versioned(name: &str) -> Option<(&str, &str)> {
    let idx = name.find(".so")?;
    Some((&name[..idx + 3], &name[idx + 3..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_versioned_separates_base_from_suffix() {
        assert_eq!(Some(("libmpi.so", ".12")), split_versioned("libmpi.so.12"));
        assert_eq!(Some(("libmpi.so", "")), split_versioned("libmpi.so"));
        assert_eq!(None, split_versioned("notalibrary.txt"));
    }
}
