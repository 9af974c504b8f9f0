use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use log::debug;

use ldshim_resolve::Version;

use crate::backend::Backend;
use crate::error::CliError;

/// In-container directory host libraries are bound into.
pub const IMPORT_LIBRARY_DIR: &str = "/.ldshim/lib";
/// In-container directory host executables (shell, linker) are bound into.
pub const IMPORT_BINARY_DIR: &str = "/.ldshim/bin";
/// In-container path of the rendered launcher script.
pub const CONTAINER_SCRIPT: &str = "/.ldshim/entrypoint.sh";
/// In-container path this binary itself is bound to, so the container can
/// run its own `analyze` subcommand.
pub const CONTAINER_SELF: &str = "/.ldshim/bin/ldshim";

/// Mount permission for a bind directive.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FileOption {
    ReadOnly,
    ReadWrite,
}

/// One accumulated bind-mount request.
#[derive(Clone, Debug)]
pub struct BindDirective {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub option: FileOption,
}

/// The container-facade contract the import planner and entrypoint builder
/// consume (spec §6). Generic over [`Backend`] so the subprocess
/// implementation can be swapped for a fake in tests.
pub struct Container<B> {
    backend: B,
    image: String,
    binds: BTreeMap<PathBuf, BindDirective>,
    cache: BTreeMap<String, PathBuf>,
    libc_v: Version,
    fetched: bool,
}

impl<B: Backend> Container<B> {
    pub fn new(backend: B, image: String) -> Self {
        Self {
            backend,
            image,
            binds: BTreeMap::new(),
            cache: BTreeMap::new(),
            libc_v: Version::default(),
            fetched: false,
        }
    }

    /// Record a mount, keyed by destination. A later bind to an
    /// already-bound destination supersedes the earlier one (logged at
    /// debug), matching the ordering guarantee in spec §5.
    pub fn bind_file(&mut self, source: impl Into<PathBuf>, dest: impl Into<PathBuf>, option: FileOption) {
        let dest = dest.into();
        if self.binds.contains_key(&dest) {
            debug!("container: overriding bind at {:?}", dest);
        }
        self.binds.insert(
            dest.clone(),
            BindDirective {
                source: source.into(),
                dest,
                option,
            },
        );
    }

    /// Run the in-container analysis subcommand once, populating `cache` and
    /// `libc_v`. A no-op on subsequent calls.
    pub fn get_data(&mut self) -> Result<(), CliError> {
        if self.fetched {
            return Ok(());
        }
        let self_exe = std::env::current_exe()?;
        self.bind_file(self_exe, CONTAINER_SELF, FileOption::ReadOnly);
        let binds: Vec<BindDirective> = self.binds.values().cloned().collect();
        let payload = self.backend.analyze(&self.image, &binds)?;
        self.libc_v = payload.libc_version();
        for library in &payload.libraries {
            if let Some(soname) = &library.soname {
                self.cache.insert(soname.clone(), library.binary_path.clone());
            }
        }
        self.fetched = true;
        Ok(())
    }

    pub fn libc_version(&self) -> &Version {
        &self.libc_v
    }

    pub fn cache(&self) -> &BTreeMap<String, PathBuf> {
        &self.cache
    }

    /// Launch the container and run `argv`, returning its exit code.
    pub fn run(&self, argv: &[String]) -> Result<i32, CliError> {
        let binds: Vec<BindDirective> = self.binds.values().cloned().collect();
        self.backend.run(&self.image, &binds, argv)
    }
}

impl<B: Backend> ldshim_resolve::Container for Container<B> {
    fn guest_libc_version(&self) -> &Version {
        &self.libc_v
    }

    fn cache_lookup(&self, soname: &str) -> Option<&Path> {
        self.cache.get(soname).map(PathBuf::as_path)
    }

    fn import_binary_dir(&self) -> &Path {
        Path::new(IMPORT_BINARY_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use ldshim_resolve::AnalysisPayload;

    struct FakeBackend;

    impl Backend for FakeBackend {
        fn run(&self, _image: &str, _binds: &[BindDirective], _argv: &[String]) -> Result<i32, CliError> {
            Ok(0)
        }
        fn analyze(&self, _image: &str, _binds: &[BindDirective]) -> Result<AnalysisPayload, CliError> {
            Ok(AnalysisPayload {
                libc_version: "2.31".to_string(),
                libraries: Vec::new(),
            })
        }
    }

    #[test]
    fn later_bind_to_same_destination_overrides_earlier() {
        let mut container = Container::new(FakeBackend, "image".to_string());
        container.bind_file("/a", "/dest", FileOption::ReadOnly);
        container.bind_file("/b", "/dest", FileOption::ReadWrite);
        assert_eq!(1, container.binds.len());
        assert_eq!(PathBuf::from("/b"), container.binds[&PathBuf::from("/dest")].source);
    }

    #[test]
    fn get_data_populates_cache_and_libc_version() {
        let mut container = Container::new(FakeBackend, "image".to_string());
        container.get_data().unwrap();
        assert_eq!(Some(2), container.libc_version().major());
    }
}
