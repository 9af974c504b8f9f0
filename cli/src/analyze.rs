use std::io::Write;
use std::path::PathBuf;

use ldshim_resolve::AnalysisPayload;
use ldshim_resolve::Library;
use ldshim_resolve::LibrarySet;

use crate::error::CliError;

/// Run the in-container analysis step: scan every system library directory,
/// read each ELF found there, and write the resulting [`AnalysisPayload`] as
/// JSON to stdout (spec §4.8's Analyze-Container state, §6 wire format).
///
/// This subcommand only ever runs bound into a container at
/// [`crate::container::CONTAINER_SELF`]; it has no knowledge of the host
/// side of the launch.
pub fn run() -> Result<(), CliError> {
    let mut set = LibrarySet::new();
    for dir in search_dirs() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if let Ok(Some(library)) = Library::read_host(&path) {
                set.insert(library);
            }
        }
    }
    let libc_version = set.libc_version().unwrap_or_default();
    let payload = AnalysisPayload::from_library_set(&set, &libc_version);
    std::io::stdout().write_all(&payload.to_json()?)?;
    Ok(())
}

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    dirs.extend(ldshim_resolve::glibc::get_search_dirs().unwrap_or_default());
    dirs.extend(ldshim_resolve::musl::get_search_dirs(std::env::consts::ARCH).unwrap_or_default());
    dirs.extend(["/lib", "/usr/lib", "/lib64", "/usr/lib64"].map(PathBuf::from));
    dirs.sort();
    dirs.dedup();
    dirs
}
