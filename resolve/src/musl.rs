use std::env::split_paths;
use std::io::BufRead;
use std::io::BufReader;
use std::io::ErrorKind;
use std::path::PathBuf;

use fs_err::File;
use log::log_enabled;
use log::trace;
use log::warn;
use log::Level::Trace;

/// Get library search directories from `/etc/ld-musl-<arch>.path` on the
/// host.
///
/// If the file is empty or missing, returns the default search directories:
/// `/lib`, `/usr/local/lib`, `/usr/lib`.
pub fn get_search_dirs(arch: &str) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths = Vec::new();
    parse_paths(PathBuf::from(format!("/etc/ld-musl-{arch}.path")), &mut paths)?;
    if paths.is_empty() {
        paths.extend([
            PathBuf::from("/lib"),
            PathBuf::from("/usr/local/lib"),
            PathBuf::from("/usr/lib"),
        ]);
    }
    if log_enabled!(Trace) {
        for path in paths.iter() {
            trace!("Found system library path {:?}", path);
        }
    }
    Ok(paths)
}

fn parse_paths(path: PathBuf, paths: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(ref e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            warn!("Failed to open {path:?}: {e}");
            return Ok(());
        }
    };
    let reader = BufReader::new(file);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        paths.extend(split_paths(line));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_defaults_when_file_missing() {
        let mut paths = Vec::new();
        parse_paths(PathBuf::from("/nonexistent/ld-musl-x86_64.path"), &mut paths).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn parses_colon_separated_entries() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("ld-musl-x86_64.path");
        std::fs::write(&conf, "/opt/mpi/lib:/opt/mpi/lib64\n").unwrap();
        let mut paths = Vec::new();
        parse_paths(conf, &mut paths).unwrap();
        assert_eq!(
            vec![PathBuf::from("/opt/mpi/lib"), PathBuf::from("/opt/mpi/lib64")],
            paths
        );
    }
}
