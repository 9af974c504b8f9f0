use std::collections::VecDeque;
use std::io::BufRead;
use std::io::BufReader;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use fs_err::File;
use glob::glob;
use log::log_enabled;
use log::trace;
use log::warn;
use log::Level::Trace;

/// Get default library search directories plus the paths from
/// `/etc/ld.so.conf` on the host.
///
/// Default search directories: `/lib`, `/usr/local/lib`, `/usr/lib`.
pub fn get_search_dirs() -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths = Vec::new();
    paths.extend([
        PathBuf::from("/lib"),
        PathBuf::from("/usr/local/lib"),
        PathBuf::from("/usr/lib"),
    ]);
    parse_ld_so_conf(PathBuf::from("/etc/ld.so.conf"), &mut paths)?;
    if log_enabled!(Trace) {
        for path in paths.iter() {
            trace!("Found system library path {:?}", path);
        }
    }
    Ok(paths)
}

fn parse_ld_so_conf(path: PathBuf, paths: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
    let mut conf_files = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(path);
    while let Some(path) = queue.pop_front() {
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(ref e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                warn!("Failed to open {path:?}: {e}");
                continue;
            }
        };
        conf_files.push(path);
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line?;
            let line = match line.find('#') {
                Some(i) => &line[..i],
                None => &line[..],
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with("include") {
                let Some(i) = line.find(char::is_whitespace) else {
                    continue;
                };
                let pattern = line[i + 1..].trim();
                let Ok(more_paths) = glob(pattern) else {
                    continue;
                };
                for path in more_paths {
                    let Ok(path) = path else {
                        continue;
                    };
                    if !conf_files.contains(&path) {
                        queue.push_back(path);
                    }
                }
                continue;
            }
            if line.starts_with('/') {
                let path = PathBuf::from(line);
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_directory_line_and_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("ld.so.conf");
        std::fs::write(&conf, "# a comment\n/opt/mpi/lib\n\n/opt/mpi/lib64\n").unwrap();
        let mut paths = Vec::new();
        parse_ld_so_conf(conf, &mut paths).unwrap();
        assert_eq!(
            vec![PathBuf::from("/opt/mpi/lib"), PathBuf::from("/opt/mpi/lib64")],
            paths
        );
    }

    #[test]
    fn missing_conf_file_is_not_an_error() {
        let mut paths = Vec::new();
        parse_ld_so_conf(PathBuf::from("/nonexistent/ld.so.conf"), &mut paths).unwrap();
        assert!(paths.is_empty());
    }
}
