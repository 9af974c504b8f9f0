#![allow(missing_docs)]

use std::env::split_paths;
use std::env::var_os;
use std::fs::read_dir;
use std::path::PathBuf;

use ldshim::is_elf;
use ldshim::Elf;

#[test]
fn read_elf_files_from_file_system() {
    let mut dirs: Vec<PathBuf> = Vec::new();
    dirs.extend(DEFAULT_LD_LIBRARY_PATH.iter().map(Into::into));
    for var_name in DEFAULT_ENV_VARS {
        append_paths_from_env(var_name, &mut dirs);
    }
    dirs.sort_unstable();
    dirs.dedup();
    eprintln!("ELF search directories: {:#?}", dirs);
    let mut num_checked: usize = 0;
    for path in dirs.iter() {
        eprintln!("Entering {:?}", path);
        if !path.exists() || !path.is_dir() {
            continue;
        }
        let Ok(dir) = read_dir(path) else {
            eprintln!("Failed to open directory {:?}", path);
            continue;
        };
        for entry in dir {
            let Ok(entry) = entry else {
                continue;
            };
            let path = entry.path();
            if !path.is_file() || !is_elf(&path) {
                continue;
            }
            let elf = match Elf::read_path(&path) {
                Ok(elf) => elf,
                Err(e) => panic!("Failed to parse {:?}: {e}", path),
            };
            assert!(elf.header.num_segments > 0 || elf.segments.is_empty());
            num_checked += 1;
        }
    }
    eprintln!("Checked {} file(s)", num_checked);
}

fn append_paths_from_env(var_name: &str, paths: &mut Vec<PathBuf>) {
    let Some(value) = var_os(var_name) else {
        return;
    };
    paths.extend(split_paths(&value))
}

/// Environment variables known to hold paths to ELF files.
const DEFAULT_ENV_VARS: [&str; 2] = ["LD_LIBRARY_PATH", "LIBRARY_PATH"];

const DEFAULT_LD_LIBRARY_PATH: [&str; 6] = [
    "/lib",
    "/lib64",
    "/usr/lib",
    "/usr/lib64",
    "/usr/local/lib",
    "/usr/local/lib64",
];
