use std::path::Path;
use std::path::PathBuf;

use log::debug;
use log::error;
use log::warn;

use ldshim_resolve::select;
use ldshim_resolve::Container as _;
use ldshim_resolve::LibrarySet;

use crate::backend::SubprocessBackend;
use crate::container::Container;
use crate::container::FileOption;
use crate::container::IMPORT_BINARY_DIR;
use crate::container::IMPORT_LIBRARY_DIR;
use crate::entrypoint::Entrypoint;
use crate::error::CliError;
use crate::plan;
use crate::vendor;
use crate::wi4mpi::Wi4Mpi;

/// `execute` subcommand arguments (spec §6's CLI surface, plus the `--dry-run`
/// and logging flags carried by the ambient stack).
#[derive(clap::Args, Debug)]
pub struct ExecuteArgs {
    /// Container-runtime adapter to shell out to.
    #[arg(long)]
    pub backend: String,
    /// Image to launch.
    #[arg(long)]
    pub image: String,
    /// Comma-separated extra files: `PATH` or `HOST:GUEST`.
    #[arg(long, value_delimiter = ',')]
    pub files: Vec<String>,
    /// Comma-separated host library paths to seed the closure from.
    #[arg(long, value_delimiter = ',')]
    pub libraries: Vec<PathBuf>,
    /// Script to source before the user command.
    #[arg(long)]
    pub source: Option<PathBuf>,
    /// Compute and print the plan without invoking the backend.
    #[arg(long)]
    pub dry_run: bool,
    /// The command to run inside the container.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Split one `--files` item into a `(source, dest)` bind, or `None` if it
/// should be dropped (the literal `/`, per spec §6).
fn parse_file_spec(item: &str) -> Result<Option<(PathBuf, PathBuf)>, CliError> {
    if item == "/" {
        warn!("ignoring literal '/' in --files");
        return Ok(None);
    }
    let parts: Vec<&str> = item.split(':').collect();
    match parts.as_slice() {
        [path] => Ok(Some((PathBuf::from(path), PathBuf::from(path)))),
        [host, guest] => Ok(Some((PathBuf::from(host), PathBuf::from(guest)))),
        _ => Err(CliError::BadFileSpec(item.to_string())),
    }
}

/// Run the `Parse → Seed → Closure → Analyze-Container → Select → Plan →
/// Render → Launch → Teardown` state machine (spec §4.8).
pub fn run(args: ExecuteArgs) -> Result<i32, CliError> {
    let mut extra_files = Vec::new();
    for item in &args.files {
        match parse_file_spec(item) {
            Ok(Some(pair)) => extra_files.push(pair),
            Ok(None) => {}
            Err(err) => warn!("{err}"),
        }
    }

    let backend = SubprocessBackend::new(args.backend.clone());
    let mut container = Container::new(backend, args.image.clone());

    let host_set = LibrarySet::create_from(&args.libraries, |soname, rpath, runpath, dependent_dir| {
        ldshim_resolve::resolve(soname, rpath, runpath, dependent_dir)
    })?;

    container.get_data()?;

    let host_shell = which_bash();
    let selection = select(host_set, &container, &host_shell)?;

    let hint = vendor::detect_vendor(selection.libraries.iter());
    if let Some(hint) = &hint {
        debug!("detected MPI vendor {} version {}", hint.vendor, hint.version);
    }

    let mut entrypoint = Entrypoint::new();
    entrypoint.command = args.command.clone();
    entrypoint.source_script_path = args.source.clone();
    entrypoint.debug = log::log_enabled!(log::Level::Debug);
    entrypoint.linker_library_path = vec![PathBuf::from(IMPORT_LIBRARY_DIR)];

    for library in selection.libraries.iter() {
        for file in plan::library_links(library) {
            let dest = import_library_dest(&file);
            container.bind_file(file, dest, FileOption::ReadOnly);
        }
    }

    let wi4mpi = Wi4Mpi::detect();
    match &wi4mpi {
        Some(wi4mpi) => {
            for (source, dest_name) in wi4mpi.aliases() {
                container.bind_file(source, Path::new(IMPORT_LIBRARY_DIR).join(dest_name), FileOption::ReadOnly);
            }
            let (extra_env, binds) = wi4mpi.rewrite_run_libs(Path::new(IMPORT_LIBRARY_DIR));
            entrypoint.extra_env.extend(extra_env);
            for host_path in binds {
                let dest = import_library_dest(&host_path);
                container.bind_file(host_path, dest, FileOption::ReadOnly);
            }
        }
        None => {
            for (source, guest_soname) in plan::alias_mpi_families(selection.libraries.iter(), container.cache()) {
                container.bind_file(source, Path::new(IMPORT_LIBRARY_DIR).join(guest_soname), FileOption::ReadOnly);
            }
        }
    }

    for library in selection.libraries.top_level() {
        let dest = import_library_dest(&library.binary_path);
        entrypoint.preload.push(dest.display().to_string());
    }

    for library in &selection.glib_overrides {
        let Some(soname) = &library.soname else { continue };
        let dest = container.cache_lookup(soname).map(Path::to_path_buf);
        if let Some(dest) = dest {
            container.bind_file(library.binary_path.clone(), dest, FileOption::ReadOnly);
        }
    }

    if let Some(shell) = &selection.shell {
        container.bind_file(shell.binary_path.clone(), Path::new(IMPORT_BINARY_DIR).join("bash"), FileOption::ReadOnly);
    }
    if let Some(linker) = &selection.linker {
        let dest = Path::new(IMPORT_BINARY_DIR).join(
            linker
                .binary_path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("ld.so")),
        );
        container.bind_file(linker.binary_path.clone(), dest.clone(), FileOption::ReadOnly);
        entrypoint.linker = Some(dest);
    }

    for (source, dest) in &extra_files {
        let option = if dest == source {
            FileOption::ReadWrite
        } else {
            FileOption::ReadOnly
        };
        container.bind_file(source.clone(), dest.clone(), option);
    }

    if args.dry_run {
        println!("{}", entrypoint.render());
        return Ok(0);
    }

    let script_path = entrypoint.setup()?;
    container.bind_file(script_path, crate::container::CONTAINER_SCRIPT, FileOption::ReadOnly);
    let result = container.run(&[crate::container::CONTAINER_SCRIPT.to_string()]);
    if let Ok(code) = result {
        if code != 0 {
            error!("container run failed with exit code {code}");
        }
    }
    entrypoint.teardown();
    result
}

fn import_library_dest(path: &Path) -> PathBuf {
    Path::new(IMPORT_LIBRARY_DIR).join(path.file_name().unwrap_or_default())
}

fn which_bash() -> Vec<PathBuf> {
    for dir in ["/bin", "/usr/bin"] {
        let candidate = Path::new(dir).join("bash");
        if candidate.exists() {
            return vec![candidate];
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_file_spec_rejects_more_than_one_colon() {
        assert!(matches!(parse_file_spec("/etc/hosts:/a:/b"), Err(CliError::BadFileSpec(_))));
    }

    #[test]
    fn parse_file_spec_filters_root_literal() {
        assert_eq!(None, parse_file_spec("/").unwrap());
    }

    #[test]
    fn parse_file_spec_splits_host_guest() {
        let (host, guest) = parse_file_spec("/etc/hosts:/etc/hosts.guest").unwrap().unwrap();
        assert_eq!(PathBuf::from("/etc/hosts"), host);
        assert_eq!(PathBuf::from("/etc/hosts.guest"), guest);
    }

    #[test]
    fn parse_file_spec_defaults_dest_to_source() {
        let (host, guest) = parse_file_spec("/etc/hosts").unwrap().unwrap();
        assert_eq!(host, guest);
    }
}
