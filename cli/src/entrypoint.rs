use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;

use crate::container::IMPORT_BINARY_DIR;
use crate::error::CliError;

/// Launcher script parameters the import planner populates (spec §4.7).
#[derive(Default)]
pub struct Entrypoint {
    pub command: Vec<String>,
    pub source_script_path: Option<PathBuf>,
    pub linker_library_path: Vec<PathBuf>,
    pub preload: Vec<String>,
    pub linker: Option<PathBuf>,
    pub debug: bool,
    pub extra_env: BTreeMap<String, String>,
    file_name: Option<PathBuf>,
}

impl Entrypoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn render(&self) -> String {
        let mut seen = BTreeSet::new();
        let preload: Vec<&str> = self
            .preload
            .iter()
            .filter(|p| seen.insert(p.as_str()))
            .map(String::as_str)
            .collect();

        let linker = match &self.linker {
            Some(linker) => {
                let first_is_elf = self
                    .command
                    .first()
                    .is_some_and(|c| ldshim::is_elf(Path::new(c)));
                if first_is_elf {
                    linker.display().to_string()
                } else {
                    format!("{} {}/bash", linker.display(), IMPORT_BINARY_DIR)
                }
            }
            None => String::new(),
        };

        let source = self
            .source_script_path
            .as_ref()
            .map(|p| format!(". {}", p.display()))
            .unwrap_or_default();
        let debugging = if self.debug { "export LD_DEBUG=files" } else { "" };
        let extra_env: String = self
            .extra_env
            .iter()
            .map(|(k, v)| format!("export {k}={v}\n"))
            .collect();
        let library_dir: Vec<String> = self.linker_library_path.iter().map(|p| p.display().to_string()).collect();

        format!(
            "#!/bin/sh\n{source}\n{debugging}\n{extra_env}export LD_LIBRARY_PATH={}${{LD_LIBRARY_PATH:+:${{LD_LIBRARY_PATH}}}}\nexport LD_PRELOAD={}${{LD_PRELOAD:+:${{LD_PRELOAD}}}}\n{linker} {}\n",
            library_dir.join(":"),
            preload.join(":"),
            self.command.join(" "),
        )
    }

    /// Write the rendered script to a fresh temporary file with 0755
    /// permissions and record its path for [`Entrypoint::teardown`].
    pub fn setup(&mut self) -> Result<PathBuf, CliError> {
        let path = std::env::temp_dir().join(format!("ldshim-entrypoint-{}.sh", std::process::id()));
        fs_err::write(&path, self.render())?;
        let mut permissions = fs_err::metadata(&path)?.permissions();
        permissions.set_mode(0o755);
        fs_err::set_permissions(&path, permissions)?;
        self.file_name = Some(path.clone());
        Ok(path)
    }

    /// Unlink the script file, if one was created. Safe to call more than
    /// once and on every exit path, including failure.
    pub fn teardown(&mut self) {
        if let Some(path) = self.file_name.take() {
            let _ = fs_err::remove_file(path);
        }
    }
}

impl Drop for Entrypoint {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_prepends_library_dir_and_preload() {
        let mut entrypoint = Entrypoint::new();
        entrypoint.command = vec!["./a.out".to_string()];
        entrypoint.linker_library_path = vec![PathBuf::from("/.ldshim/lib")];
        entrypoint.preload = vec!["/.ldshim/lib/libmpi.so.12".to_string(), "/.ldshim/lib/libmpi.so.12".to_string()];
        let script = entrypoint.render();
        assert!(script.contains("export LD_LIBRARY_PATH=/.ldshim/lib"));
        assert_eq!(1, script.matches("libmpi.so.12").count());
    }

    #[test]
    fn render_routes_script_commands_through_bash() {
        let mut entrypoint = Entrypoint::new();
        entrypoint.command = vec!["./run.sh".to_string()];
        entrypoint.linker = Some(PathBuf::from("/.ldshim/bin/ld-linux-x86-64.so.2"));
        let script = entrypoint.render();
        assert!(script.contains("/.ldshim/bin/ld-linux-x86-64.so.2 /.ldshim/bin/bash ./run.sh"));
    }

    #[test]
    fn setup_writes_executable_file_and_teardown_removes_it() {
        let mut entrypoint = Entrypoint::new();
        entrypoint.command = vec!["true".to_string()];
        let path = entrypoint.setup().unwrap();
        assert!(path.exists());
        let mode = fs_err::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(0o755, mode);
        entrypoint.teardown();
        assert!(!path.exists());
    }
}
