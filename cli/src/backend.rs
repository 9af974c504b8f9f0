use std::process::Command;

use ldshim_resolve::AnalysisPayload;

use crate::container::BindDirective;
use crate::container::FileOption;
use crate::container::CONTAINER_SELF;
use crate::error::CliError;

/// Thin adapter over whatever actually mounts files and spawns the
/// container; the core only ever talks to this trait (spec §1, "out of
/// scope: container-runtime drivers").
pub trait Backend {
    /// Launch `image` with `binds` mounted and run `argv`, returning the
    /// child's exit code.
    fn run(&self, image: &str, binds: &[BindDirective], argv: &[String]) -> Result<i32, CliError>;

    /// Launch `image` with `binds` mounted, run the in-container analysis
    /// subcommand, and parse its stdout as an [`AnalysisPayload`].
    fn analyze(&self, image: &str, binds: &[BindDirective]) -> Result<AnalysisPayload, CliError>;
}

/// Reference [`Backend`]: shells out to a `--backend` executable (e.g.
/// `singularity`, `apptainer`, `docker`) with a `run`-style argv built from
/// the accumulated bind directives.
pub struct SubprocessBackend {
    executable: String,
}

impl SubprocessBackend {
    pub fn new(executable: String) -> Self {
        Self { executable }
    }

    fn command(&self, image: &str, binds: &[BindDirective], argv: &[String]) -> Command {
        let mut command = Command::new(&self.executable);
        command.arg("run");
        for bind in binds {
            let mode = match bind.option {
                FileOption::ReadOnly => "ro",
                FileOption::ReadWrite => "rw",
            };
            command
                .arg("--bind")
                .arg(format!("{}:{}:{mode}", bind.source.display(), bind.dest.display()));
        }
        command.arg(image);
        command.args(argv);
        command
    }
}

impl Backend for SubprocessBackend {
    fn run(&self, image: &str, binds: &[BindDirective], argv: &[String]) -> Result<i32, CliError> {
        let status = self.command(image, binds, argv).status()?;
        Ok(status.code().unwrap_or(1))
    }

    fn analyze(&self, image: &str, binds: &[BindDirective]) -> Result<AnalysisPayload, CliError> {
        let argv = vec![CONTAINER_SELF.to_string(), "analyze".to_string()];
        let output = self.command(image, binds, &argv).output()?;
        if !output.status.success() {
            return Err(CliError::ContainerFailure(format!(
                "analysis subcommand exited with {}",
                output.status
            )));
        }
        Ok(AnalysisPayload::from_json(&output.stdout)?)
    }
}
