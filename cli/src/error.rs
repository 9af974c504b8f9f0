/// Errors surfaced by the `ldshim` binary.
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Resolve(#[from] ldshim_resolve::Error),
    #[error("input/output error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed analysis document from container: {0}")]
    Json(#[from] serde_json::Error),
    #[error("container analysis subcommand failed: {0}")]
    ContainerFailure(String),
    #[error("'{0}' has more than one ':' separator, expected HOST:GUEST")]
    BadFileSpec(String),
    #[error("logger already initialized: {0}")]
    Logger(#[from] log::SetLoggerError),
}
