use thiserror::Error;

/// Errors produced while reading an ELF file.
///
/// `NotElf` and everything else are distinguished deliberately: callers doing
/// bulk discovery (e.g. walking a directory of host libraries) filter out
/// `NotElf` silently, but must treat any other variant as a hard failure.
#[derive(Error, Debug)]
pub enum Error {
    /// The file doesn't start with the ELF magic number.
    #[error("not an ELF file")]
    NotElf,
    #[error("invalid ELF class: {0}")]
    InvalidClass(u8),
    #[error("invalid byte order: {0}")]
    InvalidByteOrder(u8),
    #[error("invalid ELF version: {0}")]
    InvalidVersion(u8),
    #[error("string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("overflow: {0}")]
    TooBig(&'static str),
    #[error("malformed ELF structure: {0}")]
    Malformed(&'static str),
    #[error("input/output error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors the spec classifies as `MalformedElf` (fatal to the
    /// whole `execute` flow) as opposed to `NotElf` (silently filtered).
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Error::NotElf)
    }
}
