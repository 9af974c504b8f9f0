use std::path::PathBuf;

/// Errors produced while building and selecting a library set.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// ELF parsing failed on an input the caller asserted was a library.
    #[error("ELF error reading {1:?}: {0}")]
    Elf(ldshim::Error, PathBuf),
    /// Overlay selection found a number of dynamic linkers other than one.
    #[error("expected exactly one dynamic linker in the overlay set, found {0}")]
    InconsistentLinkerSet(usize),
    /// The host's C runtime (`libc.so.6`) could not be resolved.
    #[error("libc.so.6 could not be resolved on the host")]
    LibcMissing,
    /// Input/output error.
    #[error("input/output error: {0}")]
    Io(#[from] std::io::Error),
}
