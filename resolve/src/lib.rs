#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod families;
mod library;
mod libraryset;
mod linker;
mod selector;
mod version;
mod wire;

/// Functionality specific to GNU libc's implementation of the dynamic loader.
#[cfg(feature = "glibc")]
pub mod glibc;
/// Functionality specific to musl libc's implementation of the dynamic loader.
#[cfg(feature = "musl")]
pub mod musl;

pub use self::error::*;
pub use self::families::*;
pub use self::library::*;
pub use self::libraryset::*;
pub use self::linker::resolve;
pub use self::selector::*;
pub use self::version::*;
pub use self::wire::*;
