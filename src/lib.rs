#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod byte_order;
mod class;
pub(crate) mod constants;
mod dynamic_table;
mod elf;
mod enums;
mod error;
mod flags;
mod header;
mod io;
mod macros;
mod sections;
mod segments;
mod strings;
mod versions;

pub use self::byte_order::*;
pub use self::class::*;
pub use self::dynamic_table::*;
pub use self::elf::*;
pub use self::enums::*;
pub use self::error::*;
pub use self::flags::*;
pub use self::header::*;
pub use self::io::*;
pub(crate) use self::macros::*;
pub use self::sections::*;
pub use self::segments::*;
pub use self::strings::*;
pub use self::versions::*;
