use crate::ByteOrder;
use crate::Class;
use crate::Error;

use ByteOrder::*;
use Class::*;

macro_rules! define_read {
    ($func: ident, $uint: ident) => {
        #[doc = concat!("Read `", stringify!($uint), "`.")]
        fn $func(&mut self, byte_order: ByteOrder) -> Result<$uint, crate::Error> {
            let mut bytes = [0_u8; ::core::mem::size_of::<$uint>()];
            self.read_bytes(&mut bytes[..])?;
            let ret = match byte_order {
                LittleEndian => $uint::from_le_bytes(bytes),
                BigEndian => $uint::from_be_bytes(bytes),
            };
            Ok(ret)
        }
    };
}

/// ELF-specific read functions.
pub trait ElfRead {
    /// Read enough bytes to fill the buffer `buf`.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), crate::Error>;

    /// Read one byte as `u8`.
    fn read_u8(&mut self) -> Result<u8, crate::Error> {
        let mut bytes = [0_u8; 1];
        self.read_bytes(&mut bytes[..])?;
        Ok(bytes[0])
    }

    define_read!(read_u16, u16);
    define_read!(read_u32, u32);
    define_read!(read_u64, u64);

    /// Read one word.
    ///
    /// Reads `u32` when the class is [`Class::Elf32`], reads `u64` otherwise.
    fn read_word(&mut self, class: Class, byte_order: ByteOrder) -> Result<u64, crate::Error> {
        match class {
            Elf32 => self.read_u32(byte_order).map(Into::into),
            Elf64 => self.read_u64(byte_order),
        }
    }
}

impl<R: std::io::Read + ?Sized> ElfRead for R {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), crate::Error> {
        self.read_exact(buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::NotElf,
            _ => Error::Io(e),
        })
    }
}

/// ELF-specific seek functions.
pub trait ElfSeek {
    /// Seek to the specified offset from the start of the file.
    fn seek(&mut self, offset: u64) -> Result<(), Error>;
}

impl<S: std::io::Seek + ?Sized> ElfSeek for S {
    fn seek(&mut self, offset: u64) -> Result<(), Error> {
        std::io::Seek::seek(self, std::io::SeekFrom::Start(offset))?;
        Ok(())
    }
}

/// Read an entity from a file.
///
/// Usually an entity doesn't occupy the whole section or segment.
pub trait EntityRead {
    /// Read the entity from the `reader`.
    fn read<R: ElfRead>(reader: &mut R, class: Class, byte_order: ByteOrder) -> Result<Self, Error>
    where
        Self: Sized;
}

/// Read a block of data from a file.
///
/// Usually a block occupies the whole section or segment.
pub trait BlockRead {
    /// Read the table from the `reader`.
    fn read<R: ElfRead>(
        reader: &mut R,
        class: Class,
        byte_order: ByteOrder,
        len: u64,
    ) -> Result<Self, Error>
    where
        Self: Sized;
}

impl BlockRead for Vec<u8> {
    fn read<R: ElfRead>(
        reader: &mut R,
        _class: Class,
        _byte_order: ByteOrder,
        len: u64,
    ) -> Result<Self, Error> {
        let n: usize = len.try_into().map_err(|_| Error::TooBig("block size"))?;
        let mut buf = vec![0_u8; n];
        reader.read_bytes(&mut buf[..])?;
        Ok(buf)
    }
}
