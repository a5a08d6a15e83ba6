//! FDT header decoding and validation.
//!
//! The header appears at the beginning of every device tree blob and
//! records the layout of the blocks that follow. All fields are stored
//! big-endian on-disk and are converted to host order when parsed.

use crate::data::Reader;
use crate::define::{FdtError, FDT_MAGIC};

/// The FDT header structure.
#[derive(Debug, Clone)]
pub struct Header {
    /// FDT header magic number (must be 0xd00dfeed)
    pub magic: u32,
    /// Total size in bytes of the FDT structure
    pub totalsize: u32,
    /// Offset in bytes from the start of the header to the structure block
    pub off_dt_struct: u32,
    /// Offset in bytes from the start of the header to the strings block
    pub off_dt_strings: u32,
    /// Offset in bytes from the start of the header to the memory reservation block
    pub off_mem_rsvmap: u32,
    /// FDT version number
    pub version: u32,
    /// Last compatible FDT version
    pub last_comp_version: u32,
    /// Physical ID of the boot CPU
    pub boot_cpuid_phys: u32,
    /// Length in bytes of the strings block
    pub size_dt_strings: u32,
    /// Length in bytes of the structure block
    pub size_dt_struct: u32,
}

impl Header {
    /// Encoded size of the header in bytes.
    pub const SIZE: usize = 40;

    /// Read a header from the beginning of a byte slice.
    ///
    /// Decodes the ten big-endian fields and validates the magic number.
    /// The size fields are not checked here; see [`Header::validate`].
    ///
    /// # Errors
    ///
    /// Returns `FdtError::BufferTooSmall` if the slice is too small to
    /// contain a complete header, or `FdtError::InvalidMagic` if the magic
    /// number doesn't match the expected value.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FdtError> {
        if data.len() < Self::SIZE {
            return Err(FdtError::BufferTooSmall { pos: Self::SIZE });
        }
        let mut reader = Reader::new(data);

        let magic = reader.read_u32()?;
        if magic != FDT_MAGIC {
            return Err(FdtError::InvalidMagic(magic));
        }

        let totalsize = reader.read_u32()?;
        let off_dt_struct = reader.read_u32()?;
        let off_dt_strings = reader.read_u32()?;
        let off_mem_rsvmap = reader.read_u32()?;
        let version = reader.read_u32()?;
        let last_comp_version = reader.read_u32()?;
        let boot_cpuid_phys = reader.read_u32()?;
        let size_dt_strings = reader.read_u32()?;
        let size_dt_struct = reader.read_u32()?;

        Ok(Header {
            magic,
            totalsize,
            off_dt_struct,
            off_dt_strings,
            off_mem_rsvmap,
            version,
            last_comp_version,
            boot_cpuid_phys,
            size_dt_strings,
            size_dt_struct,
        })
    }

    /// Check the size fields against a caller-supplied maximum length.
    ///
    /// `max_len` may be a loose upper bound such as the amount of memory
    /// remaining after the blob, rather than its exact size; the recorded
    /// `totalsize` is authoritative once it fits the bound.
    ///
    /// # Errors
    ///
    /// Returns `FdtError::BufferTooSmall` if `totalsize` exceeds `max_len`,
    /// or `FdtError::InvalidLayout` if `totalsize` cannot hold the header
    /// itself or either block falls outside of it. The sums are computed in
    /// u64, so `offset + size` cannot wrap.
    pub fn validate(&self, max_len: usize) -> Result<(), FdtError> {
        let total = u64::from(self.totalsize);
        if (max_len as u64) < total {
            return Err(FdtError::BufferTooSmall {
                pos: self.totalsize as usize,
            });
        }
        if total < Self::SIZE as u64 {
            return Err(FdtError::InvalidLayout);
        }
        let struct_end = u64::from(self.off_dt_struct) + u64::from(self.size_dt_struct);
        let strings_end = u64::from(self.off_dt_strings) + u64::from(self.size_dt_strings);
        if struct_end > total || strings_end > total {
            return Err(FdtError::InvalidLayout);
        }
        Ok(())
    }
}
