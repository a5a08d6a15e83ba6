//! The validated blob handle and its query operations.

use core::ptr::NonNull;

use log::{debug, trace};

use crate::data::Reader;
use crate::define::{FdtError, MemoryReservation, NodeOffset};
use crate::header::Header;
use crate::node::{Node, Property, StringList};

/// A validated view of a device tree blob.
///
/// The handle borrows the caller's buffer and holds nothing beyond the
/// decoded header; every query rescans the structure block from the
/// requested offset. Cloning is cheap and concurrent read-only use from
/// multiple contexts is safe, since no operation writes.
#[derive(Clone)]
pub struct Fdt<'a> {
    header: Header,
    /// Exactly `totalsize` bytes, regardless of how large the caller's
    /// buffer was.
    data: &'a [u8],
}

impl<'a> Fdt<'a> {
    /// Create a new `Fdt` from a byte slice.
    ///
    /// The slice length acts as the maximum permissible length: the blob's
    /// recorded `totalsize` must fit within it, and the resulting handle
    /// covers `totalsize` bytes only. Validation is O(1); the tree is not
    /// walked here.
    ///
    /// # Errors
    ///
    /// Returns `FdtError::BufferTooSmall`, `FdtError::InvalidMagic` or
    /// `FdtError::InvalidLayout` as described in [`Header::from_bytes`] and
    /// [`Header::validate`].
    pub fn from_bytes(data: &'a [u8]) -> Result<Fdt<'a>, FdtError> {
        let header = Header::from_bytes(data)?;
        header.validate(data.len())?;
        let data = &data[..header.totalsize as usize];
        trace!(
            "fdt v{}: totalsize {:#x}, struct {:#x}+{:#x}, strings {:#x}+{:#x}",
            header.version,
            header.totalsize,
            header.off_dt_struct,
            header.size_dt_struct,
            header.off_dt_strings,
            header.size_dt_strings
        );
        Ok(Fdt { header, data })
    }

    /// Create a new `Fdt` from a raw pointer and a maximum permissible
    /// length.
    ///
    /// `max_len` may be a loose bound such as the amount of memory known to
    /// be readable after `ptr` (including `usize::MAX` for "no bound"); no
    /// slice of `max_len` bytes is ever materialized. The handle covers the
    /// header's `totalsize` bytes.
    ///
    /// # Safety
    ///
    /// `ptr` must either be null (reported as `FdtError::InvalidPtr`) or
    /// point to at least `min(max_len, totalsize)` readable bytes that stay
    /// valid and unmodified for `'a`.
    pub unsafe fn from_ptr(ptr: *const u8, max_len: usize) -> Result<Fdt<'a>, FdtError> {
        let ptr = NonNull::new(ptr.cast_mut()).ok_or(FdtError::InvalidPtr)?;
        if max_len < Header::SIZE {
            return Err(FdtError::BufferTooSmall { pos: Header::SIZE });
        }
        // SAFETY: max_len was checked to cover the fixed-size header, and
        // the caller guarantees that many bytes are readable.
        let head = unsafe { core::slice::from_raw_parts(ptr.as_ptr(), Header::SIZE) };
        let header = Header::from_bytes(head)?;
        header.validate(max_len)?;
        // SAFETY: totalsize fits max_len per the validation above.
        let data =
            unsafe { core::slice::from_raw_parts(ptr.as_ptr(), header.totalsize as usize) };
        Ok(Fdt { header, data })
    }

    /// Get a reference to the decoded header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The validated blob, exactly `totalsize` bytes long.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Total size of the blob as recorded in the header.
    pub fn total_size(&self) -> usize {
        self.header.totalsize as usize
    }

    /// The FDT version.
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Physical ID of the system's boot CPU.
    pub fn boot_cpuid_phys(&self) -> u32 {
        self.header.boot_cpuid_phys
    }

    pub(crate) fn struct_block(&self) -> &'a [u8] {
        let start = self.header.off_dt_struct as usize;
        &self.data[start..start + self.header.size_dt_struct as usize]
    }

    pub(crate) fn strings_block(&self) -> &'a [u8] {
        let start = self.header.off_dt_strings as usize;
        &self.data[start..start + self.header.size_dt_strings as usize]
    }

    /// Read the NUL-terminated string at `offset` in the strings block.
    pub(crate) fn string_at(&self, offset: usize) -> Result<&'a str, FdtError> {
        let mut reader = Reader::new(self.strings_block());
        reader.seek(offset)?;
        reader.read_str()
    }

    /// Open the node at `offset`.
    ///
    /// `NodeOffset::ROOT` opens the root node. The offset must point at a
    /// `BEGIN_NODE` token (`NOP` tokens before it are permitted).
    pub fn node(&self, offset: NodeOffset) -> Result<Node<'a>, FdtError> {
        Node::open(self, offset)
    }

    /// Find a property by node offset and name, returning its raw view.
    pub fn property(&self, offset: NodeOffset, name: &str) -> Result<Property<'a>, FdtError> {
        self.node(offset)?.property(name)
    }

    /// Find a string property.
    pub fn string(&self, offset: NodeOffset, name: &str) -> Result<&'a str, FdtError> {
        self.property(offset, name)?.str()
    }

    /// Find a string list property.
    pub fn string_list(
        &self,
        offset: NodeOffset,
        name: &str,
    ) -> Result<StringList<'a>, FdtError> {
        Ok(self.property(offset, name)?.str_list())
    }

    /// Find an integer property, accepting 4-byte and 8-byte encodings.
    pub fn u64(&self, offset: NodeOffset, name: &str) -> Result<u64, FdtError> {
        self.property(offset, name)?.u64()
    }

    /// Resolve a path to a node offset.
    ///
    /// Components are separated by `/`; empty components collapse, so
    /// leading, trailing and doubled separators are permitted, and an empty
    /// or all-separator path resolves to the root. Each component must
    /// match a child name exactly, including any `@unit-address` suffix.
    ///
    /// # Errors
    ///
    /// Returns `FdtError::NotFound` if any component has no matching child;
    /// no partial result is observable.
    pub fn path(&self, path: &str) -> Result<NodeOffset, FdtError> {
        let mut node = self.node(NodeOffset::ROOT)?;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            node = match node.child(part)? {
                Some(child) => child,
                None => {
                    debug!("no node {:?} in path {:?}", part, path);
                    return Err(FdtError::NotFound);
                }
            };
        }
        Ok(node.offset())
    }

    /// Resolve an alias to a node offset.
    ///
    /// Looks up the property `name` of the `/aliases` node and resolves its
    /// string value as a path. Nothing is cached; every call re-resolves
    /// `/aliases` from the root.
    pub fn alias(&self, name: &str) -> Result<NodeOffset, FdtError> {
        let aliases = self.path("/aliases")?;
        let target = self.string(aliases, name)?;
        trace!("alias {:?} -> {:?}", name, target);
        self.path(target)
    }

    /// Find a node by path or alias: a string starting with `/` is resolved
    /// as a path, anything else as an alias.
    pub fn find_node(&self, path: &str) -> Result<Node<'a>, FdtError> {
        let offset = if path.starts_with('/') {
            self.path(path)?
        } else {
            self.alias(path)?
        };
        self.node(offset)
    }

    /// Iterate over the memory reservation block.
    pub fn memory_reservations(&self) -> MemoryReservationIter<'a> {
        MemoryReservationIter {
            data: self.data,
            offset: self.header.off_mem_rsvmap as usize,
        }
    }
}

impl core::fmt::Debug for Fdt<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Fdt")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

/// Iterator over memory reservation block entries.
///
/// Ends at the all-zero terminator entry, or silently at a truncated
/// block.
pub struct MemoryReservationIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Iterator for MemoryReservationIter<'_> {
    type Item = MemoryReservation;

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.offset.checked_add(16)?;
        if end > self.data.len() {
            return None;
        }
        let address = u64::from_be_bytes(self.data[self.offset..self.offset + 8].try_into().unwrap());
        let size = u64::from_be_bytes(self.data[self.offset + 8..end].try_into().unwrap());
        self.offset = end;

        if address == 0 && size == 0 {
            return None;
        }
        Some(MemoryReservation { address, size })
    }
}
