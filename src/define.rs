//! Core type definitions and constants.
//!
//! This module provides the fundamental types used throughout the crate:
//! the magic number constant, structure block tokens, node offsets, and
//! the error type.

use core::ffi::FromBytesUntilNulError;
use core::fmt::Display;

/// The magic number that identifies a valid Flattened Device Tree blob.
///
/// This value (0xd00dfeed) must be present at the beginning of any
/// valid device tree blob. It is used for validation when parsing.
pub const FDT_MAGIC: u32 = 0xd00dfeed;

/// Token type for parsing the FDT structure block.
///
/// The device tree structure block is composed of a sequence of 32-bit
/// big-endian tokens followed by data. This enum represents the possible
/// token values.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token {
    /// Marks the beginning of a node (FDT_BEGIN_NODE, 0x00000001)
    BeginNode,
    /// Marks the end of a node (FDT_END_NODE, 0x00000002)
    EndNode,
    /// Marks a property (FDT_PROP, 0x00000003)
    Prop,
    /// No-op token, skipped wherever it appears (FDT_NOP, 0x00000004)
    Nop,
    /// Marks the end of the structure block (FDT_END, 0x00000009)
    End,
    /// Any other 32-bit value (invalid or unknown token)
    Data(u32),
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        match value {
            0x1 => Token::BeginNode,
            0x2 => Token::EndNode,
            0x3 => Token::Prop,
            0x4 => Token::Nop,
            0x9 => Token::End,
            _ => Token::Data(value),
        }
    }
}

impl From<Token> for u32 {
    fn from(value: Token) -> Self {
        match value {
            Token::BeginNode => 0x1,
            Token::EndNode => 0x2,
            Token::Prop => 0x3,
            Token::Nop => 0x4,
            Token::End => 0x9,
            Token::Data(v) => v,
        }
    }
}

/// Byte offset of a node within the structure block.
///
/// A node is identified by the offset of its `BEGIN_NODE` token relative to
/// the start of the structure block; no node objects are materialized.
/// Offsets are produced by [`Fdt::path`](crate::Fdt::path),
/// [`Fdt::alias`](crate::Fdt::alias) and child enumeration, and remain
/// meaningful for as long as the underlying blob is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeOffset(usize);

impl NodeOffset {
    /// Offset of the root node.
    pub const ROOT: NodeOffset = NodeOffset(0);

    /// Returns the raw byte offset into the structure block.
    pub fn raw(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeOffset {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl Display for NodeOffset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Entry in the memory reservation block.
///
/// The memory reservation block lists physical memory regions that must be
/// preserved (not used by the OS) during boot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryReservation {
    /// Physical address of the reserved region
    pub address: u64,
    /// Size of the reserved region in bytes
    pub size: u64,
}

/// Errors that can occur while parsing or querying a device tree blob.
///
/// Malformed input is a normal, recoverable condition here: the blob is
/// platform-supplied and may be absent, truncated or corrupt. Every variant
/// other than [`FdtError::NotFound`] indicates either a malformed blob or a
/// caller-side constraint violation; `NotFound` means the blob is fine and
/// the requested node, property, path or alias simply is not there.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FdtError {
    /// A requested node, property, path or alias was not found
    #[error("not found")]
    NotFound,
    /// A read would run past the end of its block at the given position
    #[error("buffer too small at position {pos}")]
    BufferTooSmall {
        /// The position at which the read would have ended
        pos: usize,
    },
    /// The FDT magic number doesn't match the expected value
    #[error("invalid magic number {0:#x} != {FDT_MAGIC:#x}")]
    InvalidMagic(u32),
    /// An invalid pointer was provided
    #[error("invalid pointer")]
    InvalidPtr,
    /// The header's block offsets or sizes fall outside the total size
    #[error("structure or strings block out of bounds")]
    InvalidLayout,
    /// An unexpected or unknown token was encountered in the structure block
    #[error("unexpected token {value:#x} at position {pos}")]
    BadToken {
        /// The raw 32-bit token value
        value: u32,
        /// Structure block offset of the token
        pos: usize,
    },
    /// A property value has a length its requested decoding does not permit
    #[error("invalid property value length {0}")]
    InvalidValueLen(usize),
    /// A NUL-terminated string was expected but no terminator was found
    #[error("string value is not NUL-terminated")]
    MissingNul,
    /// Failed to parse data as a UTF-8 string
    #[error("failed to parse UTF-8 string")]
    Utf8Parse,
}

impl From<core::str::Utf8Error> for FdtError {
    fn from(_: core::str::Utf8Error) -> Self {
        FdtError::Utf8Parse
    }
}

impl From<FromBytesUntilNulError> for FdtError {
    fn from(_: FromBytesUntilNulError) -> Self {
        FdtError::MissingNul
    }
}
