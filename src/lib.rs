#![no_std]
#![doc = include_str!("../README.md")]

mod data;
mod define;
mod fdt;
mod header;
mod node;

pub use define::{FdtError, MemoryReservation, NodeOffset, Token, FDT_MAGIC};
pub use fdt::{Fdt, MemoryReservationIter};
pub use header::Header;
pub use node::{ChildIter, Node, PropIter, Property, StringList};
