//! Byte-addressable address spaces with switchable banks.
//!
//! An [`AddressSpace`] owns every RAM and ROM buffer of a machine in an arena
//! and maps them into the CPU's view through independent read and write window
//! lists. Windows are bound to a fixed buffer view, a [`BankSlot`] whose
//! selected entry can be switched at any time, a device handler tag, or
//! nothing at all.
//!
//! Device handlers are plain `Copy` tags chosen by the machine (usually an
//! enum). The address space never calls into devices itself: a read or write
//! that lands on a device window is handed back to the machine together with
//! the offset inside the window, and the machine dispatches it. This keeps the
//! borrow of the address space short, so a device write is free to re-install
//! windows or switch banks.
//!
//! | Target            | Read                        | Write                 |
//! |-------------------|-----------------------------|-----------------------|
//! | `Buffer`/`Bank`   | buffer byte                 | stored unless ROM     |
//! | `Device(h)`       | returned to the machine     | returned to machine   |
//! | `Nop`             | open bus, silent            | dropped, silent       |
//! | `Unmapped`/none   | open bus, logged            | dropped, logged       |

mod address_space;
mod bank;

pub use address_space::{Access, AddressSpace, Target, Window};
pub use bank::{BankSlot, SlotId};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle to a buffer owned by an [`AddressSpace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferId(pub(crate) usize);

/// A view into an arena buffer starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferView {
    pub buffer: BufferId,
    pub offset: usize,
}

impl BufferView {
    pub fn new(buffer: BufferId, offset: usize) -> Self {
        Self { buffer, offset }
    }
}

/// Direction of a window in a map listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapDirection {
    Read,
    Write,
}

/// One window of a memory map listing, with its target described in text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    pub direction: MapDirection,
    pub start: u32,
    pub end: u32,
    pub mirror: u32,
    pub target: String,
}

/// Errors raised while configuring memory.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("bank slot '{slot}' has no entry {entry}")]
    UndefinedEntry { slot: String, entry: usize },
    #[error("{len} bytes at offset {offset:#x} do not fit buffer '{buffer}' ({size} bytes)")]
    OutOfBounds {
        buffer: String,
        offset: usize,
        len: usize,
        size: usize,
    },
    #[error("expected {expected} bank selections, got {actual}")]
    SelectionCount { expected: usize, actual: usize },
}
