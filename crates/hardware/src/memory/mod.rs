//! Addressable memory.
//!
//! This module implements the layered address-space model. It provides:
//! 1. **Capability:** The `Memory` trait every addressable component exposes
//!    through [`Component::as_memory`](crate::component::Component::as_memory).
//! 2. **Leaves:** `LinearMemory` (one contiguous buffer) and `ChunkedMemory`
//!    (lazily allocated fixed-size chunks), each as RAM or ROM.
//! 3. **Composites:** `MainMemory`, routing addresses to registered children with
//!    a one-entry lookup cache, and `MultiplexedMemory`, exposing one of several
//!    banks at a time.
//! 4. **Images:** Loading and dumping raw memory contents from and to files.
//!
//! Cells are bytes. Serialization writes every cell of a memory in address
//! order with no framing.

/// Lazily allocated chunked storage.
pub mod chunked;

/// Raw image files.
pub mod image;

/// Contiguous storage.
pub mod linear;

/// Address dispatcher over child memories.
pub mod main_memory;

/// Bank-switched memory.
pub mod multiplexed;

use std::io::{self, Read, Write};

use crate::common::{Address, AddressRange, Result};
use crate::component::{ComponentTree, Context};

pub use chunked::ChunkedMemory;
pub use linear::LinearMemory;
pub use main_memory::MainMemory;
pub use multiplexed::MultiplexedMemory;

/// Whether a memory leaf accepts `set_cell`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Access {
    /// Read/write.
    #[default]
    Ram,
    /// Read-only; writes fail with a write access violation. Deserialization
    /// still fills it.
    Rom,
}

/// Byte-addressable memory.
///
/// Addresses passed to every method are absolute; implementations translate
/// them with [`AddressRange::offset`].
pub trait Memory {
    /// Range of addresses this memory answers for.
    fn address_range(&self) -> AddressRange;

    /// Range this memory answers for right now, asking `tree` about any
    /// child memories it dispatches to.
    ///
    /// Leaves answer with [`address_range`](Self::address_range).
    fn current_range(&self, _tree: &ComponentTree) -> Result<AddressRange> {
        Ok(self.address_range())
    }

    /// Reads the cell at `address`.
    fn get_cell(&mut self, cx: &mut Context<'_>, address: Address) -> Result<u8>;

    /// Writes the cell at `address`.
    fn set_cell(&mut self, cx: &mut Context<'_>, address: Address, value: u8) -> Result<()>;

    /// Writes the whole content to `out` in address order.
    fn serialize(&mut self, cx: &mut Context<'_>, out: &mut dyn Write) -> Result<()>;

    /// Refills the content from `input` in address order.
    ///
    /// A short input leaves the remaining cells untouched.
    fn deserialize(&mut self, cx: &mut Context<'_>, input: &mut dyn Read) -> Result<()>;
}

/// Reads from `input` until `buf` is full or the input is exhausted.
///
/// Returns the number of bytes read.
pub(crate) fn read_fill(input: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
