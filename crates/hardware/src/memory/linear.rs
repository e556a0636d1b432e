//! Contiguous memory leaf.

use std::io::{Read, Write};

use super::{Access, Memory, read_fill};
use crate::common::{AccessType, Address, AddressRange, Error, Result};
use crate::component::{Component, Context};

/// Memory backed by one buffer covering its whole range.
#[derive(Clone, Debug)]
pub struct LinearMemory {
    range: AddressRange,
    access: Access,
    data: Vec<u8>,
}

impl LinearMemory {
    /// Creates zero-filled memory covering `range`.
    ///
    /// # Panics
    ///
    /// Panics if the host cannot allocate a buffer of the range's length; use
    /// [`try_new`](Self::try_new) for ranges that come from configuration.
    pub fn new(range: AddressRange, access: Access) -> Self {
        let len = usize::try_from(range.len()).unwrap_or(usize::MAX);
        Self {
            range,
            access,
            data: vec![0; len],
        }
    }

    /// Creates zero-filled memory covering `range`, failing instead of
    /// aborting when the buffer cannot be reserved.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if the range's length does not fit in a `usize`
    /// or the allocator refuses it.
    pub fn try_new(range: AddressRange, access: Access) -> Result<Self> {
        let len = usize::try_from(range.len()).map_err(|_| Error::Allocation { range })?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| Error::Allocation { range })?;
        data.resize(len, 0);
        Ok(Self { range, access, data })
    }

    /// Creates zero-filled read/write memory.
    pub fn ram(range: AddressRange) -> Self {
        Self::new(range, Access::Ram)
    }

    /// Creates zero-filled read-only memory.
    pub fn rom(range: AddressRange) -> Self {
        Self::new(range, Access::Rom)
    }

    /// Creates read-only memory whose leading cells are `contents`.
    ///
    /// Extra bytes beyond the range are ignored.
    pub fn rom_with(range: AddressRange, contents: &[u8]) -> Self {
        let mut rom = Self::rom(range);
        let len = contents.len().min(rom.data.len());
        rom.data[..len].copy_from_slice(&contents[..len]);
        rom
    }

    /// Returns whether writes are accepted.
    pub const fn access(&self) -> Access {
        self.access
    }

    /// Returns the raw cells.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn index(&self, cx: &Context<'_>, access: AccessType, address: Address) -> Result<usize> {
        if self.range.contains(address) {
            Ok(self.range.offset(address) as usize)
        } else {
            Err(Error::access_violation(access, cx.name(), address))
        }
    }
}

impl Memory for LinearMemory {
    fn address_range(&self) -> AddressRange {
        self.range
    }

    fn get_cell(&mut self, cx: &mut Context<'_>, address: Address) -> Result<u8> {
        let index = self.index(cx, AccessType::Read, address)?;
        Ok(self.data[index])
    }

    fn set_cell(&mut self, cx: &mut Context<'_>, address: Address, value: u8) -> Result<()> {
        if self.access == Access::Rom {
            return Err(Error::access_violation(AccessType::Write, cx.name(), address));
        }
        let index = self.index(cx, AccessType::Write, address)?;
        self.data[index] = value;
        Ok(())
    }

    fn serialize(&mut self, _cx: &mut Context<'_>, out: &mut dyn Write) -> Result<()> {
        out.write_all(&self.data)?;
        Ok(())
    }

    fn deserialize(&mut self, _cx: &mut Context<'_>, input: &mut dyn Read) -> Result<()> {
        let _ = read_fill(input, &mut self.data)?;
        Ok(())
    }
}

impl Component for LinearMemory {
    fn as_memory(&self) -> Option<&dyn Memory> {
        Some(self)
    }

    fn as_memory_mut(&mut self) -> Option<&mut dyn Memory> {
        Some(self)
    }
}
