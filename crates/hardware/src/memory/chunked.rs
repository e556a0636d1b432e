//! Sparse memory leaf.
//!
//! Large address ranges are split into fixed-size chunks that are only
//! allocated once a non-zero value is stored in them. Unallocated chunks read
//! as zero, so a mostly empty multi-gigabyte RAM costs almost nothing.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use super::{Access, Memory, read_fill};
use crate::common::{AccessType, Address, AddressRange, Error, Result};
use crate::component::{Component, Context};

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Memory backed by lazily allocated chunks.
#[derive(Clone, Debug)]
pub struct ChunkedMemory {
    range: AddressRange,
    access: Access,
    chunk_size: usize,
    chunks: BTreeMap<u64, Box<[u8]>>,
}

impl ChunkedMemory {
    /// Creates zero-filled chunked memory; a zero `chunk_size` selects the default.
    pub fn new(range: AddressRange, access: Access, chunk_size: usize) -> Self {
        Self {
            range,
            access,
            chunk_size: if chunk_size == 0 { DEFAULT_CHUNK_SIZE } else { chunk_size },
            chunks: BTreeMap::new(),
        }
    }

    /// Creates zero-filled read/write memory with the default chunk size.
    pub fn ram(range: AddressRange) -> Self {
        Self::new(range, Access::Ram, DEFAULT_CHUNK_SIZE)
    }

    /// Creates zero-filled read-only memory with the default chunk size.
    pub fn rom(range: AddressRange) -> Self {
        Self::new(range, Access::Rom, DEFAULT_CHUNK_SIZE)
    }

    /// Returns the chunk size in bytes.
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks currently allocated.
    pub fn allocated_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Splits an in-range address into (chunk index, offset in chunk).
    fn locate(&self, cx: &Context<'_>, access: AccessType, address: Address) -> Result<(u64, usize)> {
        if !self.range.contains(address) {
            return Err(Error::access_violation(access, cx.name(), address));
        }
        let offset = self.range.offset(address);
        let size = self.chunk_size as u64;
        Ok((offset / size, (offset % size) as usize))
    }

    /// Length of chunk `index`; the last chunk may be short.
    fn chunk_len(&self, index: u64) -> usize {
        let start = u128::from(index) * self.chunk_size as u128;
        (self.range.len() - start).min(self.chunk_size as u128) as usize
    }

    fn chunk_count(&self) -> u64 {
        self.range.len().div_ceil(self.chunk_size as u128) as u64
    }
}

impl Memory for ChunkedMemory {
    fn address_range(&self) -> AddressRange {
        self.range
    }

    fn get_cell(&mut self, cx: &mut Context<'_>, address: Address) -> Result<u8> {
        let (index, offset) = self.locate(cx, AccessType::Read, address)?;
        Ok(self.chunks.get(&index).map_or(0, |chunk| chunk[offset]))
    }

    fn set_cell(&mut self, cx: &mut Context<'_>, address: Address, value: u8) -> Result<()> {
        if self.access == Access::Rom {
            return Err(Error::access_violation(AccessType::Write, cx.name(), address));
        }
        let (index, offset) = self.locate(cx, AccessType::Write, address)?;
        if let Some(chunk) = self.chunks.get_mut(&index) {
            chunk[offset] = value;
        } else if value != 0 {
            let mut chunk = vec![0; self.chunk_len(index)].into_boxed_slice();
            chunk[offset] = value;
            let _ = self.chunks.insert(index, chunk);
        }
        Ok(())
    }

    fn serialize(&mut self, _cx: &mut Context<'_>, out: &mut dyn Write) -> Result<()> {
        let zeros = vec![0; self.chunk_size];
        for index in 0..self.chunk_count() {
            match self.chunks.get(&index) {
                Some(chunk) => out.write_all(chunk)?,
                None => out.write_all(&zeros[..self.chunk_len(index)])?,
            }
        }
        Ok(())
    }

    fn deserialize(&mut self, _cx: &mut Context<'_>, input: &mut dyn Read) -> Result<()> {
        let mut buffer = vec![0; self.chunk_size];
        for index in 0..self.chunk_count() {
            let len = self.chunk_len(index);
            let filled = read_fill(input, &mut buffer[..len])?;
            if filled == 0 {
                break;
            }
            match self.chunks.get_mut(&index) {
                Some(chunk) => chunk[..filled].copy_from_slice(&buffer[..filled]),
                None if buffer[..filled].iter().any(|&b| b != 0) => {
                    let mut chunk = vec![0; len].into_boxed_slice();
                    chunk[..filled].copy_from_slice(&buffer[..filled]);
                    let _ = self.chunks.insert(index, chunk);
                }
                None => {}
            }
            if filled < len {
                break;
            }
        }
        Ok(())
    }
}

impl Component for ChunkedMemory {
    fn as_memory(&self) -> Option<&dyn Memory> {
        Some(self)
    }

    fn as_memory_mut(&mut self) -> Option<&mut dyn Memory> {
        Some(self)
    }
}
