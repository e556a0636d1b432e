//! # Chunked Memory Tests
//!
//! Verifies lazy chunk allocation, zero reads from unallocated chunks, a
//! short final chunk, and streaming across allocated and missing chunks.

use hwsim_core::Error;
use hwsim_core::common::AddressRange;
use hwsim_core::component::{ComponentId, ComponentTree};
use hwsim_core::memory::chunked::DEFAULT_CHUNK_SIZE;
use hwsim_core::memory::{Access, ChunkedMemory};
use pretty_assertions::assert_eq;

fn chunked(tree: &mut ComponentTree, start: u64, end: u64, chunk_size: usize) -> ComponentId {
    tree.create(
        "chunked",
        ChunkedMemory::new(AddressRange::new(start, end), Access::Ram, chunk_size),
    )
}

fn allocated(tree: &ComponentTree, id: ComponentId) -> usize {
    tree.get::<ChunkedMemory>(id).unwrap().allocated_chunks()
}

#[test]
fn test_zero_chunk_size_selects_default() {
    let memory = ChunkedMemory::new(AddressRange::new(0, 0xFFFF), Access::Ram, 0);
    assert_eq!(memory.chunk_size(), DEFAULT_CHUNK_SIZE);
}

#[test]
fn test_unallocated_cells_read_zero() {
    let mut tree = ComponentTree::new();
    let id = chunked(&mut tree, 0, u64::MAX, 4096);
    assert_eq!(tree.read_cell(id, 0xFFFF_FFFF_0000_1234).unwrap(), 0);
    assert_eq!(allocated(&tree, id), 0);
}

#[test]
fn test_chunks_allocate_on_first_non_zero_write() {
    let mut tree = ComponentTree::new();
    let id = chunked(&mut tree, 0x1000, 0x4FFF, 0x1000);

    tree.write_cell(id, 0x2000, 0).unwrap();
    assert_eq!(allocated(&tree, id), 0);

    tree.write_cell(id, 0x2001, 0x5A).unwrap();
    tree.write_cell(id, 0x2FFF, 0xA5).unwrap();
    assert_eq!(allocated(&tree, id), 1);
    assert_eq!(tree.read_cell(id, 0x2001).unwrap(), 0x5A);
    assert_eq!(tree.read_cell(id, 0x2FFF).unwrap(), 0xA5);

    tree.write_cell(id, 0x4000, 1).unwrap();
    assert_eq!(allocated(&tree, id), 2);
}

#[test]
fn test_rom_and_range_checks() {
    let mut tree = ComponentTree::new();
    let rom = tree.create("rom", ChunkedMemory::rom(AddressRange::new(0, 0xFF)));

    assert!(matches!(
        tree.write_cell(rom, 0x10, 1),
        Err(Error::WriteAccessViolation { address: 0x10, .. })
    ));
    assert!(matches!(
        tree.read_cell(rom, 0x100),
        Err(Error::ReadAccessViolation { address: 0x100, .. })
    ));
}

#[test]
fn test_serialize_pads_missing_chunks_and_short_tail() {
    let mut tree = ComponentTree::new();
    // Ten cells in chunks of four: 4 + 4 + 2.
    let id = chunked(&mut tree, 0x100, 0x109, 4);
    tree.write_cell(id, 0x105, 7).unwrap();
    tree.write_cell(id, 0x109, 9).unwrap();

    let mut out = Vec::new();
    tree.serialize_memory(id, &mut out).unwrap();

    assert_eq!(out, vec![0, 0, 0, 0, 0, 7, 0, 0, 0, 9]);
}

#[test]
fn test_deserialize_only_allocates_non_zero_chunks() {
    let mut tree = ComponentTree::new();
    let id = chunked(&mut tree, 0, 11, 4);

    tree.deserialize_memory(id, &mut &[0u8, 0, 0, 0, 0, 3, 0, 0, 1][..]).unwrap();

    assert_eq!(allocated(&tree, id), 2);
    assert_eq!(tree.read_cell(id, 5).unwrap(), 3);
    assert_eq!(tree.read_cell(id, 8).unwrap(), 1);
    assert_eq!(tree.read_cell(id, 9).unwrap(), 0);
}
