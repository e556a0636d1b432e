//! # Main Memory Tests
//!
//! Verifies dispatch to registered children, access violations for uncovered
//! addresses, the one-entry lookup cache, owned versus referenced children,
//! and streaming in registration order.

use hwsim_core::Error;
use hwsim_core::common::AddressRange;
use hwsim_core::component::{ComponentId, ComponentTree};
use hwsim_core::memory::{LinearMemory, MainMemory};
use pretty_assertions::assert_eq;

use crate::common::mocks::memory::{CountingMemory, Counters};

fn ram(tree: &mut ComponentTree, name: &str, start: u64, end: u64) -> ComponentId {
    tree.create(name, LinearMemory::ram(AddressRange::new(start, end)))
}

fn main_memory(tree: &ComponentTree, id: ComponentId) -> &MainMemory {
    tree.get::<MainMemory>(id).unwrap()
}

// ══════════════════════════════════════════════════════════
// 1. Dispatch
// ══════════════════════════════════════════════════════════

#[test]
fn test_cells_route_to_the_covering_child() {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    let low = ram(&mut tree, "low", 0x0000, 0x0FFF);
    let high = ram(&mut tree, "high", 0x8000, 0x8FFF);
    MainMemory::add_memory(&mut tree, main, low, true).unwrap();
    MainMemory::add_memory(&mut tree, main, high, true).unwrap();

    tree.write_cell(main, 0x0010, 1).unwrap();
    tree.write_cell(main, 0x8010, 2).unwrap();

    assert_eq!(tree.read_cell(low, 0x0010).unwrap(), 1);
    assert_eq!(tree.read_cell(high, 0x8010).unwrap(), 2);
    assert_eq!(tree.read_cell(main, 0x8010).unwrap(), 2);
}

#[test]
fn test_aggregate_range_is_the_envelope() {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    assert!(tree.memory_range(main).unwrap().is_empty());

    let a = ram(&mut tree, "a", 0x4000, 0x4FFF);
    let b = ram(&mut tree, "b", 0x1000, 0x1FFF);
    MainMemory::add_memory(&mut tree, main, a, false).unwrap();
    MainMemory::add_memory(&mut tree, main, b, false).unwrap();

    assert_eq!(tree.memory_range(main).unwrap(), AddressRange::new(0x1000, 0x4FFF));
}

#[test]
fn test_uncovered_addresses_violate_with_the_address() {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    let a = ram(&mut tree, "a", 0x0100, 0x01FF);
    let b = ram(&mut tree, "b", 0x0300, 0x03FF);
    MainMemory::add_memory(&mut tree, main, a, true).unwrap();
    MainMemory::add_memory(&mut tree, main, b, true).unwrap();

    // Inside the envelope, in the gap between children.
    let gap = tree.read_cell(main, 0x0250).unwrap_err();
    // Outside the envelope.
    let far = tree.write_cell(main, 0x9000, 1).unwrap_err();

    assert!(matches!(
        gap,
        Error::ReadAccessViolation { address: 0x0250, ref component } if component == "main memory"
    ));
    assert!(matches!(far, Error::WriteAccessViolation { address: 0x9000, .. }));
}

#[test]
fn test_earlier_registration_wins_on_overlap() {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    let first = ram(&mut tree, "first", 0x0000, 0x00FF);
    let second = ram(&mut tree, "second", 0x0080, 0x017F);
    MainMemory::add_memory(&mut tree, main, first, true).unwrap();
    MainMemory::add_memory(&mut tree, main, second, true).unwrap();

    tree.write_cell(main, 0x0090, 0x42).unwrap();

    assert_eq!(tree.read_cell(first, 0x0090).unwrap(), 0x42);
    assert_eq!(tree.read_cell(second, 0x0090).unwrap(), 0);
}

#[test]
fn test_nested_main_memory_sees_regions_added_later() {
    let mut tree = ComponentTree::new();
    let outer = tree.create("outer", MainMemory::new());
    let inner = tree.create("inner", MainMemory::new());
    MainMemory::add_memory(&mut tree, outer, inner, true).unwrap();
    let late = ram(&mut tree, "late", 0x1000, 0x1FFF);

    MainMemory::add_memory(&mut tree, inner, late, true).unwrap();
    tree.write_cell(outer, 0x1000, 0x5A).unwrap();

    assert_eq!(tree.read_cell(outer, 0x1000).unwrap(), 0x5A);
    assert_eq!(tree.read_cell(late, 0x1000).unwrap(), 0x5A);
    assert_eq!(tree.memory_range(outer).unwrap(), AddressRange::new(0x1000, 0x1FFF));
}

#[test]
fn test_nested_main_memory_shrinks_with_its_children() {
    let mut tree = ComponentTree::new();
    let outer = tree.create("outer", MainMemory::new());
    let inner = tree.create("inner", MainMemory::new());
    let a = ram(&mut tree, "a", 0x0000, 0x00FF);
    let b = ram(&mut tree, "b", 0x8000, 0x80FF);
    MainMemory::add_memory(&mut tree, inner, a, true).unwrap();
    MainMemory::add_memory(&mut tree, inner, b, true).unwrap();
    MainMemory::add_memory(&mut tree, outer, inner, true).unwrap();
    assert_eq!(tree.read_cell(outer, 0x8000).unwrap(), 0);

    MainMemory::remove_memory(&mut tree, inner, b).unwrap();

    assert_eq!(tree.memory_range(outer).unwrap(), AddressRange::new(0x0000, 0x00FF));
    assert!(matches!(
        tree.read_cell(outer, 0x8000),
        Err(Error::ReadAccessViolation { address: 0x8000, .. })
    ));
}

// ══════════════════════════════════════════════════════════
// 2. Lookup cache
// ══════════════════════════════════════════════════════════

struct CacheFixture {
    tree: ComponentTree,
    main: ComponentId,
    first: (ComponentId, Counters),
    second: (ComponentId, Counters),
}

fn cache_fixture() -> CacheFixture {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    let first = CountingMemory::new(0x0100, 0x3FFF);
    let second = CountingMemory::new(0x4000, 0x7FFF);
    let (first_counters, second_counters) = (first.counters(), second.counters());
    let first = tree.create("first", first);
    let second = tree.create("second", second);
    MainMemory::add_memory(&mut tree, main, first, true).unwrap();
    MainMemory::add_memory(&mut tree, main, second, true).unwrap();
    first_counters.reset();
    second_counters.reset();
    CacheFixture {
        tree,
        main,
        first: (first, first_counters),
        second: (second, second_counters),
    }
}

#[test]
fn test_cache_hit_skips_rescanning() {
    let mut f = cache_fixture();

    let _ = f.tree.read_cell(f.main, 0x5000).unwrap();
    assert_eq!(main_memory(&f.tree, f.main).last_used(), Some(f.second.0));
    assert_eq!(f.first.1.range_queries(), 1);
    assert_eq!(f.second.1.accesses(), 1);

    let _ = f.tree.read_cell(f.main, 0x5001).unwrap();
    assert_eq!(f.first.1.range_queries(), 1);
    assert_eq!(f.second.1.range_queries(), 1);
    assert_eq!(f.second.1.accesses(), 2);
}

#[test]
fn test_cache_miss_rescans_in_registration_order() {
    let mut f = cache_fixture();
    let _ = f.tree.read_cell(f.main, 0x5000).unwrap();
    f.first.1.reset();
    f.second.1.reset();

    f.tree.write_cell(f.main, 0x0200, 3).unwrap();

    assert_eq!(f.first.1.range_queries(), 1);
    assert_eq!(f.second.1.range_queries(), 0);
    assert_eq!(main_memory(&f.tree, f.main).last_used(), Some(f.first.0));
}

#[test]
fn test_removing_cached_memory_invalidates_cache() {
    let mut f = cache_fixture();
    let _ = f.tree.read_cell(f.main, 0x5000).unwrap();

    MainMemory::remove_memory(&mut f.tree, f.main, f.second.0).unwrap();

    assert_eq!(main_memory(&f.tree, f.main).last_used(), None);
    assert!(matches!(
        f.tree.read_cell(f.main, 0x5000),
        Err(Error::ReadAccessViolation { address: 0x5000, .. })
    ));
}

// ══════════════════════════════════════════════════════════
// 3. Registration
// ══════════════════════════════════════════════════════════

#[test]
fn test_owned_and_referenced_children() {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    let owned = ram(&mut tree, "owned", 0x0000, 0x00FF);
    let shared = ram(&mut tree, "shared", 0x1000, 0x10FF);
    let board = tree.create_group("board");
    tree.add_component(board, shared).unwrap();

    MainMemory::add_memory(&mut tree, main, owned, true).unwrap();
    MainMemory::add_memory(&mut tree, main, shared, false).unwrap();

    assert_eq!(tree.parent(owned), Some(main));
    assert_eq!(tree.parent(shared), Some(board));
    assert!(main_memory(&tree, main).owns(owned));
    assert!(!main_memory(&tree, main).owns(shared));
    assert_eq!(main_memory(&tree, main).memories().collect::<Vec<_>>(), vec![owned, shared]);

    MainMemory::remove_memory(&mut tree, main, owned).unwrap();
    MainMemory::remove_memory(&mut tree, main, shared).unwrap();
    assert_eq!(tree.parent(owned), None);
    assert_eq!(tree.parent(shared), Some(board));
}

#[test]
fn test_owning_a_memory_owned_elsewhere_fails() {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    let shared = ram(&mut tree, "shared", 0x1000, 0x10FF);
    let board = tree.create_group("board");
    tree.add_component(board, shared).unwrap();

    let err = MainMemory::add_memory(&mut tree, main, shared, true).unwrap_err();

    assert!(matches!(err, Error::SubcomponentOwned { .. }));
    assert_eq!(main_memory(&tree, main).memories().count(), 0);
}

#[test]
fn test_double_registration_and_unknown_removal_fail() {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    let a = ram(&mut tree, "a", 0, 0xFF);
    MainMemory::add_memory(&mut tree, main, a, false).unwrap();

    assert!(matches!(
        MainMemory::add_memory(&mut tree, main, a, false),
        Err(Error::SubcomponentOwned { .. })
    ));
    let stranger = ram(&mut tree, "stranger", 0, 0xFF);
    assert!(matches!(
        MainMemory::remove_memory(&mut tree, main, stranger),
        Err(Error::NotSubcomponent { .. })
    ));
}

#[test]
fn test_dispatch_loops_are_rejected() {
    let mut tree = ComponentTree::new();
    let outer = tree.create("outer", MainMemory::new());
    let inner = tree.create("inner", MainMemory::new());
    MainMemory::add_memory(&mut tree, outer, inner, false).unwrap();

    assert!(matches!(
        MainMemory::add_memory(&mut tree, outer, outer, false),
        Err(Error::ComponentLoop { .. })
    ));
    assert!(matches!(
        MainMemory::add_memory(&mut tree, inner, outer, false),
        Err(Error::ComponentLoop { ref component, .. }) if component == "inner"
    ));
    assert_eq!(main_memory(&tree, inner).memories().count(), 0);
    assert!(tree.memory_range(outer).unwrap().is_empty());
}

#[test]
fn test_non_memory_is_rejected() {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    let group = tree.create_group("not memory");
    assert!(matches!(
        MainMemory::add_memory(&mut tree, main, group, true),
        Err(Error::Unsupported { .. })
    ));
    assert_eq!(tree.parent(group), None);
}

#[test]
fn test_replace_memory_keeps_position_and_ownership() {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    let a = ram(&mut tree, "a", 0x0000, 0x00FF);
    let b = ram(&mut tree, "b", 0x1000, 0x10FF);
    let c = ram(&mut tree, "c", 0x2000, 0x20FF);
    MainMemory::add_memory(&mut tree, main, a, true).unwrap();
    MainMemory::add_memory(&mut tree, main, b, true).unwrap();

    MainMemory::replace_memory(&mut tree, main, a, c, true).unwrap();

    assert_eq!(main_memory(&tree, main).memories().collect::<Vec<_>>(), vec![c, b]);
    assert_eq!(tree.children(main), &[c, b]);
    assert_eq!(tree.parent(a), None);
    assert_eq!(tree.memory_range(main).unwrap(), AddressRange::new(0x1000, 0x20FF));
}

// ══════════════════════════════════════════════════════════
// 4. Streaming
// ══════════════════════════════════════════════════════════

#[test]
fn test_streaming_follows_registration_order() {
    let mut tree = ComponentTree::new();
    let main = tree.create("main memory", MainMemory::new());
    let high = ram(&mut tree, "high", 0x10, 0x11);
    let low = ram(&mut tree, "low", 0x00, 0x02);
    MainMemory::add_memory(&mut tree, main, high, true).unwrap();
    MainMemory::add_memory(&mut tree, main, low, true).unwrap();

    tree.deserialize_memory(main, &mut &[1u8, 2, 3, 4, 5][..]).unwrap();
    let mut out = Vec::new();
    tree.serialize_memory(main, &mut out).unwrap();

    assert_eq!(tree.read_cell(main, 0x10).unwrap(), 1);
    assert_eq!(tree.read_cell(main, 0x00).unwrap(), 3);
    assert_eq!(out, vec![1, 2, 3, 4, 5]);
}
