//! Main memory dispatcher.
//!
//! `MainMemory` stitches several memories into one address space. It provides:
//! 1. **Registration:** Children are kept in registration order and may be owned
//!    by the main memory in the tree or merely referenced.
//! 2. **Dispatch:** A one-entry cache of the last memory hit, then a linear scan
//!    in registration order; the first child containing the address wins.
//! 3. **Aggregate range:** The envelope of every child's current range, used to
//!    reject far-off addresses before scanning. Nested main memories report
//!    the envelope of their own children, so growth anywhere below is seen.
//! 4. **Streaming:** Serialization visits every child in registration order.

use std::io::{Read, Write};

use super::Memory;
use crate::common::{AccessType, Address, AddressRange, Error, Result};
use crate::component::{Component, ComponentId, ComponentTree, Context};

const CAPABILITY: &str = "main memory";

#[derive(Clone, Copy, Debug)]
struct Entry {
    id: ComponentId,
    owned: bool,
}

/// Address dispatcher over registered child memories.
#[derive(Clone, Debug, Default)]
pub struct MainMemory {
    entries: Vec<Entry>,
    /// Envelope as of the last registration change or out-of-envelope access.
    range: AddressRange,
    last_used: Option<(ComponentId, AddressRange)>,
}

impl MainMemory {
    /// Creates a main memory with no children.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered memories in registration order.
    pub fn memories(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.entries.iter().map(|entry| entry.id)
    }

    /// Returns `true` if `memory` is registered and owned by this main memory.
    pub fn owns(&self, memory: ComponentId) -> bool {
        self.entries.iter().any(|entry| entry.id == memory && entry.owned)
    }

    /// Returns the cached last-used memory, if any.
    pub fn last_used(&self) -> Option<ComponentId> {
        self.last_used.map(|(id, _)| id)
    }

    /// Envelope of every child's current range. Children that cannot be
    /// inspected right now (busy) are left out.
    fn envelope(&self, tree: &ComponentTree) -> AddressRange {
        self.entries
            .iter()
            .filter_map(|entry| tree.memory_range(entry.id).ok())
            .fold(AddressRange::empty(), |acc, range| acc.envelope(&range))
    }

    fn update_envelope(tree: &mut ComponentTree, main: ComponentId) -> Result<()> {
        let envelope = tree.require::<Self>(main, CAPABILITY)?.envelope(tree);
        tree.require_mut::<Self>(main, CAPABILITY)?.range = envelope;
        Ok(())
    }

    /// Returns `true` if accesses to `from` can reach `target` through
    /// main memory registrations.
    fn dispatches_to(tree: &ComponentTree, from: ComponentId, target: ComponentId) -> bool {
        from == target
            || tree
                .get::<Self>(from)
                .is_some_and(|mm| mm.entries.iter().any(|entry| Self::dispatches_to(tree, entry.id, target)))
    }

    fn dispatch_loop(tree: &ComponentTree, main: ComponentId, memory: ComponentId) -> Error {
        Error::ComponentLoop {
            component: tree.name(main).to_owned(),
            subcomponent: tree.name(memory).to_owned(),
            id: memory,
        }
    }

    fn not_registered(tree: &ComponentTree, main: ComponentId, memory: ComponentId) -> Error {
        Error::NotSubcomponent {
            component: tree.name(main).to_owned(),
            subcomponent: tree.name(memory).to_owned(),
            id: memory,
        }
    }

    fn already_registered(tree: &ComponentTree, main: ComponentId, memory: ComponentId) -> Error {
        Error::SubcomponentOwned {
            component: tree.name(main).to_owned(),
            subcomponent: tree.name(memory).to_owned(),
            id: memory,
        }
    }

    fn position(&self, memory: ComponentId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == memory)
    }

    /// Registers `memory` after every existing child.
    ///
    /// With `owned` set the memory also becomes a subcomponent of `main` and
    /// follows its lifecycle.
    ///
    /// # Errors
    ///
    /// * [`Error::Unsupported`] if `memory` is not memory or `main` is not a
    ///   `MainMemory`.
    /// * [`Error::SubcomponentOwned`] if `memory` is already registered, or
    ///   is owned elsewhere while `owned` is set.
    /// * [`Error::ComponentLoop`] if attaching would create a cycle, in the
    ///   tree or in address dispatch.
    pub fn add_memory(tree: &mut ComponentTree, main: ComponentId, memory: ComponentId, owned: bool) -> Result<()> {
        let _ = tree.memory_range(memory)?;
        if tree.require::<Self>(main, CAPABILITY)?.position(memory).is_some() {
            return Err(Self::already_registered(tree, main, memory));
        }
        if Self::dispatches_to(tree, memory, main) {
            return Err(Self::dispatch_loop(tree, main, memory));
        }
        if owned {
            tree.add_component(main, memory)?;
        }
        tree.require_mut::<Self>(main, CAPABILITY)?
            .entries
            .push(Entry { id: memory, owned });
        Self::update_envelope(tree, main)
    }

    /// Unregisters `memory`, detaching it from the tree if it was owned.
    ///
    /// # Errors
    ///
    /// [`Error::NotSubcomponent`] if `memory` is not registered.
    pub fn remove_memory(tree: &mut ComponentTree, main: ComponentId, memory: ComponentId) -> Result<()> {
        let mm = tree.require::<Self>(main, CAPABILITY)?;
        let Some(position) = mm.position(memory) else {
            return Err(Self::not_registered(tree, main, memory));
        };
        if mm.entries[position].owned {
            tree.remove_component(main, memory)?;
        }
        let mm = tree.require_mut::<Self>(main, CAPABILITY)?;
        let _ = mm.entries.remove(position);
        if mm.last_used() == Some(memory) {
            mm.last_used = None;
        }
        Self::update_envelope(tree, main)
    }

    /// Replaces the registered `old` by `new` at the same position.
    ///
    /// Tree ownership follows the flags: an owned `old` is detached, an owned
    /// `new` is attached. Nothing changes if any step would fail.
    pub fn replace_memory(
        tree: &mut ComponentTree,
        main: ComponentId,
        old: ComponentId,
        new: ComponentId,
        owned: bool,
    ) -> Result<()> {
        let _ = tree.memory_range(new)?;
        let mm = tree.require::<Self>(main, CAPABILITY)?;
        let Some(position) = mm.position(old) else {
            return Err(Self::not_registered(tree, main, old));
        };
        if old == new {
            return Ok(());
        }
        if mm.position(new).is_some() {
            return Err(Self::already_registered(tree, main, new));
        }
        if Self::dispatches_to(tree, new, main) {
            return Err(Self::dispatch_loop(tree, main, new));
        }
        match (mm.entries[position].owned, owned) {
            (true, true) => tree.replace_component(main, old, new)?,
            (true, false) => tree.remove_component(main, old)?,
            (false, true) => tree.add_component(main, new)?,
            (false, false) => {}
        }
        let mm = tree.require_mut::<Self>(main, CAPABILITY)?;
        mm.entries[position] = Entry { id: new, owned };
        if mm.last_used() == Some(old) {
            mm.last_used = None;
        }
        Self::update_envelope(tree, main)
    }

    /// Finds the child memory answering for `address`.
    ///
    /// Checks the last-used memory first, then scans children in registration
    /// order asking each for its current range, and caches the hit.
    ///
    /// # Errors
    ///
    /// The access violation matching `access` if no child contains `address`.
    pub fn get_memory(&mut self, cx: &Context<'_>, address: Address, access: AccessType) -> Result<ComponentId> {
        if let Some((id, range)) = self.last_used {
            if range.contains(address) {
                return Ok(id);
            }
        }
        for entry in &self.entries {
            let range = cx.tree_ref().memory_range(entry.id)?;
            if range.contains(address) {
                self.last_used = Some((entry.id, range));
                return Ok(entry.id);
            }
        }
        Err(Error::access_violation(access, cx.name(), address))
    }

    fn check_range(&mut self, cx: &Context<'_>, address: Address, access: AccessType) -> Result<()> {
        if !self.range.contains(address) {
            // A child may have grown since the envelope was computed.
            self.range = self.envelope(cx.tree_ref());
        }
        if self.range.contains(address) {
            Ok(())
        } else {
            Err(Error::access_violation(access, cx.name(), address))
        }
    }
}

impl Memory for MainMemory {
    fn address_range(&self) -> AddressRange {
        self.range
    }

    fn current_range(&self, tree: &ComponentTree) -> Result<AddressRange> {
        Ok(self.envelope(tree))
    }

    fn get_cell(&mut self, cx: &mut Context<'_>, address: Address) -> Result<u8> {
        self.check_range(cx, address, AccessType::Read)?;
        let memory = self.get_memory(cx, address, AccessType::Read)?;
        cx.tree().read_cell(memory, address)
    }

    fn set_cell(&mut self, cx: &mut Context<'_>, address: Address, value: u8) -> Result<()> {
        self.check_range(cx, address, AccessType::Write)?;
        let memory = self.get_memory(cx, address, AccessType::Write)?;
        cx.tree().write_cell(memory, address, value)
    }

    fn serialize(&mut self, cx: &mut Context<'_>, out: &mut dyn Write) -> Result<()> {
        for entry in &self.entries {
            cx.tree().serialize_memory(entry.id, out)?;
        }
        Ok(())
    }

    fn deserialize(&mut self, cx: &mut Context<'_>, input: &mut dyn Read) -> Result<()> {
        for entry in &self.entries {
            cx.tree().deserialize_memory(entry.id, input)?;
        }
        Ok(())
    }
}

impl Component for MainMemory {
    fn as_memory(&self) -> Option<&dyn Memory> {
        Some(self)
    }

    fn as_memory_mut(&mut self) -> Option<&mut dyn Memory> {
        Some(self)
    }
}
