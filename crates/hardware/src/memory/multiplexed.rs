//! Bank-switched memory.
//!
//! A `MultiplexedMemory` answers for a fixed address range and forwards every
//! access to whichever bank is currently switched in. Typical use is a window
//! that shows RAM, a character ROM, or I/O depending on a banking register.
//! A bank id may be selected even when nothing is registered under it; every
//! access then fails with an access violation, which models an unmapped window.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use super::Memory;
use crate::common::{AccessType, Address, AddressRange, Error, Result};
use crate::component::{Component, ComponentId, ComponentTree, Context};

const CAPABILITY: &str = "multiplexed memory";

/// Identifier of a bank.
pub type BankId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Bank {
    memory: ComponentId,
    owned: bool,
}

/// Memory window switching between registered banks.
#[derive(Clone, Debug)]
pub struct MultiplexedMemory {
    range: AddressRange,
    banks: BTreeMap<BankId, Bank>,
    active: BankId,
}

impl MultiplexedMemory {
    /// Creates a window over `range` with bank 0 selected and no banks registered.
    pub const fn new(range: AddressRange) -> Self {
        Self {
            range,
            banks: BTreeMap::new(),
            active: 0,
        }
    }

    /// Returns the selected bank id.
    pub const fn active_bank(&self) -> BankId {
        self.active
    }

    /// Returns the memory registered under `bank`.
    pub fn bank(&self, bank: BankId) -> Option<ComponentId> {
        self.banks.get(&bank).map(|b| b.memory)
    }

    /// Selects `bank` for every following access.
    pub fn switch_memory(&mut self, bank: BankId) {
        self.active = bank;
    }

    fn owns(&self, memory: ComponentId) -> bool {
        self.banks.values().any(|b| b.memory == memory && b.owned)
    }

    /// Registers `memory` under `bank`, replacing any previous registration
    /// of that bank id.
    ///
    /// The same memory may back several bank ids. With `owned` set it becomes
    /// a subcomponent of the multiplexer (once, however many banks use it).
    ///
    /// # Errors
    ///
    /// * [`Error::Unsupported`] if `memory` is not memory.
    /// * [`Error::SubcomponentOwned`] or [`Error::ComponentLoop`] if `owned`
    ///   is set and `memory` cannot be attached. The previous registration of
    ///   `bank` is kept in that case.
    pub fn add_memory(
        tree: &mut ComponentTree,
        mux: ComponentId,
        bank: BankId,
        memory: ComponentId,
        owned: bool,
    ) -> Result<()> {
        let _ = tree.memory_range(memory)?;
        let this = tree.require::<Self>(mux, CAPABILITY)?;
        let already_owned = this.owns(memory);
        let replaces_other = this.banks.get(&bank).is_some_and(|b| b.memory != memory);
        if owned && !already_owned {
            tree.add_component(mux, memory)?;
        }
        if replaces_other {
            Self::remove_memory(tree, mux, bank)?;
        }
        let _ = tree
            .require_mut::<Self>(mux, CAPABILITY)?
            .banks
            .insert(bank, Bank { memory, owned: owned || already_owned });
        Ok(())
    }

    /// Unregisters `bank`. An owned memory is detached once no other bank
    /// uses it.
    ///
    /// # Errors
    ///
    /// [`Error::NotSubcomponent`] if no memory is registered under `bank`.
    pub fn remove_memory(tree: &mut ComponentTree, mux: ComponentId, bank: BankId) -> Result<()> {
        let this = tree.require_mut::<Self>(mux, CAPABILITY)?;
        let Some(removed) = this.banks.remove(&bank) else {
            return Err(Error::NotSubcomponent {
                component: tree.name(mux).to_owned(),
                subcomponent: format!("bank {bank}"),
                id: mux,
            });
        };
        let still_used = this.banks.values().any(|b| b.memory == removed.memory);
        if removed.owned && !still_used {
            tree.remove_component(mux, removed.memory)?;
        }
        Ok(())
    }

    fn active_memory(&self, cx: &Context<'_>, address: Address, access: AccessType) -> Result<ComponentId> {
        if !self.range.contains(address) {
            return Err(Error::access_violation(access, cx.name(), address));
        }
        self.banks
            .get(&self.active)
            .map(|b| b.memory)
            .ok_or_else(|| Error::access_violation(access, cx.name(), address))
    }
}

impl Memory for MultiplexedMemory {
    fn address_range(&self) -> AddressRange {
        self.range
    }

    fn get_cell(&mut self, cx: &mut Context<'_>, address: Address) -> Result<u8> {
        let memory = self.active_memory(cx, address, AccessType::Read)?;
        cx.tree().read_cell(memory, address)
    }

    fn set_cell(&mut self, cx: &mut Context<'_>, address: Address, value: u8) -> Result<()> {
        let memory = self.active_memory(cx, address, AccessType::Write)?;
        cx.tree().write_cell(memory, address, value)
    }

    /// Streams the active bank only.
    fn serialize(&mut self, cx: &mut Context<'_>, out: &mut dyn Write) -> Result<()> {
        match self.banks.get(&self.active) {
            Some(bank) => cx.tree().serialize_memory(bank.memory, out),
            None => Ok(()),
        }
    }

    /// Refills the active bank only.
    fn deserialize(&mut self, cx: &mut Context<'_>, input: &mut dyn Read) -> Result<()> {
        match self.banks.get(&self.active) {
            Some(bank) => cx.tree().deserialize_memory(bank.memory, input),
            None => Ok(()),
        }
    }
}

impl Component for MultiplexedMemory {
    fn as_memory(&self) -> Option<&dyn Memory> {
        Some(self)
    }

    fn as_memory_mut(&mut self) -> Option<&mut dyn Memory> {
        Some(self)
    }
}
