//! Demonstration processing unit.
//!
//! `ScanCpu` has no instruction set: every fetch reads the byte at its program
//! counter through the system's main memory, every execute folds it into a
//! running checksum and advances. A zero byte requests a halt. It is enough to
//! exercise the clock, the memory map, and the run loop end to end.

use hwsim_core::clock::Tick;
use hwsim_core::common::{Address, Result};
use hwsim_core::component::{Component, ComponentId, Context};
use hwsim_core::component_log;
use hwsim_core::execution::ProcessingUnit;
use hwsim_core::log::Level;
use hwsim_core::system::ComputerSystem;

/// Byte-scanning processing unit.
#[derive(Debug)]
pub struct ScanCpu {
    entry: Address,
    pc: Address,
    current: u8,
    checksum: u32,
    memory: Option<ComponentId>,
}

impl ScanCpu {
    /// Creates a unit that starts scanning at `entry`.
    pub const fn new(entry: Address) -> Self {
        Self {
            entry,
            pc: entry,
            current: 0,
            checksum: 0,
            memory: None,
        }
    }
}

impl ProcessingUnit for ScanCpu {
    fn fetch(&mut self, cx: &mut Context<'_>) -> Result<Tick> {
        let memory = self.memory.ok_or_else(|| cx.missing("main memory"))?;
        self.current = cx.tree().read_cell(memory, self.pc)?;
        Ok(1)
    }

    fn execute(&mut self, cx: &mut Context<'_>) -> Result<Tick> {
        if self.current == 0 {
            cx.request_halt();
            return Ok(1);
        }
        self.checksum = self.checksum.rotate_left(5) ^ u32::from(self.current);
        self.pc = self.pc.wrapping_add(1);
        Ok(1)
    }

    fn disassemble(&self) -> Option<String> {
        Some(format!("{:#010x}: .byte {:#04x}", self.pc, self.current))
    }
}

impl Component for ScanCpu {
    fn on_boot(&mut self, cx: &mut Context<'_>) -> Result<()> {
        let root = cx.tree_ref().root(cx.id());
        let system = cx.tree_ref().require::<ComputerSystem>(root, "computer system")?;
        self.memory = Some(system.main_memory().ok_or_else(|| cx.missing("main memory"))?);
        Ok(())
    }

    fn on_shutdown(&mut self, cx: &mut Context<'_>) -> Result<()> {
        component_log!(
            cx.tree_ref(),
            cx.id(),
            Level::Notice,
            "scanned {} byte(s) from {:#x}, checksum {:#010x}",
            self.pc.wrapping_sub(self.entry),
            self.entry,
            self.checksum
        );
        Ok(())
    }

    fn on_cleanup(&mut self, _cx: &mut Context<'_>) -> Result<()> {
        self.pc = self.entry;
        self.checksum = 0;
        Ok(())
    }

    fn as_processing_unit_mut(&mut self) -> Option<&mut dyn ProcessingUnit> {
        Some(self)
    }
}
