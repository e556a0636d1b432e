//! Execution units.
//!
//! An execution unit is what a computer system steps. This module provides:
//! 1. **`ExecutionUnit`:** The capability the system requires of its main unit.
//! 2. **`ProcessingUnit`:** A fetch/execute engine (a CPU core model) that
//!    reports how many ticks each half of an instruction takes.
//! 3. **`ClockedExecutionUnit`:** Couples one processing unit to one clock,
//!    alternating fetch (phase 0) and execute (phase 1) events.

/// Clock-driven execution unit.
pub mod clocked;

use crate::clock::Tick;
use crate::common::Result;
use crate::component::Context;

pub use clocked::ClockedExecutionUnit;

/// Capability of a component that can serve as a system's main execution unit.
///
/// Stepping is [`Component::step`](crate::component::Component::step).
pub trait ExecutionUnit {
    /// Starts logging a disassembly of every executed instruction.
    fn enable_disassemble(&mut self);

    /// Stops logging disassembly.
    fn disable_disassemble(&mut self);

    /// Returns `true` while disassembly logging is on.
    fn is_disassembling(&self) -> bool;
}

/// A fetch/execute engine.
pub trait ProcessingUnit {
    /// Fetches the next instruction; returns the ticks until it can execute.
    fn fetch(&mut self, cx: &mut Context<'_>) -> Result<Tick>;

    /// Executes the fetched instruction; returns the ticks until the next fetch.
    fn execute(&mut self, cx: &mut Context<'_>) -> Result<Tick>;

    /// Describes the fetched instruction, if the unit can.
    fn disassemble(&self) -> Option<String> {
        None
    }
}
