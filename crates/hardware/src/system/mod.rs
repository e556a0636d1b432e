//! Computer system composition and run loop.
//!
//! A `ComputerSystem` is the root of a simulated machine. It provides:
//! 1. **Composition:** Exactly one main execution unit and one main memory,
//!    both owned subcomponents, swapped atomically when replaced.
//! 2. **Stepping:** One system step steps the main execution unit.
//! 3. **Run loop:** Steps until the system stops running, a halt is requested,
//!    or an error surfaces; errors are logged at critical level and reported,
//!    never propagated.

/// Machine assembly from configuration.
pub mod builder;

use std::fmt::Write as _;

use crate::common::{Error, Result};
use crate::component::{Component, ComponentId, ComponentTree, Context};
use crate::log::{Level, Message};

const CAPABILITY: &str = "computer system";

/// Root component of a simulated machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComputerSystem {
    execution_unit: Option<ComponentId>,
    memory: Option<ComponentId>,
}

/// Why a run loop ended.
#[derive(Debug)]
pub enum RunExit {
    /// The system stopped running on its own.
    Stopped,
    /// A halt was requested and the system was shut down.
    Halted,
    /// The configured step limit was reached; the system is still running.
    StepLimit,
    /// A step (or the halt-triggered shutdown) failed.
    Faulted(Error),
}

/// Outcome of [`ComputerSystem::run`].
#[derive(Debug)]
pub struct RunReport {
    /// Number of steps that completed successfully.
    pub steps: u64,
    /// Why the loop ended.
    pub exit: RunExit,
}

impl ComputerSystem {
    /// Creates a system with nothing attached.
    pub const fn new() -> Self {
        Self {
            execution_unit: None,
            memory: None,
        }
    }

    /// Returns the main execution unit.
    pub const fn main_execution_unit(&self) -> Option<ComponentId> {
        self.execution_unit
    }

    /// Returns the main memory.
    pub const fn main_memory(&self) -> Option<ComponentId> {
        self.memory
    }

    /// Attaches `unit` as the main execution unit, replacing the current one.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] if `unit` is not an execution unit; ownership
    /// errors from the tree. The tree is unchanged on error.
    pub fn set_main_execution_unit(tree: &mut ComponentTree, system: ComponentId, unit: ComponentId) -> Result<()> {
        if tree.component_mut(unit)?.as_execution_unit_mut().is_none() {
            return Err(Error::Unsupported {
                component: tree.name(unit).to_owned(),
                capability: "execution unit",
            });
        }
        let current = tree.require::<Self>(system, CAPABILITY)?.execution_unit;
        tree.attach(system, current, unit)?;
        tree.require_mut::<Self>(system, CAPABILITY)?.execution_unit = Some(unit);
        Ok(())
    }

    /// Attaches `memory` as the main memory, replacing the current one.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] if `memory` is not memory; ownership errors
    /// from the tree. The tree is unchanged on error.
    pub fn set_main_memory(tree: &mut ComponentTree, system: ComponentId, memory: ComponentId) -> Result<()> {
        let _ = tree.memory_range(memory)?;
        let current = tree.require::<Self>(system, CAPABILITY)?.memory;
        tree.attach(system, current, memory)?;
        tree.require_mut::<Self>(system, CAPABILITY)?.memory = Some(memory);
        Ok(())
    }

    /// Steps `system` until it stops running.
    ///
    /// See [`run_for`](Self::run_for).
    pub fn run(tree: &mut ComponentTree, system: ComponentId) -> RunReport {
        Self::run_for(tree, system, None)
    }

    /// Steps `system` until it stops running, a halt is requested, an error
    /// occurs, or `max_steps` steps completed.
    ///
    /// A pending halt request is consumed between steps and answered with
    /// [`ComponentTree::shutdown`]. Errors end the loop and are logged at
    /// [`Level::Critical`] on behalf of the component that raised them.
    pub fn run_for(tree: &mut ComponentTree, system: ComponentId, max_steps: Option<u64>) -> RunReport {
        let mut steps = 0;
        let exit = loop {
            if !tree.is_running(system) {
                break RunExit::Stopped;
            }
            if tree.halt_token().take() {
                match tree.shutdown(system) {
                    Ok(()) => break RunExit::Halted,
                    Err(error) => break RunExit::Faulted(error),
                }
            }
            if max_steps.is_some_and(|limit| steps >= limit) {
                break RunExit::StepLimit;
            }
            match tree.step(system, None) {
                Ok(()) => steps += 1,
                Err(error) => break RunExit::Faulted(error),
            }
        };
        if let RunExit::Faulted(error) = &exit {
            report_critical(tree, system, error);
        }
        RunReport { steps, exit }
    }
}

fn report_critical(tree: &ComponentTree, system: ComponentId, error: &Error) {
    let Some(log) = tree.log(system) else {
        return;
    };
    let kind = match error {
        Error::WrongState { .. } => "wrong state",
        Error::SubcomponentOwned { .. } | Error::NotSubcomponent { .. } | Error::ComponentLoop { .. } => {
            "component graph"
        }
        Error::ReadAccessViolation { .. } | Error::WriteAccessViolation { .. } => "access violation",
        Error::DeadClock { .. } => "dead clock",
        Error::Busy { .. } => "re-entrant access",
        Error::Unsupported { .. } | Error::MissingComponent { .. } => "configuration",
        Error::UnknownComponent { .. } => "component graph",
        Error::Allocation { .. } => "allocation",
        Error::Io(_) => "I/O",
        Error::Config(_) => "configuration",
    };
    let component = error.component().unwrap_or_else(|| tree.name(system));
    let mut message = Message::new(Level::Critical, file!(), line!(), module_path!(), component);
    let _ = write!(message, "{kind}: {error}");
    log.out(message);
}

impl Component for ComputerSystem {
    fn step(&mut self, cx: &mut Context<'_>, _trigger: Option<ComponentId>) -> Result<()> {
        let unit = self.execution_unit.ok_or_else(|| cx.missing("main execution unit"))?;
        let me = cx.id();
        cx.tree().step(unit, Some(me))
    }
}
