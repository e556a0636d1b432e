//! Hardware components.
//!
//! Every piece of simulated hardware is a node in a [`ComponentTree`]. This module provides:
//! 1. **Identity:** `ComponentId`, a stable index into the tree's arena.
//! 2. **State:** The `prepared`/`running` flag pair and its `Lifecycle` view.
//! 3. **Behaviour:** The `Component` trait with lifecycle hooks, `step`, and
//!    capability downcasts (memory, execution unit, processing unit).
//! 4. **Hook Context:** `Context`, the handle a hook uses to reach the rest of the tree.
//!
//! The tree owns the ownership graph, the lifecycle state machine, and log
//! sink resolution; behaviour objects only implement what is specific to
//! their kind of hardware.

/// Hook execution context.
pub mod context;

/// Arena-backed component tree and lifecycle state machine.
pub mod tree;

use std::any::Any;
use std::fmt;

use crate::common::Result;
use crate::execution::{ExecutionUnit, ProcessingUnit};
use crate::memory::Memory;

pub use context::Context;
pub use tree::{ComponentTree, HaltToken};

/// Stable handle of a component inside a [`ComponentTree`].
///
/// Ids are never reused; a detached component keeps its id and may be
/// attached again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(usize);

impl ComponentId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena slot of this component.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle flags of a component.
///
/// `running` implies `prepared`; the pair `(false, true)` is never produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct State {
    /// Set by `prepare`, cleared by `cleanup`.
    pub prepared: bool,
    /// Set by `boot`, cleared by `shutdown`.
    pub running: bool,
}

impl State {
    /// Freshly created or cleaned up.
    pub const IDLE: Self = Self::new(false, false);
    /// Prepared but not booted, or shut down.
    pub const PREPARED: Self = Self::new(true, false);
    /// Booted.
    pub const RUNNING: Self = Self::new(true, true);

    /// Creates a state from its two flags.
    pub const fn new(prepared: bool, running: bool) -> Self {
        Self { prepared, running }
    }

    /// Returns the named lifecycle stage for these flags.
    pub const fn lifecycle(self) -> Lifecycle {
        match (self.prepared, self.running) {
            (_, true) => Lifecycle::Running,
            (true, false) => Lifecycle::Prepared,
            (false, false) => Lifecycle::Idle,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[P: {}, R: {}]", self.prepared, self.running)
    }
}

/// Named view of [`State`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Neither prepared nor running.
    Idle,
    /// Prepared, not running.
    Prepared,
    /// Prepared and running.
    Running,
}

/// Object-safe access to `Any`, implemented for every `'static` type.
pub trait AsAny: Any {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Returns `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behaviour of a hardware component.
///
/// All methods have defaults, so a plain grouping node is `impl Component for
/// Foo {}`. Lifecycle hooks run inside the tree's state machine, immediately
/// before the component's own flag changes; an error from a hook aborts the
/// transition for this component and propagates to the caller.
pub trait Component: AsAny + Send {
    /// Called while preparing, after every child was prepared.
    fn on_prepare(&mut self, _cx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }

    /// Called while booting, after every child was booted.
    fn on_boot(&mut self, _cx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }

    /// Called while shutting down, before any child is shut down.
    fn on_shutdown(&mut self, _cx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }

    /// Called while cleaning up, after every child was cleaned up.
    fn on_cleanup(&mut self, _cx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }

    /// Advances the component by one unit of work.
    ///
    /// `trigger` is the component that requested the step, if any.
    fn step(&mut self, _cx: &mut Context<'_>, _trigger: Option<ComponentId>) -> Result<()> {
        Ok(())
    }

    /// Returns the memory capability, if this component is addressable memory.
    fn as_memory(&self) -> Option<&dyn Memory> {
        None
    }

    /// Mutable counterpart of [`as_memory`](Self::as_memory).
    fn as_memory_mut(&mut self) -> Option<&mut dyn Memory> {
        None
    }

    /// Returns the execution unit capability, if any.
    fn as_execution_unit_mut(&mut self) -> Option<&mut dyn ExecutionUnit> {
        None
    }

    /// Returns the processing unit capability, if any.
    fn as_processing_unit_mut(&mut self) -> Option<&mut dyn ProcessingUnit> {
        None
    }
}

/// Component with no behaviour of its own, used to group subcomponents.
#[derive(Clone, Copy, Debug, Default)]
pub struct Group;

impl Component for Group {}
