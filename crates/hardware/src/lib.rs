//! Hardware emulation framework.
//!
//! This crate composes simulated computers out of hierarchical components:
//! 1. **Components:** An arena tree of hardware components with a strict
//!    prepare → boot → shutdown → cleanup lifecycle.
//! 2. **Clock:** An event scheduler keyed by `(tick, phase)` that detects when no
//!    component has future work.
//! 3. **Memory:** Linear, chunked, bank-switched, and dispatching memories sharing
//!    one byte-addressable interface.
//! 4. **Execution:** Execution and processing unit capabilities and a clock-driven
//!    execution unit.
//! 5. **System:** The root `ComputerSystem`, its run loop, and assembly from JSON
//!    configuration.
//!
//! Concrete instruction sets and machine wiring are left to users of the crate.

/// Event scheduler and simulated time.
pub mod clock;
/// Addresses, ranges, access types, and the error taxonomy.
pub mod common;
/// Component tree, lifecycle state machine, and the `Component` trait.
pub mod component;
/// Machine configuration (JSON).
pub mod config;
/// Execution and processing units.
pub mod execution;
/// Leveled component logging and log sinks.
pub mod log;
/// Memory capability, leaves, and composites.
pub mod memory;
/// Computer system root, run loop, and builder.
pub mod system;

/// Crate-wide error type and result alias.
pub use crate::common::{Error, Result};
/// Tree owning every component; start here.
pub use crate::component::{Component, ComponentId, ComponentTree};
/// Root configuration; deserialize from JSON or use `Config::default()`.
pub use crate::config::Config;
/// Root component of a machine.
pub use crate::system::ComputerSystem;
