//! Simulated time.

use std::fmt;

/// Coarse unit of simulated time.
pub type Tick = u64;

/// Sub-division of a tick. Phases are absolute within their tick.
pub type Phase = u64;

/// A point in simulated time, ordered by tick and then by phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cycle {
    /// Tick number.
    pub tick: Tick,
    /// Phase within the tick.
    pub phase: Phase,
}

impl Cycle {
    /// Creates a cycle.
    pub const fn new(tick: Tick, phase: Phase) -> Self {
        Self { tick, phase }
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.tick, self.phase)
    }
}
