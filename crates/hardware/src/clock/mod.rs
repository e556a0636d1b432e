//! Event-driven clock.
//!
//! This module implements the scheduler that drives simulated time. It provides:
//! 1. **Cycles:** `Cycle`, a `(tick, phase)` pair ordered lexicographically.
//! 2. **Scheduling:** Callbacks keyed by the cycle they fire at; callbacks at the
//!    same cycle fire in insertion order. A phase past the clock's phase count
//!    carries over into later ticks.
//! 3. **Stepping:** Each step jumps straight to the next pending cycle and fires
//!    everything scheduled there.
//! 4. **Deadlock detection:** A step with no future event (or only events past
//!    the tick limit) fails with `DeadClock`.
//!
//! The clock is itself a [`Component`]: stepping it through the tree advances
//! time, and cleaning it up drops every pending event.

/// Cycle, tick, and phase types.
pub mod cycle;

use std::collections::BTreeMap;
use std::fmt;

use crate::common::{Error, Result};
use crate::component::{Component, ComponentId, Context};
use crate::component_log;
use crate::log::Level;

pub use cycle::{Cycle, Phase, Tick};

/// A scheduled action. Receives the clock, so it can schedule follow-ups,
/// and the clock's context, so it can reach other components.
pub type Callback = Box<dyn FnOnce(&mut Clock, &mut Context<'_>) -> Result<()> + Send>;

/// Phase count of a clock that was not given one: every phase is taken as is.
pub const UNBOUNDED_PHASES: Phase = Phase::MAX;

/// Pending-event queue and current simulated time.
pub struct Clock {
    cycle: Cycle,
    tick_limit: Option<Tick>,
    phases_per_tick: Phase,
    events: BTreeMap<Cycle, Vec<Callback>>,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            cycle: Cycle::default(),
            tick_limit: None,
            phases_per_tick: UNBOUNDED_PHASES,
            events: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("cycle", &self.cycle)
            .field("tick_limit", &self.tick_limit)
            .field("phases_per_tick", &self.phases_per_tick)
            .field("pending", &self.pending())
            .finish()
    }
}

impl Clock {
    /// Creates a clock at `(0, 0)` with no tick limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock that treats events after `tick_limit` as unreachable.
    pub fn with_tick_limit(tick_limit: Tick) -> Self {
        Self {
            tick_limit: Some(tick_limit),
            ..Self::default()
        }
    }

    /// Creates a clock whose ticks are divided into `phases` phases.
    pub fn with_phases_per_tick(phases: Phase) -> Self {
        let mut clock = Self::default();
        clock.set_phases_per_tick(phases);
        clock
    }

    /// Sets or clears the tick limit.
    pub const fn set_tick_limit(&mut self, tick_limit: Option<Tick>) {
        self.tick_limit = tick_limit;
    }

    /// Sets the number of phases per tick; zero is treated as one.
    ///
    /// Only affects callbacks scheduled afterwards.
    pub fn set_phases_per_tick(&mut self, phases: Phase) {
        self.phases_per_tick = phases.max(1);
    }

    /// Returns the number of phases per tick.
    pub const fn phases_per_tick(&self) -> Phase {
        self.phases_per_tick
    }

    /// Returns the current cycle.
    pub const fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Returns the configured tick limit.
    pub const fn tick_limit(&self) -> Option<Tick> {
        self.tick_limit
    }

    /// Number of callbacks waiting to fire.
    pub fn pending(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    /// Returns the earliest cycle with a pending callback.
    pub fn next_event(&self) -> Option<Cycle> {
        self.events.keys().next().copied()
    }

    /// Schedules `callback` at phase `phase` of tick `cycle.tick + tick_offset`.
    ///
    /// `phase` is absolute within the target tick. A phase at or past
    /// [`phases_per_tick`](Self::phases_per_tick) carries into later ticks:
    /// with four phases, `(offset 1, phase 6)` lands on phase 2 of the tick
    /// after next. A target at or before the current cycle is accepted but can
    /// never fire; the next step discards it.
    pub fn schedule<F>(&mut self, tick_offset: Tick, phase: Phase, callback: F)
    where
        F: FnOnce(&mut Self, &mut Context<'_>) -> Result<()> + Send + 'static,
    {
        let carry = phase / self.phases_per_tick;
        let tick = self.cycle.tick.saturating_add(tick_offset).saturating_add(carry);
        let at = Cycle::new(tick, phase % self.phases_per_tick);
        self.events.entry(at).or_default().push(Box::new(callback));
    }

    /// Advances to the next pending cycle and fires its callbacks in order.
    ///
    /// Callbacks scheduled while firing are kept for later steps. The first
    /// failing callback aborts the firing; the remaining callbacks of that
    /// cycle are dropped.
    ///
    /// # Errors
    ///
    /// [`Error::DeadClock`] if nothing is scheduled after the current cycle
    /// within the tick limit.
    pub fn advance(&mut self, cx: &mut Context<'_>) -> Result<()> {
        loop {
            let Some(entry) = self.events.first_entry() else {
                return Err(self.dead(cx));
            };
            let at = *entry.key();
            if at <= self.cycle {
                let stale = entry.remove().len();
                component_log!(
                    cx.tree_ref(),
                    cx.id(),
                    Level::Warning,
                    "Dropping {stale} event(s) scheduled for {at}, current cycle is {}",
                    self.cycle
                );
                continue;
            }
            if self.tick_limit.is_some_and(|limit| at.tick > limit) {
                return Err(self.dead(cx));
            }
            let callbacks = entry.remove();
            self.cycle = at;
            for callback in callbacks {
                callback(self, cx)?;
            }
            return Ok(());
        }
    }

    fn dead(&self, cx: &Context<'_>) -> Error {
        Error::DeadClock {
            component: cx.name().to_owned(),
            cycle: self.cycle,
        }
    }

    /// Drops every pending event and rewinds to `(0, 0)`.
    pub fn reset(&mut self) {
        self.events.clear();
        self.cycle = Cycle::default();
    }
}

impl Component for Clock {
    fn on_cleanup(&mut self, _cx: &mut Context<'_>) -> Result<()> {
        self.reset();
        Ok(())
    }

    fn step(&mut self, cx: &mut Context<'_>, _trigger: Option<ComponentId>) -> Result<()> {
        self.advance(cx)
    }
}
