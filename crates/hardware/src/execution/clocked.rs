//! Clock-driven execution unit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ExecutionUnit, ProcessingUnit};
use crate::clock::{Clock, Phase, Tick};
use crate::common::{Error, Result};
use crate::component::{Component, ComponentId, ComponentTree, Context};
use crate::component_log;
use crate::log::Level;

const CAPABILITY: &str = "clocked execution unit";

/// Phase at which instructions are fetched.
pub const FETCH_PHASE: Phase = 0;

/// Phase at which instructions are executed.
pub const EXECUTE_PHASE: Phase = 1;

/// Execution unit driving one processing unit from one clock.
///
/// Both are owned subcomponents. On boot a fetch is scheduled for the next
/// tick (a shut down unit booted again resumes the chain already queued);
/// each fetch schedules its execute and each execute schedules the next
/// fetch, so one [`step`](Component::step) fires exactly one of them.
#[derive(Debug, Default)]
pub struct ClockedExecutionUnit {
    clock: Option<ComponentId>,
    processing_unit: Option<ComponentId>,
    disassemble: Arc<AtomicBool>,
    /// Set once the fetch/execute chain is on the clock; cleared by cleanup,
    /// which also tears the clock's queue down.
    started: bool,
}

impl ClockedExecutionUnit {
    /// Creates a unit with neither clock nor processing unit attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the attached clock.
    pub const fn clock(&self) -> Option<ComponentId> {
        self.clock
    }

    /// Returns the attached processing unit.
    pub const fn processing_unit(&self) -> Option<ComponentId> {
        self.processing_unit
    }

    /// Attaches `clock`, replacing the current one.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`](crate::common::Error::Unsupported) if `clock`
    /// is not a [`Clock`]; ownership errors from the tree.
    pub fn set_clock(tree: &mut ComponentTree, unit: ComponentId, clock: ComponentId) -> Result<()> {
        let _ = tree.require::<Clock>(clock, "clock")?;
        let current = tree.require::<Self>(unit, CAPABILITY)?.clock;
        tree.attach(unit, current, clock)?;
        tree.require_mut::<Self>(unit, CAPABILITY)?.clock = Some(clock);
        Ok(())
    }

    /// Attaches `processing_unit`, replacing the current one.
    pub fn set_processing_unit(tree: &mut ComponentTree, unit: ComponentId, processing_unit: ComponentId) -> Result<()> {
        if tree.component_mut(processing_unit)?.as_processing_unit_mut().is_none() {
            return Err(Error::Unsupported {
                component: tree.name(processing_unit).to_owned(),
                capability: "processing unit",
            });
        }
        let current = tree.require::<Self>(unit, CAPABILITY)?.processing_unit;
        tree.attach(unit, current, processing_unit)?;
        tree.require_mut::<Self>(unit, CAPABILITY)?.processing_unit = Some(processing_unit);
        Ok(())
    }
}

fn processing<'c>(component: &'c mut dyn Component, cx: &Context<'_>) -> Result<&'c mut dyn ProcessingUnit> {
    component
        .as_processing_unit_mut()
        .ok_or_else(|| cx.unsupported("processing unit"))
}

fn schedule_fetch(clock: &mut Clock, unit: ComponentId, disassemble: Arc<AtomicBool>, delay: Tick) {
    clock.schedule(delay.max(1), FETCH_PHASE, move |clock, cx| {
        let ticks = cx
            .tree()
            .with_component(unit, |component, cx| processing(component, cx)?.fetch(cx))?;
        schedule_execute(clock, unit, disassemble, ticks);
        Ok(())
    });
}

fn schedule_execute(clock: &mut Clock, unit: ComponentId, disassemble: Arc<AtomicBool>, delay: Tick) {
    clock.schedule(delay, EXECUTE_PHASE, move |clock, cx| {
        let show = disassemble.load(Ordering::Relaxed);
        let ticks = cx.tree().with_component(unit, |component, cx| {
            let pu = processing(component, cx)?;
            if show {
                if let Some(text) = pu.disassemble() {
                    component_log!(cx.tree_ref(), cx.id(), Level::Debug, "{text}");
                }
            }
            pu.execute(cx)
        })?;
        schedule_fetch(clock, unit, disassemble, ticks);
        Ok(())
    });
}

impl ExecutionUnit for ClockedExecutionUnit {
    fn enable_disassemble(&mut self) {
        self.disassemble.store(true, Ordering::Relaxed);
    }

    fn disable_disassemble(&mut self) {
        self.disassemble.store(false, Ordering::Relaxed);
    }

    fn is_disassembling(&self) -> bool {
        self.disassemble.load(Ordering::Relaxed)
    }
}

impl Component for ClockedExecutionUnit {
    fn on_boot(&mut self, cx: &mut Context<'_>) -> Result<()> {
        if self.started {
            return Ok(());
        }
        let clock = self.clock.ok_or_else(|| cx.missing("clock"))?;
        let unit = self.processing_unit.ok_or_else(|| cx.missing("processing unit"))?;
        let disassemble = Arc::clone(&self.disassemble);
        let clock = cx.tree().require_mut::<Clock>(clock, "clock")?;
        schedule_fetch(clock, unit, disassemble, 1);
        self.started = true;
        Ok(())
    }

    fn on_cleanup(&mut self, _cx: &mut Context<'_>) -> Result<()> {
        self.started = false;
        Ok(())
    }

    fn step(&mut self, cx: &mut Context<'_>, _trigger: Option<ComponentId>) -> Result<()> {
        let clock = self.clock.ok_or_else(|| cx.missing("clock"))?;
        let me = cx.id();
        cx.tree().step(clock, Some(me))
    }

    fn as_execution_unit_mut(&mut self) -> Option<&mut dyn ExecutionUnit> {
        Some(self)
    }
}
