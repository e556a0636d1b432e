//! Machine assembly from configuration.
//!
//! This module turns a [`Config`] into a component tree. It performs:
//! 1. **Root:** Creates the `ComputerSystem` and installs the configured log sink on it.
//! 2. **Memory map:** Creates one leaf per region, registers it with a `MainMemory`,
//!    and loads region images.
//! 3. **Execution:** Creates the clock and a `ClockedExecutionUnit` around the
//!    caller-supplied processing unit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ComputerSystem;
use crate::clock::Clock;
use crate::common::{AddressRange, Result};
use crate::component::{Component, ComponentId, ComponentTree};
use crate::config::{Config, Layout, LogConfig, LogSink, MemoryConfig, RegionKind};
use crate::execution::{ClockedExecutionUnit, ExecutionUnit};
use crate::log::{Log, StreamLog, TracingLog};
use crate::memory::{Access, ChunkedMemory, LinearMemory, MainMemory, image};

/// A memory region created from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Component name.
    pub name: String,
    /// Leaf memory component.
    pub id: ComponentId,
    /// Access kind.
    pub kind: RegionKind,
}

/// An assembled machine.
#[derive(Debug)]
pub struct Machine {
    /// Tree holding every component.
    pub tree: ComponentTree,
    /// Root `ComputerSystem`.
    pub system: ComponentId,
    /// Main memory dispatcher.
    pub main_memory: ComponentId,
    /// Clock driving the execution unit.
    pub clock: ComponentId,
    /// Main execution unit.
    pub execution_unit: ComponentId,
    /// Processing unit supplied by the caller.
    pub processing_unit: ComponentId,
    /// Memory regions in registration order.
    pub regions: Vec<Region>,
}

impl Machine {
    /// Writes every RAM region to `<dir>/<region name>.bin`.
    ///
    /// # Returns
    ///
    /// The paths written, in region order.
    pub fn dump_ram(&mut self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for region in self.regions.iter().filter(|r| r.kind == RegionKind::Ram) {
            let path = dir.join(format!("{}.bin", region.name));
            image::dump(&mut self.tree, region.id, &path)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Creates the log sink described by `config`.
pub fn log_sink(config: &LogConfig) -> Option<Arc<dyn Log>> {
    match config.sink {
        LogSink::Console => {
            let log = StreamLog::console();
            log.display_component(config.display_component);
            log.display_file(config.display_file);
            log.display_line(config.display_line);
            log.display_function(config.display_function);
            Some(Arc::new(log))
        }
        LogSink::Tracing => Some(Arc::new(TracingLog)),
        LogSink::Disabled => None,
    }
}

/// Creates a `MainMemory` populated with every configured region.
///
/// Regions are owned by the main memory. Images are loaded immediately.
pub fn build_memory(tree: &mut ComponentTree, config: &MemoryConfig) -> Result<(ComponentId, Vec<Region>)> {
    let main = tree.create("main memory", MainMemory::new());
    let mut regions: Vec<Region> = Vec::with_capacity(config.regions.len());
    let mut ranges: Vec<AddressRange> = Vec::with_capacity(config.regions.len());
    for region in &config.regions {
        let range = AddressRange::new(region.start, region.end);
        if let Some(index) = ranges.iter().position(|r| r.overlaps(&range)) {
            tracing::warn!(
                region = %region.name,
                shadowed_by = %regions[index].name,
                "memory region overlaps an earlier region; the earlier one wins"
            );
        }
        let access = match region.kind {
            RegionKind::Ram => Access::Ram,
            RegionKind::Rom => Access::Rom,
        };
        let id = match region.layout {
            Layout::Linear => tree.create(region.name.clone(), LinearMemory::try_new(range, access)?),
            Layout::Chunked => tree.create(
                region.name.clone(),
                ChunkedMemory::new(range, access, region.chunk_size),
            ),
        };
        MainMemory::add_memory(tree, main, id, true)?;
        if let Some(path) = &region.image {
            image::load(tree, id, path)?;
        }
        tracing::debug!(region = %region.name, %range, ?access, "mapped memory region");
        ranges.push(range);
        regions.push(Region {
            name: region.name.clone(),
            id,
            kind: region.kind,
        });
    }
    Ok((main, regions))
}

/// Builds a complete machine around `processing_unit`.
///
/// # Errors
///
/// Fails if a region image cannot be read, or if `processing_unit` does not
/// expose the processing-unit capability.
pub fn build(config: &Config, processing_unit: Box<dyn Component>) -> Result<Machine> {
    let mut tree = ComponentTree::new();
    let system = tree.create(config.general.name.clone(), ComputerSystem::new());
    tree.set_log(system, log_sink(&config.log));

    let (main_memory, regions) = build_memory(&mut tree, &config.memory)?;
    ComputerSystem::set_main_memory(&mut tree, system, main_memory)?;

    let mut clock = Clock::new();
    clock.set_tick_limit(config.clock.tick_limit);
    if let Some(phases) = config.clock.phases_per_tick {
        clock.set_phases_per_tick(phases);
    }
    let clock = tree.create("clock", clock);
    let mut unit = ClockedExecutionUnit::new();
    if config.general.disassemble {
        unit.enable_disassemble();
    }
    let execution_unit = tree.create("execution unit", unit);
    let processing_unit = tree.create_boxed("processing unit", processing_unit);
    ClockedExecutionUnit::set_clock(&mut tree, execution_unit, clock)?;
    ClockedExecutionUnit::set_processing_unit(&mut tree, execution_unit, processing_unit)?;
    ComputerSystem::set_main_execution_unit(&mut tree, system, execution_unit)?;

    tracing::info!(
        system = %config.general.name,
        regions = regions.len(),
        components = tree.len(),
        "machine assembled"
    );
    Ok(Machine {
        tree,
        system,
        main_memory,
        clock,
        execution_unit,
        processing_unit,
        regions,
    })
}
