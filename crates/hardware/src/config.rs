//! Machine configuration.
//!
//! This module defines the JSON document describing a machine. It provides:
//! 1. **Defaults:** Baseline values for every optional field.
//! 2. **Structures:** General, clock, log, and memory-map sections.
//! 3. **Enums:** Region access kind, storage layout, and log sink selection.
//!
//! Every section and field is optional; `Config::default()` describes an
//! empty machine with a console log.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::{Address, Result};

/// Default configuration constants.
mod defaults {
    /// Name given to the root component.
    pub const SYSTEM_NAME: &str = "system";

    /// Chunk size of chunked regions (4 KiB).
    pub const CHUNK_SIZE: usize = 4096;
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use hwsim_core::config::{Config, Layout, RegionKind};
///
/// let json = r#"{
///     "general": { "name": "c64", "max_steps": 1000 },
///     "clock": { "tick_limit": 50000 },
///     "log": { "sink": "Console", "display_function": true },
///     "memory": {
///         "regions": [
///             { "name": "ram", "start": 0, "end": 40959 },
///             { "name": "kernal", "start": "0xE000", "end": "0xFFFF",
///               "kind": "Rom", "layout": "Chunked", "chunk_size": 1024 }
///         ]
///     }
/// }"#;
///
/// let config = Config::from_json(json)?;
/// assert_eq!(config.general.name, "c64");
/// assert_eq!(config.memory.regions[1].start, 0xE000);
/// assert_eq!(config.memory.regions[1].kind, RegionKind::Rom);
/// assert_eq!(config.memory.regions[1].layout, Layout::Chunked);
/// # Ok::<(), hwsim_core::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Machine-wide settings.
    pub general: GeneralConfig,
    /// Clock settings.
    pub clock: ClockConfig,
    /// Log sink settings.
    pub log: LogConfig,
    /// Memory map.
    pub memory: MemoryConfig,
}

impl Config {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Machine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneralConfig {
    /// Name of the root component.
    #[serde(default = "GeneralConfig::default_name")]
    pub name: String,

    /// Stop the run loop after this many steps.
    #[serde(default)]
    pub max_steps: Option<u64>,

    /// Log the disassembly of every executed instruction.
    #[serde(default)]
    pub disassemble: bool,
}

impl GeneralConfig {
    fn default_name() -> String {
        defaults::SYSTEM_NAME.to_owned()
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            max_steps: None,
            disassemble: false,
        }
    }
}

/// Clock settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClockConfig {
    /// Events scheduled after this tick are treated as unreachable, which
    /// ends the simulation with a dead clock.
    #[serde(default)]
    pub tick_limit: Option<u64>,
    /// Schedule granularity: phases past this count carry into the next tick.
    /// Unset keeps every phase as given.
    #[serde(default)]
    pub phases_per_tick: Option<u64>,
}

/// Which sink the root component logs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum LogSink {
    /// Formatted lines on standard output.
    #[default]
    #[serde(alias = "console")]
    Console,
    /// Forward to the `tracing` subscriber.
    #[serde(alias = "tracing")]
    Tracing,
    /// No sink; component logging is disabled.
    #[serde(alias = "None", alias = "none")]
    Disabled,
}

/// Log sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    /// Sink installed on the root component.
    #[serde(default)]
    pub sink: LogSink,
    /// Prefix console lines with the component name.
    #[serde(default = "LogConfig::default_true")]
    pub display_component: bool,
    /// Show the source file on console lines.
    #[serde(default)]
    pub display_file: bool,
    /// Show the source line (only with the file).
    #[serde(default)]
    pub display_line: bool,
    /// Show the emitting function on console lines.
    #[serde(default)]
    pub display_function: bool,
}

impl LogConfig {
    const fn default_true() -> bool {
        true
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            sink: LogSink::Console,
            display_component: true,
            display_file: false,
            display_line: false,
            display_function: false,
        }
    }
}

/// Memory map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    /// Regions in registration order; earlier regions win where they overlap.
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
}

/// Access kind of a region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum RegionKind {
    /// Read/write.
    #[default]
    #[serde(alias = "ram", alias = "RAM")]
    Ram,
    /// Read-only.
    #[serde(alias = "rom", alias = "ROM")]
    Rom,
}

/// Storage layout of a region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Layout {
    /// One contiguous buffer.
    #[default]
    #[serde(alias = "linear")]
    Linear,
    /// Lazily allocated chunks.
    #[serde(alias = "chunked")]
    Chunked,
}

/// One memory region.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegionConfig {
    /// Component name.
    pub name: String,
    /// First address (number or `"0x…"` string).
    #[serde(deserialize_with = "address::deserialize")]
    pub start: Address,
    /// Last address, inclusive (number or `"0x…"` string).
    #[serde(deserialize_with = "address::deserialize")]
    pub end: Address,
    /// Access kind.
    #[serde(default)]
    pub kind: RegionKind,
    /// Storage layout.
    #[serde(default)]
    pub layout: Layout,
    /// Chunk size for chunked regions.
    #[serde(default = "RegionConfig::default_chunk_size")]
    pub chunk_size: usize,
    /// Image loaded into the region when the machine is built.
    #[serde(default)]
    pub image: Option<PathBuf>,
}

impl RegionConfig {
    const fn default_chunk_size() -> usize {
        defaults::CHUNK_SIZE
    }
}

/// Addresses given either as JSON numbers or as hex/decimal strings.
mod address {
    use serde::de::{self, Deserializer};
    use serde::Deserialize;

    use crate::common::Address;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(Address),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(text) => parse(&text).ok_or_else(|| de::Error::custom(format!("invalid address `{text}`"))),
        }
    }

    fn parse(text: &str) -> Option<Address> {
        let text = text.trim().replace('_', "");
        match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => Address::from_str_radix(hex, 16).ok(),
            None => text.parse().ok(),
        }
    }
}
