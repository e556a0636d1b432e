//! hwsim command-line runner.
//!
//! This binary assembles a machine from a JSON description and runs it. It performs:
//! 1. **Assembly:** Config file → component tree (memory map, clock, execution unit).
//! 2. **Lifecycle:** prepare → boot → run → shutdown (if still running) → cleanup.
//! 3. **Interrupts:** Ctrl-C requests a halt, answered between two steps.
//! 4. **Dumps:** Optionally writes every RAM region to a directory afterwards.

mod scan;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hwsim_core::Config;
use hwsim_core::common::Address;
use hwsim_core::system::builder::{self, Machine};
use hwsim_core::system::{ComputerSystem, RunExit, RunReport};
use tracing_subscriber::EnvFilter;

use crate::scan::ScanCpu;

#[derive(Parser, Debug)]
#[command(
    name = "hwsim",
    author,
    version,
    about = "Component-tree hardware emulator",
    long_about = "Assemble a machine from a JSON description and run it until it halts.\n\nExamples:\n  hwsim run --config machine.json\n  hwsim run --config machine.json --entry 0x1000 --dump out/"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a machine from a config file and run it.
    Run {
        /// Machine description (JSON).
        #[arg(short, long)]
        config: PathBuf,

        /// Address the demo processing unit starts scanning at.
        #[arg(long, default_value = "0", value_parser = parse_address)]
        entry: Address,

        /// Stop after this many steps (overrides the config).
        #[arg(long)]
        max_steps: Option<u64>,

        /// Log disassembly of every executed instruction.
        #[arg(long)]
        disassemble: bool,

        /// Directory receiving `<region>.bin` dumps of RAM regions.
        #[arg(long)]
        dump: Option<PathBuf>,
    },
}

fn parse_address(text: &str) -> Result<Address, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => Address::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid address `{text}`: {e}"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            config,
            entry,
            max_steps,
            disassemble,
            dump,
        } => cmd_run(&config, entry, max_steps, disassemble, dump.as_deref()),
    };
    match result {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(%error, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

/// Runs a machine through its whole lifecycle.
///
/// Returns success when the run ended by halting, stopping, or hitting the
/// step limit, and failure when it faulted.
fn cmd_run(
    config_path: &Path,
    entry: Address,
    max_steps: Option<u64>,
    disassemble: bool,
    dump: Option<&Path>,
) -> hwsim_core::Result<ExitCode> {
    let mut config = Config::from_file(config_path)?;
    config.general.disassemble |= disassemble;
    let max_steps = max_steps.or(config.general.max_steps);

    let mut machine = builder::build(&config, Box::new(ScanCpu::new(entry)))?;
    let halt = machine.tree.halt_token().clone();
    if let Err(error) = ctrlc::set_handler(move || halt.request()) {
        tracing::warn!(%error, "Ctrl-C handler unavailable; interrupt will kill the process");
    }

    let Machine { tree, system, .. } = &mut machine;
    let system = *system;
    tree.prepare(system)?;
    tree.boot(system)?;
    let report = ComputerSystem::run_for(tree, system, max_steps);
    if tree.is_running(system) {
        tree.shutdown(system)?;
    }
    tree.cleanup(system)?;

    if let Some(dir) = dump {
        std::fs::create_dir_all(dir)?;
        for path in machine.dump_ram(dir)? {
            tracing::info!(path = %path.display(), "dumped RAM region");
        }
    }

    Ok(summarize(&report))
}

fn summarize(report: &RunReport) -> ExitCode {
    match &report.exit {
        RunExit::Stopped => {
            tracing::info!(steps = report.steps, "system stopped");
            ExitCode::SUCCESS
        }
        RunExit::Halted => {
            tracing::info!(steps = report.steps, "system halted");
            ExitCode::SUCCESS
        }
        RunExit::StepLimit => {
            tracing::info!(steps = report.steps, "step limit reached");
            ExitCode::SUCCESS
        }
        RunExit::Faulted(error) => {
            tracing::error!(steps = report.steps, %error, "system faulted");
            ExitCode::FAILURE
        }
    }
}
