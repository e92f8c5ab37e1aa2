//! Emulator driver: the outer cycle loop.
//!
//! Runs the system for a bounded number of cycles, polling the host-IO
//! stop condition before each cycle and feeding the trace dumper after
//! each cycle past the skip threshold. A fatal emulator fault stops the
//! loop with the simulated state left as-is for inspection.

use thiserror::Error;
use tracing::info;

use crate::common::error::EmuError;
use crate::config::Config;
use crate::trace::dumper::TraceDumper;
use crate::trace::TraceError;

use super::loader;
use super::system::System;

/// Any failure a simulation run can end with.
#[derive(Debug, Error)]
pub enum SimError {
    /// Fatal emulator fault (simulator bug or corrupt input).
    #[error(transparent)]
    Emu(#[from] EmuError),

    /// Trace codec failure.
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// Host file I/O failure (image loading).
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// How a completed run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The configured cycle budget was exhausted.
    CycleLimit,
    /// The host-IO probe turned nonzero.
    HostIo(u32),
}

/// Result of a completed run.
#[derive(Clone, Copy, Debug)]
pub struct RunSummary {
    /// Cycles executed.
    pub cycles: u64,
    /// Why the run stopped.
    pub stop: StopReason,
}

/// The emulator: a system plus the outer driver state.
#[derive(Debug)]
pub struct Emulator {
    system: System,
    dumper: Option<TraceDumper>,
    config: Config,
    cycle: u64,
}

impl Emulator {
    /// Builds the system, loads the configured images, and opens the trace
    /// file when dumping is enabled.
    pub fn new(config: Config) -> Result<Self, SimError> {
        let mut system = System::new(&config)?;
        loader::apply_loads(&mut system, &config)?;

        let dumper = match &config.dump.path {
            Some(path) => Some(TraceDumper::new(path, &config.dump)?),
            None => None,
        };

        Ok(Self {
            system,
            dumper,
            config,
            cycle: 0,
        })
    }

    /// Runs until the cycle budget or the host-IO stop condition is hit.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        let budget = self.config.cycles;
        let mut stop = StopReason::CycleLimit;

        while self.cycle < budget {
            let host_io = self.system.host_io_value();
            if host_io != 0 {
                stop = StopReason::HostIo(host_io);
                break;
            }
            self.step()?;
        }

        if let Some(dumper) = &mut self.dumper {
            dumper.finish()?;
        }
        info!(cycles = self.cycle, ?stop, "emulation finished");
        Ok(RunSummary {
            cycles: self.cycle,
            stop,
        })
    }

    /// Executes exactly one cycle (also the GDB single-step entry point).
    pub fn step(&mut self) -> Result<(), SimError> {
        self.system.process_cycle()?;
        if let Some(dumper) = &mut self.dumper {
            if self.cycle >= self.config.dump.skip_cycles {
                dumper.dump_cycle(self.cycle as u32, &self.system)?;
            }
        }
        self.cycle = self.cycle.wrapping_add(1);
        Ok(())
    }

    /// Cycles executed so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The simulated system.
    pub fn system(&self) -> &System {
        &self.system
    }

    /// The simulated system, mutably (GDB stub).
    pub fn system_mut(&mut self) -> &mut System {
        &mut self.system
    }
}
