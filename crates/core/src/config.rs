//! Simulator configuration.
//!
//! The CLI maps its arguments onto [`Config`]; tests and embedders can
//! also deserialize one from JSON. Defaults mirror the reference system:
//! RAM at 0x8000_0000, reset PC at the RAM base, XLEN=32.

use serde::Deserialize;

/// Default configuration constants.
pub mod defaults {
    /// Default RAM size (64 MiB).
    pub const RAM_SIZE: usize = 64 * 1024 * 1024;

    /// Default reset PC (the RAM base).
    pub const PC: u32 = 0x8000_0000;

    /// Default cycle budget.
    pub const CYCLES: u64 = 0;
}

/// Architectural register width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum Xlen {
    /// 32-bit registers (the width this core executes).
    #[default]
    #[serde(rename = "32")]
    Rv32,
    /// 64-bit registers (accepted by the codec surface only).
    #[serde(rename = "64")]
    Rv64,
}

impl Xlen {
    /// Register width in bits.
    pub fn bits(self) -> u32 {
        match self {
            Xlen::Rv32 => 32,
            Xlen::Rv64 => 64,
        }
    }
}

/// One binary image to place in memory before the run.
#[derive(Clone, Debug, Deserialize)]
pub struct LoadImage {
    /// Path of the raw binary.
    pub path: std::path::PathBuf,
    /// Physical load address.
    pub address: u64,
}

/// Trace-dump configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Trace file path; dumping is off when absent.
    pub path: Option<std::path::PathBuf>,
    /// Number of initial cycles to skip.
    pub skip_cycles: u64,
    /// Include the CSR snapshot node.
    pub csr: bool,
    /// Include the RAM snapshot node.
    pub memory: bool,
    /// Include the FP register node.
    pub fp_reg: bool,
    /// Include the integer register node.
    pub int_reg: bool,
    /// Include the host-IO node.
    pub host_io: bool,
}

/// Top-level simulator configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Architectural register width.
    pub xlen: Xlen,
    /// Reset PC.
    pub pc: u32,
    /// RAM size in bytes.
    pub ram_size: usize,
    /// Maximum number of cycles to run.
    pub cycles: u64,
    /// Images to load before the run.
    pub load: Vec<LoadImage>,
    /// Host-IO probe address; a nonzero u32 there stops the run.
    pub host_io_addr: Option<u32>,
    /// Device-tree blob address, published to the guest in `a1`.
    pub dtb_addr: Option<u32>,
    /// Trace-dump settings.
    pub dump: DumpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            xlen: Xlen::Rv32,
            pc: defaults::PC,
            ram_size: defaults::RAM_SIZE,
            cycles: defaults::CYCLES,
            load: Vec::new(),
            host_io_addr: None,
            dtb_addr: None,
            dump: DumpConfig::default(),
        }
    }
}

impl Config {
    /// Parses a configuration from JSON; absent fields take their
    /// defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
