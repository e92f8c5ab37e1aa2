//! RV32 emulator front-end.
//!
//! Parses the command line into the core's `Config`, loads the requested
//! images, and drives the cycle loop — optionally serving a minimal GDB
//! remote stub instead of free-running. Exit code 0 on clean termination,
//! 1 on a fatal emulator error (the current cycle and PC are printed).

mod gdb;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rv32emu_core::config::{Config, DumpConfig, LoadImage, Xlen};
use rv32emu_core::sim::Emulator;

/// One `path:addr` load specification.
#[derive(Clone, Debug)]
struct LoadSpec {
    path: PathBuf,
    address: u64,
}

fn parse_load(arg: &str) -> Result<LoadSpec, String> {
    let (path, addr) = arg
        .rsplit_once(':')
        .ok_or_else(|| format!("expected <path:addr-hex>, got '{arg}'"))?;
    let address = parse_hex64(addr)?;
    if address == 0 {
        return Err(format!("load address in '{arg}' must be nonzero"));
    }
    Ok(LoadSpec {
        path: PathBuf::from(path),
        address,
    })
}

fn parse_hex64(arg: &str) -> Result<u64, String> {
    let digits = arg.strip_prefix("0x").unwrap_or(arg);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{arg}': {e}"))
}

fn parse_hex32(arg: &str) -> Result<u32, String> {
    let digits = arg.strip_prefix("0x").unwrap_or(arg);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{arg}': {e}"))
}

/// RV32IMAFDC functional simulator with execution-trace dumping.
#[derive(Debug, Parser)]
#[command(name = "emulate", version, about)]
struct Args {
    /// Initial program counter (hex).
    #[arg(long, value_parser = parse_hex32, default_value = "80000000")]
    pc: u32,

    /// RAM size in bytes.
    #[arg(long, default_value_t = 64 * 1024 * 1024)]
    ram_size: usize,

    /// Binary image to load, as <path:addr-hex>; repeatable.
    #[arg(long, value_parser = parse_load)]
    load: Vec<LoadSpec>,

    /// Number of cycles to emulate.
    #[arg(long, default_value_t = 0)]
    cycle: u64,

    /// Architectural register width.
    #[arg(long, default_value_t = 32)]
    xlen: u32,

    /// Host-IO address (hex); a nonzero u32 there stops the run.
    #[arg(long, value_parser = parse_hex32)]
    host_io_addr: Option<u32>,

    /// Device-tree blob address (hex), published to the guest in a1.
    #[arg(long, value_parser = parse_hex32)]
    dtb_addr: Option<u32>,

    /// Trace dump file path.
    #[arg(long)]
    dump_path: Option<PathBuf>,

    /// Number of cycles to skip before dumping.
    #[arg(long, default_value_t = 0)]
    dump_skip_cycle: u64,

    /// Include CSR contents in the dump.
    #[arg(long)]
    enable_dump_csr: bool,

    /// Include the RAM snapshot in the dump.
    #[arg(long)]
    enable_dump_memory: bool,

    /// Include FP registers in the dump.
    #[arg(long)]
    enable_dump_fp_reg: bool,

    /// Include integer registers in the dump.
    #[arg(long)]
    enable_dump_int_reg: bool,

    /// Include the host-IO probe value in the dump.
    #[arg(long)]
    enable_dump_host_io: bool,

    /// Serve a GDB remote stub on this TCP port instead of free-running.
    #[arg(long)]
    gdb: Option<u16>,
}

impl Args {
    fn into_config(self) -> Result<(Config, Option<u16>), String> {
        let xlen = match self.xlen {
            32 => Xlen::Rv32,
            64 => Xlen::Rv64,
            other => return Err(format!("--xlen must be 32 or 64, got {other}")),
        };
        let gdb = self.gdb;
        let config = Config {
            xlen,
            pc: self.pc,
            ram_size: self.ram_size,
            cycles: self.cycle,
            load: self
                .load
                .into_iter()
                .map(|spec| LoadImage {
                    path: spec.path,
                    address: spec.address,
                })
                .collect(),
            host_io_addr: self.host_io_addr,
            dtb_addr: self.dtb_addr,
            dump: DumpConfig {
                path: self.dump_path,
                skip_cycles: self.dump_skip_cycle,
                csr: self.enable_dump_csr,
                memory: self.enable_dump_memory,
                fp_reg: self.enable_dump_fp_reg,
                int_reg: self.enable_dump_int_reg,
                host_io: self.enable_dump_host_io,
            },
        };
        Ok((config, gdb))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (config, gdb_port) = match Args::parse().into_config() {
        Ok(parts) => parts,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let mut emulator = match Emulator::new(config) {
        Ok(emulator) => emulator,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(port) = gdb_port {
        return match gdb::serve(&mut emulator, port) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("gdb server error: {error}");
                ExitCode::FAILURE
            }
        };
    }

    match emulator.run() {
        Ok(summary) => {
            println!(
                "Emulation finished @ cycle {} ({:#x})",
                summary.cycles, summary.cycles
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            let pc = emulator.system().processor().pc();
            eprintln!(
                "Emulation stopped @ cycle {} pc {:#010x}: {error}",
                emulator.cycle(),
                pc
            );
            ExitCode::FAILURE
        }
    }
}
