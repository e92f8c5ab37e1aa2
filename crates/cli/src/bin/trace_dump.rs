//! Prints a trace file's cycle records in human-readable form.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rv32emu_core::trace::{CycleReader, NodeType, TraceError, TraceFileReader};

/// Trace dump tool.
#[derive(Debug, Parser)]
#[command(name = "trace-dump", version, about)]
struct Args {
    /// Trace file to print.
    path: PathBuf,

    /// First cycle to print.
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Maximum number of cycles to print.
    #[arg(long, default_value_t = u64::MAX)]
    count: u64,
}

fn print_cycle(index: u64, cycle: &CycleReader<'_>) -> Result<(), TraceError> {
    println!("cycle record #{index} ({} bytes)", cycle.record_len());

    if let Some(info) = cycle.basic_info().transpose()? {
        println!(
            "  basic: cycle={} opId={} insn={:#010x} priv={}",
            info.cycle, info.op_id, info.insn, info.privilege
        );
    }
    if let Some(pc) = cycle.pc32().transpose()? {
        println!(
            "  pc:    virtual={:#010x} physical={:#010x}",
            pc.virtual_pc, pc.physical_pc
        );
    }
    if let Some(trap) = cycle.trap32().transpose()? {
        println!(
            "  trap:  type={} from={} to={} cause={} tval={:#010x}",
            trap.trap_type, trap.from, trap.to, trap.cause, trap.trap_value
        );
    }
    for index in 0..cycle.node_count(NodeType::MemoryAccess32) {
        if let Some(access) = cycle.memory_access32(index).transpose()? {
            println!(
                "  mem:   type={} size={} vaddr={:#010x} paddr={:#010x} value={:#010x}",
                access.access_type,
                access.access_size,
                access.virtual_address,
                access.physical_address,
                access.value
            );
        }
    }
    if let Some(regs) = cycle.int_reg32().transpose()? {
        for chunk in 0..8 {
            let base = chunk * 4;
            println!(
                "  x{:<2}: {:#010x} {:#010x} {:#010x} {:#010x}",
                base,
                regs.regs[base],
                regs.regs[base + 1],
                regs.regs[base + 2],
                regs.regs[base + 3]
            );
        }
    }
    if let Some(entries) = cycle.csr32().transpose()? {
        for entry in entries {
            println!("  csr:   {:#05x} = {:#010x}", entry.address, entry.value);
        }
    }
    if let Some(io) = cycle.io().transpose()? {
        println!("  io:    {:#010x}", io.host_io_value);
    }
    if let Some(memory) = cycle.memory() {
        println!("  memory snapshot: {} bytes", memory.len());
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), TraceError> {
    let mut reader = TraceFileReader::open(&args.path)?;
    let mut index = 0u64;
    let mut printed = 0u64;

    while !reader.is_end() && printed < args.count {
        if index >= args.start {
            print_cycle(index, &reader.cycle()?)?;
            printed += 1;
        }
        if !reader.advance()? {
            break;
        }
        index += 1;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
