//! Bit-compares two trace files cycle by cycle.
//!
//! Matching cycles advance both files; a mismatch is printed and only the
//! `actual` side advances (so a dropped cycle re-synchronizes). After
//! `--threshold` consecutive mismatches the comparison stops.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rv32emu_core::trace::{CycleComparator, TraceError, TraceFileReader};

/// Trace diff tool.
#[derive(Debug, Parser)]
#[command(name = "trace-diff", version, about)]
struct Args {
    /// Reference trace file.
    #[arg(long)]
    expect: PathBuf,

    /// Trace file under test.
    #[arg(long)]
    actual: PathBuf,

    /// Maximum number of cycles to compare.
    #[arg(long, default_value_t = u64::MAX)]
    count: u64,

    /// Stop after this many consecutive mismatched cycles.
    #[arg(long, default_value_t = 10)]
    threshold: u32,

    /// Also compare the physical PC of each cycle.
    #[arg(long)]
    check_physical_pc: bool,
}

fn run(args: &Args) -> Result<bool, TraceError> {
    let mut expect = TraceFileReader::open(&args.expect)?;
    let mut actual = TraceFileReader::open(&args.actual)?;
    let comparator = CycleComparator::new(args.check_physical_pc);

    let mut matched = 0u64;
    let mut mismatched = 0u64;
    let mut consecutive = 0u32;

    for _ in 0..args.count {
        if expect.is_end() || actual.is_end() {
            break;
        }

        let diffs = {
            let expect_cycle = expect.cycle()?;
            let actual_cycle = actual.cycle()?;
            comparator.describe_diff(&expect_cycle, &actual_cycle)?
        };

        if diffs.is_empty() {
            matched += 1;
            consecutive = 0;
            expect.advance()?;
            actual.advance()?;
        } else {
            mismatched += 1;
            consecutive += 1;
            println!("Mismatched cycle (expect #{matched}):");
            for line in diffs {
                println!("    - {line}");
            }
            if consecutive >= args.threshold {
                println!("Stop: {consecutive} consecutive mismatched cycles.");
                break;
            }
            // Keep the reference cycle and advance only the trace under
            // test, so a dropped cycle re-synchronizes.
            actual.advance()?;
        }
    }

    println!("Comparison finished: {matched} matched, {mismatched} mismatched.");
    Ok(mismatched == 0)
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
