//! End-to-end dumper tests: run a program with dumping enabled, then read
//! the trace back and check the recorded architectural deltas. Also the
//! determinism property: two identical runs produce byte-identical files.

use std::path::Path;

use pretty_assertions::assert_eq;

use rv32emu_core::config::{Config, DumpConfig};
use rv32emu_core::sim::{Emulator, StopReason};
use rv32emu_core::trace::{NodeType, TraceFileReader};

use crate::common::encode;

const RAM_BASE: u64 = 0x8000_0000;

fn arithmetic_image() -> Vec<u8> {
    let words = [
        encode::addi(1, 0, 5),
        encode::addi(2, 0, 7),
        encode::add(3, 1, 2),
        encode::lui(4, 0x80000),
        encode::sw(3, 4, 0x40), // store x3 to RAM_BASE + 0x40
        encode::ebreak(),
    ];
    let mut bytes = Vec::new();
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes
}

fn run_with_dump(dir: &Path, name: &str) -> std::path::PathBuf {
    let image_path = dir.join(format!("{name}.bin"));
    std::fs::write(&image_path, arithmetic_image()).unwrap();

    let trace_path = dir.join(format!("{name}.trace"));
    let config = Config {
        ram_size: 1024 * 1024,
        cycles: 6,
        load: vec![rv32emu_core::config::LoadImage {
            path: image_path,
            address: RAM_BASE,
        }],
        dump: DumpConfig {
            path: Some(trace_path.clone()),
            skip_cycles: 0,
            csr: true,
            memory: false,
            fp_reg: false,
            int_reg: true,
            host_io: false,
        },
        ..Config::default()
    };

    let mut emulator = Emulator::new(config).unwrap();
    let summary = emulator.run().unwrap();
    assert_eq!(summary.cycles, 6);
    assert_eq!(summary.stop, StopReason::CycleLimit);
    trace_path
}

#[test]
fn dumped_trace_records_the_architectural_deltas() {
    let dir = tempfile::tempdir().unwrap();
    let path = run_with_dump(dir.path(), "run");

    let mut reader = TraceFileReader::open(&path).unwrap();

    // Cycle 0: addi x1, x0, 5.
    let cycle = reader.cycle().unwrap();
    let info = cycle.basic_info().unwrap().unwrap();
    assert_eq!(info.cycle, 0);
    assert_eq!(info.op_id, 0);
    assert_eq!(info.insn, encode::addi(1, 0, 5));
    assert_eq!(info.privilege, 3);
    let pc = cycle.pc32().unwrap().unwrap();
    assert_eq!(pc.virtual_pc, 0x8000_0000);
    assert_eq!(pc.physical_pc, 0x8000_0000);
    let regs = cycle.int_reg32().unwrap().unwrap();
    assert_eq!(regs.regs[1], 5);
    assert!(cycle.trap32().is_none());
    // The CSR node carries the 32-entry dump list.
    assert_eq!(cycle.csr32().unwrap().unwrap().len(), 32);

    // Cycle 2: add x3, x1, x2 → x3 = 12.
    reader.advance().unwrap();
    reader.advance().unwrap();
    let cycle = reader.cycle().unwrap();
    assert_eq!(cycle.int_reg32().unwrap().unwrap().regs[3], 12);

    // Cycle 4: the store appears as a memory-access node.
    reader.advance().unwrap();
    reader.advance().unwrap();
    let cycle = reader.cycle().unwrap();
    assert_eq!(cycle.node_count(NodeType::MemoryAccess32), 1);
    let access = cycle.memory_access32(0).unwrap().unwrap();
    assert_eq!(access.virtual_address, 0x8000_0040);
    assert_eq!(access.physical_address, 0x8000_0040);
    assert_eq!(access.value, 12);
    assert_eq!(access.access_type, 3);
    assert_eq!(access.access_size, 4);

    // Cycle 5: the breakpoint trap node.
    reader.advance().unwrap();
    let cycle = reader.cycle().unwrap();
    let trap = cycle.trap32().unwrap().unwrap();
    assert_eq!(trap.trap_type, 1); // exception
    assert_eq!(trap.cause, 3);
    assert_eq!(trap.from, 3);
    assert_eq!(trap.to, 3);
    assert_eq!(cycle.next_offset(), 0);
}

#[test]
fn identical_runs_produce_byte_identical_traces() {
    let dir = tempfile::tempdir().unwrap();
    let first = run_with_dump(dir.path(), "first");
    let second = run_with_dump(dir.path(), "second");

    let a = std::fs::read(first).unwrap();
    let b = std::fs::read(second).unwrap();
    assert_eq!(a, b);
}

#[test]
fn skip_cycle_suppresses_early_records() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("skip.bin");
    std::fs::write(&image_path, arithmetic_image()).unwrap();

    let trace_path = dir.path().join("skip.trace");
    let config = Config {
        ram_size: 1024 * 1024,
        cycles: 6,
        load: vec![rv32emu_core::config::LoadImage {
            path: image_path,
            address: RAM_BASE,
        }],
        dump: DumpConfig {
            path: Some(trace_path.clone()),
            skip_cycles: 3,
            int_reg: true,
            ..DumpConfig::default()
        },
        ..Config::default()
    };
    Emulator::new(config).unwrap().run().unwrap();

    let mut reader = TraceFileReader::open(&trace_path).unwrap();
    let mut count = 0;
    while !reader.is_end() {
        count += 1;
        if !reader.advance().unwrap() {
            break;
        }
    }
    assert_eq!(count, 3); // cycles 3, 4, and 5 only
}
