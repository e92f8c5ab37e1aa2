//! Trace file framing tests: signature, record chaining, and the
//! comparator.

use pretty_assertions::assert_eq;

use rv32emu_core::trace::builder::CycleBuilder;
use rv32emu_core::trace::config::CycleConfig;
use rv32emu_core::trace::node::BasicInfoNode;
use rv32emu_core::trace::{
    CycleComparator, NodeType, TraceError, TraceFileReader, TraceFileWriter,
};

fn basic_record(cycle: u32) -> Vec<u8> {
    let mut config = CycleConfig::new();
    config.set_node_count(NodeType::BasicInfo, 1);
    let mut builder = CycleBuilder::new(&config);
    builder
        .set_node(
            NodeType::BasicInfo,
            &BasicInfoNode {
                cycle,
                op_id: cycle,
                insn: 0x13,
                privilege: 3,
            }
            .encode(),
        )
        .unwrap();
    builder.into_bytes()
}

#[test]
fn file_header_and_chain_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.bin");

    let mut writer = TraceFileWriter::create(&path).unwrap();
    for cycle in 0..3 {
        writer.write_cycle(basic_record(cycle)).unwrap();
    }
    writer.finish().unwrap();

    // Signature and header size.
    let raw = std::fs::read(&path).unwrap();
    assert_eq!(&raw[0..8], b"RVTRACE\0");
    assert_eq!(i64::from_le_bytes(raw[8..16].try_into().unwrap()), 16);

    let mut reader = TraceFileReader::open(&path).unwrap();
    let record_len = basic_record(0).len() as i64;

    // First record: prev = 0, next = its own size.
    let cycle = reader.cycle().unwrap();
    assert_eq!(cycle.prev_offset(), 0);
    assert_eq!(cycle.next_offset(), record_len);
    assert_eq!(cycle.basic_info().unwrap().unwrap().cycle, 0);

    assert!(reader.advance().unwrap());
    let cycle = reader.cycle().unwrap();
    assert_eq!(cycle.prev_offset(), -record_len);
    assert_eq!(cycle.basic_info().unwrap().unwrap().cycle, 1);

    assert!(reader.advance().unwrap());
    let cycle = reader.cycle().unwrap();
    assert_eq!(cycle.basic_info().unwrap().unwrap().cycle, 2);
    // The final record terminates the chain.
    assert_eq!(cycle.next_offset(), 0);

    assert!(!reader.advance().unwrap());
    assert!(reader.is_end());
}

#[test]
fn empty_trace_is_just_the_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.bin");
    TraceFileWriter::create(&path).unwrap().finish().unwrap();

    let reader = TraceFileReader::open(&path).unwrap();
    assert!(reader.is_end());
}

#[test]
fn bad_signature_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bogus.bin");
    std::fs::write(&path, b"NOTATRACE_FILE_X").unwrap();

    assert!(matches!(
        TraceFileReader::open(&path),
        Err(TraceError::BadSignature)
    ));
}

#[test]
fn comparator_accepts_identical_and_flags_differing_records() {
    fn record(x1: u32) -> Vec<u8> {
        use rv32emu_core::trace::node::{IntReg32Node, Pc32Node};
        let mut config = CycleConfig::new();
        config.set_node_count(NodeType::Pc32, 1);
        config.set_node_count(NodeType::IntReg32, 1);
        let mut builder = CycleBuilder::new(&config);
        builder
            .set_node(
                NodeType::Pc32,
                &Pc32Node {
                    virtual_pc: 0x8000_0000,
                    physical_pc: 0x8000_0000,
                }
                .encode(),
            )
            .unwrap();
        let mut regs = [0u32; 32];
        regs[1] = x1;
        builder
            .set_node(NodeType::IntReg32, &IntReg32Node { regs }.encode())
            .unwrap();
        builder.into_bytes()
    }

    use rv32emu_core::trace::CycleReader;

    let comparator = CycleComparator::new(true);
    let a = record(5);
    let b = record(5);
    let c = record(6);

    let ra = CycleReader::parse(&a).unwrap();
    let rb = CycleReader::parse(&b).unwrap();
    let rc = CycleReader::parse(&c).unwrap();

    assert!(comparator.are_matched(&ra, &rb).unwrap());
    assert!(!comparator.are_matched(&ra, &rc).unwrap());

    let diffs = comparator.describe_diff(&ra, &rc).unwrap();
    assert_eq!(diffs.len(), 1);
    assert!(diffs[0].contains("x1"));
}
