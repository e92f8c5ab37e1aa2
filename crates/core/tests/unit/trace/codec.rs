//! Cycle-record builder/reader round trips and size enforcement.

use pretty_assertions::assert_eq;

use rv32emu_core::trace::builder::CycleBuilder;
use rv32emu_core::trace::config::CycleConfig;
use rv32emu_core::trace::node::{
    encode_csr32, BasicInfoNode, IntReg32Node, IoNode, MemoryAccess32Node, Pc32Node, Trap32Node,
    BASIC_INFO_SIZE, CYCLE_HEADER_SIZE, MEMORY_ACCESS32_SIZE, META_NODE_SIZE, TRAP32_SIZE,
};
use rv32emu_core::trace::reader::CycleReader;
use rv32emu_core::trace::{NodeType, TraceError};

fn full_config() -> CycleConfig {
    let mut config = CycleConfig::new();
    config.set_node_count(NodeType::BasicInfo, 1);
    config.set_node_count(NodeType::Pc32, 1);
    config.set_node_count(NodeType::IntReg32, 1);
    config.set_node_count(NodeType::Trap32, 1);
    config.set_node_count(NodeType::MemoryAccess32, 2);
    config.set_node_count(NodeType::Io, 1);
    config.set_node_count(NodeType::Csr32, 1);
    config.set_csr_count(3);
    config.set_node_count(NodeType::Memory, 1);
    config.set_ram_size(64);
    config
}

#[test]
fn record_layout_is_header_metas_then_bodies() {
    let config = full_config();
    let builder = CycleBuilder::new(&config);
    let expected = CYCLE_HEADER_SIZE
        + 9 * META_NODE_SIZE
        + BASIC_INFO_SIZE
        + 8 // pc32
        + 128 // int regs
        + 3 * 8 // csr
        + TRAP32_SIZE
        + 2 * MEMORY_ACCESS32_SIZE
        + 8 // io
        + 64; // memory
    assert_eq!(builder.len(), expected);
}

#[test]
fn round_trip_preserves_every_node() {
    let config = full_config();
    let mut builder = CycleBuilder::new(&config);

    let basic = BasicInfoNode {
        cycle: 7,
        op_id: 42,
        insn: 0x0050_0093,
        privilege: 3,
    };
    let pc = Pc32Node {
        virtual_pc: 0x8000_0000,
        physical_pc: 0x8000_0000,
    };
    let mut regs = [0u32; 32];
    for (i, reg) in regs.iter_mut().enumerate() {
        *reg = i as u32 * 3;
    }
    let trap = Trap32Node {
        trap_type: 1,
        from: 3,
        to: 3,
        cause: 2,
        trap_value: 0xFFFF_FFFF,
    };
    let access0 = MemoryAccess32Node {
        virtual_address: 0x10,
        physical_address: 0x8000_0010,
        value: 0xAB,
        access_type: 2,
        access_size: 1,
    };
    let access1 = MemoryAccess32Node {
        virtual_address: 0x20,
        physical_address: 0x8000_0020,
        value: 0xCDEF,
        access_type: 3,
        access_size: 2,
    };
    let io = IoNode { host_io_value: 1 };
    let csrs = [(0x300u32, 0x1888u32), (0x305, 0x8000_0100), (0x341, 0x4)];
    let memory = [0x5Au8; 64];

    builder.set_node(NodeType::BasicInfo, &basic.encode()).unwrap();
    builder.set_node(NodeType::Pc32, &pc.encode()).unwrap();
    builder
        .set_node(NodeType::IntReg32, &IntReg32Node { regs }.encode())
        .unwrap();
    builder.set_node(NodeType::Trap32, &trap.encode()).unwrap();
    builder
        .set_node_at(NodeType::MemoryAccess32, 0, &access0.encode())
        .unwrap();
    builder
        .set_node_at(NodeType::MemoryAccess32, 1, &access1.encode())
        .unwrap();
    builder.set_node(NodeType::Io, &io.encode()).unwrap();
    builder.set_node(NodeType::Csr32, &encode_csr32(&csrs)).unwrap();
    builder.set_node(NodeType::Memory, &memory).unwrap();

    let bytes = builder.into_bytes();
    let reader = CycleReader::parse(&bytes).unwrap();

    assert_eq!(reader.basic_info().unwrap().unwrap(), basic);
    assert_eq!(reader.pc32().unwrap().unwrap(), pc);
    assert_eq!(reader.int_reg32().unwrap().unwrap().regs, regs);
    assert_eq!(reader.trap32().unwrap().unwrap(), trap);
    assert_eq!(reader.memory_access32(0).unwrap().unwrap(), access0);
    assert_eq!(reader.memory_access32(1).unwrap().unwrap(), access1);
    assert_eq!(reader.io().unwrap().unwrap(), io);
    let decoded_csrs = reader.csr32().unwrap().unwrap();
    assert_eq!(decoded_csrs.len(), 3);
    assert_eq!(
        (decoded_csrs[1].address, decoded_csrs[1].value),
        (0x305, 0x8000_0100)
    );
    assert_eq!(reader.memory().unwrap(), &memory);
}

#[test]
fn missing_nodes_read_as_none() {
    let mut config = CycleConfig::new();
    config.set_node_count(NodeType::BasicInfo, 1);
    let builder = CycleBuilder::new(&config);
    let bytes = builder.into_bytes();
    let reader = CycleReader::parse(&bytes).unwrap();

    assert!(reader.basic_info().is_some());
    assert!(reader.trap32().is_none());
    assert!(reader.pc32().is_none());
    assert!(reader.memory_access32(0).is_none());
}

#[test]
fn node_size_mismatch_is_rejected() {
    let mut config = CycleConfig::new();
    config.set_node_count(NodeType::Pc32, 1);
    let mut builder = CycleBuilder::new(&config);

    let too_short = [0u8; 4];
    let err = builder.set_node(NodeType::Pc32, &too_short);
    assert!(matches!(
        err,
        Err(TraceError::NodeSizeMismatch {
            expected: 8,
            actual: 4
        })
    ));
}

#[test]
fn setting_an_unconfigured_node_is_rejected() {
    let mut config = CycleConfig::new();
    config.set_node_count(NodeType::BasicInfo, 1);
    let mut builder = CycleBuilder::new(&config);

    let err = builder.set_node(NodeType::Io, &[0u8; 8]);
    assert!(matches!(err, Err(TraceError::MissingNode(NodeType::Io))));
}

#[test]
fn nodes_appear_in_ascending_tag_order() {
    let config = full_config();
    let bytes = CycleBuilder::new(&config).into_bytes();
    let reader = CycleReader::parse(&bytes).unwrap();

    // The meta array is declared in tag order; spot-check with counts.
    assert_eq!(reader.node_count(NodeType::BasicInfo), 1);
    assert_eq!(reader.node_count(NodeType::MemoryAccess32), 2);
    assert_eq!(reader.node_count(NodeType::Memory), 1);

    let meta_count = i32::from_le_bytes(bytes[16..20].try_into().unwrap());
    assert_eq!(meta_count, 9);
}

#[test]
fn truncated_buffers_are_rejected() {
    assert!(matches!(
        CycleReader::parse(&[0u8; 10]),
        Err(TraceError::Truncated)
    ));
}

#[test]
fn unknown_node_tags_are_rejected() {
    let mut config = CycleConfig::new();
    config.set_node_count(NodeType::BasicInfo, 1);
    let mut bytes = CycleBuilder::new(&config).into_bytes();
    // Corrupt the first meta entry's tag.
    bytes[CYCLE_HEADER_SIZE] = 0x7F;
    assert!(matches!(
        CycleReader::parse(&bytes),
        Err(TraceError::InvalidNodeType(0x7F))
    ));
}
