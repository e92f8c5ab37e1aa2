//! Cycle-record node types and their fixed on-disk layouts.
//!
//! All integers are little-endian. Each node has a declared total size;
//! bytes past the listed fields are reserved and written as zero. The
//! layouts are the wire contract two independent simulators must agree on
//! for the bit-compare to succeed.

use super::TraceError;

/// Node type tags as stored in cycle meta entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i32)]
pub enum NodeType {
    /// Cycle number, op id, instruction word, privilege level.
    BasicInfo = 1,
    /// 32-bit virtual/physical PC pair.
    Pc32 = 2,
    /// 64-bit virtual/physical PC pair.
    Pc64 = 3,
    /// 32 × 32-bit integer registers.
    IntReg32 = 4,
    /// 32 × 64-bit integer registers.
    IntReg64 = 5,
    /// Array of 32-bit CSR address/value pairs.
    Csr32 = 6,
    /// Array of 64-bit CSR address/value pairs.
    Csr64 = 7,
    /// 32-bit trap record.
    Trap32 = 8,
    /// 64-bit trap record.
    Trap64 = 9,
    /// 32-bit memory access record.
    MemoryAccess32 = 10,
    /// 64-bit memory access record.
    MemoryAccess64 = 11,
    /// Host-IO probe value.
    Io = 12,
    /// Raw RAM snapshot.
    Memory = 13,
    /// 32 × 64-bit NaN-boxed FP registers.
    FpReg = 14,
}

/// Number of distinct node types plus one (array-index headroom).
pub const NODE_TYPE_MAX: usize = 15;

/// All node types in tag order, the order nodes appear within a record.
pub const NODE_TYPES: [NodeType; 14] = [
    NodeType::BasicInfo,
    NodeType::Pc32,
    NodeType::Pc64,
    NodeType::IntReg32,
    NodeType::IntReg64,
    NodeType::Csr32,
    NodeType::Csr64,
    NodeType::Trap32,
    NodeType::Trap64,
    NodeType::MemoryAccess32,
    NodeType::MemoryAccess64,
    NodeType::Io,
    NodeType::Memory,
    NodeType::FpReg,
];

impl NodeType {
    /// Decodes a meta-entry tag.
    pub fn from_i32(value: i32) -> Result<Self, TraceError> {
        NODE_TYPES
            .into_iter()
            .find(|t| *t as i32 == value)
            .ok_or(TraceError::InvalidNodeType(value))
    }
}

/// Size of the cycle-record header in bytes.
pub const CYCLE_HEADER_SIZE: usize = 24;
/// Size of one meta entry in bytes.
pub const META_NODE_SIZE: usize = 16;

/// `BasicInfo` node size.
pub const BASIC_INFO_SIZE: usize = 16;
/// `Pc32` node size.
pub const PC32_SIZE: usize = 8;
/// `Pc64` node size.
pub const PC64_SIZE: usize = 16;
/// `IntReg32` node size.
pub const INT_REG32_SIZE: usize = 128;
/// `IntReg64` node size.
pub const INT_REG64_SIZE: usize = 256;
/// `Trap32` node size.
pub const TRAP32_SIZE: usize = 20;
/// `Trap64` node size.
pub const TRAP64_SIZE: usize = 24;
/// `MemoryAccess32` node size.
pub const MEMORY_ACCESS32_SIZE: usize = 20;
/// `MemoryAccess64` node size.
pub const MEMORY_ACCESS64_SIZE: usize = 32;
/// `Io` node size.
pub const IO_SIZE: usize = 8;
/// `FpReg` node size.
pub const FP_REG_SIZE: usize = 256;
/// Size of one `Csr32` entry.
pub const CSR32_ENTRY_SIZE: usize = 8;
/// Size of one `Csr64` entry.
pub const CSR64_ENTRY_SIZE: usize = 16;

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn get_u32(buf: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

fn get_u64(buf: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

/// Cycle number, retirement id, instruction word, and privilege level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicInfoNode {
    /// Cycle index.
    pub cycle: u32,
    /// Monotonic retirement id.
    pub op_id: u32,
    /// Raw instruction word.
    pub insn: u32,
    /// Privilege level before execution.
    pub privilege: u8,
}

impl BasicInfoNode {
    /// Serializes into the 16-byte layout.
    pub fn encode(&self) -> [u8; BASIC_INFO_SIZE] {
        let mut buf = [0u8; BASIC_INFO_SIZE];
        put_u32(&mut buf, 0, self.cycle);
        put_u32(&mut buf, 4, self.op_id);
        put_u32(&mut buf, 8, self.insn);
        buf[12] = self.privilege;
        buf
    }

    /// Deserializes from the 16-byte layout.
    pub fn decode(buf: &[u8]) -> Result<Self, TraceError> {
        check_size(buf, BASIC_INFO_SIZE)?;
        Ok(Self {
            cycle: get_u32(buf, 0),
            op_id: get_u32(buf, 4),
            insn: get_u32(buf, 8),
            privilege: buf[12],
        })
    }
}

/// 32-bit virtual/physical PC pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pc32Node {
    /// Virtual PC.
    pub virtual_pc: u32,
    /// Physical PC.
    pub physical_pc: u32,
}

impl Pc32Node {
    /// Serializes into the 8-byte layout.
    pub fn encode(&self) -> [u8; PC32_SIZE] {
        let mut buf = [0u8; PC32_SIZE];
        put_u32(&mut buf, 0, self.virtual_pc);
        put_u32(&mut buf, 4, self.physical_pc);
        buf
    }

    /// Deserializes from the 8-byte layout.
    pub fn decode(buf: &[u8]) -> Result<Self, TraceError> {
        check_size(buf, PC32_SIZE)?;
        Ok(Self {
            virtual_pc: get_u32(buf, 0),
            physical_pc: get_u32(buf, 4),
        })
    }
}

/// 64-bit virtual/physical PC pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pc64Node {
    /// Virtual PC.
    pub virtual_pc: u64,
    /// Physical PC.
    pub physical_pc: u64,
}

impl Pc64Node {
    /// Serializes into the 16-byte layout.
    pub fn encode(&self) -> [u8; PC64_SIZE] {
        let mut buf = [0u8; PC64_SIZE];
        put_u64(&mut buf, 0, self.virtual_pc);
        put_u64(&mut buf, 8, self.physical_pc);
        buf
    }

    /// Deserializes from the 16-byte layout.
    pub fn decode(buf: &[u8]) -> Result<Self, TraceError> {
        check_size(buf, PC64_SIZE)?;
        Ok(Self {
            virtual_pc: get_u64(buf, 0),
            physical_pc: get_u64(buf, 8),
        })
    }
}

/// 32 × 32-bit integer registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntReg32Node {
    /// Register values `x0..x31`.
    pub regs: [u32; 32],
}

impl IntReg32Node {
    /// Serializes into the 128-byte layout.
    pub fn encode(&self) -> [u8; INT_REG32_SIZE] {
        let mut buf = [0u8; INT_REG32_SIZE];
        for (i, reg) in self.regs.iter().enumerate() {
            put_u32(&mut buf, i * 4, *reg);
        }
        buf
    }

    /// Deserializes from the 128-byte layout.
    pub fn decode(buf: &[u8]) -> Result<Self, TraceError> {
        check_size(buf, INT_REG32_SIZE)?;
        let mut regs = [0u32; 32];
        for (i, reg) in regs.iter_mut().enumerate() {
            *reg = get_u32(buf, i * 4);
        }
        Ok(Self { regs })
    }
}

/// 32 × 64-bit registers (integer rv64 or NaN-boxed FP).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reg64Node {
    /// Register values.
    pub regs: [u64; 32],
}

impl Reg64Node {
    /// Serializes into the 256-byte layout.
    pub fn encode(&self) -> [u8; INT_REG64_SIZE] {
        let mut buf = [0u8; INT_REG64_SIZE];
        for (i, reg) in self.regs.iter().enumerate() {
            put_u64(&mut buf, i * 8, *reg);
        }
        buf
    }

    /// Deserializes from the 256-byte layout.
    pub fn decode(buf: &[u8]) -> Result<Self, TraceError> {
        check_size(buf, INT_REG64_SIZE)?;
        let mut regs = [0u64; 32];
        for (i, reg) in regs.iter_mut().enumerate() {
            *reg = get_u64(buf, i * 8);
        }
        Ok(Self { regs })
    }
}

/// 32-bit trap record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Trap32Node {
    /// 0 = interrupt, 1 = exception, 2 = return.
    pub trap_type: u8,
    /// Privilege level the trap left.
    pub from: u8,
    /// Privilege level the trap entered.
    pub to: u8,
    /// Cause code (without the interrupt bit).
    pub cause: u8,
    /// `xtval` value.
    pub trap_value: u32,
}

impl Trap32Node {
    /// Serializes into the 20-byte layout.
    pub fn encode(&self) -> [u8; TRAP32_SIZE] {
        let mut buf = [0u8; TRAP32_SIZE];
        buf[0] = self.trap_type;
        buf[1] = self.from;
        buf[2] = self.to;
        buf[3] = self.cause;
        put_u32(&mut buf, 4, self.trap_value);
        buf
    }

    /// Deserializes from the 20-byte layout.
    pub fn decode(buf: &[u8]) -> Result<Self, TraceError> {
        check_size(buf, TRAP32_SIZE)?;
        Ok(Self {
            trap_type: buf[0],
            from: buf[1],
            to: buf[2],
            cause: buf[3],
            trap_value: get_u32(buf, 4),
        })
    }
}

/// 64-bit trap record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Trap64Node {
    /// 0 = interrupt, 1 = exception, 2 = return.
    pub trap_type: u8,
    /// Privilege level the trap left.
    pub from: u8,
    /// Privilege level the trap entered.
    pub to: u8,
    /// Cause code (without the interrupt bit).
    pub cause: u8,
    /// `xtval` value.
    pub trap_value: u64,
}

impl Trap64Node {
    /// Serializes into the 24-byte layout.
    pub fn encode(&self) -> [u8; TRAP64_SIZE] {
        let mut buf = [0u8; TRAP64_SIZE];
        buf[0] = self.trap_type;
        buf[1] = self.from;
        buf[2] = self.to;
        buf[3] = self.cause;
        put_u64(&mut buf, 8, self.trap_value);
        buf
    }

    /// Deserializes from the 24-byte layout.
    pub fn decode(buf: &[u8]) -> Result<Self, TraceError> {
        check_size(buf, TRAP64_SIZE)?;
        Ok(Self {
            trap_type: buf[0],
            from: buf[1],
            to: buf[2],
            cause: buf[3],
            trap_value: get_u64(buf, 8),
        })
    }
}

/// 32-bit memory access record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryAccess32Node {
    /// Virtual address.
    pub virtual_address: u32,
    /// Physical address.
    pub physical_address: u32,
    /// Value read or written.
    pub value: u32,
    /// 0 = instruction, 2 = load, 3 = store.
    pub access_type: u8,
    /// Access width in bytes.
    pub access_size: u8,
}

impl MemoryAccess32Node {
    /// Serializes into the 20-byte layout.
    pub fn encode(&self) -> [u8; MEMORY_ACCESS32_SIZE] {
        let mut buf = [0u8; MEMORY_ACCESS32_SIZE];
        put_u32(&mut buf, 0, self.virtual_address);
        put_u32(&mut buf, 4, self.physical_address);
        put_u32(&mut buf, 8, self.value);
        buf[12] = self.access_type;
        buf[13] = self.access_size;
        buf
    }

    /// Deserializes from the 20-byte layout.
    pub fn decode(buf: &[u8]) -> Result<Self, TraceError> {
        check_size(buf, MEMORY_ACCESS32_SIZE)?;
        Ok(Self {
            virtual_address: get_u32(buf, 0),
            physical_address: get_u32(buf, 4),
            value: get_u32(buf, 8),
            access_type: buf[12],
            access_size: buf[13],
        })
    }
}

/// 64-bit memory access record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryAccess64Node {
    /// Virtual address.
    pub virtual_address: u64,
    /// Physical address.
    pub physical_address: u64,
    /// Value read or written.
    pub value: u64,
    /// 0 = instruction, 2 = load, 3 = store.
    pub access_type: u8,
    /// Access width in bytes.
    pub access_size: u8,
}

impl MemoryAccess64Node {
    /// Serializes into the 32-byte layout.
    pub fn encode(&self) -> [u8; MEMORY_ACCESS64_SIZE] {
        let mut buf = [0u8; MEMORY_ACCESS64_SIZE];
        put_u64(&mut buf, 0, self.virtual_address);
        put_u64(&mut buf, 8, self.physical_address);
        put_u64(&mut buf, 16, self.value);
        buf[24] = self.access_type;
        buf[25] = self.access_size;
        buf
    }

    /// Deserializes from the 32-byte layout.
    pub fn decode(buf: &[u8]) -> Result<Self, TraceError> {
        check_size(buf, MEMORY_ACCESS64_SIZE)?;
        Ok(Self {
            virtual_address: get_u64(buf, 0),
            physical_address: get_u64(buf, 8),
            value: get_u64(buf, 16),
            access_type: buf[24],
            access_size: buf[25],
        })
    }
}

/// Host-IO probe value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IoNode {
    /// The u32 at the host-IO address.
    pub host_io_value: u32,
}

impl IoNode {
    /// Serializes into the 8-byte layout.
    pub fn encode(&self) -> [u8; IO_SIZE] {
        let mut buf = [0u8; IO_SIZE];
        put_u32(&mut buf, 0, self.host_io_value);
        buf
    }

    /// Deserializes from the 8-byte layout.
    pub fn decode(buf: &[u8]) -> Result<Self, TraceError> {
        check_size(buf, IO_SIZE)?;
        Ok(Self {
            host_io_value: get_u32(buf, 0),
        })
    }
}

/// One `Csr32` entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Csr32Entry {
    /// CSR address.
    pub address: u32,
    /// CSR value.
    pub value: u32,
}

/// Serializes a `Csr32` node body from address/value pairs.
pub fn encode_csr32(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(entries.len() * CSR32_ENTRY_SIZE);
    for (address, value) in entries {
        buf.extend_from_slice(&address.to_le_bytes());
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf
}

/// Deserializes a `Csr32` node body.
pub fn decode_csr32(buf: &[u8]) -> Result<Vec<Csr32Entry>, TraceError> {
    if buf.len() % CSR32_ENTRY_SIZE != 0 {
        return Err(TraceError::NodeSizeMismatch {
            expected: buf.len() - buf.len() % CSR32_ENTRY_SIZE,
            actual: buf.len(),
        });
    }
    Ok(buf
        .chunks_exact(CSR32_ENTRY_SIZE)
        .map(|chunk| Csr32Entry {
            address: get_u32(chunk, 0),
            value: get_u32(chunk, 4),
        })
        .collect())
}

fn check_size(buf: &[u8], expected: usize) -> Result<(), TraceError> {
    if buf.len() == expected {
        Ok(())
    } else {
        Err(TraceError::NodeSizeMismatch {
            expected,
            actual: buf.len(),
        })
    }
}
