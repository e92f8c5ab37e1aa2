//! Cycle-record reader.
//!
//! Wraps one record's bytes, parses the header and meta array, and hands
//! out node bodies. `node(type, index)` performs a linear scan of the
//! metas; a missing node is `None`, while the typed accessors additionally
//! enforce the fixed layouts' sizes.

use super::node::{
    decode_csr32, BasicInfoNode, Csr32Entry, IntReg32Node, IoNode, MemoryAccess32Node, NodeType,
    Pc32Node, Reg64Node, Trap32Node, CYCLE_HEADER_SIZE, META_NODE_SIZE,
};
use super::TraceError;

/// Reader over one cycle record.
#[derive(Debug)]
pub struct CycleReader<'a> {
    data: &'a [u8],
    next: i64,
    prev: i64,
    // (type, body offset, body size) per meta entry, in record order.
    metas: Vec<(NodeType, usize, usize)>,
}

impl<'a> CycleReader<'a> {
    /// Parses a record that starts at the beginning of `data` (trailing
    /// bytes beyond the record are ignored).
    pub fn parse(data: &'a [u8]) -> Result<Self, TraceError> {
        if data.len() < CYCLE_HEADER_SIZE {
            return Err(TraceError::Truncated);
        }
        let next = i64::from_le_bytes(slice8(data, 0)?);
        let prev = i64::from_le_bytes(slice8(data, 8)?);
        let meta_count = i32::from_le_bytes(slice4(data, 16)?);
        if meta_count < 0 {
            return Err(TraceError::Truncated);
        }
        let meta_count = meta_count as usize;

        let mut metas = Vec::with_capacity(meta_count);
        let mut offset = CYCLE_HEADER_SIZE + meta_count * META_NODE_SIZE;
        for index in 0..meta_count {
            let meta_offset = CYCLE_HEADER_SIZE + index * META_NODE_SIZE;
            let node_type = NodeType::from_i32(i32::from_le_bytes(slice4(data, meta_offset)?))?;
            let size = i64::from_le_bytes(slice8(data, meta_offset + 8)?);
            if size < 0 {
                return Err(TraceError::Truncated);
            }
            metas.push((node_type, offset, size as usize));
            offset += size as usize;
        }
        if offset > data.len() {
            return Err(TraceError::Truncated);
        }

        Ok(Self {
            data,
            next,
            prev,
            metas,
        })
    }

    /// Byte offset to the next record header (0 on the last record).
    pub fn next_offset(&self) -> i64 {
        self.next
    }

    /// Byte offset to the previous record header (0 on the first record).
    pub fn prev_offset(&self) -> i64 {
        self.prev
    }

    /// Total size of this record in bytes.
    pub fn record_len(&self) -> usize {
        self.metas
            .last()
            .map_or(CYCLE_HEADER_SIZE, |(_, offset, size)| offset + size)
    }

    /// Number of nodes of `node_type` in this record.
    pub fn node_count(&self, node_type: NodeType) -> usize {
        self.metas.iter().filter(|(t, _, _)| *t == node_type).count()
    }

    /// Body of the `index`-th node of `node_type`, if present.
    pub fn node(&self, node_type: NodeType, index: usize) -> Option<&'a [u8]> {
        let data = self.data;
        self.metas
            .iter()
            .filter(|(t, _, _)| *t == node_type)
            .nth(index)
            .map(|&(_, offset, size)| &data[offset..offset + size])
    }

    /// The `BasicInfo` node.
    pub fn basic_info(&self) -> Option<Result<BasicInfoNode, TraceError>> {
        self.node(NodeType::BasicInfo, 0).map(BasicInfoNode::decode)
    }

    /// The `Pc32` node.
    pub fn pc32(&self) -> Option<Result<Pc32Node, TraceError>> {
        self.node(NodeType::Pc32, 0).map(Pc32Node::decode)
    }

    /// The `IntReg32` node.
    pub fn int_reg32(&self) -> Option<Result<IntReg32Node, TraceError>> {
        self.node(NodeType::IntReg32, 0).map(IntReg32Node::decode)
    }

    /// The `FpReg` node.
    pub fn fp_reg(&self) -> Option<Result<Reg64Node, TraceError>> {
        self.node(NodeType::FpReg, 0).map(Reg64Node::decode)
    }

    /// The `Trap32` node.
    pub fn trap32(&self) -> Option<Result<Trap32Node, TraceError>> {
        self.node(NodeType::Trap32, 0).map(Trap32Node::decode)
    }

    /// The `index`-th `MemoryAccess32` node.
    pub fn memory_access32(&self, index: usize) -> Option<Result<MemoryAccess32Node, TraceError>> {
        self.node(NodeType::MemoryAccess32, index)
            .map(MemoryAccess32Node::decode)
    }

    /// The `Io` node.
    pub fn io(&self) -> Option<Result<IoNode, TraceError>> {
        self.node(NodeType::Io, 0).map(IoNode::decode)
    }

    /// The decoded `Csr32` node.
    pub fn csr32(&self) -> Option<Result<Vec<Csr32Entry>, TraceError>> {
        self.node(NodeType::Csr32, 0).map(decode_csr32)
    }

    /// The raw `Memory` node body.
    pub fn memory(&self) -> Option<&'a [u8]> {
        self.node(NodeType::Memory, 0)
    }
}

fn slice4(data: &[u8], offset: usize) -> Result<[u8; 4], TraceError> {
    data.get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or(TraceError::Truncated)
}

fn slice8(data: &[u8], offset: usize) -> Result<[u8; 8], TraceError> {
    data.get(offset..offset + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or(TraceError::Truncated)
}
