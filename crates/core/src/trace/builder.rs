//! Cycle-record builder.
//!
//! The builder allocates the exact backing buffer for one record up front
//! from a [`CycleConfig`], fills in the header and the meta array (nodes
//! appear in ascending tag order, repeated per configured count), then
//! accepts node bodies. A body whose length differs from the configured
//! node size is rejected — that mismatch is in the fatal error category.

use super::config::CycleConfig;
use super::node::{NodeType, CYCLE_HEADER_SIZE, META_NODE_SIZE, NODE_TYPES};
use super::TraceError;

/// Builder for one cycle record.
#[derive(Debug)]
pub struct CycleBuilder {
    data: Vec<u8>,
    // (type, body offset, body size) per meta entry, in record order.
    metas: Vec<(NodeType, usize, usize)>,
}

impl CycleBuilder {
    /// Allocates a record for the given configuration with zeroed bodies
    /// and `next`/`prev` offsets of 0.
    pub fn new(config: &CycleConfig) -> Self {
        let meta_count = config.total_node_count() as usize;

        let mut metas = Vec::with_capacity(meta_count);
        let mut offset = CYCLE_HEADER_SIZE + meta_count * META_NODE_SIZE;
        for node_type in NODE_TYPES {
            let size = config.node_size(node_type);
            for _ in 0..config.node_count(node_type) {
                metas.push((node_type, offset, size));
                offset += size;
            }
        }

        let mut data = vec![0u8; offset];
        data[16..20].copy_from_slice(&(meta_count as i32).to_le_bytes());
        for (index, (node_type, _, size)) in metas.iter().enumerate() {
            let meta_offset = CYCLE_HEADER_SIZE + index * META_NODE_SIZE;
            data[meta_offset..meta_offset + 4].copy_from_slice(&(*node_type as i32).to_le_bytes());
            data[meta_offset + 8..meta_offset + 16]
                .copy_from_slice(&(*size as i64).to_le_bytes());
        }

        Self { data, metas }
    }

    /// Patches the byte offset to the next cycle header.
    pub fn set_next_offset(&mut self, offset: i64) {
        self.data[0..8].copy_from_slice(&offset.to_le_bytes());
    }

    /// Patches the byte offset to the previous cycle header (negative).
    pub fn set_prev_offset(&mut self, offset: i64) {
        self.data[8..16].copy_from_slice(&offset.to_le_bytes());
    }

    /// Stores the body of the first node of `node_type`.
    pub fn set_node(&mut self, node_type: NodeType, body: &[u8]) -> Result<(), TraceError> {
        self.set_node_at(node_type, 0, body)
    }

    /// Stores the body of the `index`-th node of `node_type`.
    pub fn set_node_at(
        &mut self,
        node_type: NodeType,
        index: usize,
        body: &[u8],
    ) -> Result<(), TraceError> {
        let (_, offset, size) = *self
            .metas
            .iter()
            .filter(|(t, _, _)| *t == node_type)
            .nth(index)
            .ok_or(TraceError::MissingNode(node_type))?;
        if body.len() != size {
            return Err(TraceError::NodeSizeMismatch {
                expected: size,
                actual: body.len(),
            });
        }
        self.data[offset..offset + size].copy_from_slice(body);
        Ok(())
    }

    /// Total record size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the record carries no bytes (never true in practice; the
    /// header alone occupies 24 bytes).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The finished record bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Borrows the record bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
