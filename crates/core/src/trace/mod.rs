//! Execution-trace codec.
//!
//! A trace file records, per retired cycle, the architectural deltas and
//! events sufficient to bit-compare two independent simulators:
//!
//! - `node`: the self-describing node layouts (all little-endian).
//! - `config`/`builder`: exact-size record construction.
//! - `reader`: record parsing and node lookup.
//! - `writer`: file-level framing (`"RVTRACE\0"` signature, record chain
//!   linked by `next`/`prev` offsets, terminated by `next = 0`).
//! - `dumper`: per-cycle record production from the system state.
//! - `diff`: the cycle comparator used by the diff tool.

use thiserror::Error;

/// Cycle-record builder.
pub mod builder;

/// Cycle-record configuration.
pub mod config;

/// Cycle comparator.
pub mod diff;

/// Per-cycle record production.
pub mod dumper;

/// Node layouts.
pub mod node;

/// Cycle-record reader.
pub mod reader;

/// File-level framing.
pub mod writer;

pub use builder::CycleBuilder;
pub use config::CycleConfig;
pub use diff::CycleComparator;
pub use dumper::TraceDumper;
pub use node::NodeType;
pub use reader::CycleReader;
pub use writer::{TraceFileReader, TraceFileWriter};

/// Trace codec failures. All of these are in the fatal category: they
/// indicate a corrupt file or a builder/dumper bug, never an
/// architectural condition.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Underlying file I/O failure.
    #[error("trace file i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the `"RVTRACE\0"` signature.
    #[error("not a trace file (bad signature)")]
    BadSignature,

    /// A record or node extends past the end of the buffer.
    #[error("truncated trace data")]
    Truncated,

    /// A meta entry carries an unknown node-type tag.
    #[error("invalid node type tag {0}")]
    InvalidNodeType(i32),

    /// A node body does not have its configured size.
    #[error("node size mismatch: expected {expected} bytes, got {actual}")]
    NodeSizeMismatch {
        /// Configured size.
        expected: usize,
        /// Presented size.
        actual: usize,
    },

    /// A node required by the configuration is absent.
    #[error("missing node {0:?}")]
    MissingNode(NodeType),
}
