//! Instruction-set model: opcodes, operands, and the decoders.
//!
//! # Structure
//!
//! - `opcode`: extension classes and the closed mnemonic enumeration.
//! - `operand`: one operand record per encoding family, plus the `Op` sum.
//! - `decode`: the standard 32-bit decoder (three-level dispatch).
//! - `rvc`: the compressed 16-bit decoder with the C-extension immediate
//!   gather patterns.

/// ABI register names.
pub mod abi;

/// Standard instruction decoder.
pub mod decode;

/// Instruction classes and mnemonics.
pub mod opcode;

/// Operand payloads and the decoded operation record.
pub mod operand;

/// Compressed instruction decoder.
pub mod rvc;

pub use decode::{decode, is_compressed};
pub use opcode::{OpClass, OpCode};
pub use operand::{Op, Operand};
