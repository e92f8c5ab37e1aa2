//! Operand payloads, one variant per encoding family.
//!
//! The decoder establishes the invariant that a given opcode pairs with
//! exactly one operand family; the executor relies on it and does not
//! re-check. `Operand::None` covers instructions whose opcode alone is
//! sufficient (`ecall`, `mret`, `c.nop`, ...) and every `Unknown` op, so
//! later stages never see uninitialized fields.

use super::opcode::{OpClass, OpCode};

/// R-type: register-register operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandR {
    /// Destination register.
    pub rd: usize,
    /// First source register.
    pub rs1: usize,
    /// Second source register.
    pub rs2: usize,
    /// Minor opcode; carries the FP rounding mode for Rv32f/Rv32d ops.
    pub funct3: u32,
    /// Major function code.
    pub funct7: u32,
}

/// R4-type: fused multiply-add with a third source register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandR4 {
    /// Destination register.
    pub rd: usize,
    /// First source register.
    pub rs1: usize,
    /// Second source register.
    pub rs2: usize,
    /// Third source register.
    pub rs3: usize,
    /// Minor opcode; carries the FP rounding mode.
    pub funct3: u32,
    /// Format field (00 = single, 01 = double).
    pub funct2: u32,
}

/// I-type: loads, JALR, and immediate arithmetic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandI {
    /// Sign-extended 12-bit immediate.
    pub imm: i32,
    /// Destination register.
    pub rd: usize,
    /// Source register.
    pub rs1: usize,
    /// Minor opcode.
    pub funct3: u32,
}

/// S-type: stores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandS {
    /// Sign-extended 12-bit immediate.
    pub imm: i32,
    /// Base address register.
    pub rs1: usize,
    /// Data register.
    pub rs2: usize,
    /// Minor opcode.
    pub funct3: u32,
}

/// B-type: conditional branches (even immediate).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandB {
    /// Sign-extended 13-bit immediate (bit 0 always zero).
    pub imm: i32,
    /// First compare register.
    pub rs1: usize,
    /// Second compare register.
    pub rs2: usize,
    /// Minor opcode.
    pub funct3: u32,
}

/// U-type: LUI and AUIPC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandU {
    /// Upper 20 bits already shifted into position.
    pub imm: i32,
    /// Destination register.
    pub rd: usize,
}

/// J-type: JAL (even immediate).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandJ {
    /// Sign-extended 21-bit immediate (bit 0 always zero).
    pub imm: i32,
    /// Link register.
    pub rd: usize,
}

/// Shift-immediate: SLLI/SRLI/SRAI with a 5-bit shift amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandShiftImm {
    /// Destination register.
    pub rd: usize,
    /// Source register.
    pub rs1: usize,
    /// Shift amount in [0, 31].
    pub shamt: u32,
}

/// CSR access with a register source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandCsr {
    /// Destination register.
    pub rd: usize,
    /// Source register (also the write-intent marker: rs1 != 0).
    pub rs1: usize,
    /// 12-bit CSR address.
    pub csr: u32,
}

/// CSR access with a 5-bit zero-extended immediate source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandCsrImm {
    /// Zero-extended immediate operand.
    pub zimm: u32,
    /// Destination register.
    pub rd: usize,
    /// 12-bit CSR address.
    pub csr: u32,
}

/// FENCE predecessor/successor sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandFence {
    /// Predecessor set (PI/PO/PR/PW).
    pub pred: u32,
    /// Successor set (SI/SO/SR/SW).
    pub succ: u32,
}

/// CR format: compressed register-register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandCr {
    /// Destination/first source register.
    pub rd: usize,
    /// First source register.
    pub rs1: usize,
    /// Second source register.
    pub rs2: usize,
}

/// CI format: compressed immediate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandCi {
    /// Decoded immediate (gather pattern depends on the opcode).
    pub imm: i32,
    /// Destination register.
    pub rd: usize,
    /// Source register (equal to `rd` for most CI ops).
    pub rs1: usize,
}

/// CSS format: compressed stack-relative store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandCss {
    /// Zero-extended, scaled stack offset.
    pub imm: i32,
    /// Data register.
    pub rs2: usize,
}

/// CIW format: compressed wide immediate (c.addi4spn).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandCiw {
    /// Zero-extended, scaled immediate.
    pub imm: i32,
    /// Destination register (x8..x15).
    pub rd: usize,
}

/// CL format: compressed load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandCl {
    /// Zero-extended, scaled offset.
    pub imm: i32,
    /// Destination register (x8..x15).
    pub rd: usize,
    /// Base register (x8..x15).
    pub rs1: usize,
}

/// CS format: compressed store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandCs {
    /// Zero-extended, scaled offset.
    pub imm: i32,
    /// Base register (x8..x15).
    pub rs1: usize,
    /// Data register (x8..x15).
    pub rs2: usize,
}

/// CB format: compressed branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandCb {
    /// Sign-extended, even branch offset.
    pub imm: i32,
    /// Compare register (x8..x15).
    pub rs1: usize,
}

/// CJ format: compressed jump.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperandCj {
    /// Sign-extended, even jump offset.
    pub imm: i32,
}

/// The operand payload of a decoded operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// No operand fields; the opcode alone is sufficient.
    None,
    /// R-type payload.
    R(OperandR),
    /// R4-type payload.
    R4(OperandR4),
    /// I-type payload.
    I(OperandI),
    /// S-type payload.
    S(OperandS),
    /// B-type payload.
    B(OperandB),
    /// U-type payload.
    U(OperandU),
    /// J-type payload.
    J(OperandJ),
    /// Shift-immediate payload.
    ShiftImm(OperandShiftImm),
    /// CSR payload with register source.
    Csr(OperandCsr),
    /// CSR payload with immediate source.
    CsrImm(OperandCsrImm),
    /// FENCE payload.
    Fence(OperandFence),
    /// Compressed register-register payload.
    Cr(OperandCr),
    /// Compressed immediate payload.
    Ci(OperandCi),
    /// Compressed stack-store payload.
    Css(OperandCss),
    /// Compressed wide-immediate payload.
    Ciw(OperandCiw),
    /// Compressed load payload.
    Cl(OperandCl),
    /// Compressed store payload.
    Cs(OperandCs),
    /// Compressed branch payload.
    Cb(OperandCb),
    /// Compressed jump payload.
    Cj(OperandCj),
}

/// A decoded operation: class, opcode, and operand payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Op {
    /// Extension class.
    pub class: OpClass,
    /// Mnemonic.
    pub code: OpCode,
    /// Operand payload matching the encoding family of `code`.
    pub operand: Operand,
}

impl Op {
    /// Builds an operation record.
    #[inline(always)]
    pub fn new(class: OpClass, code: OpCode, operand: Operand) -> Self {
        Self {
            class,
            code,
            operand,
        }
    }

    /// The unrecognized-encoding record. Carries `Operand::None` so later
    /// stages never inspect uninitialized fields.
    #[inline(always)]
    pub fn unknown() -> Self {
        Self {
            class: OpClass::Rv32i,
            code: OpCode::Unknown,
            operand: Operand::None,
        }
    }

    /// Whether this operation decoded from a 16-bit (compressed) encoding.
    ///
    /// Compressed ops link and fall through with PC+2 instead of PC+4.
    #[inline(always)]
    pub fn is_compressed(self) -> bool {
        self.class == OpClass::Rv32c
    }
}
