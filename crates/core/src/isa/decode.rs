//! Standard (32-bit) instruction decoder.
//!
//! Dispatch is three-level: compressed-vs-standard on the low two bits,
//! then major opcode (bits [6:0]), then `funct3`/`funct7`/`funct5`/`rs2`
//! as each encoding table requires. Unrecognized encodings decode to
//! [`OpCode::Unknown`] with [`Operand::None`]; there are no spurious
//! matches outside the RV32IMAFDC tables.

use crate::common::bitfield::sign_extend;

use super::opcode::{OpClass, OpCode};
use super::operand::{
    Op, Operand, OperandB, OperandCsr, OperandCsrImm, OperandFence, OperandI, OperandJ, OperandR,
    OperandR4, OperandS, OperandShiftImm, OperandU,
};
use super::rvc;

/// Extracts `width` bits starting at `lsb`.
#[inline(always)]
fn pick(insn: u32, lsb: u32, width: u32) -> u32 {
    (insn >> lsb) & ((1 << width) - 1)
}

/// Whether an instruction word is a compressed (16-bit) encoding.
#[inline(always)]
pub fn is_compressed(insn: u32) -> bool {
    insn & 0b11 != 0b11
}

/// Decodes a 32-bit instruction word (or a 16-bit word in its low half)
/// into an operation record.
pub fn decode(insn: u32) -> Op {
    if is_compressed(insn) {
        return rvc::decode_compressed(insn as u16);
    }

    let opcode = pick(insn, 0, 7);
    let funct3 = pick(insn, 12, 3);
    let funct7 = pick(insn, 25, 7);
    let funct2 = pick(insn, 25, 2);

    if opcode == 0b0110011 && funct7 == 0b0000001 {
        decode_rv32m(insn)
    } else if opcode == 0b0101111 && funct3 == 0b010 {
        decode_rv32a(insn)
    } else if (opcode == 0b0000111 && funct3 == 0b010)
        || (opcode == 0b0100111 && funct3 == 0b010)
        || (matches!(opcode, 0b1000011 | 0b1000111 | 0b1001011 | 0b1001111) && funct2 == 0b00)
        || (opcode == 0b1010011 && funct2 == 0b00 && funct7 != 0b0100000)
    {
        decode_rv32f(insn)
    } else if (opcode == 0b0000111 && funct3 == 0b011)
        || (opcode == 0b0100111 && funct3 == 0b011)
        || (matches!(opcode, 0b1000011 | 0b1000111 | 0b1001011 | 0b1001111) && funct2 == 0b01)
        || (opcode == 0b1010011 && (funct2 == 0b01 || funct7 == 0b0100000))
    {
        decode_rv32d(insn)
    } else {
        decode_rv32i(insn)
    }
}

// ── Operand decoders ──────────────────────────────────────────────

fn operand_r(insn: u32) -> Operand {
    Operand::R(OperandR {
        rd: pick(insn, 7, 5) as usize,
        rs1: pick(insn, 15, 5) as usize,
        rs2: pick(insn, 20, 5) as usize,
        funct3: pick(insn, 12, 3),
        funct7: pick(insn, 25, 7),
    })
}

fn operand_r4(insn: u32) -> Operand {
    Operand::R4(OperandR4 {
        rd: pick(insn, 7, 5) as usize,
        rs1: pick(insn, 15, 5) as usize,
        rs2: pick(insn, 20, 5) as usize,
        rs3: pick(insn, 27, 5) as usize,
        funct3: pick(insn, 12, 3),
        funct2: pick(insn, 25, 2),
    })
}

fn operand_i(insn: u32) -> Operand {
    Operand::I(OperandI {
        imm: sign_extend(pick(insn, 20, 12), 12),
        rd: pick(insn, 7, 5) as usize,
        rs1: pick(insn, 15, 5) as usize,
        funct3: pick(insn, 12, 3),
    })
}

fn operand_s(insn: u32) -> Operand {
    let imm = (pick(insn, 25, 7) << 5) | pick(insn, 7, 5);
    Operand::S(OperandS {
        imm: sign_extend(imm, 12),
        rs1: pick(insn, 15, 5) as usize,
        rs2: pick(insn, 20, 5) as usize,
        funct3: pick(insn, 12, 3),
    })
}

fn operand_b(insn: u32) -> Operand {
    let imm = (pick(insn, 31, 1) << 12)
        | (pick(insn, 7, 1) << 11)
        | (pick(insn, 25, 6) << 5)
        | (pick(insn, 8, 4) << 1);
    Operand::B(OperandB {
        imm: sign_extend(imm, 13),
        rs1: pick(insn, 15, 5) as usize,
        rs2: pick(insn, 20, 5) as usize,
        funct3: pick(insn, 12, 3),
    })
}

fn operand_u(insn: u32) -> Operand {
    Operand::U(OperandU {
        imm: (insn & 0xFFFF_F000) as i32,
        rd: pick(insn, 7, 5) as usize,
    })
}

fn operand_j(insn: u32) -> Operand {
    let imm = (pick(insn, 31, 1) << 20)
        | (pick(insn, 12, 8) << 12)
        | (pick(insn, 20, 1) << 11)
        | (pick(insn, 21, 10) << 1);
    Operand::J(OperandJ {
        imm: sign_extend(imm, 21),
        rd: pick(insn, 7, 5) as usize,
    })
}

fn operand_shift(insn: u32) -> Operand {
    Operand::ShiftImm(OperandShiftImm {
        rd: pick(insn, 7, 5) as usize,
        rs1: pick(insn, 15, 5) as usize,
        shamt: pick(insn, 20, 5),
    })
}

fn operand_csr(insn: u32) -> Operand {
    Operand::Csr(OperandCsr {
        rd: pick(insn, 7, 5) as usize,
        rs1: pick(insn, 15, 5) as usize,
        csr: pick(insn, 20, 12),
    })
}

fn operand_csr_imm(insn: u32) -> Operand {
    Operand::CsrImm(OperandCsrImm {
        zimm: pick(insn, 15, 5),
        rd: pick(insn, 7, 5) as usize,
        csr: pick(insn, 20, 12),
    })
}

fn operand_fence(insn: u32) -> Operand {
    Operand::Fence(OperandFence {
        pred: pick(insn, 24, 4),
        succ: pick(insn, 20, 4),
    })
}

// ── Per-class decoders ────────────────────────────────────────────

fn decode_rv32i(insn: u32) -> Op {
    use OpCode::*;
    let opcode = pick(insn, 0, 7);
    let funct3 = pick(insn, 12, 3);
    let funct7 = pick(insn, 25, 7);
    let funct12 = pick(insn, 20, 12);
    let rd = pick(insn, 7, 5);
    let rs1 = pick(insn, 15, 5);

    let op = |code: OpCode, operand: Operand| Op::new(OpClass::Rv32i, code, operand);

    match opcode {
        0b0110111 => op(Lui, operand_u(insn)),
        0b0010111 => op(Auipc, operand_u(insn)),
        0b1101111 => op(Jal, operand_j(insn)),
        0b1100111 if funct3 == 0 => op(Jalr, operand_i(insn)),
        0b1100011 => match funct3 {
            0 => op(Beq, operand_b(insn)),
            1 => op(Bne, operand_b(insn)),
            4 => op(Blt, operand_b(insn)),
            5 => op(Bge, operand_b(insn)),
            6 => op(Bltu, operand_b(insn)),
            7 => op(Bgeu, operand_b(insn)),
            _ => Op::unknown(),
        },
        0b0000011 => match funct3 {
            0 => op(Lb, operand_i(insn)),
            1 => op(Lh, operand_i(insn)),
            2 => op(Lw, operand_i(insn)),
            4 => op(Lbu, operand_i(insn)),
            5 => op(Lhu, operand_i(insn)),
            _ => Op::unknown(),
        },
        0b0100011 => match funct3 {
            0 => op(Sb, operand_s(insn)),
            1 => op(Sh, operand_s(insn)),
            2 => op(Sw, operand_s(insn)),
            _ => Op::unknown(),
        },
        0b0010011 => match (funct3, funct7) {
            (0, _) => op(Addi, operand_i(insn)),
            (1, 0b0000000) => op(Slli, operand_shift(insn)),
            (2, _) => op(Slti, operand_i(insn)),
            (3, _) => op(Sltiu, operand_i(insn)),
            (4, _) => op(Xori, operand_i(insn)),
            (5, 0b0000000) => op(Srli, operand_shift(insn)),
            (5, 0b0100000) => op(Srai, operand_shift(insn)),
            (6, _) => op(Ori, operand_i(insn)),
            (7, _) => op(Andi, operand_i(insn)),
            _ => Op::unknown(),
        },
        0b0110011 => match (funct7, funct3) {
            (0b0000000, 0) => op(Add, operand_r(insn)),
            (0b0100000, 0) => op(Sub, operand_r(insn)),
            (0b0000000, 1) => op(Sll, operand_r(insn)),
            (0b0000000, 2) => op(Slt, operand_r(insn)),
            (0b0000000, 3) => op(Sltu, operand_r(insn)),
            (0b0000000, 4) => op(Xor, operand_r(insn)),
            (0b0000000, 5) => op(Srl, operand_r(insn)),
            (0b0100000, 5) => op(Sra, operand_r(insn)),
            (0b0000000, 6) => op(Or, operand_r(insn)),
            (0b0000000, 7) => op(And, operand_r(insn)),
            _ => Op::unknown(),
        },
        0b0001111 => match funct3 {
            0 => op(Fence, operand_fence(insn)),
            1 => op(FenceI, Operand::None),
            _ => Op::unknown(),
        },
        0b1110011 => match funct3 {
            0 => {
                if funct7 == 0b0001001 {
                    // sfence.vma: rs1/rs2 select the flush scope; this core
                    // models no TLB, so only the operands are kept.
                    return op(SfenceVma, operand_r(insn));
                }
                if rd != 0 || rs1 != 0 {
                    return Op::unknown();
                }
                match funct12 {
                    0b0000_0000_0000 => op(Ecall, Operand::None),
                    0b0000_0000_0001 => op(Ebreak, Operand::None),
                    0b0000_0000_0010 => op(Uret, Operand::None),
                    0b0001_0000_0010 => op(Sret, Operand::None),
                    0b0011_0000_0010 => op(Mret, Operand::None),
                    0b0001_0000_0101 => op(Wfi, Operand::None),
                    _ => Op::unknown(),
                }
            }
            1 => op(Csrrw, operand_csr(insn)),
            2 => op(Csrrs, operand_csr(insn)),
            3 => op(Csrrc, operand_csr(insn)),
            5 => op(Csrrwi, operand_csr_imm(insn)),
            6 => op(Csrrsi, operand_csr_imm(insn)),
            7 => op(Csrrci, operand_csr_imm(insn)),
            _ => Op::unknown(),
        },
        _ => Op::unknown(),
    }
}

fn decode_rv32m(insn: u32) -> Op {
    use OpCode::*;
    let code = match pick(insn, 12, 3) {
        0 => Mul,
        1 => Mulh,
        2 => Mulhsu,
        3 => Mulhu,
        4 => Div,
        5 => Divu,
        6 => Rem,
        7 => Remu,
        _ => return Op::unknown(),
    };
    Op::new(OpClass::Rv32m, code, operand_r(insn))
}

fn decode_rv32a(insn: u32) -> Op {
    use OpCode::*;
    let funct5 = pick(insn, 27, 5);
    let rs2 = pick(insn, 20, 5);
    let code = match funct5 {
        0b00010 if rs2 == 0 => LrW,
        0b00011 => ScW,
        0b00001 => AmoswapW,
        0b00000 => AmoaddW,
        0b00100 => AmoxorW,
        0b01100 => AmoandW,
        0b01000 => AmoorW,
        0b10000 => AmominW,
        0b10100 => AmomaxW,
        0b11000 => AmominuW,
        0b11100 => AmomaxuW,
        _ => return Op::unknown(),
    };
    Op::new(OpClass::Rv32a, code, operand_r(insn))
}

fn decode_rv32f(insn: u32) -> Op {
    use OpCode::*;
    let opcode = pick(insn, 0, 7);
    let funct3 = pick(insn, 12, 3);
    let funct7 = pick(insn, 25, 7);
    let rs2 = pick(insn, 20, 5);

    let op = |code: OpCode, operand: Operand| Op::new(OpClass::Rv32f, code, operand);

    match opcode {
        0b0000111 => op(Flw, operand_i(insn)),
        0b0100111 => op(Fsw, operand_s(insn)),
        0b1000011 => op(FmaddS, operand_r4(insn)),
        0b1000111 => op(FmsubS, operand_r4(insn)),
        0b1001011 => op(FnmsubS, operand_r4(insn)),
        0b1001111 => op(FnmaddS, operand_r4(insn)),
        0b1010011 => match funct7 {
            0b0000000 => op(FaddS, operand_r(insn)),
            0b0000100 => op(FsubS, operand_r(insn)),
            0b0001000 => op(FmulS, operand_r(insn)),
            0b0001100 => op(FdivS, operand_r(insn)),
            0b0101100 if rs2 == 0 => op(FsqrtS, operand_r(insn)),
            0b0010000 => match funct3 {
                0 => op(FsgnjS, operand_r(insn)),
                1 => op(FsgnjnS, operand_r(insn)),
                2 => op(FsgnjxS, operand_r(insn)),
                _ => Op::unknown(),
            },
            0b0010100 => match funct3 {
                0 => op(FminS, operand_r(insn)),
                1 => op(FmaxS, operand_r(insn)),
                _ => Op::unknown(),
            },
            0b1100000 => match rs2 {
                0 => op(FcvtWS, operand_r(insn)),
                1 => op(FcvtWuS, operand_r(insn)),
                _ => Op::unknown(),
            },
            0b1110000 => match (rs2, funct3) {
                (0, 0) => op(FmvXW, operand_r(insn)),
                (0, 1) => op(FclassS, operand_r(insn)),
                _ => Op::unknown(),
            },
            0b1010000 => match funct3 {
                2 => op(FeqS, operand_r(insn)),
                1 => op(FltS, operand_r(insn)),
                0 => op(FleS, operand_r(insn)),
                _ => Op::unknown(),
            },
            0b1101000 => match rs2 {
                0 => op(FcvtSW, operand_r(insn)),
                1 => op(FcvtSWu, operand_r(insn)),
                _ => Op::unknown(),
            },
            0b1111000 if rs2 == 0 && funct3 == 0 => op(FmvWX, operand_r(insn)),
            _ => Op::unknown(),
        },
        _ => Op::unknown(),
    }
}

fn decode_rv32d(insn: u32) -> Op {
    use OpCode::*;
    let opcode = pick(insn, 0, 7);
    let funct3 = pick(insn, 12, 3);
    let funct7 = pick(insn, 25, 7);
    let rs2 = pick(insn, 20, 5);

    let op = |code: OpCode, operand: Operand| Op::new(OpClass::Rv32d, code, operand);

    match opcode {
        0b0000111 => op(Fld, operand_i(insn)),
        0b0100111 => op(Fsd, operand_s(insn)),
        0b1000011 => op(FmaddD, operand_r4(insn)),
        0b1000111 => op(FmsubD, operand_r4(insn)),
        0b1001011 => op(FnmsubD, operand_r4(insn)),
        0b1001111 => op(FnmaddD, operand_r4(insn)),
        0b1010011 => match funct7 {
            0b0000001 => op(FaddD, operand_r(insn)),
            0b0000101 => op(FsubD, operand_r(insn)),
            0b0001001 => op(FmulD, operand_r(insn)),
            0b0001101 => op(FdivD, operand_r(insn)),
            0b0101101 if rs2 == 0 => op(FsqrtD, operand_r(insn)),
            0b0010001 => match funct3 {
                0 => op(FsgnjD, operand_r(insn)),
                1 => op(FsgnjnD, operand_r(insn)),
                2 => op(FsgnjxD, operand_r(insn)),
                _ => Op::unknown(),
            },
            0b0010101 => match funct3 {
                0 => op(FminD, operand_r(insn)),
                1 => op(FmaxD, operand_r(insn)),
                _ => Op::unknown(),
            },
            0b0100000 if rs2 == 1 => op(FcvtSD, operand_r(insn)),
            0b0100001 if rs2 == 0 => op(FcvtDS, operand_r(insn)),
            0b1010001 => match funct3 {
                2 => op(FeqD, operand_r(insn)),
                1 => op(FltD, operand_r(insn)),
                0 => op(FleD, operand_r(insn)),
                _ => Op::unknown(),
            },
            0b1110001 if rs2 == 0 && funct3 == 1 => op(FclassD, operand_r(insn)),
            0b1100001 => match rs2 {
                0 => op(FcvtWD, operand_r(insn)),
                1 => op(FcvtWuD, operand_r(insn)),
                _ => Op::unknown(),
            },
            0b1101001 => match rs2 {
                0 => op(FcvtDW, operand_r(insn)),
                1 => op(FcvtDWu, operand_r(insn)),
                _ => Op::unknown(),
            },
            _ => Op::unknown(),
        },
        _ => Op::unknown(),
    }
}
