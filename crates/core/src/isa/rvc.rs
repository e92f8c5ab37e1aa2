//! Compressed (16-bit) instruction decoder.
//!
//! RV32C only: quadrant (bits [1:0]) then funct3 (bits [15:13]) select the
//! row; the immediate gather patterns follow the C-extension tables,
//! including the dedicated forms for `c.addi16sp`, `c.lui`, and the
//! stack-pointer-relative loads/stores scaled by the access size.
//! Reserved rows (all-zero word, `c.addi4spn` with zero immediate, shift
//! amounts with bit 5 set, `c.lwsp` with rd=0, ...) decode to `Unknown`.

use crate::common::bitfield::sign_extend;

use super::opcode::{OpClass, OpCode};
use super::operand::{
    Op, Operand, OperandCb, OperandCi, OperandCiw, OperandCj, OperandCl, OperandCr, OperandCs,
    OperandCss,
};

/// Extracts `width` bits starting at `lsb` from a 16-bit word.
#[inline(always)]
fn pick(insn: u16, lsb: u32, width: u32) -> u32 {
    (u32::from(insn) >> lsb) & ((1 << width) - 1)
}

/// Maps a 3-bit compressed register field to x8..x15.
#[inline(always)]
fn creg(field: u32) -> usize {
    (field + 8) as usize
}

fn op(code: OpCode, operand: Operand) -> Op {
    Op::new(OpClass::Rv32c, code, operand)
}

/// Decodes a 16-bit compressed instruction word.
pub fn decode_compressed(insn: u16) -> Op {
    match pick(insn, 0, 2) {
        0b00 => decode_quadrant0(insn),
        0b01 => decode_quadrant1(insn),
        0b10 => decode_quadrant2(insn),
        _ => Op::unknown(),
    }
}

fn decode_quadrant0(insn: u16) -> Op {
    use OpCode::*;
    match pick(insn, 13, 3) {
        0b000 => {
            // c.addi4spn: nzuimm[5:4|9:6|2|3] = insn[12:11|10:7|6|5]
            let imm = (pick(insn, 11, 2) << 4)
                | (pick(insn, 7, 4) << 6)
                | (pick(insn, 6, 1) << 2)
                | (pick(insn, 5, 1) << 3);
            if imm == 0 {
                // Covers the all-zero illegal instruction.
                return Op::unknown();
            }
            op(
                CAddi4spn,
                Operand::Ciw(OperandCiw {
                    imm: imm as i32,
                    rd: creg(pick(insn, 2, 3)),
                }),
            )
        }
        0b001 => op(CFld, Operand::Cl(cl_operand_8(insn))),
        0b010 => op(CLw, Operand::Cl(cl_operand_4(insn))),
        0b011 => op(CFlw, Operand::Cl(cl_operand_4(insn))),
        0b101 => op(CFsd, Operand::Cs(cs_operand_8(insn))),
        0b110 => op(CSw, Operand::Cs(cs_operand_4(insn))),
        0b111 => op(CFsw, Operand::Cs(cs_operand_4(insn))),
        _ => Op::unknown(),
    }
}

fn decode_quadrant1(insn: u16) -> Op {
    use OpCode::*;
    let rd = pick(insn, 7, 5) as usize;
    match pick(insn, 13, 3) {
        0b000 => {
            let imm = ci_imm6(insn);
            if rd == 0 {
                op(CNop, Operand::None)
            } else {
                op(
                    CAddi,
                    Operand::Ci(OperandCi {
                        imm,
                        rd,
                        rs1: rd,
                    }),
                )
            }
        }
        0b001 => op(CJal, Operand::Cj(OperandCj { imm: cj_imm(insn) })),
        0b010 => op(
            CLi,
            Operand::Ci(OperandCi {
                imm: ci_imm6(insn),
                rd,
                rs1: 0,
            }),
        ),
        0b011 => {
            if rd == 2 {
                // c.addi16sp: nzimm[9|4|6|8:7|5] = insn[12|6|5|4:3|2]
                let imm = (pick(insn, 12, 1) << 9)
                    | (pick(insn, 6, 1) << 4)
                    | (pick(insn, 5, 1) << 6)
                    | (pick(insn, 3, 2) << 7)
                    | (pick(insn, 2, 1) << 5);
                let imm = sign_extend(imm, 10);
                if imm == 0 {
                    return Op::unknown();
                }
                op(
                    CAddi16sp,
                    Operand::Ci(OperandCi { imm, rd: 2, rs1: 2 }),
                )
            } else {
                // c.lui: nzimm[17|16:12] = insn[12|6:2], kept pre-shifted.
                let imm = sign_extend((pick(insn, 12, 1) << 5) | pick(insn, 2, 5), 6);
                if imm == 0 {
                    return Op::unknown();
                }
                op(
                    CLui,
                    Operand::Ci(OperandCi {
                        imm: imm << 12,
                        rd,
                        rs1: 0,
                    }),
                )
            }
        }
        0b100 => {
            let rs1 = creg(pick(insn, 7, 3));
            match pick(insn, 10, 2) {
                0b00 | 0b01 => {
                    // c.srli / c.srai: shamt[5] must be zero on RV32.
                    if pick(insn, 12, 1) != 0 {
                        return Op::unknown();
                    }
                    let shamt = pick(insn, 2, 5) as i32;
                    let code = if pick(insn, 10, 2) == 0 { CSrli } else { CSrai };
                    op(code, Operand::Cb(OperandCb { imm: shamt, rs1 }))
                }
                0b10 => op(
                    CAndi,
                    Operand::Cb(OperandCb {
                        imm: ci_imm6(insn),
                        rs1,
                    }),
                ),
                0b11 => {
                    if pick(insn, 12, 1) != 0 {
                        // c.subw/c.addw are RV64-only rows.
                        return Op::unknown();
                    }
                    let rs2 = creg(pick(insn, 2, 3));
                    let code = match pick(insn, 5, 2) {
                        0b00 => CSub,
                        0b01 => CXor,
                        0b10 => COr,
                        0b11 => CAnd,
                        _ => return Op::unknown(),
                    };
                    op(
                        code,
                        Operand::Cr(OperandCr {
                            rd: rs1,
                            rs1,
                            rs2,
                        }),
                    )
                }
                _ => Op::unknown(),
            }
        }
        0b101 => op(CJ, Operand::Cj(OperandCj { imm: cj_imm(insn) })),
        0b110 => op(CBeqz, Operand::Cb(cb_operand(insn))),
        0b111 => op(CBnez, Operand::Cb(cb_operand(insn))),
        _ => Op::unknown(),
    }
}

fn decode_quadrant2(insn: u16) -> Op {
    use OpCode::*;
    let rd = pick(insn, 7, 5) as usize;
    let rs2 = pick(insn, 2, 5) as usize;
    match pick(insn, 13, 3) {
        0b000 => {
            // c.slli: shamt[5] must be zero on RV32.
            if pick(insn, 12, 1) != 0 {
                return Op::unknown();
            }
            op(
                CSlli,
                Operand::Ci(OperandCi {
                    imm: pick(insn, 2, 5) as i32,
                    rd,
                    rs1: rd,
                }),
            )
        }
        0b001 => {
            // c.fldsp: uimm[5|4:3|8:6] = insn[12|6:5|4:2]
            let imm = (pick(insn, 12, 1) << 5) | (pick(insn, 5, 2) << 3) | (pick(insn, 2, 3) << 6);
            op(
                CFldsp,
                Operand::Ci(OperandCi {
                    imm: imm as i32,
                    rd,
                    rs1: 2,
                }),
            )
        }
        0b010 | 0b011 => {
            // c.lwsp / c.flwsp: uimm[5|4:2|7:6] = insn[12|6:4|3:2]
            let imm = (pick(insn, 12, 1) << 5) | (pick(insn, 4, 3) << 2) | (pick(insn, 2, 2) << 6);
            let is_int = pick(insn, 13, 3) == 0b010;
            if is_int && rd == 0 {
                return Op::unknown();
            }
            op(
                if is_int { CLwsp } else { CFlwsp },
                Operand::Ci(OperandCi {
                    imm: imm as i32,
                    rd,
                    rs1: 2,
                }),
            )
        }
        0b100 => {
            if pick(insn, 12, 1) == 0 {
                if rs2 == 0 {
                    if rd == 0 {
                        return Op::unknown();
                    }
                    op(CJr, Operand::Cr(OperandCr { rd: 0, rs1: rd, rs2: 0 }))
                } else {
                    op(CMv, Operand::Cr(OperandCr { rd, rs1: 0, rs2 }))
                }
            } else if rs2 == 0 {
                if rd == 0 {
                    op(CEbreak, Operand::None)
                } else {
                    op(CJalr, Operand::Cr(OperandCr { rd: 1, rs1: rd, rs2: 0 }))
                }
            } else {
                op(CAdd, Operand::Cr(OperandCr { rd, rs1: rd, rs2 }))
            }
        }
        0b101 => {
            // c.fsdsp: uimm[5:3|8:6] = insn[12:10|9:7]
            let imm = (pick(insn, 10, 3) << 3) | (pick(insn, 7, 3) << 6);
            op(
                CFsdsp,
                Operand::Css(OperandCss {
                    imm: imm as i32,
                    rs2,
                }),
            )
        }
        0b110 | 0b111 => {
            // c.swsp / c.fswsp: uimm[5:2|7:6] = insn[12:9|8:7]
            let imm = (pick(insn, 9, 4) << 2) | (pick(insn, 7, 2) << 6);
            op(
                if pick(insn, 13, 3) == 0b110 { CSwsp } else { CFswsp },
                Operand::Css(OperandCss {
                    imm: imm as i32,
                    rs2,
                }),
            )
        }
        _ => Op::unknown(),
    }
}

/// CI 6-bit immediate: sext(insn[12] ++ insn[6:2]).
fn ci_imm6(insn: u16) -> i32 {
    sign_extend((pick(insn, 12, 1) << 5) | pick(insn, 2, 5), 6)
}

/// CJ offset: imm[11|4|9:8|10|6|7|3:1|5] = insn[12|11|10:9|8|7|6|5:3|2].
fn cj_imm(insn: u16) -> i32 {
    let imm = (pick(insn, 12, 1) << 11)
        | (pick(insn, 11, 1) << 4)
        | (pick(insn, 9, 2) << 8)
        | (pick(insn, 8, 1) << 10)
        | (pick(insn, 7, 1) << 6)
        | (pick(insn, 6, 1) << 7)
        | (pick(insn, 3, 3) << 1)
        | (pick(insn, 2, 1) << 5);
    sign_extend(imm, 12)
}

/// CB branch offset: imm[8|4:3|7:6|2:1|5] = insn[12|11:10|6:5|4:3|2].
fn cb_operand(insn: u16) -> OperandCb {
    let imm = (pick(insn, 12, 1) << 8)
        | (pick(insn, 10, 2) << 3)
        | (pick(insn, 5, 2) << 6)
        | (pick(insn, 3, 2) << 1)
        | (pick(insn, 2, 1) << 5);
    OperandCb {
        imm: sign_extend(imm, 9),
        rs1: creg(pick(insn, 7, 3)),
    }
}

/// CL word form: uimm[5:3|2|6] = insn[12:10|6|5].
fn cl_operand_4(insn: u16) -> OperandCl {
    let imm = (pick(insn, 10, 3) << 3) | (pick(insn, 6, 1) << 2) | (pick(insn, 5, 1) << 6);
    OperandCl {
        imm: imm as i32,
        rd: creg(pick(insn, 2, 3)),
        rs1: creg(pick(insn, 7, 3)),
    }
}

/// CL doubleword form: uimm[5:3|7:6] = insn[12:10|6:5].
fn cl_operand_8(insn: u16) -> OperandCl {
    let imm = (pick(insn, 10, 3) << 3) | (pick(insn, 5, 2) << 6);
    OperandCl {
        imm: imm as i32,
        rd: creg(pick(insn, 2, 3)),
        rs1: creg(pick(insn, 7, 3)),
    }
}

/// CS word form: same gather as the CL word form.
fn cs_operand_4(insn: u16) -> OperandCs {
    let imm = (pick(insn, 10, 3) << 3) | (pick(insn, 6, 1) << 2) | (pick(insn, 5, 1) << 6);
    OperandCs {
        imm: imm as i32,
        rs1: creg(pick(insn, 7, 3)),
        rs2: creg(pick(insn, 2, 3)),
    }
}

/// CS doubleword form: same gather as the CL doubleword form.
fn cs_operand_8(insn: u16) -> OperandCs {
    let imm = (pick(insn, 10, 3) << 3) | (pick(insn, 5, 2) << 6);
    OperandCs {
        imm: imm as i32,
        rs1: creg(pick(insn, 7, 3)),
        rs2: creg(pick(insn, 2, 3)),
    }
}
