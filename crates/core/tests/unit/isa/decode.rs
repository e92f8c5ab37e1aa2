//! Standard (32-bit) decoder tests: one probe per encoding family plus
//! the system rows and a sample of illegal encodings.

use pretty_assertions::assert_eq;
use rstest::rstest;

use rv32emu_core::isa::operand::{Op, Operand};
use rv32emu_core::isa::{decode, OpClass, OpCode};

use crate::common::encode;

fn decoded(word: u32) -> Op {
    decode(word)
}

#[test]
fn addi_decodes_as_i_type() {
    let op = decoded(encode::addi(1, 0, 5));
    assert_eq!(op.class, OpClass::Rv32i);
    assert_eq!(op.code, OpCode::Addi);
    let Operand::I(o) = op.operand else {
        panic!("expected I operand, got {:?}", op.operand);
    };
    assert_eq!((o.rd, o.rs1, o.imm), (1, 0, 5));
}

#[test]
fn addi_negative_immediate_sign_extends() {
    let op = decoded(encode::addi(2, 0, -273));
    let Operand::I(o) = op.operand else {
        panic!("expected I operand");
    };
    assert_eq!(o.imm, -273);
}

#[test]
fn add_decodes_as_r_type() {
    let op = decoded(encode::add(3, 1, 2));
    assert_eq!(op.code, OpCode::Add);
    let Operand::R(o) = op.operand else {
        panic!("expected R operand");
    };
    assert_eq!((o.rd, o.rs1, o.rs2), (3, 1, 2));
}

#[test]
fn lui_carries_preshifted_immediate() {
    let op = decoded(encode::lui(1, 0xDEADC));
    assert_eq!(op.code, OpCode::Lui);
    let Operand::U(o) = op.operand else {
        panic!("expected U operand");
    };
    assert_eq!(o.imm as u32, 0xDEADC000);
}

#[test]
fn branch_offset_gathers_and_sign_extends() {
    let op = decoded(encode::beq(1, 2, -8));
    assert_eq!(op.code, OpCode::Beq);
    let Operand::B(o) = op.operand else {
        panic!("expected B operand");
    };
    assert_eq!(o.imm, -8);
}

#[test]
fn jal_offset_gathers_and_sign_extends() {
    let op = decoded(encode::jal(1, -2048));
    assert_eq!(op.code, OpCode::Jal);
    let Operand::J(o) = op.operand else {
        panic!("expected J operand");
    };
    assert_eq!((o.rd, o.imm), (1, -2048));
}

#[test]
fn store_offset_reassembles_split_immediate() {
    let op = decoded(encode::sw(7, 2, -20));
    assert_eq!(op.code, OpCode::Sw);
    let Operand::S(o) = op.operand else {
        panic!("expected S operand");
    };
    assert_eq!((o.rs1, o.rs2, o.imm), (2, 7, -20));
}

#[rstest]
#[case(0x0000_0073, OpCode::Ecall)]
#[case(0x0010_0073, OpCode::Ebreak)]
#[case(0x3020_0073, OpCode::Mret)]
#[case(0x1020_0073, OpCode::Sret)]
#[case(0x0020_0073, OpCode::Uret)]
#[case(0x1050_0073, OpCode::Wfi)]
fn system_rows_decode(#[case] word: u32, #[case] expected: OpCode) {
    assert_eq!(decoded(word).code, expected);
}

#[test]
fn shift_immediate_carries_shamt() {
    // slli x5, x6, 17
    let word = encode::i_type(17, 6, 0b001, 5, 0b0010011);
    let op = decoded(word);
    assert_eq!(op.code, OpCode::Slli);
    let Operand::ShiftImm(o) = op.operand else {
        panic!("expected shift operand");
    };
    assert_eq!((o.rd, o.rs1, o.shamt), (5, 6, 17));
}

#[test]
fn slli_with_high_funct7_is_illegal() {
    // Bit 30 set on a left shift is not a valid RV32 encoding.
    let word = encode::i_type(17, 6, 0b001, 5, 0b0010011) | (0b0100000 << 25);
    assert_eq!(decoded(word).code, OpCode::Unknown);
}

#[rstest]
#[case(encode::mul(3, 1, 2), OpCode::Mul, OpClass::Rv32m)]
#[case(encode::div(3, 1, 2), OpCode::Div, OpClass::Rv32m)]
#[case(encode::rem(4, 1, 2), OpCode::Rem, OpClass::Rv32m)]
#[case(encode::lr_w(2, 1), OpCode::LrW, OpClass::Rv32a)]
#[case(encode::sc_w(3, 1, 2), OpCode::ScW, OpClass::Rv32a)]
#[case(encode::amoadd_w(3, 1, 2), OpCode::AmoaddW, OpClass::Rv32a)]
#[case(encode::flw(1, 2, 0), OpCode::Flw, OpClass::Rv32f)]
#[case(encode::fadd_s(3, 1, 2, 0), OpCode::FaddS, OpClass::Rv32f)]
#[case(encode::fcvt_w_s(1, 2, 1), OpCode::FcvtWS, OpClass::Rv32f)]
fn extension_rows_decode(#[case] word: u32, #[case] code: OpCode, #[case] class: OpClass) {
    let op = decoded(word);
    assert_eq!((op.code, op.class), (code, class));
}

#[test]
fn csr_operand_carries_address() {
    let op = decoded(encode::csrrw(1, 0x305, 2));
    assert_eq!(op.code, OpCode::Csrrw);
    let Operand::Csr(o) = op.operand else {
        panic!("expected CSR operand");
    };
    assert_eq!((o.rd, o.rs1, o.csr), (1, 2, 0x305));
}

#[rstest]
#[case(0xFFFF_FFFF)]
#[case(0x0000_007F)] // unused major opcode
#[case(0x0000_3003)] // ld on RV32
fn illegal_words_decode_to_unknown_with_none_operand(#[case] word: u32) {
    let op = decoded(word);
    assert_eq!(op.code, OpCode::Unknown);
    assert_eq!(op.operand, Operand::None);
}
