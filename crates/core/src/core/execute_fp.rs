//! Executor: single- and double-precision floating-point operations.
//!
//! Arithmetic is delegated to the host FPU under the instruction's
//! rounding mode (see [`crate::core::fpu`]); every NaN result is replaced
//! by the canonical quiet NaN and every single-precision write is
//! NaN-boxed. Comparison, min/max, sign-injection, classification, and
//! the integer conversions compute their exception flags explicitly per
//! the RISC-V rules.

use crate::common::data::MemoryAccessSize;
use crate::common::error::EmuError;
use crate::core::arch::fpr::{F32_CANONICAL_NAN, F64_CANONICAL_NAN};
use crate::isa::opcode::OpCode;
use crate::isa::operand::{Op, Operand};
use crate::soc::bus::Bus;

use super::fpu::{
    self, classify_f32, classify_f64, f64_to_i32, f64_to_u32, fflags, is_snan_f32, is_snan_f64,
    with_host_rounding, RoundingMode,
};
use super::Processor;

/// Replaces NaN results with the canonical f32 quiet NaN.
fn canonize_f32(value: f32) -> u32 {
    if value.is_nan() {
        F32_CANONICAL_NAN
    } else {
        value.to_bits()
    }
}

/// Replaces NaN results with the canonical f64 quiet NaN.
fn canonize_f64(value: f64) -> u64 {
    if value.is_nan() {
        F64_CANONICAL_NAN
    } else {
        value.to_bits()
    }
}

impl Processor {
    pub(super) fn process_fp(&mut self, op: &Op, bus: &mut Bus) -> Result<(), EmuError> {
        use OpCode::*;
        match (op.code, &op.operand) {
            // Loads and stores.
            (Flw, Operand::I(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.load(addr, MemoryAccessSize::Word, bus)? as u32;
                self.fpregs.write_f32(o.rd, value);
            }
            (Fld, Operand::I(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.load(addr, MemoryAccessSize::DoubleWord, bus)?;
                self.fpregs.write(o.rd, value);
            }
            (Fsw, Operand::S(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.fpregs.read_f32(o.rs2);
                self.store(addr, MemoryAccessSize::Word, u64::from(value), bus)?;
            }
            (Fsd, Operand::S(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.fpregs.read(o.rs2);
                self.store(addr, MemoryAccessSize::DoubleWord, value, bus)?;
            }

            // Fused multiply-add.
            (FmaddS | FmsubS | FnmsubS | FnmaddS, Operand::R4(o)) => {
                let rm = self.rounding_mode(o.funct3);
                let a = f32::from_bits(self.fpregs.read_f32(o.rs1));
                let b = f32::from_bits(self.fpregs.read_f32(o.rs2));
                let c = f32::from_bits(self.fpregs.read_f32(o.rs3));
                let (value, flags) = with_host_rounding(rm, || match op.code {
                    FmaddS => a.mul_add(b, c),
                    FmsubS => a.mul_add(b, -c),
                    FnmsubS => (-a).mul_add(b, c),
                    _ => (-a).mul_add(b, -c),
                });
                self.fpregs.write_f32(o.rd, canonize_f32(value));
                self.csr.accrue_fflags(flags);
            }
            (FmaddD | FmsubD | FnmsubD | FnmaddD, Operand::R4(o)) => {
                let rm = self.rounding_mode(o.funct3);
                let a = f64::from_bits(self.fpregs.read(o.rs1));
                let b = f64::from_bits(self.fpregs.read(o.rs2));
                let c = f64::from_bits(self.fpregs.read(o.rs3));
                let (value, flags) = with_host_rounding(rm, || match op.code {
                    FmaddD => a.mul_add(b, c),
                    FmsubD => a.mul_add(b, -c),
                    FnmsubD => (-a).mul_add(b, c),
                    _ => (-a).mul_add(b, -c),
                });
                self.fpregs.write(o.rd, canonize_f64(value));
                self.csr.accrue_fflags(flags);
            }

            // Single-precision arithmetic.
            (FaddS | FsubS | FmulS | FdivS | FsqrtS, Operand::R(o)) => {
                let rm = self.rounding_mode(o.funct3);
                let a = f32::from_bits(self.fpregs.read_f32(o.rs1));
                let b = f32::from_bits(self.fpregs.read_f32(o.rs2));
                let (value, flags) = with_host_rounding(rm, || match op.code {
                    FaddS => a + b,
                    FsubS => a - b,
                    FmulS => a * b,
                    FdivS => a / b,
                    _ => a.sqrt(),
                });
                self.fpregs.write_f32(o.rd, canonize_f32(value));
                self.csr.accrue_fflags(flags);
            }

            // Double-precision arithmetic.
            (FaddD | FsubD | FmulD | FdivD | FsqrtD, Operand::R(o)) => {
                let rm = self.rounding_mode(o.funct3);
                let a = f64::from_bits(self.fpregs.read(o.rs1));
                let b = f64::from_bits(self.fpregs.read(o.rs2));
                let (value, flags) = with_host_rounding(rm, || match op.code {
                    FaddD => a + b,
                    FsubD => a - b,
                    FmulD => a * b,
                    FdivD => a / b,
                    _ => a.sqrt(),
                });
                self.fpregs.write(o.rd, canonize_f64(value));
                self.csr.accrue_fflags(flags);
            }

            // Sign injection operates on raw bits and raises no flags.
            (FsgnjS | FsgnjnS | FsgnjxS, Operand::R(o)) => {
                let a = self.fpregs.read_f32(o.rs1);
                let b = self.fpregs.read_f32(o.rs2);
                let sign = match op.code {
                    FsgnjS => b & 0x8000_0000,
                    FsgnjnS => !b & 0x8000_0000,
                    _ => (a ^ b) & 0x8000_0000,
                };
                self.fpregs.write_f32(o.rd, (a & 0x7FFF_FFFF) | sign);
            }
            (FsgnjD | FsgnjnD | FsgnjxD, Operand::R(o)) => {
                let a = self.fpregs.read(o.rs1);
                let b = self.fpregs.read(o.rs2);
                let sign = match op.code {
                    FsgnjD => b & (1 << 63),
                    FsgnjnD => !b & (1 << 63),
                    _ => (a ^ b) & (1 << 63),
                };
                self.fpregs.write(o.rd, (a & !(1 << 63)) | sign);
            }

            // Min/max: quiet except on signaling NaN inputs; a single NaN
            // input yields the other operand; -0.0 orders below +0.0.
            (FminS | FmaxS, Operand::R(o)) => {
                let a_bits = self.fpregs.read_f32(o.rs1);
                let b_bits = self.fpregs.read_f32(o.rs2);
                if is_snan_f32(a_bits) || is_snan_f32(b_bits) {
                    self.csr.accrue_fflags(fflags::NV);
                }
                let value = min_max_f32(a_bits, b_bits, op.code == FmaxS);
                self.fpregs.write_f32(o.rd, value);
            }
            (FminD | FmaxD, Operand::R(o)) => {
                let a_bits = self.fpregs.read(o.rs1);
                let b_bits = self.fpregs.read(o.rs2);
                if is_snan_f64(a_bits) || is_snan_f64(b_bits) {
                    self.csr.accrue_fflags(fflags::NV);
                }
                let value = min_max_f64(a_bits, b_bits, op.code == FmaxD);
                self.fpregs.write(o.rd, value);
            }

            // Comparisons write 0/1 to the integer destination. FEQ raises
            // NV only for signaling NaNs; FLT/FLE for any NaN.
            (FeqS | FltS | FleS, Operand::R(o)) => {
                let a_bits = self.fpregs.read_f32(o.rs1);
                let b_bits = self.fpregs.read_f32(o.rs2);
                let a = f32::from_bits(a_bits);
                let b = f32::from_bits(b_bits);
                let nv = if op.code == FeqS {
                    is_snan_f32(a_bits) || is_snan_f32(b_bits)
                } else {
                    a.is_nan() || b.is_nan()
                };
                if nv {
                    self.csr.accrue_fflags(fflags::NV);
                }
                let result = match op.code {
                    FeqS => a == b,
                    FltS => a < b,
                    _ => a <= b,
                };
                self.regs.write(o.rd, u32::from(result));
            }
            (FeqD | FltD | FleD, Operand::R(o)) => {
                let a_bits = self.fpregs.read(o.rs1);
                let b_bits = self.fpregs.read(o.rs2);
                let a = f64::from_bits(a_bits);
                let b = f64::from_bits(b_bits);
                let nv = if op.code == FeqD {
                    is_snan_f64(a_bits) || is_snan_f64(b_bits)
                } else {
                    a.is_nan() || b.is_nan()
                };
                if nv {
                    self.csr.accrue_fflags(fflags::NV);
                }
                let result = match op.code {
                    FeqD => a == b,
                    FltD => a < b,
                    _ => a <= b,
                };
                self.regs.write(o.rd, u32::from(result));
            }

            // Float-to-integer conversions (software rounding).
            (FcvtWS | FcvtWuS, Operand::R(o)) => {
                let rm = self.rounding_mode(o.funct3);
                let value = f64::from(f32::from_bits(self.fpregs.read_f32(o.rs1)));
                if op.code == FcvtWS {
                    let (result, flags) = f64_to_i32(value, rm);
                    self.regs.write_i32(o.rd, result);
                    self.csr.accrue_fflags(flags);
                } else {
                    let (result, flags) = f64_to_u32(value, rm);
                    self.regs.write(o.rd, result);
                    self.csr.accrue_fflags(flags);
                }
            }
            (FcvtWD | FcvtWuD, Operand::R(o)) => {
                let rm = self.rounding_mode(o.funct3);
                let value = f64::from_bits(self.fpregs.read(o.rs1));
                if op.code == FcvtWD {
                    let (result, flags) = f64_to_i32(value, rm);
                    self.regs.write_i32(o.rd, result);
                    self.csr.accrue_fflags(flags);
                } else {
                    let (result, flags) = f64_to_u32(value, rm);
                    self.regs.write(o.rd, result);
                    self.csr.accrue_fflags(flags);
                }
            }

            // Integer-to-float conversions.
            (FcvtSW | FcvtSWu, Operand::R(o)) => {
                let rm = self.rounding_mode(o.funct3);
                let src = self.regs.read(o.rs1);
                let exact = if op.code == FcvtSW {
                    f64::from(src as i32)
                } else {
                    f64::from(src)
                };
                let (value, _) = with_host_rounding(rm, || exact as f32);
                if f64::from(value) != exact {
                    self.csr.accrue_fflags(fflags::NX);
                }
                self.fpregs.write_f32(o.rd, value.to_bits());
            }
            (FcvtDW, Operand::R(o)) => {
                // i32 -> f64 is always exact.
                let value = f64::from(self.regs.read_i32(o.rs1));
                self.fpregs.write(o.rd, value.to_bits());
            }
            (FcvtDWu, Operand::R(o)) => {
                let value = f64::from(self.regs.read(o.rs1));
                self.fpregs.write(o.rd, value.to_bits());
            }

            // Precision conversions.
            (FcvtSD, Operand::R(o)) => {
                let rm = self.rounding_mode(o.funct3);
                let src = f64::from_bits(self.fpregs.read(o.rs1));
                let (value, _) = with_host_rounding(rm, || src as f32);
                if !src.is_nan() && f64::from(value) != src {
                    self.csr.accrue_fflags(fflags::NX);
                }
                self.fpregs.write_f32(o.rd, canonize_f32(value));
            }
            (FcvtDS, Operand::R(o)) => {
                // f32 -> f64 is always exact.
                let value = f64::from(f32::from_bits(self.fpregs.read_f32(o.rs1)));
                self.fpregs.write(o.rd, canonize_f64(value));
            }

            // Classification and raw moves.
            (FclassS, Operand::R(o)) => {
                let mask = classify_f32(self.fpregs.read_f32(o.rs1));
                self.regs.write(o.rd, mask);
            }
            (FclassD, Operand::R(o)) => {
                let mask = classify_f64(self.fpregs.read(o.rs1));
                self.regs.write(o.rd, mask);
            }
            (FmvXW, Operand::R(o)) => {
                self.regs.write(o.rd, self.fpregs.read_f32(o.rs1));
            }
            (FmvWX, Operand::R(o)) => {
                self.fpregs.write_f32(o.rd, self.regs.read(o.rs1));
            }
            _ => {}
        }
        Ok(())
    }

    /// Effective rounding mode for an FP instruction. Reserved encodings
    /// were already rejected by the pre-execute check.
    fn rounding_mode(&self, rm: u32) -> RoundingMode {
        let selector = if rm == 0b111 { self.csr.frm() } else { rm };
        fpu::RoundingMode::from_bits(selector).unwrap_or(RoundingMode::Rne)
    }
}

/// RISC-V min/max for f32: NaN inputs drop out; both-NaN yields the
/// canonical NaN; zeros are ordered by sign.
fn min_max_f32(a_bits: u32, b_bits: u32, want_max: bool) -> u32 {
    let a = f32::from_bits(a_bits);
    let b = f32::from_bits(b_bits);
    match (a.is_nan(), b.is_nan()) {
        (true, true) => F32_CANONICAL_NAN,
        (true, false) => b_bits,
        (false, true) => a_bits,
        (false, false) => {
            if a == b {
                // ±0: max prefers +0, min prefers -0.
                let negative = a_bits | b_bits;
                let positive = a_bits & b_bits;
                if want_max {
                    positive
                } else {
                    negative
                }
            } else if (a < b) != want_max {
                a_bits
            } else {
                b_bits
            }
        }
    }
}

/// RISC-V min/max for f64 (see [`min_max_f32`]).
fn min_max_f64(a_bits: u64, b_bits: u64, want_max: bool) -> u64 {
    let a = f64::from_bits(a_bits);
    let b = f64::from_bits(b_bits);
    match (a.is_nan(), b.is_nan()) {
        (true, true) => F64_CANONICAL_NAN,
        (true, false) => b_bits,
        (false, true) => a_bits,
        (false, false) => {
            if a == b {
                let negative = a_bits | b_bits;
                let positive = a_bits & b_bits;
                if want_max {
                    positive
                } else {
                    negative
                }
            } else if (a < b) != want_max {
                a_bits
            } else {
                b_bits
            }
        }
    }
}
