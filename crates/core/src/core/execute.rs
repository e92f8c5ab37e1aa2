//! Executor: integer, multiply/divide, atomic, and compressed operations,
//! plus the pre- and post-execute trap checks.
//!
//! The step loop assigns the fall-through PC before `process_op` runs;
//! branches and jumps overwrite it. The pre-execute check consults the MMU
//! for every load/store/atomic address and the CSR file for csr* legality,
//! so no architectural state changes before a trap is ruled out.

use crate::common::data::{MemoryAccessSize, MemoryAccessType};
use crate::common::error::{EmuError, Trap};
use crate::isa::opcode::{OpClass, OpCode};
use crate::isa::operand::{Op, Operand};
use crate::soc::bus::Bus;

use super::fpu::resolve_rounding_mode;
use super::trap::environment_call_kind;
use super::Processor;

impl Processor {
    /// Pre-execute trap check: memory permission faults for loads, stores
    /// and atomics, CSR access legality, and FP rounding-mode validity.
    /// No state is mutated.
    pub(super) fn pre_check_trap(
        &mut self,
        op: &Op,
        pc: u32,
        insn: u32,
        bus: &mut Bus,
    ) -> Result<Option<Trap>, EmuError> {
        use OpCode::*;
        match (op.code, &op.operand) {
            // Integer and FP loads.
            (Lb | Lh | Lw | Lbu | Lhu | Flw | Fld, Operand::I(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                self.mmu
                    .check_trap(MemoryAccessType::Load, pc, addr, &self.csr, bus)
            }
            // Integer and FP stores.
            (Sb | Sh | Sw | Fsw | Fsd, Operand::S(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                self.mmu
                    .check_trap(MemoryAccessType::Store, pc, addr, &self.csr, bus)
            }
            // Compressed loads and stores.
            (CLw | CFlw | CFld, Operand::Cl(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                self.mmu
                    .check_trap(MemoryAccessType::Load, pc, addr, &self.csr, bus)
            }
            (CSw | CFsw | CFsd, Operand::Cs(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                self.mmu
                    .check_trap(MemoryAccessType::Store, pc, addr, &self.csr, bus)
            }
            (CLwsp | CFlwsp | CFldsp, Operand::Ci(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                self.mmu
                    .check_trap(MemoryAccessType::Load, pc, addr, &self.csr, bus)
            }
            (CSwsp | CFswsp | CFsdsp, Operand::Css(o)) => {
                let addr = self.regs.read(2).wrapping_add(o.imm as u32);
                self.mmu
                    .check_trap(MemoryAccessType::Store, pc, addr, &self.csr, bus)
            }
            // CSR accesses: legality depends on write intent.
            (Csrrw | Csrrs | Csrrc, Operand::Csr(o)) => {
                let is_write = op.code == Csrrw || o.rs1 != 0;
                Ok(self.csr.check_access(o.csr, is_write, pc, insn))
            }
            (Csrrwi | Csrrsi | Csrrci, Operand::CsrImm(o)) => {
                let is_write = op.code == Csrrwi || o.zimm != 0;
                Ok(self.csr.check_access(o.csr, is_write, pc, insn))
            }
            // LR/SC check only their own side; AMOs check both.
            (LrW, Operand::R(o)) => {
                let addr = self.regs.read(o.rs1);
                self.mmu
                    .check_trap(MemoryAccessType::Load, pc, addr, &self.csr, bus)
            }
            (ScW, Operand::R(o)) => {
                let addr = self.regs.read(o.rs1);
                self.mmu
                    .check_trap(MemoryAccessType::Store, pc, addr, &self.csr, bus)
            }
            (
                AmoswapW | AmoaddW | AmoxorW | AmoandW | AmoorW | AmominW | AmomaxW | AmominuW
                | AmomaxuW,
                Operand::R(o),
            ) => {
                let addr = self.regs.read(o.rs1);
                if let Some(trap) =
                    self.mmu
                        .check_trap(MemoryAccessType::Load, pc, addr, &self.csr, bus)?
                {
                    return Ok(Some(trap));
                }
                self.mmu
                    .check_trap(MemoryAccessType::Store, pc, addr, &self.csr, bus)
            }
            // FP operations with a rounding-mode field: reserved values
            // raise illegal-instruction before any state changes.
            (
                FaddS | FsubS | FmulS | FdivS | FsqrtS | FcvtWS | FcvtWuS | FcvtSW | FcvtSWu
                | FaddD | FsubD | FmulD | FdivD | FsqrtD | FcvtWD | FcvtWuD | FcvtDW | FcvtDWu
                | FcvtSD | FcvtDS,
                Operand::R(o),
            ) => Ok(resolve_rounding_mode(o.funct3, self.csr.frm(), pc, insn).err()),
            (
                FmaddS | FmsubS | FnmsubS | FnmaddS | FmaddD | FmsubD | FnmsubD | FnmaddD,
                Operand::R4(o),
            ) => Ok(resolve_rounding_mode(o.funct3, self.csr.frm(), pc, insn).err()),
            _ => Ok(None),
        }
    }

    /// Post-execute trap check: environment calls, breakpoints, and trap
    /// returns are delivered after the (side-effect free) execute step.
    pub(super) fn post_check_trap(&self, op: &Op, pc: u32) -> Option<Trap> {
        match op.code {
            OpCode::Ecall => Some(Trap::environment_call(
                environment_call_kind(self.csr.privilege()),
                pc,
            )),
            OpCode::Ebreak | OpCode::CEbreak => Some(Trap::breakpoint(pc)),
            _ => None,
        }
    }

    /// Interprets one decoded operation.
    pub(super) fn process_op(&mut self, op: &Op, pc: u32, bus: &mut Bus) -> Result<(), EmuError> {
        match op.class {
            OpClass::Rv32i => self.process_rv32i(op, pc, bus),
            OpClass::Rv32m => {
                self.process_rv32m(op);
                Ok(())
            }
            OpClass::Rv32a => self.process_rv32a(op, bus),
            OpClass::Rv32f | OpClass::Rv32d => self.process_fp(op, bus),
            OpClass::Rv32c => self.process_rv32c(op, pc, bus),
        }
    }

    fn process_rv32i(&mut self, op: &Op, pc: u32, bus: &mut Bus) -> Result<(), EmuError> {
        use OpCode::*;
        match (op.code, &op.operand) {
            (Lui, Operand::U(o)) => self.regs.write_i32(o.rd, o.imm),
            (Auipc, Operand::U(o)) => self.regs.write(o.rd, pc.wrapping_add(o.imm as u32)),
            (Jal, Operand::J(o)) => {
                self.regs.write(o.rd, pc.wrapping_add(4));
                self.csr.set_pc(pc.wrapping_add(o.imm as u32));
            }
            (Jalr, Operand::I(o)) => {
                let target = self.regs.read(o.rs1).wrapping_add(o.imm as u32) & !1;
                self.regs.write(o.rd, pc.wrapping_add(4));
                self.csr.set_pc(target);
            }
            (Beq | Bne | Blt | Bge | Bltu | Bgeu, Operand::B(o)) => {
                let lhs = self.regs.read(o.rs1);
                let rhs = self.regs.read(o.rs2);
                let taken = match op.code {
                    Beq => lhs == rhs,
                    Bne => lhs != rhs,
                    Blt => (lhs as i32) < (rhs as i32),
                    Bge => (lhs as i32) >= (rhs as i32),
                    Bltu => lhs < rhs,
                    _ => lhs >= rhs,
                };
                if taken {
                    self.csr.set_pc(pc.wrapping_add(o.imm as u32));
                }
            }
            (Lb | Lh | Lw | Lbu | Lhu, Operand::I(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = match op.code {
                    Lb => {
                        let raw = self.load(addr, MemoryAccessSize::Byte, bus)?;
                        raw as u8 as i8 as i32 as u32
                    }
                    Lh => {
                        let raw = self.load(addr, MemoryAccessSize::HalfWord, bus)?;
                        raw as u16 as i16 as i32 as u32
                    }
                    Lw => self.load(addr, MemoryAccessSize::Word, bus)? as u32,
                    Lbu => self.load(addr, MemoryAccessSize::Byte, bus)? as u32,
                    _ => self.load(addr, MemoryAccessSize::HalfWord, bus)? as u32,
                };
                self.regs.write(o.rd, value);
            }
            (Sb | Sh | Sw, Operand::S(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.regs.read(o.rs2);
                let size = match op.code {
                    Sb => MemoryAccessSize::Byte,
                    Sh => MemoryAccessSize::HalfWord,
                    _ => MemoryAccessSize::Word,
                };
                let masked = match size {
                    MemoryAccessSize::Byte => u64::from(value & 0xFF),
                    MemoryAccessSize::HalfWord => u64::from(value & 0xFFFF),
                    _ => u64::from(value),
                };
                self.store(addr, size, masked, bus)?;
            }
            (Addi, Operand::I(o)) => {
                let value = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                self.regs.write(o.rd, value);
            }
            (Slti, Operand::I(o)) => {
                let flag = u32::from(self.regs.read_i32(o.rs1) < o.imm);
                self.regs.write(o.rd, flag);
            }
            (Sltiu, Operand::I(o)) => {
                let flag = u32::from(self.regs.read(o.rs1) < o.imm as u32);
                self.regs.write(o.rd, flag);
            }
            (Xori, Operand::I(o)) => {
                self.regs.write(o.rd, self.regs.read(o.rs1) ^ o.imm as u32);
            }
            (Ori, Operand::I(o)) => {
                self.regs.write(o.rd, self.regs.read(o.rs1) | o.imm as u32);
            }
            (Andi, Operand::I(o)) => {
                self.regs.write(o.rd, self.regs.read(o.rs1) & o.imm as u32);
            }
            (Slli, Operand::ShiftImm(o)) => {
                self.regs.write(o.rd, self.regs.read(o.rs1) << o.shamt);
            }
            (Srli, Operand::ShiftImm(o)) => {
                self.regs.write(o.rd, self.regs.read(o.rs1) >> o.shamt);
            }
            (Srai, Operand::ShiftImm(o)) => {
                self.regs
                    .write_i32(o.rd, self.regs.read_i32(o.rs1) >> o.shamt);
            }
            (Add | Sub | Sll | Slt | Sltu | Xor | Srl | Sra | Or | And, Operand::R(o)) => {
                let lhs = self.regs.read(o.rs1);
                let rhs = self.regs.read(o.rs2);
                let shamt = rhs & 0x1F;
                let value = match op.code {
                    Add => lhs.wrapping_add(rhs),
                    Sub => lhs.wrapping_sub(rhs),
                    Sll => lhs << shamt,
                    Slt => u32::from((lhs as i32) < (rhs as i32)),
                    Sltu => u32::from(lhs < rhs),
                    Xor => lhs ^ rhs,
                    Srl => lhs >> shamt,
                    Sra => ((lhs as i32) >> shamt) as u32,
                    Or => lhs | rhs,
                    _ => lhs & rhs,
                };
                self.regs.write(o.rd, value);
            }
            // Memory ordering is trivially satisfied by the in-order,
            // single-hart interpreter.
            (Fence | FenceI | SfenceVma, _) => {}
            // Delivered by the post-execute check.
            (Ecall | Ebreak, _) => {}
            (Mret, _) => {
                let level = crate::core::arch::mode::PrivilegeLevel::Machine;
                self.trap.process_return(level, &mut self.csr);
            }
            (Sret, _) => {
                let level = crate::core::arch::mode::PrivilegeLevel::Supervisor;
                self.trap.process_return(level, &mut self.csr);
            }
            (Uret, _) => {
                let level = crate::core::arch::mode::PrivilegeLevel::User;
                self.trap.process_return(level, &mut self.csr);
            }
            (Wfi, _) => self.csr.set_halted(true),
            (Csrrw | Csrrs | Csrrc, Operand::Csr(o)) => {
                let old = self.csr.read(o.csr);
                let src = self.regs.read(o.rs1);
                match op.code {
                    Csrrw => self.csr.write(o.csr, src),
                    Csrrs if o.rs1 != 0 => self.csr.write(o.csr, old | src),
                    Csrrc if o.rs1 != 0 => self.csr.write(o.csr, old & !src),
                    _ => {}
                }
                self.regs.write(o.rd, old);
            }
            (Csrrwi | Csrrsi | Csrrci, Operand::CsrImm(o)) => {
                let old = self.csr.read(o.csr);
                match op.code {
                    Csrrwi => self.csr.write(o.csr, o.zimm),
                    Csrrsi if o.zimm != 0 => self.csr.write(o.csr, old | o.zimm),
                    Csrrci if o.zimm != 0 => self.csr.write(o.csr, old & !o.zimm),
                    _ => {}
                }
                self.regs.write(o.rd, old);
            }
            _ => {}
        }
        Ok(())
    }

    fn process_rv32m(&mut self, op: &Op) {
        use OpCode::*;
        let Operand::R(o) = op.operand else {
            return;
        };
        let lhs = self.regs.read(o.rs1);
        let rhs = self.regs.read(o.rs2);

        let value = match op.code {
            Mul => lhs.wrapping_mul(rhs),
            Mulh => {
                let wide = i64::from(lhs as i32) * i64::from(rhs as i32);
                (wide >> 32) as u32
            }
            Mulhsu => {
                let wide = i64::from(lhs as i32).wrapping_mul(u64::from(rhs) as i64);
                (wide >> 32) as u32
            }
            Mulhu => {
                let wide = u64::from(lhs) * u64::from(rhs);
                (wide >> 32) as u32
            }
            Div => {
                let dividend = lhs as i32;
                let divisor = rhs as i32;
                if divisor == 0 {
                    u32::MAX
                } else if dividend == i32::MIN && divisor == -1 {
                    dividend as u32
                } else {
                    (dividend / divisor) as u32
                }
            }
            Divu => {
                if rhs == 0 {
                    u32::MAX
                } else {
                    lhs / rhs
                }
            }
            Rem => {
                let dividend = lhs as i32;
                let divisor = rhs as i32;
                if divisor == 0 {
                    lhs
                } else if dividend == i32::MIN && divisor == -1 {
                    0
                } else {
                    (dividend % divisor) as u32
                }
            }
            Remu => {
                if rhs == 0 {
                    lhs
                } else {
                    lhs % rhs
                }
            }
            _ => return,
        };
        self.regs.write(o.rd, value);
    }

    fn process_rv32a(&mut self, op: &Op, bus: &mut Bus) -> Result<(), EmuError> {
        use OpCode::*;
        let Operand::R(o) = op.operand else {
            return Ok(());
        };
        let addr = self.regs.read(o.rs1);

        match op.code {
            LrW => {
                let value = self.load(addr, MemoryAccessSize::Word, bus)? as u32;
                self.mmu.set_reservation(addr);
                self.regs.write(o.rd, value);
            }
            ScW => {
                if self.mmu.reservation_matches(addr) {
                    let value = self.regs.read(o.rs2);
                    self.store(addr, MemoryAccessSize::Word, u64::from(value), bus)?;
                    self.regs.write(o.rd, 0);
                } else {
                    self.regs.write(o.rd, 1);
                }
                self.mmu.clear_reservation();
            }
            _ => {
                let old = self.load(addr, MemoryAccessSize::Word, bus)? as u32;
                let src = self.regs.read(o.rs2);
                let new = match op.code {
                    AmoswapW => src,
                    AmoaddW => old.wrapping_add(src),
                    AmoxorW => old ^ src,
                    AmoandW => old & src,
                    AmoorW => old | src,
                    AmominW => (old as i32).min(src as i32) as u32,
                    AmomaxW => (old as i32).max(src as i32) as u32,
                    AmominuW => old.min(src),
                    _ => old.max(src),
                };
                self.store(addr, MemoryAccessSize::Word, u64::from(new), bus)?;
                self.regs.write(o.rd, old);
            }
        }
        Ok(())
    }

    fn process_rv32c(&mut self, op: &Op, pc: u32, bus: &mut Bus) -> Result<(), EmuError> {
        use OpCode::*;
        match (op.code, &op.operand) {
            (CAddi4spn, Operand::Ciw(o)) => {
                let value = self.regs.read(2).wrapping_add(o.imm as u32);
                self.regs.write(o.rd, value);
            }
            (CLw, Operand::Cl(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.load(addr, MemoryAccessSize::Word, bus)? as u32;
                self.regs.write(o.rd, value);
            }
            (CFlw, Operand::Cl(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.load(addr, MemoryAccessSize::Word, bus)? as u32;
                self.fpregs.write_f32(o.rd, value);
            }
            (CFld, Operand::Cl(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.load(addr, MemoryAccessSize::DoubleWord, bus)?;
                self.fpregs.write(o.rd, value);
            }
            (CSw, Operand::Cs(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.regs.read(o.rs2);
                self.store(addr, MemoryAccessSize::Word, u64::from(value), bus)?;
            }
            (CFsw, Operand::Cs(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.fpregs.read_f32(o.rs2);
                self.store(addr, MemoryAccessSize::Word, u64::from(value), bus)?;
            }
            (CFsd, Operand::Cs(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.fpregs.read(o.rs2);
                self.store(addr, MemoryAccessSize::DoubleWord, value, bus)?;
            }
            (CNop, _) => {}
            (CAddi | CAddi16sp, Operand::Ci(o)) => {
                let value = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                self.regs.write(o.rd, value);
            }
            (CJal, Operand::Cj(o)) => {
                self.regs.write(1, pc.wrapping_add(2));
                self.csr.set_pc(pc.wrapping_add(o.imm as u32));
            }
            (CLi | CLui, Operand::Ci(o)) => self.regs.write_i32(o.rd, o.imm),
            (CSrli, Operand::Cb(o)) => {
                let value = self.regs.read(o.rs1) >> (o.imm as u32);
                self.regs.write(o.rs1, value);
            }
            (CSrai, Operand::Cb(o)) => {
                let value = self.regs.read_i32(o.rs1) >> (o.imm as u32);
                self.regs.write_i32(o.rs1, value);
            }
            (CAndi, Operand::Cb(o)) => {
                let value = self.regs.read(o.rs1) & o.imm as u32;
                self.regs.write(o.rs1, value);
            }
            (CSub | CXor | COr | CAnd, Operand::Cr(o)) => {
                let lhs = self.regs.read(o.rs1);
                let rhs = self.regs.read(o.rs2);
                let value = match op.code {
                    CSub => lhs.wrapping_sub(rhs),
                    CXor => lhs ^ rhs,
                    COr => lhs | rhs,
                    _ => lhs & rhs,
                };
                self.regs.write(o.rd, value);
            }
            (CJ, Operand::Cj(o)) => self.csr.set_pc(pc.wrapping_add(o.imm as u32)),
            (CBeqz, Operand::Cb(o)) => {
                if self.regs.read(o.rs1) == 0 {
                    self.csr.set_pc(pc.wrapping_add(o.imm as u32));
                }
            }
            (CBnez, Operand::Cb(o)) => {
                if self.regs.read(o.rs1) != 0 {
                    self.csr.set_pc(pc.wrapping_add(o.imm as u32));
                }
            }
            (CSlli, Operand::Ci(o)) => {
                let value = self.regs.read(o.rs1) << (o.imm as u32);
                self.regs.write(o.rd, value);
            }
            (CLwsp, Operand::Ci(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.load(addr, MemoryAccessSize::Word, bus)? as u32;
                self.regs.write(o.rd, value);
            }
            (CFlwsp, Operand::Ci(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.load(addr, MemoryAccessSize::Word, bus)? as u32;
                self.fpregs.write_f32(o.rd, value);
            }
            (CFldsp, Operand::Ci(o)) => {
                let addr = self.regs.read(o.rs1).wrapping_add(o.imm as u32);
                let value = self.load(addr, MemoryAccessSize::DoubleWord, bus)?;
                self.fpregs.write(o.rd, value);
            }
            (CJr, Operand::Cr(o)) => self.csr.set_pc(self.regs.read(o.rs1) & !1),
            (CJalr, Operand::Cr(o)) => {
                let target = self.regs.read(o.rs1) & !1;
                self.regs.write(1, pc.wrapping_add(2));
                self.csr.set_pc(target);
            }
            (CMv, Operand::Cr(o)) => self.regs.write(o.rd, self.regs.read(o.rs2)),
            (CAdd, Operand::Cr(o)) => {
                let value = self.regs.read(o.rs1).wrapping_add(self.regs.read(o.rs2));
                self.regs.write(o.rd, value);
            }
            // Delivered by the post-execute check.
            (CEbreak, _) => {}
            (CSwsp, Operand::Css(o)) => {
                let addr = self.regs.read(2).wrapping_add(o.imm as u32);
                let value = self.regs.read(o.rs2);
                self.store(addr, MemoryAccessSize::Word, u64::from(value), bus)?;
            }
            (CFswsp, Operand::Css(o)) => {
                let addr = self.regs.read(2).wrapping_add(o.imm as u32);
                let value = self.fpregs.read_f32(o.rs2);
                self.store(addr, MemoryAccessSize::Word, u64::from(value), bus)?;
            }
            (CFsdsp, Operand::Css(o)) => {
                let addr = self.regs.read(2).wrapping_add(o.imm as u32);
                let value = self.fpregs.read(o.rs2);
                self.store(addr, MemoryAccessSize::DoubleWord, value, bus)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Load helper forwarding to the MMU with the processor's CSR view.
    pub(super) fn load(
        &mut self,
        vaddr: u32,
        size: MemoryAccessSize,
        bus: &mut Bus,
    ) -> Result<u64, EmuError> {
        self.mmu.load(vaddr, size, &self.csr, bus)
    }

    /// Store helper forwarding to the MMU with the processor's CSR view.
    pub(super) fn store(
        &mut self,
        vaddr: u32,
        size: MemoryAccessSize,
        value: u64,
        bus: &mut Bus,
    ) -> Result<(), EmuError> {
        self.mmu.store(vaddr, size, value, &self.csr, bus)
    }
}
