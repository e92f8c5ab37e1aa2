//! Processor core: architectural state, executor, MMU, trap and interrupt
//! controllers, and the per-cycle step loop.
//!
//! Per cycle the loop runs: clear event buffers → advance counters and
//! refresh interrupts → deliver a pending interrupt (ending the cycle) →
//! fetch-permission check → fetch → decode → pre-execute trap check →
//! execute → post-execute trap check → emit the op event. Once a mutation
//! has occurred the cycle is committed; fatal emulator errors abort the
//! run with state intact.

/// Architectural state (registers, CSRs, privilege modes).
pub mod arch;

/// Per-cycle event records.
pub mod events;

/// Integer/multiply/atomic/compressed execution and trap checks.
mod execute;

/// Floating-point execution.
mod execute_fp;

/// Host-FPU rounding and exception-flag plumbing.
pub mod fpu;

/// Interrupt controller.
pub mod interrupt;

/// Memory access unit (Sv32 translation and the load/store path).
pub mod mmu;

/// Trap controller.
pub mod trap;

use crate::common::addr::PhysAddr;
use crate::common::data::MemoryAccessType;
use crate::common::error::{EmuError, Trap};
use crate::isa::opcode::OpCode;
use crate::isa::{decode, is_compressed};
use crate::soc::bus::Bus;

use arch::csr::CsrFile;
use arch::fpr::FpRegFile;
use arch::gpr::IntRegFile;
use arch::mode::PrivilegeLevel;
use events::{MemoryAccessEvent, OpEvent, TrapEvent};
use interrupt::InterruptController;
use mmu::MemoryAccessUnit;
use trap::TrapController;

/// The processor: one RV32IMAFDC hart.
#[derive(Debug)]
pub struct Processor {
    pub(crate) csr: CsrFile,
    pub(crate) regs: IntRegFile,
    pub(crate) fpregs: FpRegFile,
    pub(crate) mmu: MemoryAccessUnit,
    pub(crate) trap: TrapController,
    interrupts: InterruptController,
    op_event: Option<OpEvent>,
    op_count: u32,
}

impl Processor {
    /// Creates a hart with the given reset PC, in machine mode.
    pub fn new(initial_pc: u32) -> Self {
        Self {
            csr: CsrFile::new(initial_pc),
            regs: IntRegFile::new(),
            fpregs: FpRegFile::new(),
            mmu: MemoryAccessUnit::new(),
            trap: TrapController::new(),
            interrupts: InterruptController::new(),
            op_event: None,
            op_count: 0,
        }
    }

    /// Executes one cycle against the given bus.
    pub fn process_cycle(&mut self, bus: &mut Bus) -> Result<(), EmuError> {
        self.op_event = None;
        self.trap.clear_event();
        self.mmu.clear_events();

        let privilege = self.csr.privilege();
        let pc = self.csr.pc();

        self.csr.update();
        self.interrupts.update(&mut self.csr, bus.irq_lines());

        if let Some(interrupt) = self.interrupts.pending_type() {
            self.csr.set_halted(false);
            self.mmu.clear_reservation();
            self.trap.process_interrupt(interrupt, pc, &mut self.csr);
            self.set_op_event(pc, PhysAddr::new(0), 0, privilege);
            return Ok(());
        }

        if self.csr.halted() {
            return Ok(());
        }

        // Fetch.
        if let Some(trap) =
            self.mmu
                .check_trap(MemoryAccessType::Instruction, pc, pc, &self.csr, bus)?
        {
            self.deliver(trap);
            self.set_op_event(pc, PhysAddr::new(0), 0, privilege);
            return Ok(());
        }
        let (raw, physical_pc) = self.mmu.fetch(pc, &self.csr, bus)?;
        let compressed = is_compressed(raw);
        let insn = if compressed { raw & 0xFFFF } else { raw };

        // Decode.
        let op = decode(insn);
        if op.code == OpCode::Unknown {
            self.deliver(Trap::illegal_instruction(pc, insn));
            self.set_op_event(pc, physical_pc, insn, privilege);
            return Ok(());
        }

        // Execute, bracketed by the trap checks.
        if let Some(trap) = self.pre_check_trap(&op, pc, insn, bus)? {
            self.deliver(trap);
            self.set_op_event(pc, physical_pc, insn, privilege);
            return Ok(());
        }

        let step = if compressed { 2 } else { 4 };
        self.csr.set_pc(pc.wrapping_add(step));
        self.process_op(&op, pc, bus)?;

        if let Some(trap) = self.post_check_trap(&op, pc) {
            self.deliver(trap);
        }

        self.set_op_event(pc, physical_pc, insn, privilege);
        Ok(())
    }

    fn deliver(&mut self, trap: Trap) {
        self.mmu.clear_reservation();
        self.trap.process_exception(trap, &mut self.csr);
    }

    fn set_op_event(&mut self, virtual_pc: u32, physical_pc: PhysAddr, insn: u32, privilege: PrivilegeLevel) {
        self.op_event = Some(OpEvent {
            op_id: self.op_count,
            insn,
            virtual_pc,
            physical_pc,
            privilege,
        });
        self.op_count = self.op_count.wrapping_add(1);
    }

    // ── State access for drivers, the trace dumper, and the GDB stub ──

    /// Current PC.
    pub fn pc(&self) -> u32 {
        self.csr.pc()
    }

    /// Overwrites the PC (driver/GDB use).
    pub fn set_pc(&mut self, pc: u32) {
        self.csr.set_pc(pc);
    }

    /// Current privilege level.
    pub fn privilege(&self) -> PrivilegeLevel {
        self.csr.privilege()
    }

    /// Reads an integer register.
    pub fn read_reg(&self, idx: usize) -> Result<u32, EmuError> {
        if idx < 32 {
            Ok(self.regs.read(idx))
        } else {
            Err(EmuError::RegisterIndexOutOfRange(idx))
        }
    }

    /// Writes an integer register (driver/GDB use).
    pub fn write_reg(&mut self, idx: usize, value: u32) -> Result<(), EmuError> {
        if idx < 32 {
            self.regs.write(idx, value);
            Ok(())
        } else {
            Err(EmuError::RegisterIndexOutOfRange(idx))
        }
    }

    /// Snapshot of the integer register file.
    pub fn int_regs(&self) -> [u32; 32] {
        self.regs.snapshot()
    }

    /// Snapshot of the floating-point register file.
    pub fn fp_regs(&self) -> [u64; 32] {
        self.fpregs.snapshot()
    }

    /// Reads a CSR without an access check (trace dumper, tests).
    pub fn read_csr(&self, addr: u32) -> u32 {
        self.csr.read(addr)
    }

    /// Writes a CSR without an access check (driver/tests).
    pub fn write_csr(&mut self, addr: u32, value: u32) {
        self.csr.write(addr, value);
    }

    /// Number of CSRs in a trace snapshot.
    pub fn csr_count(&self) -> usize {
        self.csr.dump_count()
    }

    /// Snapshot of the trace-visible CSRs as `(address, value)` pairs.
    pub fn csr_snapshot(&self) -> Vec<(u32, u32)> {
        self.csr.snapshot()
    }

    /// The op event of the last cycle, if one retired.
    pub fn op_event(&self) -> Option<OpEvent> {
        self.op_event
    }

    /// The trap event of the last cycle, if any.
    pub fn trap_event(&self) -> Option<TrapEvent> {
        self.trap.event()
    }

    /// The memory-access events of the last cycle, in program order.
    pub fn memory_access_events(&self) -> &[MemoryAccessEvent] {
        self.mmu.events()
    }
}
