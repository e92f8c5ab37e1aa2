//! Per-cycle event records consumed by the trace writer.
//!
//! Buffers are cleared (not freed) at the top of every cycle; within a
//! cycle the order is: at most one trap event, zero or more memory-access
//! events in program order, then the op event that terminates the cycle.

use crate::common::addr::PhysAddr;
use crate::common::data::{MemoryAccessSize, MemoryAccessType};
use crate::core::arch::mode::PrivilegeLevel;

/// Discriminates trap events in the trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TrapKind {
    /// Asynchronous interrupt entry.
    Interrupt = 0,
    /// Synchronous exception entry.
    Exception = 1,
    /// Trap return (`mret`/`sret`/`uret`).
    Return = 2,
}

/// One retired operation.
#[derive(Clone, Copy, Debug)]
pub struct OpEvent {
    /// Monotonic retirement index.
    pub op_id: u32,
    /// Raw instruction word (0 when the cycle trapped before fetch).
    pub insn: u32,
    /// Virtual PC before execution.
    pub virtual_pc: u32,
    /// Physical PC before execution (equal to virtual when translation is
    /// off; 0 when fetch never completed).
    pub physical_pc: PhysAddr,
    /// Privilege level before execution.
    pub privilege: PrivilegeLevel,
}

/// One trap entry or return.
#[derive(Clone, Copy, Debug)]
pub struct TrapEvent {
    /// Interrupt, exception, or return.
    pub kind: TrapKind,
    /// Privilege level the trap left.
    pub from: PrivilegeLevel,
    /// Privilege level the trap entered.
    pub to: PrivilegeLevel,
    /// Cause code (without the interrupt bit); 0 for returns.
    pub cause: u32,
    /// Trap value written to `xtval`; 0 for interrupts and returns.
    pub value: u32,
}

/// One data memory access (loads and stores; not translation reads).
#[derive(Clone, Copy, Debug)]
pub struct MemoryAccessEvent {
    /// Load or store.
    pub access_type: MemoryAccessType,
    /// Access width.
    pub size: MemoryAccessSize,
    /// Value read or written (zero-extended).
    pub value: u64,
    /// Virtual address presented by the instruction.
    pub virtual_address: u32,
    /// Physical address after translation.
    pub physical_address: PhysAddr,
}
