//! Architectural traps and fatal emulator faults.
//!
//! Two very different failure families flow through the simulator:
//! 1. **Architectural traps** (`Trap`): exceptions and interrupts defined by
//!    the ISA. They never escape the core; the trap controller turns them
//!    into CSR updates and a redirected program counter.
//! 2. **Emulator faults** (`EmuError`): invariant violations that indicate a
//!    simulator bug or corrupt input. They abort the run and are surfaced to
//!    the driver, which prints the current cycle and PC and exits nonzero.

use thiserror::Error;

use super::addr::PhysAddr;
use super::data::MemoryAccessType;

/// Synchronous exception codes as written to `xcause`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ExceptionKind {
    /// Instruction address misaligned (0).
    InstructionAddressMisaligned = 0,
    /// Instruction access fault (1).
    InstructionAccessFault = 1,
    /// Illegal instruction (2).
    IllegalInstruction = 2,
    /// Breakpoint (3).
    Breakpoint = 3,
    /// Load address misaligned (4).
    LoadAddressMisaligned = 4,
    /// Load access fault (5).
    LoadAccessFault = 5,
    /// Store/AMO address misaligned (6).
    StoreAddressMisaligned = 6,
    /// Store/AMO access fault (7).
    StoreAccessFault = 7,
    /// Environment call from U-mode (8).
    EnvironmentCallFromUser = 8,
    /// Environment call from S-mode (9).
    EnvironmentCallFromSupervisor = 9,
    /// Environment call from M-mode (11).
    EnvironmentCallFromMachine = 11,
    /// Instruction page fault (12).
    InstructionPageFault = 12,
    /// Load page fault (13).
    LoadPageFault = 13,
    /// Store/AMO page fault (15).
    StorePageFault = 15,
}

/// Asynchronous interrupt classes with their architectural cause codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum InterruptType {
    /// User software interrupt (0).
    UserSoftware = 0,
    /// Supervisor software interrupt (1).
    SupervisorSoftware = 1,
    /// Machine software interrupt (3).
    MachineSoftware = 3,
    /// User timer interrupt (4).
    UserTimer = 4,
    /// Supervisor timer interrupt (5).
    SupervisorTimer = 5,
    /// Machine timer interrupt (7).
    MachineTimer = 7,
    /// User external interrupt (8).
    UserExternal = 8,
    /// Supervisor external interrupt (9).
    SupervisorExternal = 9,
    /// Machine external interrupt (11).
    MachineExternal = 11,
}

impl InterruptType {
    /// The cause code written to `xcause` (without the interrupt bit).
    #[inline(always)]
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// An architectural trap: the exception kind, the PC of the faulting
/// instruction, and the value written to `xtval`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trap {
    /// Exception code.
    pub kind: ExceptionKind,
    /// PC of the instruction that trapped.
    pub pc: u32,
    /// Value for `xtval` (faulting address, offending instruction, or 0).
    pub value: u32,
}

impl Trap {
    /// Illegal-instruction exception; `xtval` carries the instruction word.
    pub fn illegal_instruction(pc: u32, insn: u32) -> Self {
        Self {
            kind: ExceptionKind::IllegalInstruction,
            pc,
            value: insn,
        }
    }

    /// Breakpoint exception raised by `ebreak`/`c.ebreak`.
    pub fn breakpoint(pc: u32) -> Self {
        Self {
            kind: ExceptionKind::Breakpoint,
            pc,
            value: pc,
        }
    }

    /// Environment call from the given privilege level (0, 1 or 3).
    pub fn environment_call(kind: ExceptionKind, pc: u32) -> Self {
        Self { kind, pc, value: 0 }
    }

    /// Page fault for the given access type; `xtval` carries the virtual
    /// address.
    pub fn page_fault(access: MemoryAccessType, pc: u32, vaddr: u32) -> Self {
        let kind = match access {
            MemoryAccessType::Instruction => ExceptionKind::InstructionPageFault,
            MemoryAccessType::Load => ExceptionKind::LoadPageFault,
            MemoryAccessType::Store => ExceptionKind::StorePageFault,
        };
        Self {
            kind,
            pc,
            value: vaddr,
        }
    }
}

/// Fatal emulator faults. These indicate a simulator bug or corrupt input
/// and never produce trap events; the simulated state is left as-is for
/// inspection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmuError {
    /// A physical address survived translation but matched no bus region.
    #[error("bus access to unmapped physical address {paddr:#x} ({size} bytes)")]
    UnmappedBusAccess {
        /// The unrouted physical address.
        paddr: PhysAddr,
        /// Access width in bytes.
        size: usize,
    },

    /// A store targeted the ROM region after initialization.
    #[error("store to read-only memory at {paddr:#x}")]
    RomWrite {
        /// The written physical address.
        paddr: PhysAddr,
    },

    /// A device rejected the access width or alignment.
    #[error("{device}: invalid {size}-byte access at offset {offset:#x}")]
    DeviceAccess {
        /// Device name.
        device: &'static str,
        /// Region-relative offset.
        offset: u64,
        /// Access width in bytes.
        size: usize,
    },

    /// The configured XLEN is not executable by this core.
    #[error("unsupported XLEN {0} (execution is implemented for XLEN=32)")]
    UnsupportedXlen(u32),

    /// A register index escaped the decoder's [0, 31] guarantee.
    #[error("register index {0} out of range")]
    RegisterIndexOutOfRange(usize),

    /// A load or ROM image does not fit in the target region.
    #[error("load of {len} bytes at {paddr:#x} does not fit its memory region")]
    LoadOutOfBounds {
        /// Physical load address.
        paddr: PhysAddr,
        /// Image length in bytes.
        len: usize,
    },
}
