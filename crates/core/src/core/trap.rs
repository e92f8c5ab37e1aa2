//! Trap controller: exception/interrupt entry and trap return.
//!
//! Entry resolves the target privilege through the delegation registers
//! (`medeleg` to Supervisor, then `sedeleg` to User; interrupts target the
//! privilege of their class), saves context into the target level's CSRs,
//! and redirects the PC to the trap vector — vectored mode offsets by
//! `4 * cause` for interrupts only. Return restores the stacked enable
//! bits and privilege. Each entry or return records one trap event.

use tracing::debug;

use crate::common::error::{ExceptionKind, InterruptType, Trap};

use super::arch::csr::{
    CsrFile, STATUS_MIE, STATUS_MPIE, STATUS_MPP, STATUS_MPP_SHIFT, STATUS_SIE, STATUS_SPIE,
    STATUS_SPP, STATUS_UIE, STATUS_UPIE, TVEC_MODE_MASK, TVEC_MODE_VECTORED,
};
use super::arch::mode::PrivilegeLevel;
use super::events::{TrapEvent, TrapKind};

/// Interrupt bit of `xcause`.
const CAUSE_INTERRUPT_BIT: u32 = 1 << 31;

/// The trap controller.
#[derive(Debug, Default)]
pub struct TrapController {
    event: Option<TrapEvent>,
}

impl TrapController {
    /// Creates the controller with no recorded event.
    pub fn new() -> Self {
        Self { event: None }
    }

    /// Clears the per-cycle trap event.
    pub fn clear_event(&mut self) {
        self.event = None;
    }

    /// The trap event recorded this cycle, if any.
    pub fn event(&self) -> Option<TrapEvent> {
        self.event
    }

    /// Delivers a synchronous exception.
    pub fn process_exception(&mut self, trap: Trap, csr: &mut CsrFile) {
        let code = trap.kind as u32;
        let mask = 1u32 << code;

        let mut target = PrivilegeLevel::Machine;
        if csr.medeleg() & mask != 0 {
            target = PrivilegeLevel::Supervisor;
            if csr.sedeleg() & mask != 0 {
                target = PrivilegeLevel::User;
            }
        }

        debug!(
            "exception entry: {:?} at pc {:#x} (tval {:#x}) -> {target}",
            trap.kind, trap.pc, trap.value
        );
        self.enter(false, code, trap.value, trap.pc, target, csr);
    }

    /// Delivers an interrupt of the given class.
    pub fn process_interrupt(&mut self, interrupt: InterruptType, pc: u32, csr: &mut CsrFile) {
        let target = match interrupt {
            InterruptType::MachineSoftware
            | InterruptType::MachineTimer
            | InterruptType::MachineExternal => PrivilegeLevel::Machine,
            InterruptType::SupervisorSoftware
            | InterruptType::SupervisorTimer
            | InterruptType::SupervisorExternal => PrivilegeLevel::Supervisor,
            InterruptType::UserSoftware
            | InterruptType::UserTimer
            | InterruptType::UserExternal => PrivilegeLevel::User,
        };

        debug!("interrupt entry: {interrupt:?} at pc {pc:#x} -> {target}");
        self.enter(true, interrupt.code(), 0, pc, target, csr);
    }

    /// Returns from a trap taken to privilege `level` (`mret`/`sret`/
    /// `uret`).
    pub fn process_return(&mut self, level: PrivilegeLevel, csr: &mut CsrFile) {
        let from = csr.privilege();
        let mut status = csr.status();

        let to = match level {
            PrivilegeLevel::Machine => {
                let mpp = ((status & STATUS_MPP) >> STATUS_MPP_SHIFT) as u8;
                let mpie = status & STATUS_MPIE != 0;
                status = if mpie {
                    status | STATUS_MIE
                } else {
                    status & !STATUS_MIE
                };
                status |= STATUS_MPIE;
                status &= !STATUS_MPP;
                PrivilegeLevel::from_bits(mpp)
            }
            PrivilegeLevel::Supervisor => {
                let spp = u8::from(status & STATUS_SPP != 0);
                let spie = status & STATUS_SPIE != 0;
                status = if spie {
                    status | STATUS_SIE
                } else {
                    status & !STATUS_SIE
                };
                status |= STATUS_SPIE;
                status &= !STATUS_SPP;
                PrivilegeLevel::from_bits(spp)
            }
            PrivilegeLevel::User => {
                let upie = status & STATUS_UPIE != 0;
                status = if upie {
                    status | STATUS_UIE
                } else {
                    status & !STATUS_UIE
                };
                status |= STATUS_UPIE;
                PrivilegeLevel::User
            }
        };

        csr.set_status(status);
        csr.set_pc(csr.epc(level));
        csr.set_privilege(to);

        debug!(%from, %to, "trap return");
        self.event = Some(TrapEvent {
            kind: TrapKind::Return,
            from,
            to,
            cause: 0,
            value: 0,
        });
    }

    /// Common trap-entry sequence: stack the enable bit, save context,
    /// switch privilege, and redirect the PC through the trap vector.
    fn enter(
        &mut self,
        is_interrupt: bool,
        code: u32,
        tval: u32,
        pc: u32,
        target: PrivilegeLevel,
        csr: &mut CsrFile,
    ) {
        let from = csr.privilege();
        let mut status = csr.status();

        match target {
            PrivilegeLevel::Machine => {
                status = if status & STATUS_MIE != 0 {
                    status | STATUS_MPIE
                } else {
                    status & !STATUS_MPIE
                };
                status &= !STATUS_MIE;
                status = (status & !STATUS_MPP) | (u32::from(from.to_bits()) << STATUS_MPP_SHIFT);
            }
            PrivilegeLevel::Supervisor => {
                status = if status & STATUS_SIE != 0 {
                    status | STATUS_SPIE
                } else {
                    status & !STATUS_SPIE
                };
                status &= !STATUS_SIE;
                status = if from == PrivilegeLevel::Supervisor {
                    status | STATUS_SPP
                } else {
                    status & !STATUS_SPP
                };
            }
            PrivilegeLevel::User => {
                status = if status & STATUS_UIE != 0 {
                    status | STATUS_UPIE
                } else {
                    status & !STATUS_UPIE
                };
                status &= !STATUS_UIE;
            }
        }
        csr.set_status(status);

        let cause = if is_interrupt {
            CAUSE_INTERRUPT_BIT | code
        } else {
            code
        };
        csr.set_trap_context(target, pc, cause, tval);
        csr.set_privilege(target);

        let tvec = csr.tvec(target);
        let base = tvec & !TVEC_MODE_MASK;
        let next_pc = if is_interrupt && tvec & TVEC_MODE_MASK == TVEC_MODE_VECTORED {
            base + 4 * code
        } else {
            base
        };
        csr.set_pc(next_pc);

        self.event = Some(TrapEvent {
            kind: if is_interrupt {
                TrapKind::Interrupt
            } else {
                TrapKind::Exception
            },
            from,
            to: target,
            cause: code,
            value: tval,
        });
    }
}

/// Maps the current privilege to its environment-call exception kind.
pub fn environment_call_kind(level: PrivilegeLevel) -> ExceptionKind {
    match level {
        PrivilegeLevel::User => ExceptionKind::EnvironmentCallFromUser,
        PrivilegeLevel::Supervisor => ExceptionKind::EnvironmentCallFromSupervisor,
        PrivilegeLevel::Machine => ExceptionKind::EnvironmentCallFromMachine,
    }
}
