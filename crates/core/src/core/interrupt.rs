//! Interrupt controller: pending-bit routing and prioritization.
//!
//! Runs once per cycle before fetch. First the timer and external lines
//! sampled from the devices are routed into `xip` through the delegation
//! registers, so exactly one of the M/S/U pending bits is set per line;
//! the CLINT's MSIP register drives `mip.MSIP` directly. Then pending,
//! enable, the global `xIE` bits, and the current privilege are combined
//! to select at most one deliverable interrupt of highest priority.
//!
//! Priority follows the architectural ordering:
//! MEI > MSI > MTI > SEI > SSI > STI > UEI > USI > UTI.

use tracing::trace;

use crate::common::error::InterruptType;
use crate::soc::bus::IrqLines;

use super::arch::csr::{
    CsrFile, IRQ_MEI, IRQ_MSI, IRQ_MTI, IRQ_SEI, IRQ_SSI, IRQ_STI, IRQ_UEI, IRQ_USI, IRQ_UTI,
    STATUS_MIE, STATUS_SIE, STATUS_UIE,
};
use super::arch::mode::PrivilegeLevel;

/// Candidate table in priority order: pending/enable bit, target level,
/// and the interrupt class delivered.
const PRIORITY: [(u32, PrivilegeLevel, InterruptType); 9] = [
    (IRQ_MEI, PrivilegeLevel::Machine, InterruptType::MachineExternal),
    (IRQ_MSI, PrivilegeLevel::Machine, InterruptType::MachineSoftware),
    (IRQ_MTI, PrivilegeLevel::Machine, InterruptType::MachineTimer),
    (IRQ_SEI, PrivilegeLevel::Supervisor, InterruptType::SupervisorExternal),
    (IRQ_SSI, PrivilegeLevel::Supervisor, InterruptType::SupervisorSoftware),
    (IRQ_STI, PrivilegeLevel::Supervisor, InterruptType::SupervisorTimer),
    (IRQ_UEI, PrivilegeLevel::User, InterruptType::UserExternal),
    (IRQ_USI, PrivilegeLevel::User, InterruptType::UserSoftware),
    (IRQ_UTI, PrivilegeLevel::User, InterruptType::UserTimer),
];

/// The interrupt controller.
#[derive(Debug, Default)]
pub struct InterruptController {
    pending: Option<InterruptType>,
}

impl InterruptController {
    /// Creates the controller with nothing pending.
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Whether an interrupt is pending and deliverable this cycle.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The interrupt to deliver, if any.
    pub fn pending_type(&self) -> Option<InterruptType> {
        self.pending
    }

    /// Refreshes `xip` from the device lines and recomputes the pending
    /// interrupt. Called once per cycle before fetch.
    pub fn update(&mut self, csr: &mut CsrFile, lines: IrqLines) {
        self.route_lines(csr, lines);
        self.pending = Self::select(csr);
        if let Some(interrupt) = self.pending {
            trace!(?interrupt, "interrupt deliverable");
        }
    }

    /// Routes the timer and external lines through mideleg/sideleg so
    /// exactly one privilege's pending bit is set per line; the software
    /// line mirrors the CLINT MSIP register into `mip.MSIP`.
    fn route_lines(&self, csr: &mut CsrFile, lines: IrqLines) {
        let mideleg = csr.mideleg();
        let sideleg = csr.sideleg();
        let mut ip = csr.ip();

        ip &= !(IRQ_MTI | IRQ_STI | IRQ_UTI);
        if lines.timer {
            ip |= Self::route(
                mideleg,
                sideleg,
                InterruptType::MachineTimer,
                InterruptType::SupervisorTimer,
                (IRQ_MTI, IRQ_STI, IRQ_UTI),
            );
        }

        ip &= !(IRQ_MEI | IRQ_SEI | IRQ_UEI);
        if lines.external {
            ip |= Self::route(
                mideleg,
                sideleg,
                InterruptType::MachineExternal,
                InterruptType::SupervisorExternal,
                (IRQ_MEI, IRQ_SEI, IRQ_UEI),
            );
        }

        if lines.software {
            ip |= IRQ_MSI;
        } else {
            ip &= !IRQ_MSI;
        }

        csr.set_ip(ip);
    }

    /// Picks the pending bit for one line: machine unless delegated by
    /// `mideleg`, then supervisor unless further delegated by `sideleg`.
    fn route(
        mideleg: u32,
        sideleg: u32,
        machine_class: InterruptType,
        supervisor_class: InterruptType,
        bits: (u32, u32, u32),
    ) -> u32 {
        let (machine_bit, supervisor_bit, user_bit) = bits;
        if mideleg >> machine_class.code() & 1 == 0 {
            machine_bit
        } else if sideleg >> supervisor_class.code() & 1 == 0 {
            supervisor_bit
        } else {
            user_bit
        }
    }

    /// Combines pending, enable, global enables, and the current privilege
    /// to select the highest-priority deliverable interrupt.
    fn select(csr: &CsrFile) -> Option<InterruptType> {
        let ready = csr.ip() & csr.ie();
        if ready == 0 {
            return None;
        }

        let status = csr.status();
        let privilege = csr.privilege();

        for (bit, target, interrupt) in PRIORITY {
            if ready & bit == 0 {
                continue;
            }
            let global_enable = match target {
                PrivilegeLevel::Machine => status & STATUS_MIE != 0,
                PrivilegeLevel::Supervisor => status & STATUS_SIE != 0,
                PrivilegeLevel::User => status & STATUS_UIE != 0,
            };
            let deliverable = privilege < target || (privilege == target && global_enable);
            if deliverable {
                return Some(interrupt);
            }
        }
        None
    }
}
