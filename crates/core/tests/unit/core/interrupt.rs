//! Interrupt controller tests: line routing through delegation,
//! deliverability, and prioritization.

use pretty_assertions::assert_eq;

use rv32emu_core::core::arch::csr::{CsrFile, MIDELEG, MIE, MIP, MSTATUS, SIDELEG, SIP};
use rv32emu_core::core::arch::mode::PrivilegeLevel;
use rv32emu_core::core::interrupt::InterruptController;
use rv32emu_core::common::error::InterruptType;
use rv32emu_core::soc::bus::IrqLines;

const TIMER: IrqLines = IrqLines {
    software: false,
    timer: true,
    external: false,
};

const EXTERNAL: IrqLines = IrqLines {
    software: false,
    timer: false,
    external: true,
};

fn csr() -> CsrFile {
    CsrFile::new(0)
}

#[test]
fn timer_line_sets_machine_pending_by_default() {
    let mut csr = csr();
    let mut controller = InterruptController::new();

    controller.update(&mut csr, TIMER);
    assert_ne!(csr.read(MIP) & (1 << 7), 0, "MTIP expected");
    assert_eq!(csr.read(SIP) & (1 << 5), 0, "STIP must stay clear");
}

#[test]
fn mideleg_routes_the_timer_line_to_supervisor() {
    let mut csr = csr();
    csr.write(MIDELEG, 1 << 7);
    let mut controller = InterruptController::new();

    controller.update(&mut csr, TIMER);
    assert_eq!(csr.read(MIP) & (1 << 7), 0, "MTIP must stay clear");
    assert_ne!(csr.read(SIP) & (1 << 5), 0, "STIP expected");
}

#[test]
fn sideleg_routes_the_timer_line_to_user() {
    let mut csr = csr();
    csr.write(MIDELEG, 1 << 7);
    csr.write(SIDELEG, 1 << 5);
    let mut controller = InterruptController::new();

    controller.update(&mut csr, TIMER);
    assert_eq!(csr.read(MIP) & ((1 << 7) | (1 << 5)), 0);
    assert_ne!(csr.read(MIP) & (1 << 4), 0, "UTIP expected");
}

#[test]
fn lines_clear_when_the_source_drops() {
    let mut csr = csr();
    let mut controller = InterruptController::new();

    controller.update(&mut csr, TIMER);
    assert_ne!(csr.read(MIP) & (1 << 7), 0);
    controller.update(&mut csr, IrqLines::default());
    assert_eq!(csr.read(MIP) & (1 << 7), 0);
}

#[test]
fn delivery_requires_enable_and_global_enable_at_the_same_level() {
    let mut csr = csr();
    let mut controller = InterruptController::new();

    // Pending but not enabled.
    controller.update(&mut csr, TIMER);
    assert!(!controller.is_pending());

    // Enabled but globally masked at machine level.
    csr.write(MIE, 1 << 7);
    controller.update(&mut csr, TIMER);
    assert!(!controller.is_pending());

    // Globally enabled: deliverable.
    csr.write(MSTATUS, 1 << 3);
    controller.update(&mut csr, TIMER);
    assert_eq!(controller.pending_type(), Some(InterruptType::MachineTimer));
}

#[test]
fn lower_privilege_always_takes_higher_targeted_interrupts() {
    let mut csr = csr();
    // Machine timer enabled, global MIE off, but the hart runs in U-mode:
    // an interrupt targeting a higher privilege is always deliverable.
    csr.write(MIE, 1 << 7);
    csr.set_privilege(PrivilegeLevel::User);
    let mut controller = InterruptController::new();

    controller.update(&mut csr, TIMER);
    assert_eq!(controller.pending_type(), Some(InterruptType::MachineTimer));
}

#[test]
fn supervisor_interrupts_are_invisible_to_machine_mode() {
    let mut csr = csr();
    // Timer delegated to S; hart in M-mode: current_privilege > target,
    // so the interrupt must wait.
    csr.write(MIDELEG, 1 << 7);
    csr.write(MIE, 1 << 5);
    csr.write(MSTATUS, 1 << 1); // SIE (irrelevant from M)
    let mut controller = InterruptController::new();

    controller.update(&mut csr, TIMER);
    assert!(!controller.is_pending());

    csr.set_privilege(PrivilegeLevel::Supervisor);
    controller.update(&mut csr, TIMER);
    assert_eq!(
        controller.pending_type(),
        Some(InterruptType::SupervisorTimer)
    );
}

#[test]
fn external_outranks_software_outranks_timer() {
    let mut csr = csr();
    csr.write(MIE, (1 << 11) | (1 << 7) | (1 << 3));
    csr.write(MSTATUS, 1 << 3);
    csr.write(MIP, 1 << 3); // software-pending via CSR write
    let mut controller = InterruptController::new();

    // All three machine classes pending: external wins.
    let all = IrqLines {
        software: true,
        timer: true,
        external: true,
    };
    controller.update(&mut csr, all);
    assert_eq!(
        controller.pending_type(),
        Some(InterruptType::MachineExternal)
    );

    // Software and timer pending: software wins (MSI > MTI).
    let soft_and_timer = IrqLines {
        software: true,
        timer: true,
        external: false,
    };
    controller.update(&mut csr, soft_and_timer);
    assert_eq!(
        controller.pending_type(),
        Some(InterruptType::MachineSoftware)
    );
}

#[test]
fn machine_classes_outrank_supervisor_classes() {
    let mut csr = csr();
    // External delegated to S, timer kept at M; hart in S-mode with both
    // enables: the machine-targeted timer outranks the supervisor
    // external.
    csr.write(MIDELEG, 1 << 11);
    csr.write(MIE, (1 << 9) | (1 << 7));
    csr.write(MSTATUS, (1 << 3) | (1 << 1));
    csr.set_privilege(PrivilegeLevel::Supervisor);
    let mut controller = InterruptController::new();

    let both = IrqLines {
        software: false,
        timer: true,
        external: true,
    };
    controller.update(&mut csr, both);
    assert_eq!(controller.pending_type(), Some(InterruptType::MachineTimer));
}
