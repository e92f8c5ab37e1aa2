//! Trap entry, delegation, and return tests.

use pretty_assertions::assert_eq;

use rv32emu_core::core::arch::csr::{
    MCAUSE, MEDELEG, MEPC, MSTATUS, MTVEC, SCAUSE, SEPC, STVEC,
};
use rv32emu_core::core::arch::mode::PrivilegeLevel;
use rv32emu_core::core::events::TrapKind;

use crate::common::{encode, TestContext, RAM_BASE};

#[test]
fn ecall_from_machine_traps_to_machine() {
    let mut ctx = TestContext::new();
    ctx.load_program(&[encode::ecall()]);
    ctx.system.processor_mut().write_csr(MTVEC, RAM_BASE + 0x80);

    ctx.step();
    assert_eq!(ctx.csr(MCAUSE), 11);
    assert_eq!(ctx.csr(MEPC), RAM_BASE);
    assert_eq!(ctx.pc(), RAM_BASE + 0x80);
    assert_eq!(
        ctx.system.processor().privilege(),
        PrivilegeLevel::Machine
    );
}

#[test]
fn delegated_user_ecall_lands_in_supervisor() {
    let mut ctx = TestContext::new();
    // ecall at the RAM base; mret at +4, where the PC starts... the reset
    // PC is the RAM base, so place mret first and the ecall after it.
    ctx.load_program(&[encode::mret(), encode::ecall()]);

    let processor = ctx.system.processor_mut();
    processor.write_csr(MEDELEG, 1 << 8); // delegate ECALL-from-U
    processor.write_csr(MEPC, RAM_BASE + 4);
    processor.write_csr(STVEC, RAM_BASE + 0x100);
    // mstatus.MPP is already User (0); mret drops to U-mode.

    ctx.step(); // mret
    assert_eq!(ctx.system.processor().privilege(), PrivilegeLevel::User);
    assert_eq!(ctx.pc(), RAM_BASE + 4);

    ctx.step(); // ecall from U, delegated to S
    assert_eq!(ctx.csr(SCAUSE), 8);
    assert_eq!(ctx.csr(SEPC), RAM_BASE + 4);
    assert_eq!(ctx.pc(), RAM_BASE + 0x100);
    assert_eq!(
        ctx.system.processor().privilege(),
        PrivilegeLevel::Supervisor
    );

    let event = ctx.system.processor().trap_event().unwrap();
    assert_eq!(event.kind, TrapKind::Exception);
    assert_eq!(event.from, PrivilegeLevel::User);
    assert_eq!(event.to, PrivilegeLevel::Supervisor);
    assert_eq!(event.cause, 8);
}

#[test]
fn trap_entry_and_return_restore_privilege_and_enable() {
    let mut ctx = TestContext::new();
    // Handler at +0x80 immediately returns with mret.
    ctx.load_program(&[encode::ecall()]);
    ctx.load_words(u64::from(RAM_BASE) + 0x80, &[encode::mret()]);

    let processor = ctx.system.processor_mut();
    processor.write_csr(MTVEC, RAM_BASE + 0x80);
    processor.write_csr(MSTATUS, 1 << 3); // MIE = 1

    ctx.step(); // ecall: MPIE <- MIE, MIE <- 0, MPP <- Machine
    let status = ctx.csr(MSTATUS);
    assert_eq!(status & (1 << 3), 0);
    assert_ne!(status & (1 << 7), 0);
    assert_eq!((status >> 11) & 0b11, 0b11);

    ctx.step(); // mret: MIE <- MPIE, privilege <- MPP
    let status = ctx.csr(MSTATUS);
    assert_ne!(status & (1 << 3), 0);
    assert_eq!((status >> 11) & 0b11, 0); // MPP reset to User
    assert_eq!(
        ctx.system.processor().privilege(),
        PrivilegeLevel::Machine
    );
    assert_eq!(ctx.pc(), RAM_BASE);

    let event = ctx.system.processor().trap_event().unwrap();
    assert_eq!(event.kind, TrapKind::Return);
    assert_eq!(event.to, PrivilegeLevel::Machine);
}

#[test]
fn vectored_mode_offsets_interrupts_only() {
    use rv32emu_core::core::arch::csr::MIE;

    let mut ctx = TestContext::new();
    ctx.load_program(&[encode::addi(1, 0, 1)]);

    let processor = ctx.system.processor_mut();
    // Vectored mtvec; machine timer interrupt = cause 7 → base + 28.
    processor.write_csr(MTVEC, (RAM_BASE + 0x80) | 1);
    processor.write_csr(MIE, 1 << 7);
    processor.write_csr(MSTATUS, 1 << 3);
    ctx.write_phys_u32(0x0200_4000, 1); // mtimecmp = 1
    ctx.write_phys_u32(0x0200_4004, 0);

    ctx.step();
    assert_eq!(ctx.csr(MCAUSE), 0x8000_0007);
    assert_eq!(ctx.pc(), RAM_BASE + 0x80 + 4 * 7);
}

#[test]
fn exceptions_ignore_the_vectored_bit() {
    let mut ctx = TestContext::new();
    ctx.load_program(&[encode::ebreak()]);
    ctx.system
        .processor_mut()
        .write_csr(MTVEC, (RAM_BASE + 0x80) | 1);

    ctx.step();
    assert_eq!(ctx.pc(), RAM_BASE + 0x80);
}
