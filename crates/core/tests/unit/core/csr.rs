//! CSR file tests: alias masks, write legality, and counter gating.

use pretty_assertions::assert_eq;

use rv32emu_core::core::arch::csr::{
    CsrFile, CYCLE, FCSR, FFLAGS, FRM, MCOUNTEREN, MEPC, MIE, MIP, MISA, MISA_VALUE, MSTATUS,
    MVENDORID, SCOUNTEREN, SIE, SIP, SSTATUS, STATUS_SMASK, TIME, USTATUS,
};
use rv32emu_core::core::arch::mode::PrivilegeLevel;

fn csr() -> CsrFile {
    CsrFile::new(0x8000_0000)
}

#[test]
fn sstatus_is_a_masked_view_of_mstatus() {
    let mut csr = csr();
    csr.write(MSTATUS, 0xFFFF_FFFF);
    assert_eq!(csr.read(SSTATUS), 0xFFFF_FFFF & STATUS_SMASK);
}

#[test]
fn sstatus_writes_preserve_machine_bits() {
    let mut csr = csr();
    // MPP = Machine lives outside the supervisor mask.
    csr.write(MSTATUS, 0b11 << 11);
    csr.write(SSTATUS, 0);
    assert_eq!(csr.read(MSTATUS) & (0b11 << 11), 0b11 << 11);

    // Bits inside the mask go through.
    csr.write(SSTATUS, 1 << 1); // SIE
    assert_eq!(csr.read(MSTATUS) & (1 << 1), 1 << 1);
}

#[test]
fn ustatus_is_confined_to_upie_and_uie() {
    let mut csr = csr();
    csr.write(USTATUS, 0xFFFF_FFFF);
    assert_eq!(csr.read(USTATUS), (1 << 4) | (1 << 0));
    // Nothing outside the user mask was modified.
    assert_eq!(csr.read(MSTATUS), (1 << 4) | (1 << 0));
}

#[test]
fn sie_writes_stay_within_the_supervisor_mask() {
    let mut csr = csr();
    csr.write(SIE, 0xFFFF_FFFF);
    // MEIE/MTIE/MSIE must remain clear.
    assert_eq!(csr.read(MIE) & ((1 << 11) | (1 << 7) | (1 << 3)), 0);
    assert_ne!(csr.read(SIE), 0);
}

#[test]
fn mip_timer_bits_are_not_software_writable() {
    let mut csr = csr();
    csr.write(MIP, 0xFFFF_FFFF);
    // MTIP/STIP/UTIP are owned by the interrupt controller.
    assert_eq!(csr.read(MIP) & ((1 << 7) | (1 << 5) | (1 << 4)), 0);
    // Software-pending bits went through.
    assert_ne!(csr.read(MIP) & (1 << 3), 0);
}

#[test]
fn sip_cannot_raise_machine_software_pending() {
    let mut csr = csr();
    csr.write(SIP, 0xFFFF_FFFF);
    assert_eq!(csr.read(MIP) & (1 << 3), 0);
    assert_ne!(csr.read(SIP) & (1 << 1), 0);
}

#[test]
fn misa_reports_rv32imafdc_and_ignores_writes() {
    let mut csr = csr();
    assert_eq!(csr.read(MISA), MISA_VALUE);
    csr.write(MISA, 0);
    assert_eq!(csr.read(MISA), MISA_VALUE);
}

#[test]
fn mvendorid_is_the_noncommercial_sentinel() {
    assert_eq!(csr().read(MVENDORID), 0);
}

#[test]
fn fcsr_aliases_frm_and_fflags() {
    let mut csr = csr();
    csr.write(FCSR, 0b101_11011);
    assert_eq!(csr.read(FRM), 0b101);
    assert_eq!(csr.read(FFLAGS), 0b11011);

    csr.write(FRM, 0b001);
    assert_eq!(csr.read(FCSR), 0b001_11011);

    csr.write(FFLAGS, 0);
    assert_eq!(csr.read(FCSR), 0b001_00000);
}

#[test]
fn writes_to_read_only_csrs_are_illegal() {
    let csr = csr();
    assert!(csr.check_access(MVENDORID, true, 0, 0).is_some());
    assert!(csr.check_access(MVENDORID, false, 0, 0).is_none());
    assert!(csr.check_access(CYCLE, true, 0, 0).is_some());
}

#[test]
fn lower_privilege_cannot_touch_higher_csrs() {
    let mut csr = csr();
    csr.set_privilege(PrivilegeLevel::Supervisor);
    assert!(csr.check_access(MEPC, false, 0, 0).is_some());
    assert!(csr.check_access(SSTATUS, false, 0, 0).is_none());

    csr.set_privilege(PrivilegeLevel::User);
    assert!(csr.check_access(SSTATUS, false, 0, 0).is_some());
    assert!(csr.check_access(USTATUS, false, 0, 0).is_none());
}

#[test]
fn counter_reads_are_gated_by_counteren() {
    let mut csr = csr();
    csr.set_privilege(PrivilegeLevel::User);

    // No grants: cycle and time read illegally from U-mode.
    assert!(csr.check_access(CYCLE, false, 0, 0).is_some());
    assert!(csr.check_access(TIME, false, 0, 0).is_some());

    // mcounteren alone is not enough for U-mode.
    csr.set_privilege(PrivilegeLevel::Machine);
    csr.write(MCOUNTEREN, 0b11);
    csr.set_privilege(PrivilegeLevel::User);
    assert!(csr.check_access(CYCLE, false, 0, 0).is_some());

    // Both grants open the counter.
    csr.set_privilege(PrivilegeLevel::Machine);
    csr.write(SCOUNTEREN, 0b11);
    csr.set_privilege(PrivilegeLevel::User);
    assert!(csr.check_access(CYCLE, false, 0, 0).is_none());
    assert!(csr.check_access(TIME, false, 0, 0).is_none());
    // instret (bit 2) was not granted.
    assert!(csr.check_access(CYCLE + 2, false, 0, 0).is_some());

    // Supervisor only needs the mcounteren grant.
    csr.set_privilege(PrivilegeLevel::Supervisor);
    assert!(csr.check_access(CYCLE, false, 0, 0).is_none());
}

#[test]
fn update_advances_all_three_counters() {
    use rv32emu_core::core::arch::csr::INSTRET;

    let mut csr = csr();
    csr.update();
    csr.update();
    assert_eq!(csr.read(CYCLE), 2);
    assert_eq!(csr.read(TIME), 2);
    assert_eq!(csr.read(INSTRET), 2);
}

#[test]
fn pmp_registers_are_accepted_and_inert() {
    use rv32emu_core::core::arch::csr::{PMPADDR_BEGIN, PMPCFG_BEGIN};

    let mut csr = csr();
    csr.write(PMPCFG_BEGIN, 0x1F1F_1F1F);
    csr.write(PMPADDR_BEGIN + 3, 0x1234_5678);
    assert_eq!(csr.read(PMPCFG_BEGIN), 0x1F1F_1F1F);
    assert_eq!(csr.read(PMPADDR_BEGIN + 3), 0x1234_5678);
}
