//! LR/SC reservation semantics and AMO read-modify-write.

use pretty_assertions::assert_eq;

use crate::common::{encode, TestContext, RAM_BASE};

const DATA: u64 = 0x8000_0100;

fn ctx_with_data(program: &[u32], value: u32) -> TestContext {
    let mut ctx = TestContext::new();
    ctx.load_program(program);
    ctx.write_phys_u32(DATA, value);
    ctx.system
        .processor_mut()
        .write_reg(1, DATA as u32)
        .unwrap();
    ctx
}

#[test]
fn lr_sc_pair_succeeds() {
    let mut ctx = ctx_with_data(
        &[
            encode::lr_w(2, 1),
            encode::addi(3, 2, 1),
            encode::sc_w(4, 1, 3),
        ],
        41,
    );

    ctx.step_n(3);
    assert_eq!(ctx.reg(2), 41);
    assert_eq!(ctx.reg(4), 0, "sc must succeed");
    assert_eq!(ctx.read_phys_u32(DATA), 42);
}

#[test]
fn sc_without_reservation_fails_and_does_not_store() {
    let mut ctx = ctx_with_data(&[encode::sc_w(4, 1, 3)], 41);
    ctx.system.processor_mut().write_reg(3, 99).unwrap();

    ctx.step();
    assert_eq!(ctx.reg(4), 1, "sc must fail");
    assert_eq!(ctx.read_phys_u32(DATA), 41);
    // A failed sc records no store event.
    assert!(ctx.system.processor().memory_access_events().is_empty());
}

#[test]
fn an_intervening_store_clears_the_reservation() {
    let mut ctx = ctx_with_data(
        &[
            encode::lr_w(2, 1),
            encode::sw(3, 1, 0),
            encode::sc_w(4, 1, 5),
        ],
        41,
    );
    let processor = ctx.system.processor_mut();
    processor.write_reg(3, 7).unwrap();
    processor.write_reg(5, 99).unwrap();

    ctx.step_n(3);
    assert_eq!(ctx.reg(4), 1, "sc must fail after the intervening store");
    assert_eq!(ctx.read_phys_u32(DATA), 7);
}

#[test]
fn trap_entry_clears_the_reservation() {
    let mut ctx = ctx_with_data(
        &[
            encode::lr_w(2, 1),
            encode::ebreak(),
            encode::sc_w(4, 1, 3),
        ],
        41,
    );
    ctx.system
        .processor_mut()
        .write_csr(rv32emu_core::core::arch::csr::MTVEC, RAM_BASE + 8);

    ctx.step_n(3); // lr, ebreak (trap to the sc), sc
    assert_eq!(ctx.reg(4), 1, "sc must fail after a trap");
}

#[test]
fn amoadd_returns_the_old_value_and_stores_the_sum() {
    let mut ctx = ctx_with_data(&[encode::amoadd_w(2, 1, 3)], 40);
    ctx.system.processor_mut().write_reg(3, 2).unwrap();

    ctx.step();
    assert_eq!(ctx.reg(2), 40);
    assert_eq!(ctx.read_phys_u32(DATA), 42);

    // AMO emits a load event then a store event, in that order.
    let events = ctx.system.processor().memory_access_events();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].access_type,
        rv32emu_core::common::data::MemoryAccessType::Load
    );
    assert_eq!(
        events[1].access_type,
        rv32emu_core::common::data::MemoryAccessType::Store
    );
}

#[test]
fn amo_minmax_are_signed_and_unsigned() {
    use crate::common::encode::r_type;

    // amomax.w x2, x3, (x1) ; amominu.w x4, x5, (x1)
    let amomax = r_type(0b1010000, 3, 1, 0b010, 2, 0b0101111);
    let amominu = r_type(0b1100000, 5, 1, 0b010, 4, 0b0101111);
    let mut ctx = ctx_with_data(&[amomax, amominu], 0xFFFF_FFFF); // -1 signed

    let processor = ctx.system.processor_mut();
    processor.write_reg(3, 5).unwrap(); // max(-1, 5) = 5
    processor.write_reg(5, 3).unwrap(); // minu(5, 3) = 3

    ctx.step();
    assert_eq!(ctx.reg(2), 0xFFFF_FFFF);
    assert_eq!(ctx.read_phys_u32(DATA), 5);

    ctx.step();
    assert_eq!(ctx.reg(4), 5);
    assert_eq!(ctx.read_phys_u32(DATA), 3);
}
