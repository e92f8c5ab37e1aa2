//! Device register-contract tests: CLINT, PLIC, VirtIO stubs, UARTs, and
//! the timer, driven through the bus.

use pretty_assertions::assert_eq;
use rstest::rstest;

use rv32emu_core::common::addr::PhysAddr;
use rv32emu_core::common::data::MemoryAccessSize;
use rv32emu_core::soc::bus::Bus;

fn bus() -> Bus {
    Bus::new(4096)
}

fn read32(bus: &mut Bus, addr: u64) -> u32 {
    bus.read_u32(PhysAddr::new(addr)).unwrap()
}

fn write32(bus: &mut Bus, addr: u64, value: u32) {
    bus.write_u32(PhysAddr::new(addr), value).unwrap();
}

// ── CLINT ─────────────────────────────────────────────────────────

#[test]
fn clint_msip_drives_the_software_line() {
    let mut bus = bus();
    assert!(!bus.irq_lines().software);

    write32(&mut bus, 0x0200_0000, 1);
    assert!(bus.irq_lines().software);
    assert_eq!(read32(&mut bus, 0x0200_0000), 1);

    // Only bit 0 is stored.
    write32(&mut bus, 0x0200_0000, 0xFFFF_FFFE);
    assert!(!bus.irq_lines().software);
}

#[test]
fn clint_mtime_advances_and_compares() {
    let mut bus = bus();
    // mtimecmp = 3.
    write32(&mut bus, 0x0200_4000, 3);
    write32(&mut bus, 0x0200_4004, 0);
    assert!(!bus.irq_lines().timer);

    for _ in 0..3 {
        bus.process_cycle();
    }
    assert_eq!(read32(&mut bus, 0x0200_BFF8), 3);
    assert!(bus.irq_lines().timer);

    // Raising the compare clears the line.
    write32(&mut bus, 0x0200_4000, 1000);
    assert!(!bus.irq_lines().timer);
}

#[test]
fn clint_supports_64_bit_access() {
    let mut bus = bus();
    bus.write(
        PhysAddr::new(0x0200_4000),
        MemoryAccessSize::DoubleWord,
        0x0000_0001_0000_0002,
    )
    .unwrap();
    assert_eq!(read32(&mut bus, 0x0200_4000), 2);
    assert_eq!(read32(&mut bus, 0x0200_4004), 1);
}

#[test]
fn clint_rejects_byte_access() {
    let mut bus = bus();
    assert!(bus
        .read(PhysAddr::new(0x0200_0000), MemoryAccessSize::Byte)
        .is_err());
}

#[test]
fn device_registers_require_natural_alignment() {
    let mut bus = bus();
    // Word access at offset 2 into the CLINT window.
    assert!(bus
        .read(PhysAddr::new(0x0200_0002), MemoryAccessSize::Word)
        .is_err());
    // RAM has no such restriction.
    assert!(bus
        .read(PhysAddr::new(0x8000_0002), MemoryAccessSize::Word)
        .is_ok());
}

// ── PLIC ──────────────────────────────────────────────────────────

#[test]
fn plic_priority_registers_mask_to_eight_levels() {
    let mut bus = bus();
    write32(&mut bus, 0x0c00_0004, 0xFFFF_FFFF); // source 1 priority
    assert_eq!(read32(&mut bus, 0x0c00_0004), 7);
}

#[test]
fn plic_enable_and_threshold_read_back() {
    let mut bus = bus();
    write32(&mut bus, 0x0c00_2000, 0xAAAA_5555); // machine enables
    write32(&mut bus, 0x0c20_0000, 3); // machine threshold
    assert_eq!(read32(&mut bus, 0x0c00_2000), 0xAAAA_5555);
    assert_eq!(read32(&mut bus, 0x0c20_0000), 3);
}

#[test]
fn plic_claim_reads_zero_and_accepts_completion() {
    let mut bus = bus();
    assert_eq!(read32(&mut bus, 0x0c20_0004), 0);
    write32(&mut bus, 0x0c20_0004, 5); // completion is discarded
    assert_eq!(read32(&mut bus, 0x0c20_0004), 0);
}

#[test]
fn plic_pending_bits_are_read_only() {
    let mut bus = bus();
    write32(&mut bus, 0x0c00_1000, 0xFFFF_FFFF);
    assert_eq!(read32(&mut bus, 0x0c00_1000), 0);
}

// ── VirtIO stubs ──────────────────────────────────────────────────

#[rstest]
#[case(0x1000_1000)]
#[case(0x1000_8000)]
fn virtio_slots_answer_the_probe(#[case] base: u64) {
    let mut bus = bus();
    assert_eq!(read32(&mut bus, base), 0x7472_6976);
    assert_eq!(read32(&mut bus, base + 4), 1);
    assert_eq!(read32(&mut bus, base + 8), 0); // device id: none
    assert_eq!(read32(&mut bus, base + 12), 0x4946_4152);
}

#[test]
fn virtio_accepts_and_discards_writes() {
    let mut bus = bus();
    write32(&mut bus, 0x1000_1070, 0xFF); // status register write
    assert_eq!(read32(&mut bus, 0x1000_1070), 0);
}

// ── UARTs and the timer ───────────────────────────────────────────

#[test]
fn uart_registers_hold_enable_and_pending() {
    let mut bus = bus();
    write32(&mut bus, 0x4000_0010, 1); // interrupt enable
    assert_eq!(read32(&mut bus, 0x4000_0010), 1);
    assert!(!bus.irq_lines().external);

    // Transmit a byte; after the cycle hook the TX-pending bit is set and
    // the enabled interrupt line rises.
    write32(&mut bus, 0x4000_0000, u32::from(b'\n'));
    bus.process_cycle();
    assert_eq!(read32(&mut bus, 0x4000_0018) & 1, 1);
    assert!(bus.irq_lines().external);

    // Clearing the pending register drops the line.
    write32(&mut bus, 0x4000_0018, 0);
    assert!(!bus.irq_lines().external);
}

#[test]
fn uart16550_line_status_reports_transmitter_empty() {
    let mut bus = bus();
    let lsr = bus
        .read(PhysAddr::new(0x1000_0005), MemoryAccessSize::Byte)
        .unwrap();
    assert_eq!(lsr & 0x60, 0x60);
}

#[test]
fn uart16550_scratch_register_round_trips() {
    let mut bus = bus();
    bus.write(PhysAddr::new(0x1000_0007), MemoryAccessSize::Byte, 0x5A)
        .unwrap();
    assert_eq!(
        bus.read(PhysAddr::new(0x1000_0007), MemoryAccessSize::Byte)
            .unwrap(),
        0x5A
    );
}

#[test]
fn timer_counts_and_raises_its_line() {
    let mut bus = bus();
    write32(&mut bus, 0x4000_2008, 2); // cmp low
    write32(&mut bus, 0x4000_200C, 0); // cmp high
    assert!(!bus.irq_lines().timer);

    bus.process_cycle();
    bus.process_cycle();
    assert_eq!(read32(&mut bus, 0x4000_2000), 2);
    assert!(bus.irq_lines().timer);
}
