//! Bus routing tests.

use pretty_assertions::assert_eq;

use rv32emu_core::common::addr::PhysAddr;
use rv32emu_core::common::data::MemoryAccessSize;
use rv32emu_core::common::error::EmuError;
use rv32emu_core::soc::bus::Bus;

fn bus() -> Bus {
    Bus::new(1024 * 1024)
}

#[test]
fn ram_round_trips_all_sizes() {
    let mut bus = bus();
    let base = PhysAddr::new(0x8000_0000);

    bus.write(base, MemoryAccessSize::DoubleWord, 0x1122_3344_5566_7788)
        .unwrap();
    assert_eq!(
        bus.read(base, MemoryAccessSize::DoubleWord).unwrap(),
        0x1122_3344_5566_7788
    );
    assert_eq!(bus.read(base, MemoryAccessSize::Word).unwrap(), 0x5566_7788);
    assert_eq!(bus.read(base, MemoryAccessSize::HalfWord).unwrap(), 0x7788);
    assert_eq!(bus.read(base, MemoryAccessSize::Byte).unwrap(), 0x88);

    // Little-endian byte order.
    assert_eq!(
        bus.read(PhysAddr::new(0x8000_0001), MemoryAccessSize::Byte)
            .unwrap(),
        0x77
    );
}

#[test]
fn unmapped_access_is_a_fatal_error() {
    let mut bus = bus();
    let err = bus.read(PhysAddr::new(0x5000_0000), MemoryAccessSize::Word);
    assert_eq!(
        err,
        Err(EmuError::UnmappedBusAccess {
            paddr: PhysAddr::new(0x5000_0000),
            size: 4
        })
    );
}

#[test]
fn access_straddling_the_ram_end_is_unmapped() {
    let mut bus = bus();
    let last = PhysAddr::new(0x8000_0000 + 1024 * 1024 - 2);
    assert!(bus.read(last, MemoryAccessSize::HalfWord).is_ok());
    assert!(bus.read(last, MemoryAccessSize::Word).is_err());
}

#[test]
fn rom_loads_at_init_and_rejects_stores() {
    let mut bus = bus();
    bus.load(PhysAddr::new(0x1000), &[0xEF, 0xBE, 0xAD, 0xDE])
        .unwrap();
    assert_eq!(bus.read_u32(PhysAddr::new(0x1000)).unwrap(), 0xDEAD_BEEF);

    let err = bus.write_u32(PhysAddr::new(0x1000), 0);
    assert_eq!(
        err,
        Err(EmuError::RomWrite {
            paddr: PhysAddr::new(0x1000)
        })
    );
}

#[test]
fn load_outside_ram_and_rom_is_rejected() {
    let mut bus = bus();
    assert!(bus.load(PhysAddr::new(0x0200_0000), &[0]).is_err());
}

#[test]
fn is_valid_range_covers_regions_exactly() {
    let bus = bus();
    assert!(bus.is_valid_range(PhysAddr::new(0x8000_0000), 4));
    assert!(bus.is_valid_range(PhysAddr::new(0x1000_0000), 4)); // uart16550
    assert!(!bus.is_valid_range(PhysAddr::new(0x0000_0000), 4));
    assert!(!bus.is_valid_range(PhysAddr::new(0x8000_0000 + 1024 * 1024), 1));
}
