//! System-wide constants: the reference memory map and page geometry.

/// Size of a 4 KiB page.
pub const PAGE_SIZE: u64 = 1 << 12;

/// Size of a 4 MiB Sv32 megapage.
pub const MEGAPAGE_SIZE: u64 = 1 << 22;

/// Size of one Sv32 page-table entry in bytes.
pub const PTE_SIZE: u64 = 4;

/// ROM base address.
pub const ROM_ADDR: u64 = 0x0000_1000;
/// ROM size (4 KiB).
pub const ROM_SIZE: u64 = 0x1000;

/// CLINT base address.
pub const CLINT_ADDR: u64 = 0x0200_0000;
/// CLINT register window size (64 KiB).
pub const CLINT_SIZE: u64 = 0x1_0000;

/// PLIC base address.
pub const PLIC_ADDR: u64 = 0x0c00_0000;
/// PLIC register window size (64 MiB).
pub const PLIC_SIZE: u64 = 0x400_0000;

/// 16550 UART base address.
pub const UART16550_ADDR: u64 = 0x1000_0000;
/// 16550 UART register window size.
pub const UART16550_SIZE: u64 = 0x1000;

/// Base address of the first VirtIO MMIO stub.
pub const VIRTIO_ADDR: u64 = 0x1000_1000;
/// Register window size of one VirtIO stub.
pub const VIRTIO_SIZE: u64 = 0x1000;
/// Number of VirtIO stubs (consecutive 4 KiB windows).
pub const VIRTIO_COUNT: u64 = 8;

/// Simple host UART base address.
pub const UART_ADDR: u64 = 0x4000_0000;
/// Simple host UART register window size.
pub const UART_SIZE: u64 = 0x1000;

/// Timer base address.
pub const TIMER_ADDR: u64 = 0x4000_2000;
/// Timer register window size.
pub const TIMER_SIZE: u64 = 0x1000;

/// RAM base address.
pub const RAM_ADDR: u64 = 0x8000_0000;
