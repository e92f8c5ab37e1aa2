//! Memory-mapped I/O devices and the `Device` trait.
//!
//! Devices expose sized register access at region-relative offsets, an
//! optional per-cycle hook, and an interrupt-request line. The bus invokes
//! `process_cycle` on every device exactly once per cycle before fetch.

use crate::common::data::MemoryAccessSize;
use crate::common::error::EmuError;

/// Core-local interruptor (software + timer interrupt registers).
pub mod clint;

/// Platform-level interrupt controller register file.
pub mod plic;

/// Host-console UART (external interrupt source).
pub mod uart;

/// 16550-compatible UART.
pub mod uart16550;

/// Memory-mapped timer (timer interrupt source).
pub mod timer;

/// VirtIO MMIO probe stub.
pub mod virtio;

pub use clint::Clint;
pub use plic::Plic;
pub use timer::Timer;
pub use uart::Uart;
pub use uart16550::Uart16550;
pub use virtio::VirtIo;

/// A memory-mapped device attached to the bus.
///
/// Register access is sized; devices are free to reject widths they do not
/// support (most are 32-bit only), which surfaces as a fatal
/// [`EmuError::DeviceAccess`] because permission checking has already
/// passed by the time the bus routes the access.
pub trait Device {
    /// Short device name used in fault messages.
    fn name(&self) -> &'static str;

    /// `(base, size)` of this device's register window.
    fn address_range(&self) -> (u64, u64);

    /// Reads a register at a region-relative offset.
    fn read(&mut self, offset: u64, size: MemoryAccessSize) -> Result<u64, EmuError>;

    /// Writes a register at a region-relative offset.
    fn write(&mut self, offset: u64, size: MemoryAccessSize, value: u64) -> Result<(), EmuError>;

    /// Advances device state by one cycle.
    fn process_cycle(&mut self) {}

    /// Level of this device's interrupt-request line.
    fn is_interrupt_requested(&self) -> bool {
        false
    }

    /// Downcast hook for the CLINT (software-interrupt polling).
    fn as_clint(&self) -> Option<&Clint> {
        None
    }
}
