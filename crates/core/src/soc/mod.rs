//! System-on-chip: the bus and the memory/device objects it owns.

/// The system bus and interrupt-line sampling.
pub mod bus;

/// Memory-mapped devices.
pub mod devices;

/// RAM and ROM backing storage.
pub mod memory;

pub use bus::{Bus, IrqLines};
