//! Simulation: the system aggregate, the binary loader, and the emulator
//! driver loop.

/// Emulator driver (outer cycle loop, stop conditions).
pub mod emulator;

/// Binary image loading.
pub mod loader;

/// The simulated system (bus + processor).
pub mod system;

pub use emulator::{Emulator, RunSummary, SimError, StopReason};
pub use system::System;
