//! Common types shared by every component of the simulator.
//!
//! This module provides the fundamental building blocks:
//! 1. **Address types:** Strong types for virtual and physical addresses.
//! 2. **Bit fields:** Const-generic extraction/insertion over 32/64-bit words.
//! 3. **Memory access:** Classification of fetches, loads, and stores.
//! 4. **Error handling:** Architectural traps and fatal emulator faults.
//! 5. **Constants:** The reference memory map and page geometry.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Typed bit-field extraction and insertion.
pub mod bitfield;

/// Common constants used throughout the simulator.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Trap and fatal error types.
pub mod error;

pub use addr::{PhysAddr, VirtAddr};
pub use bitfield::{sign_extend, BitField32, BitField64};
pub use data::{MemoryAccessSize, MemoryAccessType};
pub use error::{EmuError, ExceptionKind, InterruptType, Trap};
