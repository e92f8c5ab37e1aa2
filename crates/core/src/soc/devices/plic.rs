//! Platform-level interrupt controller (PLIC) register file.
//!
//! Only the register file is modeled: priority, pending, per-context
//! enable, threshold, and claim/complete registers are stored and read
//! back, but no interrupt routing to PLIC-wired devices is performed.

use crate::common::constants::PLIC_SIZE;
use crate::common::data::MemoryAccessSize;
use crate::common::error::EmuError;

use super::Device;

/// Number of interrupt sources modeled (IDs 0..1023).
const SOURCE_COUNT: usize = 1024;
/// Number of 32-bit words holding one bit per source.
const SOURCE_WORDS: usize = SOURCE_COUNT / 32;

/// Source priority array.
const PRIORITY_BEGIN: u64 = 0x0000;
/// One past the priority array.
const PRIORITY_END: u64 = PRIORITY_BEGIN + (SOURCE_COUNT as u64) * 4;
/// Pending bit array.
const PENDING_BEGIN: u64 = 0x1000;
/// One past the pending bit array.
const PENDING_END: u64 = PENDING_BEGIN + (SOURCE_WORDS as u64) * 4;
/// Machine-context enable bits.
const ENABLE_M_BEGIN: u64 = 0x2000;
/// One past the machine-context enable bits.
const ENABLE_M_END: u64 = ENABLE_M_BEGIN + (SOURCE_WORDS as u64) * 4;
/// Supervisor-context enable bits.
const ENABLE_S_BEGIN: u64 = 0x2080;
/// One past the supervisor-context enable bits.
const ENABLE_S_END: u64 = ENABLE_S_BEGIN + (SOURCE_WORDS as u64) * 4;
/// Machine-context priority threshold.
const THRESHOLD_M: u64 = 0x20_0000;
/// Machine-context claim/complete register.
const CLAIM_M: u64 = 0x20_0004;
/// Supervisor-context priority threshold.
const THRESHOLD_S: u64 = 0x20_1000;
/// Supervisor-context claim/complete register.
const CLAIM_S: u64 = 0x20_1004;

/// Valid priority bits (8 levels).
const PRIORITY_MASK: u32 = 0x7;

/// PLIC register file.
#[derive(Debug)]
pub struct Plic {
    base: u64,
    priorities: Vec<u32>,
    pendings: [u32; SOURCE_WORDS],
    enables_m: [u32; SOURCE_WORDS],
    enables_s: [u32; SOURCE_WORDS],
    threshold_m: u32,
    threshold_s: u32,
}

impl Plic {
    /// Creates a PLIC with all registers zero.
    pub fn new(base: u64) -> Self {
        Self {
            base,
            priorities: vec![0; SOURCE_COUNT],
            pendings: [0; SOURCE_WORDS],
            enables_m: [0; SOURCE_WORDS],
            enables_s: [0; SOURCE_WORDS],
            threshold_m: 0,
            threshold_s: 0,
        }
    }

    fn read_word(&self, offset: u64) -> u64 {
        if (PRIORITY_BEGIN..PRIORITY_END).contains(&offset) {
            u64::from(self.priorities[((offset - PRIORITY_BEGIN) / 4) as usize])
        } else if (PENDING_BEGIN..PENDING_END).contains(&offset) {
            u64::from(self.pendings[((offset - PENDING_BEGIN) / 4) as usize])
        } else if (ENABLE_M_BEGIN..ENABLE_M_END).contains(&offset) {
            u64::from(self.enables_m[((offset - ENABLE_M_BEGIN) / 4) as usize])
        } else if (ENABLE_S_BEGIN..ENABLE_S_END).contains(&offset) {
            u64::from(self.enables_s[((offset - ENABLE_S_BEGIN) / 4) as usize])
        } else if offset == THRESHOLD_M {
            u64::from(self.threshold_m)
        } else if offset == THRESHOLD_S {
            u64::from(self.threshold_s)
        } else {
            // Includes claim/complete: no routing is modeled, so there is
            // never a claimable source.
            0
        }
    }

    fn write_word(&mut self, offset: u64, value: u32) {
        if (PRIORITY_BEGIN..PRIORITY_END).contains(&offset) {
            self.priorities[((offset - PRIORITY_BEGIN) / 4) as usize] = value & PRIORITY_MASK;
        } else if (ENABLE_M_BEGIN..ENABLE_M_END).contains(&offset) {
            self.enables_m[((offset - ENABLE_M_BEGIN) / 4) as usize] = value;
        } else if (ENABLE_S_BEGIN..ENABLE_S_END).contains(&offset) {
            self.enables_s[((offset - ENABLE_S_BEGIN) / 4) as usize] = value;
        } else if offset == THRESHOLD_M {
            self.threshold_m = value & PRIORITY_MASK;
        } else if offset == THRESHOLD_S {
            self.threshold_s = value & PRIORITY_MASK;
        }
        // Pending bits are read-only; claim/complete writes are accepted
        // and discarded.
    }
}

impl Device for Plic {
    fn name(&self) -> &'static str {
        "plic"
    }

    fn address_range(&self) -> (u64, u64) {
        (self.base, PLIC_SIZE)
    }

    fn read(&mut self, offset: u64, size: MemoryAccessSize) -> Result<u64, EmuError> {
        match size {
            MemoryAccessSize::Word => Ok(self.read_word(offset)),
            MemoryAccessSize::DoubleWord => {
                Ok(self.read_word(offset) | (self.read_word(offset + 4) << 32))
            }
            _ => Err(EmuError::DeviceAccess {
                device: self.name(),
                offset,
                size: size.bytes(),
            }),
        }
    }

    fn write(&mut self, offset: u64, size: MemoryAccessSize, value: u64) -> Result<(), EmuError> {
        match size {
            MemoryAccessSize::Word => {
                self.write_word(offset, value as u32);
                Ok(())
            }
            MemoryAccessSize::DoubleWord => {
                self.write_word(offset, value as u32);
                self.write_word(offset + 4, (value >> 32) as u32);
                Ok(())
            }
            _ => Err(EmuError::DeviceAccess {
                device: self.name(),
                offset,
                size: size.bytes(),
            }),
        }
    }
}
