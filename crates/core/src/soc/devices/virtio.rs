//! VirtIO MMIO probe stub.
//!
//! Answers the MMIO discovery registers with identifying constants so a
//! guest driver can probe the slot and move on; every other read returns
//! zero and all writes are accepted and discarded.

use crate::common::constants::VIRTIO_SIZE;
use crate::common::data::MemoryAccessSize;
use crate::common::error::EmuError;

use super::Device;

/// Magic value register offset ("virt" little-endian).
const ADDR_MAGIC: u64 = 0x0;
/// Version register offset.
const ADDR_VERSION: u64 = 0x4;
/// Device-ID register offset.
const ADDR_DEVICE_ID: u64 = 0x8;
/// Vendor-ID register offset.
const ADDR_VENDOR_ID: u64 = 0xC;

/// MMIO magic value.
const MAGIC: u32 = 0x7472_6976;
/// MMIO interface version.
const VERSION: u32 = 1;
/// Vendor identifier.
const VENDOR_ID: u32 = 0x4946_4152;

/// VirtIO MMIO stub state.
#[derive(Debug)]
pub struct VirtIo {
    base: u64,
}

impl VirtIo {
    /// Creates a stub at the given base address.
    pub fn new(base: u64) -> Self {
        Self { base }
    }
}

impl Device for VirtIo {
    fn name(&self) -> &'static str {
        "virtio"
    }

    fn address_range(&self) -> (u64, u64) {
        (self.base, VIRTIO_SIZE)
    }

    fn read(&mut self, offset: u64, size: MemoryAccessSize) -> Result<u64, EmuError> {
        if size != MemoryAccessSize::Word {
            return Err(EmuError::DeviceAccess {
                device: self.name(),
                offset,
                size: size.bytes(),
            });
        }
        let value = match offset {
            ADDR_MAGIC => MAGIC,
            ADDR_VERSION => VERSION,
            ADDR_DEVICE_ID => 0,
            ADDR_VENDOR_ID => VENDOR_ID,
            _ => 0,
        };
        Ok(u64::from(value))
    }

    fn write(&mut self, offset: u64, size: MemoryAccessSize, _value: u64) -> Result<(), EmuError> {
        if size != MemoryAccessSize::Word {
            return Err(EmuError::DeviceAccess {
                device: self.name(),
                offset,
                size: size.bytes(),
            });
        }
        Ok(())
    }
}
