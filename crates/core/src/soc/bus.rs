//! System bus: routes physical accesses to RAM, ROM, or a device.
//!
//! The region set is fixed at construction and regions never overlap. The
//! MMU and executor only present addresses that already passed permission
//! checks, so an access that matches no region is a fatal emulator error,
//! not an architectural fault.

use crate::common::addr::PhysAddr;
use crate::common::constants::{
    CLINT_ADDR, PLIC_ADDR, RAM_ADDR, ROM_ADDR, ROM_SIZE, TIMER_ADDR, UART16550_ADDR, UART_ADDR,
    VIRTIO_ADDR, VIRTIO_COUNT, VIRTIO_SIZE,
};
use crate::common::data::MemoryAccessSize;
use crate::common::error::EmuError;

use super::devices::{Clint, Device, Plic, Timer, Uart, Uart16550, VirtIo};
use super::memory::{Ram, Rom};

/// Levels of the three interrupt lines the interrupt controller samples
/// each cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IrqLines {
    /// Software interrupt line (CLINT MSIP).
    pub software: bool,
    /// Timer interrupt line (CLINT mtime or the memory-mapped timer).
    pub timer: bool,
    /// External interrupt line (host UART).
    pub external: bool,
}

/// The system bus and every memory/device object it owns.
pub struct Bus {
    ram: Ram,
    ram_base: u64,
    rom: Rom,
    rom_base: u64,
    devices: Vec<Box<dyn Device>>,
    clint_idx: usize,
    timer_idx: usize,
    uart_idx: usize,
}

impl Bus {
    /// Builds the reference memory map with the given RAM size.
    pub fn new(ram_size: usize) -> Self {
        let mut devices: Vec<Box<dyn Device>> = Vec::new();

        let clint_idx = devices.len();
        devices.push(Box::new(Clint::new(CLINT_ADDR)));
        devices.push(Box::new(Plic::new(PLIC_ADDR)));
        devices.push(Box::new(Uart16550::new(UART16550_ADDR)));
        for slot in 0..VIRTIO_COUNT {
            devices.push(Box::new(VirtIo::new(VIRTIO_ADDR + slot * VIRTIO_SIZE)));
        }
        let uart_idx = devices.len();
        devices.push(Box::new(Uart::new(UART_ADDR)));
        let timer_idx = devices.len();
        devices.push(Box::new(Timer::new(TIMER_ADDR)));

        Self {
            ram: Ram::new(ram_size),
            ram_base: RAM_ADDR,
            rom: Rom::new(ROM_SIZE as usize),
            rom_base: ROM_ADDR,
            devices,
            clint_idx,
            timer_idx,
            uart_idx,
        }
    }

    /// Reads a sized little-endian value at a physical address.
    pub fn read(&mut self, paddr: PhysAddr, size: MemoryAccessSize) -> Result<u64, EmuError> {
        let addr = paddr.val();
        let width = size.bytes() as u64;

        if self.contains_ram(addr, width) {
            return Ok(self.ram.read((addr - self.ram_base) as usize, size));
        }
        if self.contains_rom(addr, width) {
            return Ok(self.rom.read((addr - self.rom_base) as usize, size));
        }
        for dev in &mut self.devices {
            let (base, region_size) = dev.address_range();
            if addr >= base && addr + width <= base + region_size {
                let offset = addr - base;
                // Device registers require natural alignment.
                if offset % width != 0 {
                    return Err(EmuError::DeviceAccess {
                        device: dev.name(),
                        offset,
                        size: size.bytes(),
                    });
                }
                return dev.read(offset, size);
            }
        }
        Err(EmuError::UnmappedBusAccess {
            paddr,
            size: size.bytes(),
        })
    }

    /// Writes a sized little-endian value at a physical address.
    pub fn write(
        &mut self,
        paddr: PhysAddr,
        size: MemoryAccessSize,
        value: u64,
    ) -> Result<(), EmuError> {
        let addr = paddr.val();
        let width = size.bytes() as u64;

        if self.contains_ram(addr, width) {
            self.ram.write((addr - self.ram_base) as usize, size, value);
            return Ok(());
        }
        if self.contains_rom(addr, width) {
            return Err(EmuError::RomWrite { paddr });
        }
        for dev in &mut self.devices {
            let (base, region_size) = dev.address_range();
            if addr >= base && addr + width <= base + region_size {
                let offset = addr - base;
                if offset % width != 0 {
                    return Err(EmuError::DeviceAccess {
                        device: dev.name(),
                        offset,
                        size: size.bytes(),
                    });
                }
                return dev.write(offset, size, value);
            }
        }
        Err(EmuError::UnmappedBusAccess {
            paddr,
            size: size.bytes(),
        })
    }

    /// Reads a 32-bit value.
    pub fn read_u32(&mut self, paddr: PhysAddr) -> Result<u32, EmuError> {
        Ok(self.read(paddr, MemoryAccessSize::Word)? as u32)
    }

    /// Writes a 32-bit value.
    pub fn write_u32(&mut self, paddr: PhysAddr, value: u32) -> Result<(), EmuError> {
        self.write(paddr, MemoryAccessSize::Word, u64::from(value))
    }

    /// Loads an image into RAM or ROM at a physical address. Initialization
    /// only; ROM is writable through this path alone.
    pub fn load(&mut self, paddr: PhysAddr, data: &[u8]) -> Result<(), EmuError> {
        let addr = paddr.val();
        if self.contains_ram(addr, data.len() as u64) {
            return self.ram.load((addr - self.ram_base) as usize, data);
        }
        if addr >= self.rom_base && addr < self.rom_base + self.rom.len() as u64 {
            return self.rom.load((addr - self.rom_base) as usize, data);
        }
        Err(EmuError::LoadOutOfBounds {
            paddr,
            len: data.len(),
        })
    }

    /// Whether `[paddr, paddr+len)` is fully covered by one region.
    pub fn is_valid_range(&self, paddr: PhysAddr, len: u64) -> bool {
        let addr = paddr.val();
        if self.contains_ram(addr, len) || self.contains_rom(addr, len) {
            return true;
        }
        self.devices.iter().any(|dev| {
            let (base, size) = dev.address_range();
            addr >= base && addr + len <= base + size
        })
    }

    /// Invokes every device's per-cycle hook. Called exactly once per
    /// cycle before fetch.
    pub fn process_cycle(&mut self) {
        for dev in &mut self.devices {
            dev.process_cycle();
        }
    }

    /// Samples the software/timer/external interrupt lines.
    pub fn irq_lines(&self) -> IrqLines {
        let software = self.devices[self.clint_idx]
            .as_clint()
            .is_some_and(Clint::software_interrupt_requested);
        let timer = self.devices[self.clint_idx].is_interrupt_requested()
            || self.devices[self.timer_idx].is_interrupt_requested();
        let external = self.devices[self.uart_idx].is_interrupt_requested();
        IrqLines {
            software,
            timer,
            external,
        }
    }

    /// RAM base address.
    #[inline(always)]
    pub fn ram_base(&self) -> u64 {
        self.ram_base
    }

    /// The RAM contents (trace memory node, host-IO polling).
    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    fn contains_ram(&self, addr: u64, width: u64) -> bool {
        addr >= self.ram_base && addr + width <= self.ram_base + self.ram.len() as u64
    }

    fn contains_rom(&self, addr: u64, width: u64) -> bool {
        addr >= self.rom_base && addr + width <= self.rom_base + self.rom.len() as u64
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("ram_base", &self.ram_base)
            .field("ram_size", &self.ram.len())
            .field("devices", &self.devices.len())
            .finish_non_exhaustive()
    }
}
