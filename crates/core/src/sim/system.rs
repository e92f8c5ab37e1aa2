//! Top-level system: the bus (with its memories and devices) and one
//! processor.
//!
//! The system owns the bus exclusively; the processor receives a mutable
//! borrow of it for the duration of each cycle. Host-IO polling reads a
//! u32 straight out of RAM without going through the processor.

use crate::common::addr::PhysAddr;
use crate::common::error::EmuError;
use crate::config::{Config, Xlen};
use crate::core::Processor;
use crate::isa::abi;
use crate::soc::bus::Bus;

/// The simulated system.
#[derive(Debug)]
pub struct System {
    bus: Bus,
    processor: Processor,
    host_io_addr: Option<u32>,
}

impl System {
    /// Builds the system from a configuration. Rejects XLEN=64: the codec
    /// understands it but this core does not execute it.
    pub fn new(config: &Config) -> Result<Self, EmuError> {
        if config.xlen != Xlen::Rv32 {
            return Err(EmuError::UnsupportedXlen(config.xlen.bits()));
        }

        let bus = Bus::new(config.ram_size);
        let mut processor = Processor::new(config.pc);
        if let Some(dtb_addr) = config.dtb_addr {
            // Boot convention: a0 = hart id, a1 = device tree address.
            processor.write_reg(abi::A0, 0)?;
            processor.write_reg(abi::A1, dtb_addr)?;
        }

        Ok(Self {
            bus,
            processor,
            host_io_addr: config.host_io_addr,
        })
    }

    /// Places an image in RAM or ROM before the run.
    pub fn load_image(&mut self, paddr: u64, data: &[u8]) -> Result<(), EmuError> {
        self.bus.load(PhysAddr::new(paddr), data)
    }

    /// Runs one cycle: device hooks first, then the processor.
    pub fn process_cycle(&mut self) -> Result<(), EmuError> {
        self.bus.process_cycle();
        self.processor.process_cycle(&mut self.bus)
    }

    /// The u32 at the host-IO address (0 when unconfigured or outside
    /// RAM). A nonzero value is the driver's stop condition.
    pub fn host_io_value(&self) -> u32 {
        let Some(addr) = self.host_io_addr else {
            return 0;
        };
        let ram = self.bus.ram();
        let base = self.bus.ram_base();
        let offset = u64::from(addr).wrapping_sub(base);
        if offset + 4 <= ram.len() as u64 {
            ram.read(offset as usize, crate::common::data::MemoryAccessSize::Word) as u32
        } else {
            0
        }
    }

    /// The processor.
    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// The processor, mutably (GDB stub, tests).
    pub fn processor_mut(&mut self) -> &mut Processor {
        &mut self.processor
    }

    /// The bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The bus, mutably (GDB stub, tests).
    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// The raw RAM contents (trace memory node).
    pub fn ram_bytes(&self) -> &[u8] {
        self.bus.ram().bytes()
    }
}
