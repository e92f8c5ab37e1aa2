//! Host-console UART.
//!
//! A four-register UART that prints transmitted bytes to the host's
//! standard output once per cycle. Its interrupt-enable/pending registers
//! make it the external-interrupt source of the reference system.
//!
//! # Memory map (32-bit registers)
//!
//! * `+0`: TX data (write queues a byte; read returns the last byte)
//! * `+4`: RX data (reads 0; no input path is modeled)
//! * `+16`: interrupt enable
//! * `+24`: interrupt pending

use std::io::Write;

use crate::common::constants::UART_SIZE;
use crate::common::data::MemoryAccessSize;
use crate::common::error::EmuError;

use super::Device;

/// TX data register offset.
const TX_DATA: u64 = 0;
/// RX data register offset.
const RX_DATA: u64 = 4;
/// Interrupt enable register offset.
const INTERRUPT_ENABLE: u64 = 16;
/// Interrupt pending register offset.
const INTERRUPT_PENDING: u64 = 24;

/// TX-pending interrupt bit in the enable/pending registers.
const IRQ_TX: u32 = 1 << 0;

/// Host-console UART state.
#[derive(Debug)]
pub struct Uart {
    base: u64,
    tx_queue: Vec<u8>,
    last_tx: u8,
    interrupt_enable: u32,
    interrupt_pending: u32,
}

impl Uart {
    /// Creates the UART with an empty transmit queue.
    pub fn new(base: u64) -> Self {
        Self {
            base,
            tx_queue: Vec::new(),
            last_tx: 0,
            interrupt_enable: 0,
            interrupt_pending: 0,
        }
    }
}

impl Device for Uart {
    fn name(&self) -> &'static str {
        "uart"
    }

    fn address_range(&self) -> (u64, u64) {
        (self.base, UART_SIZE)
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
            TX_DATA => u32::from(self.last_tx),
            RX_DATA => 0,
            INTERRUPT_ENABLE => self.interrupt_enable,
            INTERRUPT_PENDING => self.interrupt_pending,
            _ => 0,
        };
        Ok(u64::from(value))
    }

    fn write(&mut self, offset: u64, size: MemoryAccessSize, value: u64) -> Result<(), EmuError> {
        if size != MemoryAccessSize::Word {
            return Err(EmuError::DeviceAccess {
                device: self.name(),
                offset,
                size: size.bytes(),
            });
        }
        match offset {
            TX_DATA => {
                self.last_tx = value as u8;
                self.tx_queue.push(value as u8);
            }
            RX_DATA => {}
            INTERRUPT_ENABLE => self.interrupt_enable = value as u32,
            INTERRUPT_PENDING => self.interrupt_pending = value as u32,
            _ => {}
        }
        Ok(())
    }

    fn process_cycle(&mut self) {
        if !self.tx_queue.is_empty() {
            let mut stdout = std::io::stdout().lock();
            // Host stdout failures are not guest-visible.
            let _ = stdout.write_all(&self.tx_queue);
            let _ = stdout.flush();
            self.tx_queue.clear();
            self.interrupt_pending |= IRQ_TX;
        }
    }

    fn is_interrupt_requested(&self) -> bool {
        self.interrupt_enable & self.interrupt_pending != 0
    }
}
