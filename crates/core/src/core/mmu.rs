//! Memory access unit: Sv32 translation, permission checks, and the
//! load/store path with event recording.
//!
//! Translation is active iff the current privilege is below Machine and
//! `satp.mode` selects Sv32. The walk is two-level with 4 MiB megapages;
//! a megapage leaf whose PPN0 is non-zero is a misaligned superpage and
//! page-faults.
//!
//! `check_trap` performs a read-only walk and reports the page fault an
//! access would raise; `translate` performs the same walk with A/D updates
//! and assumes the check already passed. This split keeps the precise-trap
//! rule (no state changes before the pre-execute check) without carrying
//! walk results between the two phases.
//!
//! The unit also owns the LR/SC reservation and the per-cycle buffer of
//! memory-access events (loads and stores only; translation reads are not
//! events).

use tracing::trace;

use crate::common::addr::{PhysAddr, VirtAddr};
use crate::common::bitfield::BitField32;
use crate::common::constants::{MEGAPAGE_SIZE, PAGE_SIZE, PTE_SIZE};
use crate::common::data::{MemoryAccessSize, MemoryAccessType};
use crate::common::error::{EmuError, Trap};
use crate::soc::bus::Bus;

use super::arch::csr::{CsrFile, SATP_MODE, SATP_PPN_MASK, STATUS_MXR, STATUS_SUM};
use super::arch::mode::PrivilegeLevel;
use super::events::MemoryAccessEvent;

/// An Sv32 page-table entry.
#[derive(Clone, Copy, Debug)]
struct PageTableEntry(BitField32);

impl PageTableEntry {
    fn new(value: u32) -> Self {
        Self(BitField32::new(value))
    }

    fn value(self) -> u32 {
        self.0.value()
    }

    fn valid(self) -> bool {
        self.0.bit::<0>() != 0
    }

    fn readable(self) -> bool {
        self.0.bit::<1>() != 0
    }

    fn writable(self) -> bool {
        self.0.bit::<2>() != 0
    }

    fn executable(self) -> bool {
        self.0.bit::<3>() != 0
    }

    fn user(self) -> bool {
        self.0.bit::<4>() != 0
    }

    /// A leaf maps memory; a non-leaf points at the next table level.
    fn is_leaf(self) -> bool {
        self.readable() || self.executable()
    }

    /// W=1 with R=0 is a malformed encoding.
    fn malformed(self) -> bool {
        self.writable() && !self.readable()
    }

    fn ppn(self) -> u32 {
        self.0.bits::<31, 10>()
    }

    fn ppn0(self) -> u32 {
        self.0.bits::<19, 10>()
    }

    fn ppn1(self) -> u32 {
        self.0.bits::<31, 20>()
    }

    fn with_accessed_dirty(self, dirty: bool) -> Self {
        let mut raw = self.0;
        raw.set_bit::<6>(1);
        if dirty {
            raw.set_bit::<7>(1);
        }
        Self(raw)
    }
}

/// The memory access unit.
#[derive(Debug, Default)]
pub struct MemoryAccessUnit {
    events: Vec<MemoryAccessEvent>,
    reservation: Option<u32>,
}

impl MemoryAccessUnit {
    /// Creates the unit with no reservation and empty event buffer.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            reservation: None,
        }
    }

    // ── Event buffer ──────────────────────────────────────────────

    /// Clears the per-cycle event buffer (capacity is retained).
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// The memory-access events recorded this cycle, in program order.
    pub fn events(&self) -> &[MemoryAccessEvent] {
        &self.events
    }

    // ── LR/SC reservation ─────────────────────────────────────────

    /// Records a reservation on the given address.
    pub fn set_reservation(&mut self, vaddr: u32) {
        self.reservation = Some(vaddr);
    }

    /// Clears any reservation (trap entry does this too).
    pub fn clear_reservation(&mut self) {
        self.reservation = None;
    }

    /// Whether a reservation on `vaddr` is still held.
    pub fn reservation_matches(&self, vaddr: u32) -> bool {
        self.reservation == Some(vaddr)
    }

    // ── Translation ───────────────────────────────────────────────

    /// Whether virtual-address translation is active.
    fn translation_enabled(csr: &CsrFile) -> bool {
        csr.privilege() != PrivilegeLevel::Machine && csr.satp() & SATP_MODE != 0
    }

    /// Read-only walk reporting the trap the access would raise, without
    /// mutating any state. `pc` is the faulting instruction's address.
    pub fn check_trap(
        &self,
        access: MemoryAccessType,
        pc: u32,
        vaddr: u32,
        csr: &CsrFile,
        bus: &mut Bus,
    ) -> Result<Option<Trap>, EmuError> {
        if !Self::translation_enabled(csr) {
            return Ok(None);
        }

        let va = VirtAddr::new(vaddr);
        let root = u64::from(csr.satp() & SATP_PPN_MASK) * PAGE_SIZE;

        let l1_addr = PhysAddr::new(root + PTE_SIZE * u64::from(va.vpn1()));
        let l1 = PageTableEntry::new(bus.read_u32(l1_addr)?);

        if !l1.valid() || l1.malformed() {
            return Ok(Some(Trap::page_fault(access, pc, vaddr)));
        }

        if l1.is_leaf() {
            if let Some(trap) = Self::check_leaf(l1, access, pc, vaddr, csr) {
                return Ok(Some(trap));
            }
            // Misaligned megapage: low PPN bits must be zero.
            if l1.ppn0() != 0 {
                trace!("misaligned megapage leaf at {vaddr:#x}");
                return Ok(Some(Trap::page_fault(access, pc, vaddr)));
            }
            return Ok(None);
        }

        let l2_addr =
            PhysAddr::new(u64::from(l1.ppn()) * PAGE_SIZE + PTE_SIZE * u64::from(va.vpn0()));
        let l2 = PageTableEntry::new(bus.read_u32(l2_addr)?);

        if !l2.valid() || l2.malformed() || !l2.is_leaf() {
            return Ok(Some(Trap::page_fault(access, pc, vaddr)));
        }

        Ok(Self::check_leaf(l2, access, pc, vaddr, csr))
    }

    /// Leaf permission checks per privilege level and access type.
    fn check_leaf(
        entry: PageTableEntry,
        access: MemoryAccessType,
        pc: u32,
        vaddr: u32,
        csr: &CsrFile,
    ) -> Option<Trap> {
        let status = csr.status();
        let sum = status & STATUS_SUM != 0;
        let mxr = status & STATUS_MXR != 0;

        match csr.privilege() {
            PrivilegeLevel::Supervisor if entry.user() => {
                // User pages are reachable from S only under SUM, and never
                // for instruction fetch.
                if !sum || access == MemoryAccessType::Instruction {
                    return Some(Trap::page_fault(access, pc, vaddr));
                }
            }
            PrivilegeLevel::User if !entry.user() => {
                return Some(Trap::page_fault(access, pc, vaddr));
            }
            _ => {}
        }

        let permitted = match access {
            MemoryAccessType::Instruction => entry.executable(),
            MemoryAccessType::Load => entry.readable() || (mxr && entry.executable()),
            MemoryAccessType::Store => entry.writable(),
        };
        if permitted {
            None
        } else {
            Some(Trap::page_fault(access, pc, vaddr))
        }
    }

    /// Walks the table again, updates the leaf's A (and D for stores)
    /// bits, and returns the physical address. The caller must have run
    /// [`MemoryAccessUnit::check_trap`] first.
    fn translate(
        &mut self,
        vaddr: u32,
        is_write: bool,
        csr: &CsrFile,
        bus: &mut Bus,
    ) -> Result<PhysAddr, EmuError> {
        if !Self::translation_enabled(csr) {
            return Ok(PhysAddr::new(u64::from(vaddr)));
        }

        let va = VirtAddr::new(vaddr);
        let root = u64::from(csr.satp() & SATP_PPN_MASK) * PAGE_SIZE;

        let l1_addr = PhysAddr::new(root + PTE_SIZE * u64::from(va.vpn1()));
        let l1 = PageTableEntry::new(bus.read_u32(l1_addr)?);

        if l1.is_leaf() {
            bus.write_u32(l1_addr, l1.with_accessed_dirty(is_write).value())?;
            return Ok(PhysAddr::new(
                u64::from(l1.ppn1()) * MEGAPAGE_SIZE + u64::from(va.megapage_offset()),
            ));
        }

        let l2_addr =
            PhysAddr::new(u64::from(l1.ppn()) * PAGE_SIZE + PTE_SIZE * u64::from(va.vpn0()));
        let l2 = PageTableEntry::new(bus.read_u32(l2_addr)?);

        bus.write_u32(l2_addr, l2.with_accessed_dirty(is_write).value())?;
        Ok(PhysAddr::new(
            u64::from(l2.ppn()) * PAGE_SIZE + u64::from(va.page_offset()),
        ))
    }

    // ── Access paths ──────────────────────────────────────────────

    /// Fetches one 32-bit instruction word; returns the word and the
    /// physical PC. Fetches do not record memory-access events.
    pub fn fetch(
        &mut self,
        vaddr: u32,
        csr: &CsrFile,
        bus: &mut Bus,
    ) -> Result<(u32, PhysAddr), EmuError> {
        let paddr = self.translate(vaddr, false, csr, bus)?;
        let insn = bus.read_u32(paddr)?;
        Ok((insn, paddr))
    }

    /// Loads a sized value, recording a memory-access event.
    pub fn load(
        &mut self,
        vaddr: u32,
        size: MemoryAccessSize,
        csr: &CsrFile,
        bus: &mut Bus,
    ) -> Result<u64, EmuError> {
        let paddr = self.translate(vaddr, false, csr, bus)?;
        let value = bus.read(paddr, size)?;
        self.events.push(MemoryAccessEvent {
            access_type: MemoryAccessType::Load,
            size,
            value,
            virtual_address: vaddr,
            physical_address: paddr,
        });
        Ok(value)
    }

    /// Stores a sized value, recording a memory-access event. A successful
    /// store to the reserved address invalidates the reservation.
    pub fn store(
        &mut self,
        vaddr: u32,
        size: MemoryAccessSize,
        value: u64,
        csr: &CsrFile,
        bus: &mut Bus,
    ) -> Result<(), EmuError> {
        let paddr = self.translate(vaddr, true, csr, bus)?;
        bus.write(paddr, size, value)?;
        if self.reservation == Some(vaddr) {
            self.reservation = None;
        }
        self.events.push(MemoryAccessEvent {
            access_type: MemoryAccessType::Store,
            size,
            value,
            virtual_address: vaddr,
            physical_address: paddr,
        });
        Ok(())
    }
}
