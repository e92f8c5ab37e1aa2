//! Trace dumper: turns the system's per-cycle events into cycle records.
//!
//! One record is written per retired cycle (cycles that retired nothing,
//! e.g. WFI sleep, are skipped). The record always carries the basic-info
//! and PC nodes plus a trap node when one was recorded and one
//! memory-access node per recorded access; register, CSR, memory, and
//! host-IO nodes are behind their enable flags.

use std::path::Path;

use crate::config::DumpConfig;
use crate::core::events::TrapKind;
use crate::sim::system::System;

use super::builder::CycleBuilder;
use super::config::CycleConfig;
use super::node::{
    encode_csr32, BasicInfoNode, IntReg32Node, IoNode, MemoryAccess32Node, NodeType, Pc32Node,
    Reg64Node, Trap32Node,
};
use super::writer::TraceFileWriter;
use super::TraceError;

/// Writes one cycle record per retired cycle.
#[derive(Debug)]
pub struct TraceDumper {
    writer: TraceFileWriter,
    dump_csr: bool,
    dump_memory: bool,
    dump_fp_reg: bool,
    dump_int_reg: bool,
    dump_host_io: bool,
}

impl TraceDumper {
    /// Creates the trace file and records the enable flags.
    pub fn new(path: &Path, config: &DumpConfig) -> Result<Self, TraceError> {
        Ok(Self {
            writer: TraceFileWriter::create(path)?,
            dump_csr: config.csr,
            dump_memory: config.memory,
            dump_fp_reg: config.fp_reg,
            dump_int_reg: config.int_reg,
            dump_host_io: config.host_io,
        })
    }

    /// Appends the record for the cycle that just executed; no-op when the
    /// cycle retired nothing.
    pub fn dump_cycle(&mut self, cycle: u32, system: &System) -> Result<(), TraceError> {
        let processor = system.processor();
        let Some(op) = processor.op_event() else {
            return Ok(());
        };
        let trap = processor.trap_event();
        let accesses = processor.memory_access_events();

        let mut config = CycleConfig::new();
        config.set_node_count(NodeType::BasicInfo, 1);
        config.set_node_count(NodeType::Pc32, 1);
        if trap.is_some() {
            config.set_node_count(NodeType::Trap32, 1);
        }
        config.set_node_count(NodeType::MemoryAccess32, accesses.len() as u32);
        if self.dump_int_reg {
            config.set_node_count(NodeType::IntReg32, 1);
        }
        if self.dump_fp_reg {
            config.set_node_count(NodeType::FpReg, 1);
        }
        if self.dump_csr {
            config.set_node_count(NodeType::Csr32, 1);
            config.set_csr_count(processor.csr_count());
        }
        if self.dump_memory {
            config.set_node_count(NodeType::Memory, 1);
            config.set_ram_size(system.ram_bytes().len());
        }
        if self.dump_host_io {
            config.set_node_count(NodeType::Io, 1);
        }

        let mut builder = CycleBuilder::new(&config);

        builder.set_node(
            NodeType::BasicInfo,
            &BasicInfoNode {
                cycle,
                op_id: op.op_id,
                insn: op.insn,
                privilege: op.privilege.to_bits(),
            }
            .encode(),
        )?;

        builder.set_node(
            NodeType::Pc32,
            &Pc32Node {
                virtual_pc: op.virtual_pc,
                physical_pc: op.physical_pc.val() as u32,
            }
            .encode(),
        )?;

        if let Some(trap) = trap {
            builder.set_node(
                NodeType::Trap32,
                &Trap32Node {
                    trap_type: trap.kind as u8,
                    from: trap.from.to_bits(),
                    to: trap.to.to_bits(),
                    cause: trap.cause as u8,
                    trap_value: trap.value,
                }
                .encode(),
            )?;
            debug_assert!(matches!(
                trap.kind,
                TrapKind::Interrupt | TrapKind::Exception | TrapKind::Return
            ));
        }

        for (index, access) in accesses.iter().enumerate() {
            builder.set_node_at(
                NodeType::MemoryAccess32,
                index,
                &MemoryAccess32Node {
                    virtual_address: access.virtual_address,
                    physical_address: access.physical_address.val() as u32,
                    value: access.value as u32,
                    access_type: access.access_type as u8,
                    access_size: access.size as u8,
                }
                .encode(),
            )?;
        }

        if self.dump_int_reg {
            builder.set_node(
                NodeType::IntReg32,
                &IntReg32Node {
                    regs: processor.int_regs(),
                }
                .encode(),
            )?;
        }

        if self.dump_fp_reg {
            builder.set_node(
                NodeType::FpReg,
                &Reg64Node {
                    regs: processor.fp_regs(),
                }
                .encode(),
            )?;
        }

        if self.dump_csr {
            builder.set_node(NodeType::Csr32, &encode_csr32(&processor.csr_snapshot()))?;
        }

        if self.dump_memory {
            builder.set_node(NodeType::Memory, system.ram_bytes())?;
        }

        if self.dump_host_io {
            builder.set_node(
                NodeType::Io,
                &IoNode {
                    host_io_value: system.host_io_value(),
                }
                .encode(),
            )?;
        }

        self.writer.write_cycle(builder.into_bytes())
    }

    /// Flushes the trace file, terminating the record chain.
    pub fn finish(&mut self) -> Result<(), TraceError> {
        self.writer.finish()
    }
}
