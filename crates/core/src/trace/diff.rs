//! Cycle comparator for the trace diff tool.
//!
//! Two conforming simulators must produce byte-identical records, so the
//! comparison is structural only to the extent of locating nodes: the PC
//! node (virtual, optionally physical), the integer registers, and — when
//! either side carries them — the CSR and memory snapshots are compared
//! bit for bit.

use super::node::NodeType;
use super::reader::CycleReader;
use super::TraceError;

/// Compares two cycle records.
#[derive(Clone, Copy, Debug)]
pub struct CycleComparator {
    check_physical_pc: bool,
}

impl CycleComparator {
    /// Creates a comparator; `check_physical_pc` additionally compares the
    /// physical halves of the PC node.
    pub fn new(check_physical_pc: bool) -> Self {
        Self { check_physical_pc }
    }

    /// Whether two records match.
    pub fn are_matched(
        &self,
        expect: &CycleReader<'_>,
        actual: &CycleReader<'_>,
    ) -> Result<bool, TraceError> {
        Ok(self.describe_diff(expect, actual)?.is_empty())
    }

    /// Human-readable differences between two records; empty when they
    /// match.
    pub fn describe_diff(
        &self,
        expect: &CycleReader<'_>,
        actual: &CycleReader<'_>,
    ) -> Result<Vec<String>, TraceError> {
        let mut diffs = Vec::new();

        match (expect.pc32().transpose()?, actual.pc32().transpose()?) {
            (Some(e), Some(a)) => {
                if e.virtual_pc != a.virtual_pc {
                    diffs.push(format!(
                        "virtual pc: expect {:#010x}, actual {:#010x}",
                        e.virtual_pc, a.virtual_pc
                    ));
                }
                if self.check_physical_pc && e.physical_pc != a.physical_pc {
                    diffs.push(format!(
                        "physical pc: expect {:#010x}, actual {:#010x}",
                        e.physical_pc, a.physical_pc
                    ));
                }
            }
            (e, a) => {
                if e.is_none() {
                    diffs.push("expect has no pc node".to_string());
                }
                if a.is_none() {
                    diffs.push("actual has no pc node".to_string());
                }
            }
        }

        match (
            expect.int_reg32().transpose()?,
            actual.int_reg32().transpose()?,
        ) {
            (Some(e), Some(a)) => {
                for (index, (ev, av)) in e.regs.iter().zip(a.regs.iter()).enumerate() {
                    if ev != av {
                        diffs.push(format!(
                            "x{index}: expect {ev:#010x}, actual {av:#010x}"
                        ));
                    }
                }
            }
            (e, a) => {
                if e.is_none() {
                    diffs.push("expect has no int-reg node".to_string());
                }
                if a.is_none() {
                    diffs.push("actual has no int-reg node".to_string());
                }
            }
        }

        Self::compare_raw(expect, actual, NodeType::Csr32, "csr", &mut diffs);
        Self::compare_raw(expect, actual, NodeType::Memory, "memory", &mut diffs);

        Ok(diffs)
    }

    /// Bit-compares one optional node; both sides absent is a match.
    fn compare_raw(
        expect: &CycleReader<'_>,
        actual: &CycleReader<'_>,
        node_type: NodeType,
        label: &str,
        diffs: &mut Vec<String>,
    ) {
        match (expect.node(node_type, 0), actual.node(node_type, 0)) {
            (None, None) => {}
            (Some(e), Some(a)) => {
                if e.len() != a.len() {
                    diffs.push(format!(
                        "{label} node size: expect {}, actual {}",
                        e.len(),
                        a.len()
                    ));
                } else if let Some(offset) = e.iter().zip(a.iter()).position(|(x, y)| x != y) {
                    diffs.push(format!("{label} node differs at byte {offset}"));
                }
            }
            (Some(_), None) => diffs.push(format!("actual has no {label} node")),
            (None, Some(_)) => diffs.push(format!("expect has no {label} node")),
        }
    }
}
