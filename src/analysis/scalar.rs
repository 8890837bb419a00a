//! Scalar dependency analysis.
//!
//! Classifies every non-induction variable of a loop: read-only and
//! write-only variables are safe, loop-locals that are read and written
//! become private-clause candidates, and anything else that is both read
//! and written carries its value across iterations and is a hazard.

use crate::analysis::loop_info::{LoopInfo, VariableScope};
use log::trace;

/// The scalar analyzer.
#[derive(Debug, Default)]
pub struct ScalarAnalyzer;

impl ScalarAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Collect the scalar hazards of a loop, one message per variable.
    pub fn hazards(&self, loop_info: &LoopInfo) -> Vec<String> {
        let mut hazards = Vec::new();

        for var in &loop_info.variables {
            if var.is_induction() {
                trace!("{}: induction variable (safe)", var.name);
                continue;
            }

            if var.has_reads() && var.has_writes() {
                if var.scope == VariableScope::LoopLocal {
                    trace!("{}: loop-local read+write (private candidate)", var.name);
                } else {
                    trace!("{}: read+write dependency (unsafe)", var.name);
                    hazards.push(format!(
                        "Scalar variable '{}' has read-after-write dependency",
                        var.name
                    ));
                }
            } else if var.has_writes() {
                trace!("{}: write-only (safe)", var.name);
            } else {
                trace!("{}: read-only (safe)", var.name);
            }
        }

        hazards
    }

    /// Whether any scalar hazard exists.
    pub fn has_hazards(&self, loop_info: &LoopInfo) -> bool {
        loop_info.variables.iter().any(|var| {
            var.is_potential_dependency() && var.scope != VariableScope::LoopLocal
        })
    }
}
