//! Pointer usage analysis.
//!
//! Without alias analysis, every dereference is a potential alias and
//! heavy pointer arithmetic is disqualifying outright. The thresholds are
//! not derived from any principle, so they are plain fields with the
//! historical defaults rather than constants.

use crate::analysis::loop_info::LoopInfo;
use log::trace;

/// Risk verdict for the pointer operations of one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerRisk {
    /// No pointer operations
    Safe,
    /// Dereferences that might alias
    PotentialAlias,
    /// Too much arithmetic or too many dereferences
    Unsafe,
}

/// The pointer analyzer.
#[derive(Debug, Clone)]
pub struct PointerAnalyzer {
    /// More arithmetic operations than this is unsafe
    pub arithmetic_threshold: usize,
    /// More dereferences than this is unsafe
    pub dereference_threshold: usize,
}

impl Default for PointerAnalyzer {
    fn default() -> Self {
        Self {
            arithmetic_threshold: 2,
            dereference_threshold: 3,
        }
    }
}

impl PointerAnalyzer {
    /// Create the analyzer with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the analyzer with explicit thresholds.
    pub fn with_thresholds(arithmetic: usize, dereferences: usize) -> Self {
        Self {
            arithmetic_threshold: arithmetic,
            dereference_threshold: dereferences,
        }
    }

    /// Log the recorded pointer operations of a loop.
    pub fn analyze(&self, loop_info: &LoopInfo) {
        for op in &loop_info.pointer_ops {
            trace!(
                "pointer '{}' at line {}: deref={}, addr={}, arith={}",
                op.pointer, op.line, op.is_dereference, op.is_address_of, op.is_arithmetic
            );
        }
    }

    /// Risk verdict over the recorded operations.
    pub fn verdict(&self, loop_info: &LoopInfo) -> PointerRisk {
        if loop_info.pointer_ops.is_empty() {
            return PointerRisk::Safe;
        }

        let arithmetic = loop_info
            .pointer_ops
            .iter()
            .filter(|op| op.is_arithmetic)
            .count();
        let dereferences = loop_info
            .pointer_ops
            .iter()
            .filter(|op| op.is_dereference)
            .count();

        if arithmetic > self.arithmetic_threshold || dereferences > self.dereference_threshold {
            return PointerRisk::Unsafe;
        }

        if dereferences > 0 {
            return PointerRisk::PotentialAlias;
        }

        PointerRisk::Safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::loop_info::{LoopId, LoopInfo, LoopKind, PointerOp};
    use crate::utils::location::Span;

    fn loop_with_ops(ops: Vec<(bool, bool, bool)>) -> LoopInfo {
        let mut info = LoopInfo::new(LoopId(0), LoopKind::Counted, Span::dummy(), 0, None);
        for (deref, addr, arith) in ops {
            info.add_pointer_op(PointerOp {
                pointer: "p".to_string(),
                span: Span::dummy(),
                line: 1,
                is_dereference: deref,
                is_address_of: addr,
                is_arithmetic: arith,
            });
        }
        info
    }

    #[test]
    fn test_no_ops_safe() {
        let analyzer = PointerAnalyzer::new();
        assert_eq!(analyzer.verdict(&loop_with_ops(vec![])), PointerRisk::Safe);
    }

    #[test]
    fn test_single_deref_potential_alias() {
        let analyzer = PointerAnalyzer::new();
        let info = loop_with_ops(vec![(true, false, false)]);
        assert_eq!(analyzer.verdict(&info), PointerRisk::PotentialAlias);
    }

    #[test]
    fn test_address_of_only_safe() {
        let analyzer = PointerAnalyzer::new();
        let info = loop_with_ops(vec![(false, true, false)]);
        assert_eq!(analyzer.verdict(&info), PointerRisk::Safe);
    }

    #[test]
    fn test_heavy_arithmetic_unsafe() {
        let analyzer = PointerAnalyzer::new();
        let info = loop_with_ops(vec![
            (false, false, true),
            (false, false, true),
            (false, false, true),
        ]);
        assert_eq!(analyzer.verdict(&info), PointerRisk::Unsafe);
    }

    #[test]
    fn test_many_dereferences_unsafe() {
        let analyzer = PointerAnalyzer::new();
        let info = loop_with_ops(vec![
            (true, false, false),
            (true, false, false),
            (true, false, false),
            (true, false, false),
        ]);
        assert_eq!(analyzer.verdict(&info), PointerRisk::Unsafe);
    }

    #[test]
    fn test_thresholds_configurable() {
        let analyzer = PointerAnalyzer::with_thresholds(0, 0);
        let info = loop_with_ops(vec![(false, false, true)]);
        assert_eq!(analyzer.verdict(&info), PointerRisk::Unsafe);
    }
}
