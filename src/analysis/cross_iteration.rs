//! Cross-iteration conflict analysis.
//!
//! Expresses each subscript of an array as `induction + k` and classifies
//! access pairs by their offsets: equal offsets conflict across iterations
//! according to the read/write kinds, offsets one stride apart are flagged
//! conservatively, and indices that do not fit the form at all are stride
//! conflicts (the conservative unknown).

use crate::analysis::loop_info::{ArrayAccess, LoopInfo};
use crate::frontend::ast::{BinaryOp, Expr, ExprKind};
use log::trace;
use std::collections::BTreeMap;

/// How two accesses conflict across iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationConflictKind {
    /// A later iteration reads what an earlier one wrote
    ReadAfterWrite,
    /// A later iteration writes what an earlier one read
    WriteAfterRead,
    /// Two iterations write the same cell
    WriteAfterWrite,
    /// Indices do not fit the `induction + k` form
    Stride,
}

/// One detected cross-iteration conflict.
#[derive(Debug, Clone)]
pub struct CrossIterationConflict {
    /// The array involved
    pub array: String,
    /// Conflict classification
    pub kind: IterationConflictKind,
    /// Rendered index pattern, e.g. `i vs i-1`
    pub pattern: String,
    /// Line of the first access
    pub first_line: usize,
    /// Line of the second access
    pub second_line: usize,
    /// Human-readable description
    pub description: String,
}

/// Try to express a subscript as `induction + k`; bare `induction` is
/// offset 0. Returns `None` for anything else.
pub fn induction_offset(index: &Expr, induction: &str) -> Option<i64> {
    let index = index.strip_parens();

    if index.as_ident() == Some(induction) {
        return Some(0);
    }

    if let ExprKind::Binary { op, left, right } = &index.kind {
        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                // induction op constant
                if left.as_ident() == Some(induction) {
                    if let Some(constant) = right.as_int_literal() {
                        return Some(if *op == BinaryOp::Add { constant } else { -constant });
                    }
                }
                // constant + induction (subtraction would flip the sign of
                // the variable, which is not an offset form)
                if *op == BinaryOp::Add && right.as_ident() == Some(induction) {
                    if let Some(constant) = left.as_int_literal() {
                        return Some(constant);
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// The cross-iteration analyzer. The stride is taken as 1.
#[derive(Debug)]
pub struct CrossIterationAnalyzer {
    stride: i64,
}

impl Default for CrossIterationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossIterationAnalyzer {
    /// Create the analyzer with unit stride.
    pub fn new() -> Self {
        Self { stride: 1 }
    }

    /// Classify all same-array access pairs across iterations.
    pub fn analyze(&self, loop_info: &LoopInfo) -> Vec<CrossIterationConflict> {
        let mut conflicts = Vec::new();

        // Group accesses per array; BTreeMap keeps the output deterministic.
        let mut arrays: BTreeMap<&str, Vec<&ArrayAccess>> = BTreeMap::new();
        for access in &loop_info.array_accesses {
            arrays.entry(&access.array).or_default().push(access);
        }

        let induction = loop_info.bounds.induction_var.as_deref();

        for (array, accesses) in arrays {
            if accesses.len() < 2 {
                continue;
            }
            self.analyze_access_pattern(array, &accesses, induction, &mut conflicts);
        }

        conflicts
    }

    /// Whether any conflict exists.
    pub fn has_conflicts(&self, loop_info: &LoopInfo) -> bool {
        !self.analyze(loop_info).is_empty()
    }

    fn analyze_access_pattern(
        &self,
        array: &str,
        accesses: &[&ArrayAccess],
        induction: Option<&str>,
        conflicts: &mut Vec<CrossIterationConflict>,
    ) {
        for i in 0..accesses.len() {
            for j in (i + 1)..accesses.len() {
                let first = accesses[i];
                let second = accesses[j];

                if !first.is_write && !second.is_write {
                    continue;
                }

                let offsets = induction.and_then(|var| {
                    let off1 = induction_offset(&first.subscript, var)?;
                    let off2 = induction_offset(&second.subscript, var)?;
                    Some((var, off1, off2))
                });

                match offsets {
                    Some((var, off1, off2)) => {
                        if let Some(kind) = self.classify(first, second, off1, off2) {
                            let pattern =
                                format!("{} vs {}", render_offset(var, off1), render_offset(var, off2));
                            let description = describe_conflict(kind, array, &pattern);
                            trace!("cross-iteration conflict: {}", description);
                            conflicts.push(CrossIterationConflict {
                                array: array.to_string(),
                                kind,
                                pattern,
                                first_line: first.line,
                                second_line: second.line,
                                description,
                            });
                        }
                    }
                    None => {
                        // One or both indices are not induction + k; be
                        // conservative.
                        let pattern = format!("{} vs {}", first.subscript, second.subscript);
                        let description =
                            describe_conflict(IterationConflictKind::Stride, array, &pattern);
                        trace!("complex index pattern, assuming unsafe: {}", description);
                        conflicts.push(CrossIterationConflict {
                            array: array.to_string(),
                            kind: IterationConflictKind::Stride,
                            pattern,
                            first_line: first.line,
                            second_line: second.line,
                            description,
                        });
                    }
                }
            }
        }
    }

    fn classify(
        &self,
        first: &ArrayAccess,
        second: &ArrayAccess,
        off1: i64,
        off2: i64,
    ) -> Option<IterationConflictKind> {
        if off1 == off2 {
            if first.is_write && second.is_write {
                return Some(IterationConflictKind::WriteAfterWrite);
            }
            // One write, one read: direction follows textual order.
            let (earlier, _later) = if first.line <= second.line {
                (first, second)
            } else {
                (second, first)
            };
            return Some(if earlier.is_write {
                IterationConflictKind::ReadAfterWrite
            } else {
                IterationConflictKind::WriteAfterRead
            });
        }

        if (off1 - off2).abs() == self.stride {
            // Adjacent iterations touch related cells.
            return Some(IterationConflictKind::WriteAfterRead);
        }

        None
    }
}

fn render_offset(induction: &str, offset: i64) -> String {
    match offset {
        0 => induction.to_string(),
        o if o > 0 => format!("{}+{}", induction, o),
        o => format!("{}{}", induction, o),
    }
}

fn describe_conflict(kind: IterationConflictKind, array: &str, pattern: &str) -> String {
    let what = match kind {
        IterationConflictKind::ReadAfterWrite => "read after write conflict",
        IterationConflictKind::WriteAfterRead => "write after read conflict",
        IterationConflictKind::WriteAfterWrite => "write after write conflict",
        IterationConflictKind::Stride => "stride/indexing conflict",
    };
    format!("{}[{}] - {}", array, pattern, what)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::loop_info::{LoopId, LoopInfo, LoopKind};
    use crate::utils::location::Span;

    fn var(name: &str) -> Expr {
        Expr::ident(name, Span::dummy())
    }

    fn offset_expr(name: &str, op: BinaryOp, constant: i64) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(var(name)),
                right: Box::new(Expr::int_lit(constant, Span::dummy())),
            },
            Span::dummy(),
        )
    }

    fn loop_with(induction: Option<&str>, accesses: Vec<ArrayAccess>) -> LoopInfo {
        let mut info = LoopInfo::new(LoopId(0), LoopKind::Counted, Span::dummy(), 0, None);
        info.bounds.induction_var = induction.map(str::to_string);
        for access in accesses {
            info.add_array_access(access);
        }
        info
    }

    fn access_at(array: &str, subscript: Expr, write: bool, line: usize) -> ArrayAccess {
        let span = Span::new(line, 1, line, 10);
        ArrayAccess::new(array, subscript, span, write)
    }

    #[test]
    fn test_offset_extraction() {
        assert_eq!(induction_offset(&var("i"), "i"), Some(0));
        assert_eq!(induction_offset(&offset_expr("i", BinaryOp::Add, 2), "i"), Some(2));
        assert_eq!(induction_offset(&offset_expr("i", BinaryOp::Sub, 1), "i"), Some(-1));
        assert_eq!(induction_offset(&var("j"), "i"), None);
        assert_eq!(
            induction_offset(&offset_expr("i", BinaryOp::Mul, 2), "i"),
            None
        );
        // constant + induction also counts
        let flipped = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::int_lit(3, Span::dummy())),
                right: Box::new(var("i")),
            },
            Span::dummy(),
        );
        assert_eq!(induction_offset(&flipped, "i"), Some(3));
    }

    #[test]
    fn test_recurrence_is_conflict() {
        // A[i] = A[i-1] + 2
        let analyzer = CrossIterationAnalyzer::new();
        let info = loop_with(
            Some("i"),
            vec![
                access_at("A", var("i"), true, 3),
                access_at("A", offset_expr("i", BinaryOp::Sub, 1), false, 3),
            ],
        );
        let conflicts = analyzer.analyze(&info);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, IterationConflictKind::WriteAfterRead);
        assert!(analyzer.has_conflicts(&info));
    }

    #[test]
    fn test_same_offset_write_write() {
        let analyzer = CrossIterationAnalyzer::new();
        let info = loop_with(
            Some("i"),
            vec![
                access_at("A", var("i"), true, 3),
                access_at("A", var("i"), true, 4),
            ],
        );
        let conflicts = analyzer.analyze(&info);
        assert_eq!(conflicts[0].kind, IterationConflictKind::WriteAfterWrite);
    }

    #[test]
    fn test_same_offset_write_then_read_is_raw() {
        let analyzer = CrossIterationAnalyzer::new();
        let info = loop_with(
            Some("i"),
            vec![
                access_at("A", var("i"), true, 3),
                access_at("A", var("i"), false, 5),
            ],
        );
        assert_eq!(
            analyzer.analyze(&info)[0].kind,
            IterationConflictKind::ReadAfterWrite
        );
    }

    #[test]
    fn test_same_offset_read_then_write_is_war() {
        let analyzer = CrossIterationAnalyzer::new();
        let info = loop_with(
            Some("i"),
            vec![
                access_at("A", var("i"), false, 3),
                access_at("A", var("i"), true, 5),
            ],
        );
        assert_eq!(
            analyzer.analyze(&info)[0].kind,
            IterationConflictKind::WriteAfterRead
        );
    }

    #[test]
    fn test_complex_index_is_stride_conflict() {
        let analyzer = CrossIterationAnalyzer::new();
        let weird = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Mul,
                left: Box::new(var("i")),
                right: Box::new(Expr::int_lit(2, Span::dummy())),
            },
            Span::dummy(),
        );
        let info = loop_with(
            Some("i"),
            vec![
                access_at("A", weird, true, 3),
                access_at("A", var("i"), false, 4),
            ],
        );
        assert_eq!(analyzer.analyze(&info)[0].kind, IterationConflictKind::Stride);
    }

    #[test]
    fn test_no_induction_is_stride_conflict() {
        let analyzer = CrossIterationAnalyzer::new();
        let info = loop_with(
            None,
            vec![
                access_at("A", var("i"), true, 3),
                access_at("A", var("i"), false, 4),
            ],
        );
        assert_eq!(analyzer.analyze(&info)[0].kind, IterationConflictKind::Stride);
    }

    #[test]
    fn test_read_only_accesses_ignored() {
        let analyzer = CrossIterationAnalyzer::new();
        let info = loop_with(
            Some("i"),
            vec![
                access_at("A", var("i"), false, 3),
                access_at("A", offset_expr("i", BinaryOp::Sub, 1), false, 4),
            ],
        );
        assert!(!analyzer.has_conflicts(&info));
    }

    #[test]
    fn test_single_access_per_array_ignored() {
        let analyzer = CrossIterationAnalyzer::new();
        let info = loop_with(
            Some("i"),
            vec![
                access_at("C", var("i"), true, 3),
                access_at("A", var("i"), false, 3),
            ],
        );
        assert!(!analyzer.has_conflicts(&info));
    }
}
