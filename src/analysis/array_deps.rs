//! Array dependency analysis: pairwise subscript comparison within a loop.
//!
//! For every unordered pair of accesses to the same array where at least
//! one side writes, the subscripts are destructured against the loop's
//! induction variable. Anything that cannot be proven independent is a
//! hazard; parse failures land in `Unknown`, which is an ordinary value
//! here, not an exception.

use crate::analysis::cross_iteration::induction_offset;
use crate::analysis::loop_info::{ArrayAccess, LoopInfo};
use log::trace;

/// How two subscripts of the same array relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayDependencyKind {
    /// Provably different cells
    NoDependency,
    /// Same cell in the same iteration
    SameIndex,
    /// Both are `induction ± constant`; loop-carried when offsets differ
    ConstantOffset,
    /// Could not be classified; treated as a hazard
    Unknown,
}

/// One detected dependency between two accesses.
#[derive(Debug, Clone)]
pub struct ArrayDependency {
    /// The array both accesses touch
    pub array: String,
    /// Relation between the subscripts
    pub kind: ArrayDependencyKind,
    /// Line of the first access
    pub first_line: usize,
    /// Line of the second access
    pub second_line: usize,
    /// Rendered first subscript
    pub first_index: String,
    /// Rendered second subscript
    pub second_index: String,
}

/// The array dependency analyzer.
#[derive(Debug, Default)]
pub struct ArrayDependencyAnalyzer;

impl ArrayDependencyAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Compare all same-array access pairs of a loop.
    pub fn analyze(&self, loop_info: &LoopInfo) -> Vec<ArrayDependency> {
        let mut dependencies = Vec::new();
        let induction = loop_info.bounds.induction_var.as_deref();
        let accesses = &loop_info.array_accesses;

        for i in 0..accesses.len() {
            for j in (i + 1)..accesses.len() {
                let first = &accesses[i];
                let second = &accesses[j];

                if first.array != second.array {
                    continue;
                }
                // Two reads can never conflict.
                if !first.is_write && !second.is_write {
                    continue;
                }

                let kind = compare_indices(first, second, induction);
                if kind != ArrayDependencyKind::NoDependency {
                    trace!(
                        "array dependency: {}[{}] vs [{}] -> {:?}",
                        first.array, first.subscript, second.subscript, kind
                    );
                    dependencies.push(ArrayDependency {
                        array: first.array.clone(),
                        kind,
                        first_line: first.line,
                        second_line: second.line,
                        first_index: first.subscript.to_string(),
                        second_index: second.subscript.to_string(),
                    });
                }
            }
        }

        dependencies
    }

    /// Whether any pair classified as a hazard.
    pub fn has_hazards(&self, loop_info: &LoopInfo) -> bool {
        !self.analyze(loop_info).is_empty()
    }
}

/// Classify one access pair against the induction variable.
fn compare_indices(
    first: &ArrayAccess,
    second: &ArrayAccess,
    induction: Option<&str>,
) -> ArrayDependencyKind {
    let idx1 = first.subscript.strip_parens();
    let idx2 = second.subscript.strip_parens();

    if let Some(var) = induction {
        let off1 = induction_offset(idx1, var);
        let off2 = induction_offset(idx2, var);
        match (off1, off2) {
            (Some(0), Some(0)) => return ArrayDependencyKind::SameIndex,
            (Some(_), Some(_)) => return ArrayDependencyKind::ConstantOffset,
            (Some(_), None) | (None, Some(_)) => return ArrayDependencyKind::Unknown,
            (None, None) => {}
        }
    }

    // Neither subscript involves the induction variable (or there is no
    // induction variable to involve).
    if let (Some(a), Some(b)) = (idx1.as_int_literal(), idx2.as_int_literal()) {
        if a == b {
            // The same cell every iteration, with a write in the pair.
            return ArrayDependencyKind::SameIndex;
        }
        return ArrayDependencyKind::NoDependency;
    }

    if idx1.to_string() == idx2.to_string() {
        // Textually the same cell; still a conflict because one side writes.
        return ArrayDependencyKind::SameIndex;
    }

    ArrayDependencyKind::Unknown
}
