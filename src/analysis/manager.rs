//! The dependency manager: runs every analyzer on a loop and fuses their
//! verdicts into one parallelizable-or-not decision.
//!
//! The fusion rule is a conjunction: no scalar hazard, no array hazard (in
//! either the pairwise or the cross-iteration view), pointer verdict safe,
//! and no call with side effects. On top of that a loop inherits unsafety
//! from any descendant whose calls have side effects, so an outer loop is
//! never annotated around a body that transitively performs I/O.
//!
//! Soundness over completeness: nothing in here can promote a loop to
//! parallelizable while a hazard stands, and a loop that cannot be
//! analyzed is marked unsafe, never skipped.

use crate::analysis::array_deps::ArrayDependencyAnalyzer;
use crate::analysis::calls::{CallAnalyzer, CallSafety};
use crate::analysis::cross_iteration::CrossIterationAnalyzer;
use crate::analysis::loop_info::{LoopId, LoopInfo, Verdict};
use crate::analysis::pointer::{PointerAnalyzer, PointerRisk};
use crate::analysis::scalar::ScalarAnalyzer;
use log::debug;

/// Composes the five analyzers.
#[derive(Debug, Default)]
pub struct DependencyManager {
    scalar: ScalarAnalyzer,
    arrays: ArrayDependencyAnalyzer,
    cross_iteration: CrossIterationAnalyzer,
    pointers: PointerAnalyzer,
    calls: CallAnalyzer,
}

impl DependencyManager {
    /// Create a manager with default analyzers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager with a specific pointer analyzer (thresholds).
    pub fn with_pointer_analyzer(pointers: PointerAnalyzer) -> Self {
        Self {
            pointers,
            ..Self::default()
        }
    }

    /// Analyze the loop at `id` and settle its verdict.
    ///
    /// All descendants of `id` must already be finalized; the visitor
    /// guarantees this by closing loops innermost-first. A fault inside
    /// any analyzer is contained here and downgrades the loop to
    /// non-parallelizable rather than dropping it.
    pub fn analyze(&self, loops: &mut [LoopInfo], id: LoopId) {
        debug!("dependency analysis for loop at line {}", loops[id.0].line);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.collect_hazards(&*loops, id)
        }));
        let (parallelizable, warnings) = outcome.unwrap_or_else(|_| {
            (
                false,
                vec!["Analysis failed - assuming unsafe".to_string()],
            )
        });

        let loop_info = &mut loops[id.0];
        loop_info.verdict = if parallelizable {
            Verdict::Parallelizable
        } else {
            Verdict::NotParallelizable
        };
        for warning in warnings {
            debug!("  blocking: {}", warning);
            loop_info.add_warning(warning);
        }
    }

    /// Run every analyzer on the loop; read-only.
    fn collect_hazards(&self, loops: &[LoopInfo], id: LoopId) -> (bool, Vec<String>) {
        let mut warnings = Vec::new();
        let mut parallelizable = true;

        let loop_info = &loops[id.0];

        // Scalar variables.
        let scalar_hazards = self.scalar.hazards(loop_info);
        if !scalar_hazards.is_empty() {
            parallelizable = false;
            warnings.extend(scalar_hazards);
        }

        // Array subscript pairs, then iteration offsets.
        let array_deps = self.arrays.analyze(loop_info);
        let cross_conflicts = self.cross_iteration.analyze(loop_info);
        if !array_deps.is_empty() || !cross_conflicts.is_empty() {
            parallelizable = false;
            warnings.push("Array access conflicts detected".to_string());
            for conflict in &cross_conflicts {
                warnings.push(conflict.description.clone());
            }
        }

        // Pointers.
        self.pointers.analyze(loop_info);
        match self.pointers.verdict(loop_info) {
            PointerRisk::Safe => {}
            PointerRisk::PotentialAlias => {
                parallelizable = false;
                warnings.push("Potential pointer aliasing detected".to_string());
            }
            PointerRisk::Unsafe => {
                parallelizable = false;
                warnings.push("Complex pointer operations detected".to_string());
            }
        }

        // Calls.
        self.calls.analyze(loop_info);
        if self.calls.verdict(loop_info) == CallSafety::Unsafe {
            parallelizable = false;
            warnings.push("Function calls with side effects detected".to_string());
        }

        // Transitive call safety: a descendant doing I/O poisons this loop.
        if let Some(line) = self.descendant_with_unsafe_calls(loops, id) {
            parallelizable = false;
            warnings.push(format!(
                "Nested loop at line {} performs calls with side effects",
                line
            ));
        }

        (parallelizable, warnings)
    }

    /// Line of the first descendant loop with side-effecting calls.
    fn descendant_with_unsafe_calls(&self, loops: &[LoopInfo], id: LoopId) -> Option<usize> {
        let mut pending: Vec<LoopId> = loops[id.0].children.clone();
        while let Some(child) = pending.pop() {
            let info = &loops[child.0];
            if info.has_unsafe_calls() {
                return Some(info.line);
            }
            pending.extend(info.children.iter().copied());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::calls::classify_call;
    use crate::analysis::loop_info::*;
    use crate::frontend::ast::Expr;
    use crate::utils::location::Span;

    fn fresh_loop(id: usize, depth: usize, parent: Option<usize>) -> LoopInfo {
        LoopInfo::new(
            LoopId(id),
            LoopKind::Counted,
            Span::dummy(),
            depth,
            parent.map(LoopId),
        )
    }

    #[test]
    fn test_clean_loop_parallelizable() {
        let manager = DependencyManager::new();
        let mut info = fresh_loop(0, 0, None);
        info.bounds.induction_var = Some("i".to_string());
        let mut loops = vec![info];
        manager.analyze(&mut loops, LoopId(0));
        assert_eq!(loops[0].verdict, Verdict::Parallelizable);
        assert!(loops[0].warnings.is_empty());
    }

    #[test]
    fn test_scalar_hazard_blocks() {
        let manager = DependencyManager::new();
        let mut info = fresh_loop(0, 0, None);
        let mut sum = VariableInfo::new("sum", Span::dummy(), VariableScope::FunctionLocal);
        sum.add_usage(VariableUsage::new(Span::dummy(), true, false));
        sum.add_usage(VariableUsage::new(Span::dummy(), false, true));
        info.add_variable(sum);
        let mut loops = vec![info];
        manager.analyze(&mut loops, LoopId(0));
        assert_eq!(loops[0].verdict, Verdict::NotParallelizable);
        assert!(!loops[0].warnings.is_empty());
    }

    #[test]
    fn test_array_conflict_blocks() {
        let manager = DependencyManager::new();
        let mut info = fresh_loop(0, 0, None);
        info.bounds.induction_var = Some("i".to_string());
        info.add_array_access(ArrayAccess::new(
            "A",
            Expr::ident("i", Span::dummy()),
            Span::dummy(),
            true,
        ));
        info.add_array_access(ArrayAccess::new(
            "A",
            Expr::ident("i", Span::dummy()),
            Span::dummy(),
            false,
        ));
        let mut loops = vec![info];
        manager.analyze(&mut loops, LoopId(0));
        assert_eq!(loops[0].verdict, Verdict::NotParallelizable);
    }

    #[test]
    fn test_pointer_alias_blocks() {
        let manager = DependencyManager::new();
        let mut info = fresh_loop(0, 0, None);
        info.add_pointer_op(PointerOp {
            pointer: "p".to_string(),
            span: Span::dummy(),
            line: 2,
            is_dereference: true,
            is_address_of: false,
            is_arithmetic: false,
        });
        let mut loops = vec![info];
        manager.analyze(&mut loops, LoopId(0));
        assert_eq!(loops[0].verdict, Verdict::NotParallelizable);
    }

    #[test]
    fn test_math_calls_do_not_block() {
        let manager = DependencyManager::new();
        let mut info = fresh_loop(0, 0, None);
        info.add_call(classify_call("sqrt", 2));
        let mut loops = vec![info];
        manager.analyze(&mut loops, LoopId(0));
        assert_eq!(loops[0].verdict, Verdict::Parallelizable);
    }

    #[test]
    fn test_unsafe_call_blocks() {
        let manager = DependencyManager::new();
        let mut info = fresh_loop(0, 0, None);
        info.add_call(classify_call("printf", 2));
        let mut loops = vec![info];
        manager.analyze(&mut loops, LoopId(0));
        assert_eq!(loops[0].verdict, Verdict::NotParallelizable);
    }

    #[test]
    fn test_transitive_call_unsafety() {
        let manager = DependencyManager::new();
        let mut outer = fresh_loop(0, 0, None);
        outer.children.push(LoopId(1));
        let mut inner = fresh_loop(1, 1, Some(0));
        inner.parent = Some(LoopId(0));
        inner.add_call(classify_call("printf", 5));

        let mut loops = vec![outer, inner];
        // Children settle first, as the visitor does it.
        manager.analyze(&mut loops, LoopId(1));
        manager.analyze(&mut loops, LoopId(0));

        assert_eq!(loops[1].verdict, Verdict::NotParallelizable);
        assert_eq!(loops[0].verdict, Verdict::NotParallelizable);
        assert!(loops[0]
            .warnings
            .iter()
            .any(|w| w.contains("Nested loop")));
    }

    #[test]
    fn test_inner_scalar_hazard_not_inherited() {
        // The transitive rule covers calls only; an inner scalar hazard
        // stays with the inner loop.
        let manager = DependencyManager::new();
        let mut outer = fresh_loop(0, 0, None);
        outer.children.push(LoopId(1));
        let mut inner = fresh_loop(1, 1, Some(0));
        let mut t = VariableInfo::new("t", Span::dummy(), VariableScope::FunctionLocal);
        t.add_usage(VariableUsage::new(Span::dummy(), true, true));
        inner.add_variable(t);

        let mut loops = vec![outer, inner];
        manager.analyze(&mut loops, LoopId(1));
        manager.analyze(&mut loops, LoopId(0));

        assert_eq!(loops[1].verdict, Verdict::NotParallelizable);
        assert_eq!(loops[0].verdict, Verdict::Parallelizable);
    }
}
