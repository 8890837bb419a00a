//! The analysis driver: runs the visitor over a translation unit, then
//! turns every parallelizable loop into a directive, a confidence score
//! and an insertion point.
//!
//! Verdicts are settled during traversal (innermost loops first); the
//! generation phase only reads finalized records.

use crate::analysis::loop_info::LoopInfo;
use crate::analysis::manager::DependencyManager;
use crate::analysis::pointer::PointerAnalyzer;
use crate::analysis::visitor::LoopVisitor;
use crate::frontend::ast::TranslationUnit;
use crate::pragma::{GeneratedPragma, InsertionPlanner, InsertionPoint, PragmaGenerator};
use crate::AnalyzerConfig;
use log::{debug, info};
use serde::{Serialize, Deserialize};

/// A directive together with the place it goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedPragma {
    /// The generated directive
    pub pragma: GeneratedPragma,
    /// Where the annotator inserts it
    pub insertion: InsertionPoint,
}

/// The result of analyzing one translation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Every loop found, in discovery order
    pub loops: Vec<LoopInfo>,
    /// One entry per parallelizable loop that earned a directive
    pub pragmas: Vec<PlannedPragma>,
    /// Loops that earned a directive but could not be mapped to a line
    pub skipped: Vec<String>,
}

impl AnalysisReport {
    /// Number of loops with a parallelizable verdict.
    pub fn parallelizable_count(&self) -> usize {
        self.loops.iter().filter(|l| l.is_parallelizable()).count()
    }
}

/// Analyze a parsed translation unit.
pub fn analyze_unit(unit: &TranslationUnit, config: &AnalyzerConfig) -> AnalysisReport {
    let pointers = PointerAnalyzer::with_thresholds(
        config.pointer_arithmetic_threshold,
        config.pointer_dereference_threshold,
    );
    let manager = DependencyManager::with_pointer_analyzer(pointers);

    let mut visitor = LoopVisitor::with_manager(manager);
    visitor.declare_globals(unit);
    for func in &unit.functions {
        visitor.visit_function(func);
    }
    let loops = visitor.into_loops();
    info!(
        "analyzed {} function(s), found {} loop(s)",
        unit.functions.len(),
        loops.len()
    );

    let generator = PragmaGenerator::new();
    let planner = InsertionPlanner::new();
    let mut pragmas = Vec::new();
    let mut skipped = Vec::new();

    for loop_info in &loops {
        if !loop_info.is_parallelizable() {
            continue;
        }
        let Some(pragma) = generator.generate(loop_info) else {
            debug!("no directive for inner loop at line {}", loop_info.line);
            continue;
        };
        match planner.plan(loop_info) {
            Ok(insertion) => pragmas.push(PlannedPragma { pragma, insertion }),
            Err(reason) => {
                skipped.push(format!("loop at line {}: {}", loop_info.line, reason));
            }
        }
    }

    AnalysisReport {
        loops,
        pragmas,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::loop_info::Verdict;
    use crate::frontend;
    use crate::pragma::PragmaKind;

    fn analyze(source: &str) -> AnalysisReport {
        let unit = frontend::parse(source).unwrap();
        analyze_unit(&unit, &AnalyzerConfig::default())
    }

    #[test]
    fn test_elementwise_loop_gets_directive() {
        let report = analyze(
            r#"
            void add(double *A, double *B, double *C, int n) {
                for (int i = 0; i < n; i++) {
                    C[i] = A[i] + B[i];
                }
            }
            "#,
        );
        assert_eq!(report.loops.len(), 1);
        assert_eq!(report.parallelizable_count(), 1);
        assert_eq!(report.pragmas.len(), 1);
        assert_eq!(report.pragmas[0].pragma.kind, PragmaKind::ParallelForSimd);
        assert_eq!(report.pragmas[0].insertion.line, 3);
    }

    #[test]
    fn test_recurrence_gets_nothing() {
        let report = analyze(
            r#"
            void scan(double *A, int n) {
                for (int i = 1; i < n; i++) {
                    A[i] = A[i-1] + 2.0;
                }
            }
            "#,
        );
        assert_eq!(report.loops[0].verdict, Verdict::NotParallelizable);
        assert!(report.pragmas.is_empty());
    }

    #[test]
    fn test_macro_loop_skipped() {
        let report = analyze(
            "#define LOOPHEAD for (i = 0; i < 100; i = i + 1)\nvoid f(int *A) { int i; LOOPHEAD { A[i] = i; } }",
        );
        assert_eq!(report.loops.len(), 1);
        assert_eq!(report.parallelizable_count(), 1);
        assert!(report.pragmas.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].contains("macro"));
    }

    #[test]
    fn test_every_pragma_has_parallelizable_loop() {
        let report = analyze(
            r#"
            void mix(double *A, double *B, int n) {
                for (int i = 0; i < n; i++) {
                    B[i] = A[i];
                }
                for (int j = 1; j < n; j++) {
                    A[j] = A[j-1];
                }
            }
            "#,
        );
        for planned in &report.pragmas {
            let loop_info = &report.loops[planned.pragma.loop_id.0];
            assert!(loop_info.is_parallelizable());
        }
        assert_eq!(report.pragmas.len(), 1);
    }
}
