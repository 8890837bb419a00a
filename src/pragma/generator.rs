//! Directive generation for parallelizable loops.
//!
//! Picks the directive variant (outermost loops get `parallel for`, inner
//! loops at most `simd`), collects the private clause from loop-local
//! written variables, and renders the directive text.

use crate::analysis::loop_info::{LoopId, LoopInfo, LoopKind, VariableScope};
use crate::pragma::confidence::{ConfidenceScore, ConfidenceScorer};
use log::debug;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Directive variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PragmaKind {
    /// `#pragma omp parallel for`
    ParallelFor,
    /// `#pragma omp parallel for simd`
    ParallelForSimd,
    /// `#pragma omp simd`
    Simd,
}

impl PragmaKind {
    /// The directive text without clauses.
    pub fn text(&self) -> &'static str {
        match self {
            PragmaKind::ParallelFor => "#pragma omp parallel for",
            PragmaKind::ParallelForSimd => "#pragma omp parallel for simd",
            PragmaKind::Simd => "#pragma omp simd",
        }
    }
}

impl fmt::Display for PragmaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// A directive generated for one loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPragma {
    /// The loop this directive belongs to
    pub loop_id: LoopId,
    /// Loop form, for reporting
    pub loop_kind: LoopKind,
    /// Line of the loop
    pub line: usize,
    /// Directive variant
    pub kind: PragmaKind,
    /// Full directive text including the private clause
    pub text: String,
    /// Variables in the private clause, declaration order
    pub private_vars: Vec<String>,
    /// Why this variant was chosen
    pub reasoning: String,
    /// Confidence in the directive
    pub confidence: ConfidenceScore,
}

/// The directive generator.
#[derive(Debug, Default)]
pub struct PragmaGenerator {
    scorer: ConfidenceScorer,
}

impl PragmaGenerator {
    /// Create a generator with the default scorer.
    pub fn new() -> Self {
        Self {
            scorer: ConfidenceScorer::new(),
        }
    }

    /// Generate the directive for a loop, if it earns one.
    pub fn generate(&self, loop_info: &LoopInfo) -> Option<GeneratedPragma> {
        let kind = self.determine_kind(loop_info)?;

        let private_vars = self.private_variables(loop_info);
        let mut text = kind.text().to_string();
        if !private_vars.is_empty() {
            text.push_str(" private(");
            text.push_str(&private_vars.join(", "));
            text.push(')');
        }

        let confidence = self.scorer.score(loop_info, kind);
        debug!(
            "generated '{}' for loop at line {} ({})",
            text,
            loop_info.line,
            confidence.level.description()
        );

        Some(GeneratedPragma {
            loop_id: loop_info.id,
            loop_kind: loop_info.kind,
            line: loop_info.line,
            kind,
            text,
            private_vars,
            reasoning: reasoning_for(kind).to_string(),
            confidence,
        })
    }

    /// Directive variant for a loop; `None` when no directive applies.
    fn determine_kind(&self, loop_info: &LoopInfo) -> Option<PragmaKind> {
        if !loop_info.is_parallelizable() {
            return None;
        }

        // Inner loops only vectorize; the parallel region belongs to the
        // outermost loop.
        if loop_info.depth > 0 {
            if self.should_use_simd(loop_info) {
                return Some(PragmaKind::Simd);
            }
            return None;
        }

        if self.should_use_simd(loop_info) {
            Some(PragmaKind::ParallelForSimd)
        } else {
            Some(PragmaKind::ParallelFor)
        }
    }

    /// SIMD pays off for array loops that are arithmetic-heavy, and for
    /// inner loops that touch memory at all.
    fn should_use_simd(&self, loop_info: &LoopInfo) -> bool {
        if loop_info.array_accesses.is_empty() {
            return false;
        }

        if loop_info.metrics.arithmetic_ops > 2 * loop_info.metrics.function_calls {
            return true;
        }

        loop_info.depth > 0 && loop_info.metrics.memory_accesses > 0
    }

    /// Non-induction loop-local variables that are written, in declaration
    /// order. OpenMP privatizes the iterator itself.
    fn private_variables(&self, loop_info: &LoopInfo) -> Vec<String> {
        loop_info
            .variables
            .iter()
            .filter(|var| {
                !var.is_induction()
                    && var.scope == VariableScope::LoopLocal
                    && var.has_writes()
            })
            .map(|var| var.name.clone())
            .collect()
    }
}

fn reasoning_for(kind: PragmaKind) -> &'static str {
    match kind {
        PragmaKind::ParallelFor => "Loop has no dependencies and good parallelization potential",
        PragmaKind::ParallelForSimd => {
            "Loop has simple array operations suitable for both parallelization and vectorization"
        }
        PragmaKind::Simd => "Inner loop with simple operations suitable for vectorization",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::loop_info::*;
    use crate::frontend::ast::Expr;
    use crate::utils::location::Span;

    fn parallel_loop(depth: usize) -> LoopInfo {
        let mut info = LoopInfo::new(LoopId(0), LoopKind::Counted, Span::dummy(), depth, None);
        info.bounds.induction_var = Some("i".to_string());
        info.bounds.is_simple = true;
        info.verdict = Verdict::Parallelizable;
        info
    }

    fn with_array_access(mut info: LoopInfo) -> LoopInfo {
        info.add_array_access(ArrayAccess::new(
            "A",
            Expr::ident("i", Span::dummy()),
            Span::dummy(),
            true,
        ));
        info.metrics.arithmetic_ops = 2;
        info
    }

    #[test]
    fn test_no_pragma_for_hazardous_loop() {
        let generator = PragmaGenerator::new();
        let mut info = parallel_loop(0);
        info.verdict = Verdict::NotParallelizable;
        assert!(generator.generate(&info).is_none());
    }

    #[test]
    fn test_outermost_array_loop_gets_parallel_for_simd() {
        let generator = PragmaGenerator::new();
        let info = with_array_access(parallel_loop(0));
        let pragma = generator.generate(&info).unwrap();
        assert_eq!(pragma.kind, PragmaKind::ParallelForSimd);
        assert_eq!(pragma.text, "#pragma omp parallel for simd");
    }

    #[test]
    fn test_outermost_scalar_loop_gets_parallel_for() {
        let generator = PragmaGenerator::new();
        let pragma = generator.generate(&parallel_loop(0)).unwrap();
        assert_eq!(pragma.kind, PragmaKind::ParallelFor);
    }

    #[test]
    fn test_inner_array_loop_gets_simd() {
        let generator = PragmaGenerator::new();
        let info = with_array_access(parallel_loop(1));
        let pragma = generator.generate(&info).unwrap();
        assert_eq!(pragma.kind, PragmaKind::Simd);
    }

    #[test]
    fn test_inner_scalar_loop_gets_nothing() {
        let generator = PragmaGenerator::new();
        assert!(generator.generate(&parallel_loop(1)).is_none());
    }

    #[test]
    fn test_call_heavy_loop_not_simd() {
        let generator = PragmaGenerator::new();
        let mut info = with_array_access(parallel_loop(0));
        info.metrics.arithmetic_ops = 2;
        info.metrics.function_calls = 2;
        info.metrics.memory_accesses = 0;
        let pragma = generator.generate(&info).unwrap();
        assert_eq!(pragma.kind, PragmaKind::ParallelFor);
    }

    #[test]
    fn test_private_clause() {
        let generator = PragmaGenerator::new();
        let mut info = with_array_access(parallel_loop(0));

        let mut i = VariableInfo::new("i", Span::dummy(), VariableScope::LoopLocal);
        i.role = VariableRole::Induction;
        i.add_usage(VariableUsage::new(Span::dummy(), true, true));
        info.add_variable(i);

        let mut t = VariableInfo::new("t", Span::dummy(), VariableScope::LoopLocal);
        t.add_usage(VariableUsage::new(Span::dummy(), false, true));
        t.add_usage(VariableUsage::new(Span::dummy(), true, false));
        info.add_variable(t);

        let mut n = VariableInfo::new("n", Span::dummy(), VariableScope::FunctionLocal);
        n.add_usage(VariableUsage::new(Span::dummy(), true, false));
        info.add_variable(n);

        let pragma = generator.generate(&info).unwrap();
        assert_eq!(pragma.private_vars, vec!["t".to_string()]);
        assert!(pragma.text.ends_with("private(t)"));
    }

    #[test]
    fn test_private_clause_order_and_uniqueness() {
        let generator = PragmaGenerator::new();
        let mut info = with_array_access(parallel_loop(0));
        for name in ["b", "a"] {
            let mut v = VariableInfo::new(name, Span::dummy(), VariableScope::LoopLocal);
            v.add_usage(VariableUsage::new(Span::dummy(), false, true));
            info.add_variable(v);
        }
        let pragma = generator.generate(&info).unwrap();
        // Declaration order, not alphabetical.
        assert_eq!(pragma.private_vars, vec!["b".to_string(), "a".to_string()]);
    }
}
