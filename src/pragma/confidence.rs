//! Confidence scoring for generated directives.
//!
//! Five clamped sub-scores — loop shape, directive type, complexity, data
//! access, dependency outcome — combine into a weighted sum with a level
//! bucket and human-readable factors.

use crate::analysis::loop_info::LoopInfo;
use crate::pragma::generator::PragmaKind;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Bucketed confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    /// 81-100%
    VeryHigh,
    /// 61-80%
    High,
    /// 41-60%
    Medium,
    /// 21-40%
    Low,
    /// 0-20%
    VeryLow,
}

impl ConfidenceLevel {
    /// Bucket a numerical score.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.81 {
            ConfidenceLevel::VeryHigh
        } else if score >= 0.61 {
            ConfidenceLevel::High
        } else if score >= 0.41 {
            ConfidenceLevel::Medium
        } else if score >= 0.21 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    /// Description with the percentage range.
    pub fn description(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "Very High (81-100%)",
            ConfidenceLevel::High => "High (61-80%)",
            ConfidenceLevel::Medium => "Medium (41-60%)",
            ConfidenceLevel::Low => "Low (21-40%)",
            ConfidenceLevel::VeryLow => "Very Low (0-20%)",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A scored directive with its rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceScore {
    /// Weighted score in [0, 1]
    pub score: f64,
    /// Bucketed level
    pub level: ConfidenceLevel,
    /// What spoke for the directive
    pub positive_factors: Vec<String>,
    /// What spoke against it
    pub negative_factors: Vec<String>,
    /// Rendered rationale
    pub reasoning: String,
}

/// The confidence scorer.
#[derive(Debug, Default)]
pub struct ConfidenceScorer;

/// Sub-score weights: loop shape, directive type, complexity, data access,
/// dependency outcome.
const WEIGHTS: [f64; 5] = [0.25, 0.15, 0.20, 0.20, 0.20];

impl ConfidenceScorer {
    /// Create the scorer.
    pub fn new() -> Self {
        Self
    }

    /// Score one directive for one loop.
    pub fn score(&self, loop_info: &LoopInfo, kind: PragmaKind) -> ConfidenceScore {
        let scores = [
            self.score_loop_characteristics(loop_info),
            self.score_pragma_kind(kind),
            self.score_complexity(loop_info),
            self.score_data_access(loop_info),
            self.score_dependencies(loop_info),
        ];

        let mut total = 0.0;
        for (weight, score) in WEIGHTS.iter().zip(scores.iter()) {
            total += weight * score;
        }
        let total = clamp(total);

        let (positive_factors, negative_factors) = self.collect_factors(loop_info);
        let reasoning = render_reasoning(&positive_factors, &negative_factors);

        ConfidenceScore {
            score: total,
            level: ConfidenceLevel::from_score(total),
            positive_factors,
            negative_factors,
            reasoning,
        }
    }

    fn score_loop_characteristics(&self, loop_info: &LoopInfo) -> f64 {
        let mut score = 0.5;
        if loop_info.bounds.is_simple {
            score += 0.3;
        }
        if loop_info.is_outermost() {
            score += 0.2;
        } else {
            score -= 0.1 * loop_info.depth as f64;
        }
        if loop_info.is_hot() {
            score += 0.1;
        }
        clamp(score)
    }

    fn score_pragma_kind(&self, kind: PragmaKind) -> f64 {
        match kind {
            PragmaKind::ParallelFor => 0.8,
            PragmaKind::ParallelForSimd => 0.7,
            PragmaKind::Simd => 0.6,
        }
    }

    fn score_complexity(&self, loop_info: &LoopInfo) -> f64 {
        let mut score = 1.0;

        if loop_info.metrics.function_calls > 2 {
            score -= 0.3;
        } else if loop_info.metrics.function_calls > 0 {
            score -= 0.1;
        }

        if loop_info.variables.len() > 8 {
            score -= 0.3;
        } else if loop_info.variables.len() > 5 {
            score -= 0.1;
        }

        if loop_info.metrics.arithmetic_ops > 10 {
            score -= 0.1;
        }

        clamp(score)
    }

    fn score_data_access(&self, loop_info: &LoopInfo) -> f64 {
        let mut score = 0.5;
        if !loop_info.array_accesses.is_empty() {
            score += 0.5;
        }
        if loop_info.metrics.memory_accesses > 5 {
            score += 0.1;
        }
        clamp(score)
    }

    fn score_dependencies(&self, loop_info: &LoopInfo) -> f64 {
        if !loop_info.is_parallelizable() {
            return 0.0;
        }

        let mut score = 0.8;
        if !loop_info.variables.is_empty() {
            score += 0.1;
        }
        if !loop_info.array_accesses.is_empty() {
            score += 0.1;
        }
        clamp(score)
    }

    fn collect_factors(&self, loop_info: &LoopInfo) -> (Vec<String>, Vec<String>) {
        let mut positive = Vec::new();
        let mut negative = Vec::new();

        if loop_info.bounds.is_simple {
            positive.push("Simple iterator pattern detected".to_string());
        }
        if loop_info.is_hot() {
            positive.push("High computational intensity".to_string());
        }
        if !loop_info.array_accesses.is_empty() {
            positive.push("Array access patterns found".to_string());
        }
        if loop_info.is_outermost() {
            positive.push("Outermost loop (good for parallelization)".to_string());
        } else {
            negative.push("Nested loop (reduced parallelization benefit)".to_string());
        }
        if loop_info.metrics.function_calls > 0 {
            negative.push("Contains function calls".to_string());
        }
        if loop_info.variables.len() > 5 {
            negative.push("Many variables in scope".to_string());
        }

        (positive, negative)
    }
}

fn clamp(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

fn render_reasoning(positive: &[String], negative: &[String]) -> String {
    let mut reasoning = String::from("Confidence based on:");
    if !positive.is_empty() {
        reasoning.push_str("\n  Positive factors:");
        for factor in positive {
            reasoning.push_str("\n    - ");
            reasoning.push_str(factor);
        }
    }
    if !negative.is_empty() {
        reasoning.push_str("\n  Negative factors:");
        for factor in negative {
            reasoning.push_str("\n    - ");
            reasoning.push_str(factor);
        }
    }
    reasoning
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::loop_info::*;
    use crate::frontend::ast::Expr;
    use crate::utils::location::Span;

    fn parallel_loop() -> LoopInfo {
        let mut info = LoopInfo::new(LoopId(0), LoopKind::Counted, Span::dummy(), 0, None);
        info.bounds.induction_var = Some("i".to_string());
        info.bounds.is_simple = true;
        info.verdict = Verdict::Parallelizable;
        info
    }

    #[test]
    fn test_levels() {
        assert_eq!(ConfidenceLevel::from_score(0.9), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_score(0.81), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_score(0.7), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.5), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.3), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.1), ConfidenceLevel::VeryLow);
    }

    #[test]
    fn test_simple_array_loop_scores_high() {
        let scorer = ConfidenceScorer::new();
        let mut info = parallel_loop();
        info.add_array_access(ArrayAccess::new(
            "A",
            Expr::ident("i", Span::dummy()),
            Span::dummy(),
            true,
        ));
        let score = scorer.score(&info, PragmaKind::ParallelFor);
        assert!(score.score > 0.7, "score was {}", score.score);
        assert!(score
            .positive_factors
            .iter()
            .any(|f| f.contains("Simple iterator")));
    }

    #[test]
    fn test_hazardous_loop_scores_lower() {
        let scorer = ConfidenceScorer::new();
        let mut info = parallel_loop();
        info.verdict = Verdict::NotParallelizable;
        let score = scorer.score(&info, PragmaKind::ParallelFor);
        // The dependency sub-score collapses to zero.
        assert!(score.score < 0.7);
    }

    #[test]
    fn test_nested_loop_negative_factor() {
        let scorer = ConfidenceScorer::new();
        let mut info = parallel_loop();
        info.depth = 2;
        let score = scorer.score(&info, PragmaKind::Simd);
        assert!(score
            .negative_factors
            .iter()
            .any(|f| f.contains("Nested loop")));
    }

    #[test]
    fn test_call_heavy_loop_penalized() {
        let scorer = ConfidenceScorer::new();
        let base = scorer.score(&parallel_loop(), PragmaKind::ParallelFor).score;

        let mut noisy = parallel_loop();
        noisy.metrics.function_calls = 3;
        let penalized = scorer.score(&noisy, PragmaKind::ParallelFor).score;
        assert!(penalized < base);
    }
}
