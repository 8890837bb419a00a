//! User-visible output: the per-loop summary table and the pragma lists.
//!
//! The summary table is printed after every analysis run; absence of
//! directives is not an error, it is a row that says UNSAFE and why.

use crate::analysis::{AnalysisReport, LoopInfo};
use crate::pragma::PragmaKind;

/// One-line reason shown in the summary table.
fn verdict_reason(loop_info: &LoopInfo) -> &'static str {
    if loop_info.is_parallelizable() {
        if loop_info.bounds.is_simple && !loop_info.array_accesses.is_empty() {
            "Simple array operations"
        } else if loop_info.bounds.is_simple {
            "Simple iterator pattern"
        } else {
            "No dependencies"
        }
    } else if loop_info.has_unsafe_calls() {
        "Function call side effects"
    } else if !loop_info.warnings.is_empty() {
        "Loop-carried dependency"
    } else {
        "Complex dependencies"
    }
}

/// Print the per-loop summary table.
pub fn print_summary(report: &AnalysisReport) {
    println!("\n=== Loop Analysis Results ===");

    if report.loops.is_empty() {
        println!("No loops detected in the analyzed code.");
        println!("============================");
        return;
    }

    let parallelizable = report.parallelizable_count();
    println!(
        "Found {} loop{}, {} parallelizable\n",
        report.loops.len(),
        if report.loops.len() == 1 { "" } else { "s" },
        parallelizable
    );

    println!("┌─────┬──────┬───────────┬────────┬──────────────────────────┐");
    println!("│ ID  │ Line │ Type      │ Status │ Reason                   │");
    println!("├─────┼──────┼───────────┼────────┼──────────────────────────┤");

    for loop_info in &report.loops {
        let status = if loop_info.is_parallelizable() {
            "SAFE"
        } else {
            "UNSAFE"
        };
        let mut reason = verdict_reason(loop_info).to_string();
        if reason.len() > 24 {
            reason.truncate(21);
            reason.push_str("...");
        }
        println!(
            "│ {:<3} │ {:>4} │ {:<9} │ {:<6} │ {:<24} │",
            loop_info.id.to_string(),
            loop_info.line,
            loop_info.kind.to_string(),
            status,
            reason
        );
    }

    println!("└─────┴──────┴───────────┴────────┴──────────────────────────┘");

    let percent = if report.loops.is_empty() {
        0
    } else {
        parallelizable * 100 / report.loops.len()
    };
    println!("\nSummary:");
    println!(
        "  Parallelizable: {}/{} ({}%)",
        parallelizable,
        report.loops.len(),
        percent
    );
    println!("============================");
}

/// Print per-loop warnings (verbose mode).
pub fn print_warnings(report: &AnalysisReport) {
    for loop_info in &report.loops {
        if loop_info.warnings.is_empty() {
            continue;
        }
        println!(
            "\n{} ({} loop at line {}) blocking factors:",
            loop_info.id, loop_info.kind, loop_info.line
        );
        for warning in &loop_info.warnings {
            println!("  • {}", warning);
        }
    }
}

/// Print the generated pragmas, one line each.
pub fn print_pragma_list(report: &AnalysisReport) {
    if report.pragmas.is_empty() {
        println!("No parallelizable loops found.");
    } else {
        println!(
            "\nGenerated {} OpenMP pragma{}:",
            report.pragmas.len(),
            if report.pragmas.len() == 1 { "" } else { "s" }
        );
        for planned in &report.pragmas {
            println!(
                "  Line {}: {}",
                planned.insertion.line, planned.pragma.text
            );
        }
    }

    for note in &report.skipped {
        println!("  Note: {}", note);
    }
}

/// Print the pragma generation breakdown (verbose mode).
pub fn print_pragma_summary(report: &AnalysisReport) {
    println!("\n=== Pragma Generation Summary ===");
    println!("Total pragmas generated: {}\n", report.pragmas.len());

    let mut parallel_for = 0;
    let mut parallel_for_simd = 0;
    let mut simd = 0;
    let mut total_confidence = 0.0;

    for planned in &report.pragmas {
        match planned.pragma.kind {
            PragmaKind::ParallelFor => parallel_for += 1,
            PragmaKind::ParallelForSimd => parallel_for_simd += 1,
            PragmaKind::Simd => simd += 1,
        }
        total_confidence += planned.pragma.confidence.score;

        println!(
            "Line {}: {} [Confidence: {}]",
            planned.insertion.line,
            planned.pragma.text,
            planned.pragma.confidence.level.description()
        );
    }

    let average = if report.pragmas.is_empty() {
        0.0
    } else {
        total_confidence / report.pragmas.len() as f64
    };

    println!("\nBreakdown:");
    println!("  #pragma omp parallel for: {}", parallel_for);
    println!("  #pragma omp parallel for simd: {}", parallel_for_simd);
    println!("  #pragma omp simd: {}", simd);
    println!("  Average confidence: {}%", (average * 100.0) as u32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnalyzerConfig;

    #[test]
    fn test_verdict_reasons() {
        let report = crate::analyze(
            r#"
            void f(double *A, double *B, int n) {
                for (int i = 0; i < n; i++) {
                    B[i] = A[i];
                }
                for (int j = 1; j < n; j++) {
                    A[j] = A[j-1];
                }
                for (int k = 0; k < n; k++) {
                    printf("%f", A[k]);
                }
            }
            "#,
            &AnalyzerConfig::default(),
        )
        .unwrap();

        assert_eq!(verdict_reason(&report.loops[0]), "Simple array operations");
        assert_eq!(verdict_reason(&report.loops[1]), "Loop-carried dependency");
        assert_eq!(verdict_reason(&report.loops[2]), "Function call side effects");
    }
}
