//! Benchmarks for the loop parallelization analyzer.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use parloop::{analyze, parse, AnalyzerConfig};

const STENCIL: &str = r#"
    void stencil(double A[512][512], double B[512][512], int n) {
        for (int i = 1; i < n; i++) {
            for (int j = 1; j < n; j++) {
                B[i][j] = 0.25 * (A[i][j] + A[i][j] + A[i][j] + A[i][j]);
            }
        }
    }
"#;

const MIXED: &str = r#"
    double total;

    void mixed(double *A, double *B, double *C, int n) {
        for (int i = 0; i < n; i++) {
            C[i] = A[i] + B[i];
        }
        for (int j = 1; j < n; j++) {
            A[j] = A[j-1] * 2.0;
        }
        for (int k = 0; k < n; k++) {
            total += sqrt(fabs(B[k]));
        }
        for (int m = 0; m < n; m++) {
            double t = A[m] * C[m];
            B[m] = t * t;
        }
    }
"#;

/// Benchmark parsing speed.
fn bench_parsing(c: &mut Criterion) {
    c.bench_function("parse_stencil", |b| {
        b.iter(|| parse(black_box(STENCIL)).unwrap())
    });

    c.bench_function("parse_mixed", |b| {
        b.iter(|| parse(black_box(MIXED)).unwrap())
    });
}

/// Benchmark the full analysis pipeline.
fn bench_analysis(c: &mut Criterion) {
    let config = AnalyzerConfig::default();

    c.bench_function("analyze_stencil", |b| {
        b.iter(|| analyze(black_box(STENCIL), &config).unwrap())
    });

    c.bench_function("analyze_mixed", |b| {
        b.iter(|| analyze(black_box(MIXED), &config).unwrap())
    });
}

/// Benchmark analysis on a wide synthetic file.
fn bench_many_loops(c: &mut Criterion) {
    let mut source = String::from("void many(double *A, double *B, int n) {\n");
    for i in 0..100 {
        source.push_str(&format!(
            "    for (int i{idx} = 0; i{idx} < n; i{idx}++) {{ B[i{idx}] = A[i{idx}] * {idx}.0; }}\n",
            idx = i
        ));
    }
    source.push_str("}\n");
    let config = AnalyzerConfig::default();

    c.bench_function("analyze_100_loops", |b| {
        b.iter(|| analyze(black_box(&source), &config).unwrap())
    });
}

criterion_group!(benches, bench_parsing, bench_analysis, bench_many_loops);
criterion_main!(benches);
