//! parloop - Static Loop Parallelization Analyzer
//!
//! Command-line interface: analyze a C file, print the per-loop summary,
//! and optionally write an annotated copy with OpenMP directives.

use parloop::annotate::{output_filename, SourceAnnotator};
use parloop::{analyze, report, AnalyzerConfig};

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "parloop")]
#[command(version)]
#[command(about = "Static analysis tool for automatic OpenMP loop parallelization")]
#[command(long_about = r#"
parloop decides which loops of a C file are safe to execute in parallel
and can annotate the file with OpenMP directives. It performs:

  - Loop discovery with nesting tracking
  - Scalar, array, cross-iteration, pointer and call-effect analysis
  - Directive selection with confidence scoring

Example usage:
  parloop code.c                      Show the loop safety summary
  parloop --generate-pragmas code.c   Write code_openmp.c with directives
  parloop --verbose code.c            Show detailed analysis information
"#)]
struct Cli {
    /// C source file to analyze
    source_file: PathBuf,

    /// Generate OpenMP pragma annotations into <base>_openmp<ext>
    #[arg(long)]
    generate_pragmas: bool,

    /// Show detailed analysis information
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let source = fs::read_to_string(&cli.source_file)
        .with_context(|| format!("Failed to read {}", cli.source_file.display()))?;

    let config = AnalyzerConfig {
        verbose: cli.verbose,
        ..AnalyzerConfig::default()
    };

    let analysis = analyze(&source, &config)
        .with_context(|| format!("Failed to analyze {}", cli.source_file.display()))?;

    report::print_summary(&analysis);
    if cli.verbose {
        report::print_warnings(&analysis);
    }

    if cli.generate_pragmas {
        report::print_pragma_list(&analysis);
        if cli.verbose {
            report::print_pragma_summary(&analysis);
        }

        let output = output_filename(&cli.source_file);
        let inserted = SourceAnnotator::new()
            .annotate_file(&cli.source_file, &output, &analysis.pragmas)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!(
            "\nWrote {} with {} directive{}",
            output.display(),
            inserted,
            if inserted == 1 { "" } else { "s" }
        );
    }

    Ok(())
}
