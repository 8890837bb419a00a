//! Source annotation: splicing directive lines into a C file.
//!
//! Each insertion point gets its directive on a fresh line immediately
//! above the loop, indented with the loop line's own leading whitespace.
//! Everything else is copied through untouched, so the output is the
//! input plus directive lines and nothing more.

use crate::analysis::PlannedPragma;
use crate::utils::errors::{AnnotateError, ParloopError, ParloopResult};
use crate::utils::location::SourceMap;
use log::info;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Splices generated pragmas into source text.
#[derive(Debug, Default)]
pub struct SourceAnnotator;

impl SourceAnnotator {
    /// Create the annotator.
    pub fn new() -> Self {
        Self
    }

    /// Produce the annotated text for a source string.
    pub fn annotate(&self, source: &str, pragmas: &[PlannedPragma]) -> String {
        let map = SourceMap::new(source.to_string());

        let mut by_line: BTreeMap<usize, Vec<&PlannedPragma>> = BTreeMap::new();
        for planned in pragmas {
            by_line.entry(planned.insertion.line).or_default().push(planned);
        }

        // A trailing newline opens one final empty "line" in the map;
        // emitting it would grow the file by a line on every run.
        let mut last_line = map.line_count();
        if source.ends_with('\n') && last_line > 0 {
            last_line -= 1;
        }

        let mut output = String::with_capacity(source.len() + pragmas.len() * 40);
        for line_number in 1..=last_line {
            if let Some(planned) = by_line.get(&line_number) {
                let indent = map.line_indentation(line_number);
                for pragma in planned {
                    output.push_str(indent);
                    output.push_str(&pragma.pragma.text);
                    output.push('\n');
                }
            }
            if let Some(line) = map.line(line_number) {
                output.push_str(line);
                output.push('\n');
            }
        }

        output
    }

    /// Annotate a file on disk and write the result.
    ///
    /// Returns the number of directives inserted.
    pub fn annotate_file(
        &self,
        input: &Path,
        output: &Path,
        pragmas: &[PlannedPragma],
    ) -> ParloopResult<usize> {
        let source = fs::read_to_string(input).map_err(|e| {
            ParloopError::Annotate(AnnotateError {
                message: format!("could not read source file: {}", e),
                filename: input.display().to_string(),
            })
        })?;

        let annotated = self.annotate(&source, pragmas);
        fs::write(output, annotated).map_err(|e| {
            ParloopError::Annotate(AnnotateError {
                message: format!("could not write annotated file: {}", e),
                filename: output.display().to_string(),
            })
        })?;

        info!(
            "wrote {} with {} directive(s)",
            output.display(),
            pragmas.len()
        );
        Ok(pragmas.len())
    }
}

/// Output filename: `<base>_openmp<ext>`.
pub fn output_filename(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{}_openmp.{}", stem, ext.to_string_lossy()),
        None => format!("{}_openmp", stem),
    };
    match input.parent() {
        Some(parent) if parent.as_os_str().is_empty() => PathBuf::from(name),
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnalyzerConfig;

    fn planned(source: &str) -> (String, Vec<PlannedPragma>) {
        let report = crate::analyze(source, &AnalyzerConfig::default()).unwrap();
        (source.to_string(), report.pragmas)
    }

    #[test]
    fn test_directive_inserted_with_indentation() {
        let source = "void add(double *A, double *B, double *C, int n) {\n    for (int i = 0; i < n; i++) {\n        C[i] = A[i] + B[i];\n    }\n}\n";
        let (source, pragmas) = planned(source);
        assert_eq!(pragmas.len(), 1);

        let annotated = SourceAnnotator::new().annotate(&source, &pragmas);
        let lines: Vec<&str> = annotated.lines().collect();
        assert_eq!(lines[1], "    #pragma omp parallel for simd");
        assert_eq!(lines[2], "    for (int i = 0; i < n; i++) {");
        // Everything else is unchanged.
        assert_eq!(lines[0], "void add(double *A, double *B, double *C, int n) {");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_no_pragmas_copies_input() {
        let source = "void f(void) {\n    int x = 1;\n}\n";
        let (source, pragmas) = planned(source);
        assert!(pragmas.is_empty());
        let annotated = SourceAnnotator::new().annotate(&source, &pragmas);
        assert_eq!(annotated, source);
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            output_filename(Path::new("code.c")),
            PathBuf::from("code_openmp.c")
        );
        assert_eq!(
            output_filename(Path::new("dir/kernel.c")),
            PathBuf::from("dir/kernel_openmp.c")
        );
        assert_eq!(
            output_filename(Path::new("noext")),
            PathBuf::from("noext_openmp")
        );
    }
}
