//! Source location tracking for diagnostics and pragma placement.
//!
//! This module provides types for tracking source locations and spans,
//! including the spelling/expansion distinction needed for tokens that
//! come out of macro expansion.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A position in source code (line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start of file
    pub offset: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Create a location at the start of a file.
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span in source code (start and end positions).
///
/// Positions are always in expansion space: a token produced by macro
/// expansion is located where the macro was *used*, so ordering, scope
/// containment and merging all work in one coordinate system. The line
/// where the token text is actually written lives in `spelling_line`
/// (equal to `start_line` for ordinary tokens) and `from_macro` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start line (1-indexed)
    pub start_line: usize,
    /// Start column (1-indexed)
    pub start_column: usize,
    /// End line (1-indexed)
    pub end_line: usize,
    /// End column (1-indexed)
    pub end_column: usize,
    /// Byte offset of start
    pub start_offset: usize,
    /// Byte offset of end
    pub end_offset: usize,
    /// Line where the token text is written (macro body line for expansions)
    pub spelling_line: usize,
    /// True if this span came out of a macro expansion
    pub from_macro: bool,
}

impl Span {
    /// Create a new span.
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
            start_offset: 0,
            end_offset: 0,
            spelling_line: start_line,
            from_macro: false,
        }
    }

    /// Create a span from start and end locations.
    pub fn from_locations(start: SourceLocation, end: SourceLocation) -> Self {
        Self {
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
            start_offset: start.offset,
            end_offset: end.offset,
            spelling_line: start.line,
            from_macro: false,
        }
    }

    /// Mark this span as macro-expanded text spelled at `definition_line`.
    pub fn with_spelling(mut self, definition_line: usize) -> Self {
        self.spelling_line = definition_line;
        self.from_macro = true;
        self
    }

    /// Create a dummy span (for synthesized nodes).
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Check if this span is a dummy span.
    pub fn is_dummy(&self) -> bool {
        self.start_line == 0 && self.end_line == 0
    }

    /// Get the start location.
    pub fn start(&self) -> SourceLocation {
        SourceLocation {
            line: self.start_line,
            column: self.start_column,
            offset: self.start_offset,
        }
    }

    /// Get the end location.
    pub fn end(&self) -> SourceLocation {
        SourceLocation {
            line: self.end_line,
            column: self.end_column,
            offset: self.end_offset,
        }
    }

    /// Merge two spans to create a span covering both.
    ///
    /// Macro provenance follows whichever side supplies the start: a loop
    /// statement is a macro expansion when its first token is, not when a
    /// macro constant appears somewhere in its bounds.
    pub fn merge(&self, other: &Span) -> Span {
        let self_starts =
            (self.start_line, self.start_column) <= (other.start_line, other.start_column);
        let (first, _) = if self_starts { (self, other) } else { (other, self) };
        let end = if (self.end_line, self.end_column) >= (other.end_line, other.end_column) {
            self.end()
        } else {
            other.end()
        };
        let mut merged = Span::from_locations(first.start(), end);
        merged.start_offset = self.start_offset.min(other.start_offset);
        merged.end_offset = self.end_offset.max(other.end_offset);
        merged.from_macro = first.from_macro;
        merged.spelling_line = first.spelling_line;
        merged
    }

    /// Check if a byte offset falls inside this span.
    pub fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.start_offset && offset < self.end_offset
    }

    /// Get the length of this span in bytes.
    pub fn len(&self) -> usize {
        self.end_offset.saturating_sub(self.start_offset)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}:{}-{}", self.start_line, self.start_column, self.end_column)
        } else {
            write!(
                f,
                "{}:{}-{}:{}",
                self.start_line, self.start_column, self.end_line, self.end_column
            )
        }
    }
}

/// Helper to map offsets and lines of a source string.
#[derive(Debug, Clone)]
pub struct SourceMap {
    /// The source text
    source: String,
    /// Line start offsets
    line_starts: Vec<usize>,
}

impl SourceMap {
    /// Create a new source map.
    pub fn new(source: String) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { source, line_starts }
    }

    /// Get the source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Convert a byte offset to a source location.
    pub fn offset_to_location(&self, offset: usize) -> SourceLocation {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let column = offset - self.line_starts[line] + 1;
        SourceLocation::new(line + 1, column, offset)
    }

    /// Get the text for a span.
    pub fn span_text(&self, span: &Span) -> &str {
        &self.source[span.start_offset..span.end_offset]
    }

    /// Get a line of source code.
    pub fn line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 || line_number > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line_number - 1];
        let end = self.line_starts
            .get(line_number)
            .copied()
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\n'))
    }

    /// Leading whitespace of a line, used to indent inserted pragmas.
    pub fn line_indentation(&self, line_number: usize) -> &str {
        match self.line(line_number) {
            Some(text) => {
                let trimmed = text.trim_start_matches([' ', '\t']);
                &text[..text.len() - trimmed.len()]
            }
            None => "",
        }
    }

    /// Get the number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
