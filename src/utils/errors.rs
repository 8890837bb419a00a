//! Error types for the loop parallelization analyzer.
//!
//! This module defines all error types used throughout the crate,
//! organized by the phase that produces them.

use thiserror::Error;
use crate::utils::location::Span;
use std::fmt;

/// Top-level error type for the analyzer.
#[derive(Error, Debug)]
pub enum ParloopError {
    /// Error during lexing/tokenization
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    /// Error during parsing
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error while annotating a source file
    #[error("Annotation error: {0}")]
    Annotate(#[from] AnnotateError),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during lexical analysis.
#[derive(Error, Debug, Clone)]
pub struct LexerError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of lexer error
    pub kind: LexerErrorKind,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// Unexpected character
    UnexpectedChar,
    /// Unterminated string literal
    UnterminatedString,
    /// Unterminated character literal
    UnterminatedChar,
    /// Invalid number literal
    InvalidNumber,
    /// Invalid escape sequence
    InvalidEscape,
    /// Macro expansion recursed past the depth limit
    MacroDepthExceeded,
    /// Unexpected end of file
    UnexpectedEof,
}

/// Error during parsing.
#[derive(Error, Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of parse error
    pub kind: ParseErrorKind,
    /// What was found
    pub found: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)?;
        if let Some(ref found) = self.found {
            write!(f, " (found: {})", found)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken,
    /// Expected a specific token
    ExpectedToken,
    /// Expected an expression
    ExpectedExpression,
    /// Expected a statement
    ExpectedStatement,
    /// Expected an identifier
    ExpectedIdentifier,
    /// Expected a type name
    ExpectedType,
    /// Invalid syntax
    InvalidSyntax,
    /// Unexpected end of file
    UnexpectedEof,
}

/// Error while splicing pragmas into a source file.
#[derive(Error, Debug, Clone)]
pub struct AnnotateError {
    /// The error message
    pub message: String,
    /// The file being annotated
    pub filename: String,
}

impl fmt::Display for AnnotateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.filename)
    }
}

/// Result type using ParloopError.
pub type ParloopResult<T> = Result<T, ParloopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError {
            message: "Unexpected token".to_string(),
            span: Span::new(1, 5, 1, 10),
            kind: ParseErrorKind::UnexpectedToken,
            found: Some("number".to_string()),
        };
        let s = format!("{}", err);
        assert!(s.contains("Unexpected token"));
        assert!(s.contains("number"));
    }

    #[test]
    fn test_annotate_error_names_file() {
        let err = AnnotateError {
            message: "could not read source file".to_string(),
            filename: "kernel.c".to_string(),
        };
        assert!(format!("{}", err).contains("kernel.c"));
    }
}
