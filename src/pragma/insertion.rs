//! Insertion planning: where each directive line goes.
//!
//! A directive is inserted at column 1 of the loop's spelling line; the
//! annotator copies the loop line's indentation when it writes the text.
//! Loops whose first token came out of a macro expansion are rejected —
//! editing expanded text would change every use of the macro.

use crate::analysis::loop_info::{LoopId, LoopInfo};
use log::{debug, warn};
use serde::{Serialize, Deserialize};
use std::fmt;

/// A planned insertion point for one directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertionPoint {
    /// The loop the directive precedes
    pub loop_id: LoopId,
    /// Line to insert above
    pub line: usize,
    /// Always 1; indentation is resolved by the annotator
    pub column: usize,
    /// The loop is nested
    pub nested: bool,
    /// Nesting depth
    pub depth: usize,
    /// Line-number note, when spelling and expansion disagree
    pub note: Option<String>,
}

/// Why a loop could not be mapped to an insertion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The loop's first token is a macro expansion
    MacroExpansion,
    /// The loop carries no usable source location
    InvalidLocation,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MacroExpansion => write!(f, "skipped: macro"),
            SkipReason::InvalidLocation => write!(f, "skipped: invalid location"),
        }
    }
}

/// The insertion planner.
#[derive(Debug, Default)]
pub struct InsertionPlanner;

impl InsertionPlanner {
    /// Create the planner.
    pub fn new() -> Self {
        Self
    }

    /// Map a loop to the point its directive goes.
    pub fn plan(&self, loop_info: &LoopInfo) -> Result<InsertionPoint, SkipReason> {
        let span = loop_info.span;

        if span.is_dummy() {
            warn!(
                "could not determine insertion location for loop {}",
                loop_info.id
            );
            return Err(SkipReason::InvalidLocation);
        }

        if span.from_macro {
            debug!(
                "skipping loop at line {}: first token is a macro expansion",
                span.start_line
            );
            return Err(SkipReason::MacroExpansion);
        }

        let note = if span.spelling_line != span.start_line {
            Some(format!(
                "line number mismatch due to preprocessor (spelling: {}, expansion: {})",
                span.spelling_line, span.start_line
            ))
        } else {
            None
        };

        Ok(InsertionPoint {
            loop_id: loop_info.id,
            line: span.spelling_line,
            column: 1,
            nested: loop_info.depth > 0,
            depth: loop_info.depth,
            note,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::loop_info::{LoopInfo, LoopKind};
    use crate::utils::location::Span;

    fn loop_at(span: Span) -> LoopInfo {
        LoopInfo::new(LoopId(0), LoopKind::Counted, span, 0, None)
    }

    #[test]
    fn test_plain_loop_maps_to_its_line() {
        let planner = InsertionPlanner::new();
        let mut span = Span::new(7, 5, 9, 6);
        span.start_offset = 40;
        span.end_offset = 90;
        let point = planner.plan(&loop_at(span)).unwrap();
        assert_eq!(point.line, 7);
        assert_eq!(point.column, 1);
        assert!(point.note.is_none());
    }

    #[test]
    fn test_macro_loop_rejected() {
        let planner = InsertionPlanner::new();
        let span = Span::new(7, 5, 9, 6).with_spelling(2);
        let result = planner.plan(&loop_at(span));
        assert_eq!(result.unwrap_err(), SkipReason::MacroExpansion);
    }

    #[test]
    fn test_dummy_span_rejected() {
        let planner = InsertionPlanner::new();
        let result = planner.plan(&loop_at(Span::dummy()));
        assert_eq!(result.unwrap_err(), SkipReason::InvalidLocation);
    }
}
