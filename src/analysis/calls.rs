//! Call-effect analysis: which calls keep a loop parallelizable.
//!
//! A fixed allow-list of side-effect-free math functions and a few
//! read-only string/ctype predicates is treated as safe; a fixed deny-list
//! of I/O, memory-management and non-deterministic functions is unsafe.
//! Every other name — including calls through function pointers, whose
//! callee cannot be resolved — defaults to unsafe.

use crate::analysis::loop_info::{CallEvent, LoopInfo};
use log::trace;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Verdict for the calls of one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSafety {
    /// No calls at all
    Safe,
    /// Only allow-listed calls
    PotentiallySafe,
    /// At least one call with (assumed) side effects
    Unsafe,
}

/// Math functions without side effects.
static SAFE_MATH_FUNCTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "sin", "cos", "tan", "asin", "acos", "atan", "atan2",
        "sinh", "cosh", "tanh", "asinh", "acosh", "atanh",
        "exp", "exp2", "expm1", "log", "log10", "log2", "log1p",
        "sqrt", "cbrt", "pow", "hypot",
        "ceil", "floor", "trunc", "round", "nearbyint", "rint",
        "fabs", "abs", "fmod", "remainder", "remquo",
        "fmin", "fmax", "fdim", "fma",
        "isfinite", "isinf", "isnan", "isnormal", "signbit",
    ]
    .into_iter()
    .collect()
});

/// Read-only string and ctype predicates.
static SAFE_PREDICATE_FUNCTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "strlen", "strcmp", "strncmp", "strchr", "strstr",
        "memcmp", "isalpha", "isdigit", "isspace", "toupper", "tolower",
    ]
    .into_iter()
    .collect()
});

/// Functions that definitely have side effects.
static UNSAFE_FUNCTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "printf", "fprintf", "sprintf", "puts", "putchar",
        "scanf", "fscanf", "sscanf", "getchar", "gets", "fgets",
        "malloc", "calloc", "realloc", "free",
        "fopen", "fclose", "fread", "fwrite", "fseek", "ftell",
        "exit", "abort", "system", "rand", "srand", "time",
    ]
    .into_iter()
    .collect()
});

/// Name is on the math allow-list.
pub fn is_safe_math_function(name: &str) -> bool {
    SAFE_MATH_FUNCTIONS.contains(name)
}

/// Unknown names are assumed to have side effects.
pub fn has_potential_side_effects(name: &str) -> bool {
    if SAFE_MATH_FUNCTIONS.contains(name) || SAFE_PREDICATE_FUNCTIONS.contains(name) {
        return false;
    }
    // The deny-list entries and everything unrecognized.
    true
}

/// Build the call event for a resolved (or `"unknown"`) callee name.
pub fn classify_call(name: &str, line: usize) -> CallEvent {
    let is_math = is_safe_math_function(name);
    let has_side_effects = has_potential_side_effects(name);
    let is_builtin = SAFE_MATH_FUNCTIONS.contains(name)
        || SAFE_PREDICATE_FUNCTIONS.contains(name)
        || UNSAFE_FUNCTIONS.contains(name);
    CallEvent {
        name: name.to_string(),
        line,
        is_builtin,
        is_math,
        has_side_effects,
    }
}

/// The call-effect analyzer.
#[derive(Debug, Default)]
pub struct CallAnalyzer;

impl CallAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Log what the calls of a loop look like.
    pub fn analyze(&self, loop_info: &LoopInfo) {
        for call in &loop_info.calls {
            trace!(
                "call '{}' at line {}: math={}, side_effects={}",
                call.name, call.line, call.is_math, call.has_side_effects
            );
        }
    }

    /// Verdict over all calls recorded in a loop.
    pub fn verdict(&self, loop_info: &LoopInfo) -> CallSafety {
        if loop_info.calls.is_empty() {
            return CallSafety::Safe;
        }
        if loop_info.has_unsafe_calls() {
            return CallSafety::Unsafe;
        }
        CallSafety::PotentiallySafe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::loop_info::{LoopId, LoopKind};
    use crate::utils::location::Span;

    fn empty_loop() -> LoopInfo {
        LoopInfo::new(LoopId(0), LoopKind::Counted, Span::dummy(), 0, None)
    }

    #[test]
    fn test_classification() {
        assert!(is_safe_math_function("sqrt"));
        assert!(!has_potential_side_effects("strlen"));
        assert!(has_potential_side_effects("printf"));
        assert!(has_potential_side_effects("my_helper"));
        assert!(has_potential_side_effects("unknown"));
    }

    #[test]
    fn test_verdict_no_calls() {
        let analyzer = CallAnalyzer::new();
        assert_eq!(analyzer.verdict(&empty_loop()), CallSafety::Safe);
    }

    #[test]
    fn test_verdict_math_only() {
        let analyzer = CallAnalyzer::new();
        let mut info = empty_loop();
        info.add_call(classify_call("sin", 3));
        info.add_call(classify_call("fabs", 4));
        assert_eq!(analyzer.verdict(&info), CallSafety::PotentiallySafe);
    }

    #[test]
    fn test_verdict_unsafe() {
        let analyzer = CallAnalyzer::new();
        let mut info = empty_loop();
        info.add_call(classify_call("sqrt", 3));
        info.add_call(classify_call("printf", 4));
        assert_eq!(analyzer.verdict(&info), CallSafety::Unsafe);
    }

    #[test]
    fn test_unknown_callee_unsafe() {
        let analyzer = CallAnalyzer::new();
        let mut info = empty_loop();
        info.add_call(classify_call("unknown", 5));
        assert_eq!(analyzer.verdict(&info), CallSafety::Unsafe);
    }
}
