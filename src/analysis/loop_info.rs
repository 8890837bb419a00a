//! The fact model: everything the visitor learns about one loop.
//!
//! Loops live in a flat list owned by the visitor and reference each other
//! by index, never by pointer, so the nesting forest stays valid however
//! the list grows. Children always finalize before their parent.

use crate::frontend::ast::Expr;
use crate::utils::location::Span;
use serde::{Serialize, Deserialize};
use std::fmt;

/// A stable handle to a loop in the visitor's loop list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopId(pub usize);

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0 + 1)
    }
}

/// The syntactic form of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopKind {
    /// `for (...; ...; ...)`
    Counted,
    /// `while (...)`
    Conditional,
    /// `do ... while (...)`
    PostTest,
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopKind::Counted => write!(f, "for"),
            LoopKind::Conditional => write!(f, "while"),
            LoopKind::PostTest => write!(f, "do-while"),
        }
    }
}

/// The dependency verdict for a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verdict {
    /// Analysis has not run yet
    #[default]
    Undecided,
    /// Safe to parallelize
    Parallelizable,
    /// At least one hazard
    NotParallelizable,
}

/// Where a variable was declared relative to the loop using it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableScope {
    /// Declared inside the loop statement (init position included)
    LoopLocal,
    /// Declared in the function but outside the loop
    FunctionLocal,
    /// Declared at translation-unit scope
    Global,
}

/// What a variable does in a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableRole {
    /// The counted loop's iterator
    Induction,
    /// Anything else
    Ordinary,
    /// Used (only) to index arrays
    Index,
}

/// One read or write of a variable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VariableUsage {
    /// Where the reference occurred
    pub span: Span,
    /// Line of the reference
    pub line: usize,
    /// The old value is consumed
    pub is_read: bool,
    /// A new value is stored
    pub is_write: bool,
}

impl VariableUsage {
    /// Create a usage event.
    pub fn new(span: Span, is_read: bool, is_write: bool) -> Self {
        Self {
            span,
            line: span.start_line,
            is_read,
            is_write,
        }
    }
}

/// A variable and all its uses within one loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Variable name
    pub name: String,
    /// Declaration site (dummy span if the declaration was not seen)
    pub decl_span: Span,
    /// Scope relative to the owning loop
    pub scope: VariableScope,
    /// Role in the loop
    pub role: VariableRole,
    /// Usage events in source order
    pub usages: Vec<VariableUsage>,
}

impl VariableInfo {
    /// Create a record with no usages yet.
    pub fn new(name: impl Into<String>, decl_span: Span, scope: VariableScope) -> Self {
        Self {
            name: name.into(),
            decl_span,
            scope,
            role: VariableRole::Ordinary,
            usages: Vec::new(),
        }
    }

    /// Record a usage.
    pub fn add_usage(&mut self, usage: VariableUsage) {
        self.usages.push(usage);
    }

    /// Any usage reads the variable.
    pub fn has_reads(&self) -> bool {
        self.usages.iter().any(|u| u.is_read)
    }

    /// Any usage writes the variable.
    pub fn has_writes(&self) -> bool {
        self.usages.iter().any(|u| u.is_write)
    }

    /// This is the loop iterator.
    pub fn is_induction(&self) -> bool {
        self.role == VariableRole::Induction
    }

    /// Non-induction, read and written: the scalar-hazard shape.
    pub fn is_potential_dependency(&self) -> bool {
        !self.is_induction() && self.has_reads() && self.has_writes()
    }
}

/// One array access inside a loop.
///
/// `*(p + k)` records as an access with base `p` and subscript `k`, so
/// pointer-walk code and subscript code meet the same analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayAccess {
    /// Base name (innermost declarator for multi-dimensional accesses)
    pub array: String,
    /// The (outermost) subscript expression
    pub subscript: Expr,
    /// Where the access occurred
    pub span: Span,
    /// Line of the access
    pub line: usize,
    /// Left-hand side of a plain or compound assignment
    pub is_write: bool,
}

impl ArrayAccess {
    /// Create an access event.
    pub fn new(array: impl Into<String>, subscript: Expr, span: Span, is_write: bool) -> Self {
        Self {
            array: array.into(),
            subscript,
            span,
            line: span.start_line,
            is_write,
        }
    }
}

/// One call expression inside a loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    /// Callee name, or `"unknown"` when it cannot be resolved
    pub name: String,
    /// Line of the call
    pub line: usize,
    /// Name appears in the analyzer's libc tables (either list)
    pub is_builtin: bool,
    /// Name is on the side-effect-free math allow-list
    pub is_math: bool,
    /// Name is assumed to have side effects
    pub has_side_effects: bool,
}

impl CallEvent {
    /// A call is safe when it is known not to have side effects.
    pub fn is_safe(&self) -> bool {
        !self.has_side_effects
    }
}

/// One pointer operation inside a loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerOp {
    /// Pointer name (best effort, `"complex"` past the extraction limit)
    pub pointer: String,
    /// Where the operation occurred
    pub span: Span,
    /// Line of the operation
    pub line: usize,
    /// `*p`, `p->m`
    pub is_dereference: bool,
    /// `&x`
    pub is_address_of: bool,
    /// `p + n`, `p++`
    pub is_arithmetic: bool,
}

/// Bounds information for counted loops.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopBounds {
    /// The iterator extracted from the init position
    pub induction_var: Option<String>,
    /// The loop condition
    pub condition: Option<Expr>,
    /// The loop increment
    pub increment: Option<Expr>,
    /// Iterator, condition and increment are all present
    pub is_simple: bool,
}

/// Operation counters for one loop.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoopMetrics {
    /// `+ - * / %` and `++`/`--`
    pub arithmetic_ops: usize,
    /// Array accesses
    pub memory_accesses: usize,
    /// Call expressions
    pub function_calls: usize,
    /// Comparison operators
    pub comparisons: usize,
    /// Plain and compound assignments
    pub assignments: usize,
    /// Weighted intensity score
    pub hotness_score: f64,
}

impl LoopMetrics {
    /// Compute the weighted hotness score from the counters.
    pub fn finalize(&mut self) {
        self.hotness_score = self.arithmetic_ops as f64
            + 2.0 * self.memory_accesses as f64
            + 5.0 * self.function_calls as f64
            + 0.5 * self.comparisons as f64
            + 1.5 * self.assignments as f64;
    }

    /// Total counted operations.
    pub fn total_ops(&self) -> usize {
        self.arithmetic_ops
            + self.memory_accesses
            + self.function_calls
            + self.comparisons
            + self.assignments
    }
}

/// Everything known about one loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopInfo {
    /// Handle of this loop in the loop list
    pub id: LoopId,
    /// Syntactic form
    pub kind: LoopKind,
    /// Span of the whole loop statement
    pub span: Span,
    /// Line of the loop keyword (spelling line)
    pub line: usize,
    /// Nesting depth, 0 = outermost
    pub depth: usize,
    /// Enclosing loop, if any
    pub parent: Option<LoopId>,
    /// Directly nested loops
    pub children: Vec<LoopId>,
    /// Bounds (counted loops only)
    pub bounds: LoopBounds,
    /// Variables used in the loop, in first-seen order
    pub variables: Vec<VariableInfo>,
    /// Array accesses in source order
    pub array_accesses: Vec<ArrayAccess>,
    /// Pointer operations in source order
    pub pointer_ops: Vec<PointerOp>,
    /// Calls in source order
    pub calls: Vec<CallEvent>,
    /// Operation counters
    pub metrics: LoopMetrics,
    /// Dependency verdict
    pub verdict: Verdict,
    /// Accumulated hazard warnings
    pub warnings: Vec<String>,
    /// Verdict and counters are settled
    pub finalized: bool,
}

impl LoopInfo {
    /// Create a fresh loop record at the given nesting position.
    pub fn new(id: LoopId, kind: LoopKind, span: Span, depth: usize, parent: Option<LoopId>) -> Self {
        Self {
            id,
            kind,
            span,
            line: span.start_line,
            depth,
            parent,
            children: Vec::new(),
            bounds: LoopBounds::default(),
            variables: Vec::new(),
            array_accesses: Vec::new(),
            pointer_ops: Vec::new(),
            calls: Vec::new(),
            metrics: LoopMetrics::default(),
            verdict: Verdict::Undecided,
            warnings: Vec::new(),
            finalized: false,
        }
    }

    /// Find a variable record by name.
    pub fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Find a variable record by name, mutably.
    pub fn variable_mut(&mut self, name: &str) -> Option<&mut VariableInfo> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    /// Add a variable record unless one with the same name exists.
    pub fn add_variable(&mut self, var: VariableInfo) {
        if self.variable(&var.name).is_none() {
            self.variables.push(var);
        }
    }

    /// Record a usage on a (known) variable.
    pub fn add_variable_usage(&mut self, name: &str, usage: VariableUsage) {
        if let Some(var) = self.variable_mut(name) {
            var.add_usage(usage);
        }
    }

    /// Record an array access; array accesses count as memory operations.
    pub fn add_array_access(&mut self, access: ArrayAccess) {
        self.array_accesses.push(access);
        self.metrics.memory_accesses += 1;
    }

    /// Record a pointer operation.
    pub fn add_pointer_op(&mut self, op: PointerOp) {
        self.pointer_ops.push(op);
    }

    /// Record a call.
    pub fn add_call(&mut self, call: CallEvent) {
        self.calls.push(call);
        self.metrics.function_calls += 1;
    }

    /// Mark the extracted iterator's role, if its record exists.
    pub fn mark_induction_variable(&mut self) {
        if let Some(name) = self.bounds.induction_var.clone() {
            if let Some(var) = self.variable_mut(&name) {
                var.role = VariableRole::Induction;
            }
        }
    }

    /// Outermost loop (no enclosing loop).
    pub fn is_outermost(&self) -> bool {
        self.depth == 0
    }

    /// Computationally hot per the weighted score.
    pub fn is_hot(&self) -> bool {
        self.metrics.hotness_score > 10.0
    }

    /// Settled verdict says the loop is safe.
    pub fn is_parallelizable(&self) -> bool {
        self.verdict == Verdict::Parallelizable
    }

    /// Any recorded call that is not side-effect free.
    pub fn has_unsafe_calls(&self) -> bool {
        self.calls.iter().any(|c| !c.is_safe())
    }

    /// Record a hazard warning.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(read: bool, write: bool) -> VariableUsage {
        VariableUsage::new(Span::dummy(), read, write)
    }

    #[test]
    fn test_variable_predicates() {
        let mut var = VariableInfo::new("sum", Span::dummy(), VariableScope::FunctionLocal);
        assert!(!var.is_potential_dependency());

        var.add_usage(usage(true, false));
        var.add_usage(usage(false, true));
        assert!(var.has_reads());
        assert!(var.has_writes());
        assert!(var.is_potential_dependency());

        var.role = VariableRole::Induction;
        assert!(!var.is_potential_dependency());
    }

    #[test]
    fn test_metrics_hotness() {
        let mut metrics = LoopMetrics {
            arithmetic_ops: 2,
            memory_accesses: 3,
            function_calls: 1,
            comparisons: 2,
            assignments: 2,
            hotness_score: 0.0,
        };
        metrics.finalize();
        assert!((metrics.hotness_score - (2.0 + 6.0 + 5.0 + 1.0 + 3.0)).abs() < 1e-9);
        assert_eq!(metrics.total_ops(), 10);
    }

    #[test]
    fn test_loop_variable_dedup() {
        let mut info = LoopInfo::new(LoopId(0), LoopKind::Counted, Span::dummy(), 0, None);
        info.add_variable(VariableInfo::new("i", Span::dummy(), VariableScope::LoopLocal));
        info.add_variable(VariableInfo::new("i", Span::dummy(), VariableScope::FunctionLocal));
        assert_eq!(info.variables.len(), 1);
        assert_eq!(info.variables[0].scope, VariableScope::LoopLocal);
    }

    #[test]
    fn test_memory_access_counter() {
        let mut info = LoopInfo::new(LoopId(0), LoopKind::Counted, Span::dummy(), 0, None);
        let subscript = Expr::ident("i", Span::dummy());
        info.add_array_access(ArrayAccess::new("A", subscript, Span::dummy(), true));
        assert_eq!(info.metrics.memory_accesses, 1);
    }
}
