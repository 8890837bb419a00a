//! Loop discovery and the dependency analyses.
//!
//! The visitor collects per-loop facts; the five analyzers each judge one
//! hazard family; the manager fuses their verdicts; the driver wires the
//! whole pipeline together per translation unit.

pub mod loop_info;
pub mod visitor;
pub mod scalar;
pub mod array_deps;
pub mod cross_iteration;
pub mod pointer;
pub mod calls;
pub mod manager;
pub mod driver;

pub use array_deps::{ArrayDependency, ArrayDependencyAnalyzer, ArrayDependencyKind};
pub use calls::{CallAnalyzer, CallSafety};
pub use cross_iteration::{CrossIterationAnalyzer, CrossIterationConflict, IterationConflictKind};
pub use driver::{analyze_unit, AnalysisReport, PlannedPragma};
pub use loop_info::{
    ArrayAccess, CallEvent, LoopBounds, LoopId, LoopInfo, LoopKind, LoopMetrics, PointerOp,
    VariableInfo, VariableRole, VariableScope, VariableUsage, Verdict,
};
pub use manager::DependencyManager;
pub use pointer::{PointerAnalyzer, PointerRisk};
pub use scalar::ScalarAnalyzer;
pub use visitor::LoopVisitor;
