//! Directive generation: variant selection, confidence scoring and
//! insertion planning for parallelizable loops.

pub mod generator;
pub mod confidence;
pub mod insertion;

pub use confidence::{ConfidenceLevel, ConfidenceScore, ConfidenceScorer};
pub use generator::{GeneratedPragma, PragmaGenerator, PragmaKind};
pub use insertion::{InsertionPlanner, InsertionPoint, SkipReason};
