//! The pluggable AI `Generator` trait and the hybrid-search fusion helpers
//! that back `resolveForwardFuzzy` and `hybridSearch`.

pub mod context;
pub mod error;
pub mod fusion;
pub mod generator;

pub use context::{FieldRequest, GenerationContext};
pub use error::GeneratorError;
pub use fusion::{normalize_scores, reciprocal_rank_fusion};
pub use generator::{Generator, StubGenerator};
