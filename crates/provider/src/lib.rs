//! §6.1's storage-adapter contract, plus the bundled in-memory provider.
//!
//! [`Provider`] is the uniform capability-typed view over a storage
//! adapter that every other component in the engine consumes: CRUD,
//! `related`/`relate`/`unrelate`, and optional semantic/hybrid search gated
//! by capability probes. [`config`] classifies a `DATABASE_URL` into a
//! [`config::ProviderKind`] without constructing the adapter (adapter
//! construction itself is out of scope for the core). [`filter`] carries
//! the one non-trivial behavior kept from the natural-language query
//! layer: MongoDB-style `where`-clause matching.

pub mod config;
pub mod error;
pub mod filter;
pub mod memory;
pub mod opts;
pub mod provider;
pub mod record;

pub use config::{ProviderConfig, ProviderKind};
pub use error::ProviderError;
pub use memory::MemoryProvider;
pub use opts::{
    EmbeddingsConfig, HybridSearchOpts, ListOpts, Order, SearchOpts, SemanticSearchOpts,
};
pub use provider::Provider;
pub use record::{HybridScoredRecord, Record, ScoredRecord};
