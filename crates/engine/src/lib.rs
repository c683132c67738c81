//! `graphdb-engine` — components 5 through 10 of the schema-first graph
//! database: draft building, reference resolution, cascade generation,
//! lazy relation hydration, the per-type pipeline façade, the system-entity
//! projector's provider-aware half, and the shared error taxonomy.
//!
//! [`EngineContext`] is the single handle every operation takes: the
//! normalized schema, the storage [`graphdb_provider::Provider`], and the
//! AI [`graphdb_generator::Generator`], bundled as `Arc`s per the teacher's
//! `GlobalClient` convention generalized away from a true global (see
//! `context`'s module doc and DESIGN.md).

pub mod cascade;
pub mod context;
pub mod draft;
pub mod error;
pub mod hydrate;
pub mod pipeline;
pub mod query;
pub mod reference;
pub mod system;

pub use cascade::{cascade, CascadeErrorPolicy, CascadeOptions, CascadePhase, CascadeProgress, CascadeReport};
pub use context::EngineContext;
pub use draft::{draft, ChunkSink, Draft, DraftOptions, Phase, RefEntry, ReferenceSpec};
pub use error::{EngineError, ResolutionError};
pub use hydrate::{hydrate, Hydrated, LazyRelation, LazyRelationMany, RelationProxy, TargetRef};
pub use pipeline::{CreateOptions, Created, EntityOps, ForEachOptions};
pub use query::{DataLoader, EngineQuery};
pub use reference::{generate_minimal_entity, resolve, ErrorPolicy, ResolveOptions, Resolved};

/// Re-exports the handful of names most call sites need, without forcing a
/// `use graphdb_engine::{context::EngineContext, pipeline::EntityOps, ...}`
/// spray at every call site — the teacher's own `terminusdb_schema::prelude`
/// convention.
pub mod prelude {
    pub use crate::context::EngineContext;
    pub use crate::draft::{Draft, DraftOptions, Phase};
    pub use crate::error::EngineError;
    pub use crate::hydrate::{Hydrated, LazyRelation, LazyRelationMany, RelationProxy};
    pub use crate::pipeline::{CreateOptions, Created, EntityOps, ForEachOptions};
    pub use crate::query::EngineQuery;
    pub use crate::reference::ResolveOptions;
    pub use graphdb_provider::Record;
}
