//! The explicit database-context object recommended by §9's "Global
//! singletons" design note: rather than true process-globals, the
//! process-wide provider and generator handles are held as `Arc<dyn _>`
//! inside one [`EngineContext`] that every operation takes by reference —
//! generalizing the teacher's `GlobalClient` singleton one step further into
//! a non-global handle, per DESIGN.md.

use std::sync::Arc;

use graphdb_generator::Generator;
use graphdb_provider::Provider;
use graphdb_schema::ParsedSchema;

/// Everything a pipeline operation needs that isn't the call's own
/// arguments: the normalized schema, the storage adapter, and the AI
/// generator. Cheap to clone (an `Arc` bundle).
#[derive(Clone)]
pub struct EngineContext {
    pub schema: Arc<ParsedSchema>,
    pub provider: Arc<dyn Provider>,
    pub generator: Arc<dyn Generator>,
}

impl EngineContext {
    pub fn new(
        schema: Arc<ParsedSchema>,
        provider: Arc<dyn Provider>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        EngineContext {
            schema,
            provider,
            generator,
        }
    }
}
