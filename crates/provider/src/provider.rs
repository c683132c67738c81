//! Component 4: the provider façade — §6.1's contract, realized as an
//! `async_trait`, matching the teacher's `MultiTypeFetch`/
//! `TerminusDBClient` convention of one async trait per storage
//! capability.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::opts::{EmbeddingsConfig, HybridSearchOpts, ListOpts, SearchOpts, SemanticSearchOpts};
use crate::record::{HybridScoredRecord, Record, ScoredRecord};

/// The storage adapter contract every backend (filesystem, SQLite,
/// ClickHouse, in-memory) implements. Required methods are the CRUD +
/// graph-edge core; optional capabilities are separate `async fn`s with
/// default implementations that raise [`ProviderError::CapabilityNotSupported`],
/// so a provider opts in simply by overriding the ones it supports and the
/// matching `has_*` probe.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn get(&self, type_: &str, id: &str) -> Result<Option<Record>, ProviderError>;

    async fn list(&self, type_: &str, opts: ListOpts) -> Result<Vec<Record>, ProviderError>;

    async fn search(
        &self,
        type_: &str,
        query: &str,
        opts: SearchOpts,
    ) -> Result<Vec<Record>, ProviderError>;

    async fn create(
        &self,
        type_: &str,
        id: Option<&str>,
        data: Record,
    ) -> Result<Record, ProviderError>;

    async fn update(&self, type_: &str, id: &str, data: Record) -> Result<Record, ProviderError>;

    async fn delete(&self, type_: &str, id: &str) -> Result<bool, ProviderError>;

    async fn related(
        &self,
        type_: &str,
        id: &str,
        relation: &str,
    ) -> Result<Vec<Record>, ProviderError>;

    async fn relate(
        &self,
        from_type: &str,
        from_id: &str,
        relation: &str,
        to_type: &str,
        to_id: &str,
        meta: Option<Record>,
    ) -> Result<(), ProviderError>;

    async fn unrelate(
        &self,
        from_type: &str,
        from_id: &str,
        relation: &str,
        to_type: &str,
        to_id: &str,
    ) -> Result<(), ProviderError>;

    // --- Capability probes (§4.4) ---

    fn has_semantic_search(&self) -> bool {
        false
    }

    fn has_hybrid_search(&self) -> bool {
        false
    }

    fn has_events_api(&self) -> bool {
        false
    }

    fn has_actions_api(&self) -> bool {
        false
    }

    fn has_artifacts_api(&self) -> bool {
        false
    }

    fn has_embeddings_config(&self) -> bool {
        false
    }

    // --- Optional capabilities ---

    async fn semantic_search(
        &self,
        _type_: &str,
        _query: &str,
        _opts: SemanticSearchOpts,
    ) -> Result<Vec<ScoredRecord>, ProviderError> {
        Err(ProviderError::capability_not_supported_with_fallback(
            "semantic_search",
            "resolveForwardFuzzy degrades to pure generation",
        ))
    }

    async fn hybrid_search(
        &self,
        _type_: &str,
        _query: &str,
        _opts: HybridSearchOpts,
    ) -> Result<Vec<HybridScoredRecord>, ProviderError> {
        Err(ProviderError::capability_not_supported("hybrid_search"))
    }

    fn set_embeddings_config(&self, _config: EmbeddingsConfig) {}

    fn embeddings_config(&self) -> Option<EmbeddingsConfig> {
        None
    }
}
