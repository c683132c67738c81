//! Component 9: per-type pipeline entity operations (§4.9).
//!
//! `EntityOps` is the per-declared-type façade: `get`/`list`/`find`/
//! `search` return an [`EngineQuery`]; `create` composes draft → resolve →
//! persist → relate → (optional cascade) → hydrate; `for_each` bounds
//! concurrency with a counting semaphore, mirroring the teacher's
//! `MultiTypeFetch` batch helpers generalized to an arbitrary callback.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::instrument;

use graphdb_provider::{HybridSearchOpts, ListOpts, Provider, Record, SearchOpts, SemanticSearchOpts};

use crate::cascade::{cascade, CascadeOptions, CascadeReport};
use crate::context::EngineContext;
use crate::draft::{draft, Draft, DraftOptions};
use crate::error::EngineError;
use crate::hydrate::{hydrate, Hydrated};
use crate::query::EngineQuery;
use crate::reference::{resolve, ResolveOptions};

#[derive(Clone, Default)]
pub struct CreateOptions {
    pub draft_only: bool,
    pub draft: DraftOptions,
    pub resolve: ResolveOptions,
    pub cascade: Option<CascadeOptions>,
}

/// The outcome of [`EntityOps::create`]: either a still-unresolved draft
/// (`draft_only:true`) or a fully persisted, hydrated entity plus whatever
/// the cascade step reported.
pub enum Created {
    Draft(Draft),
    Entity {
        entity: Hydrated,
        cascade: Option<CascadeReport>,
    },
}

#[derive(Clone, Default)]
pub struct ForEachOptions {
    pub concurrency: usize,
    pub on_progress: Option<Arc<dyn Fn(usize, usize) + Send + Sync>>,
}

pub struct EntityOps {
    ctx: EngineContext,
    type_name: String,
}

impl EntityOps {
    pub fn new(ctx: EngineContext, type_name: impl Into<String>) -> Self {
        EntityOps {
            ctx,
            type_name: type_name.into(),
        }
    }

    #[instrument(skip(self), fields(type_ = %self.type_name))]
    pub async fn get(&self, id: &str) -> Result<Option<Hydrated>, EngineError> {
        let record = self.ctx.provider.get(&self.type_name, id).await?;
        Ok(record.map(|r| hydrate(&self.ctx, &self.type_name, r)))
    }

    pub async fn list(&self, opts: ListOpts) -> Result<EngineQuery, EngineError> {
        let records = self.ctx.provider.list(&self.type_name, opts).await?;
        Ok(EngineQuery::new(self.ctx.clone(), &self.type_name, records))
    }

    pub async fn find(&self, where_: Value) -> Result<EngineQuery, EngineError> {
        self.list(ListOpts::where_clause(where_)).await
    }

    pub async fn search(&self, query: &str, opts: SearchOpts) -> Result<EngineQuery, EngineError> {
        let records = self.ctx.provider.search(&self.type_name, query, opts).await?;
        Ok(EngineQuery::new(self.ctx.clone(), &self.type_name, records))
    }

    pub async fn semantic_search(
        &self,
        query: &str,
        opts: SemanticSearchOpts,
    ) -> Result<Vec<(Hydrated, f64)>, EngineError> {
        if !self.ctx.provider.has_semantic_search() {
            return Err(EngineError::CapabilityNotSupported {
                capability: "semantic_search",
                fallback: None,
            });
        }
        let scored = self.ctx.provider.semantic_search(&self.type_name, query, opts).await?;
        Ok(scored
            .into_iter()
            .map(|s| (hydrate(&self.ctx, &self.type_name, s.record), s.score))
            .collect())
    }

    pub async fn hybrid_search(
        &self,
        query: &str,
        opts: HybridSearchOpts,
    ) -> Result<Vec<(Hydrated, f64)>, EngineError> {
        if !self.ctx.provider.has_hybrid_search() {
            return Err(EngineError::CapabilityNotSupported {
                capability: "hybrid_search",
                fallback: None,
            });
        }
        let scored = self.ctx.provider.hybrid_search(&self.type_name, query, opts).await?;
        Ok(scored
            .into_iter()
            .map(|s| (hydrate(&self.ctx, &self.type_name, s.record), s.score))
            .collect())
    }

    pub async fn draft(&self, partial: Record, opts: &DraftOptions) -> Result<Draft, EngineError> {
        draft(&self.ctx, &self.type_name, partial, opts).await
    }

    pub async fn resolve(
        &self,
        draft: Draft,
        self_id: &str,
        opts: &ResolveOptions,
    ) -> Result<Record, EngineError> {
        let resolved = resolve(&self.ctx, draft, self_id, opts).await?;
        Ok(resolved.data)
    }

    /// `draft` → `resolve` → `provider.create` → relate every pending
    /// relation → (optional) cascade → hydrate. A pre-generated id is
    /// threaded through so generated children can backlink via
    /// `$generatedBy` before the parent itself is persisted (§2).
    #[instrument(skip(self, partial, opts), fields(type_ = %self.type_name))]
    pub async fn create(&self, id: Option<String>, partial: Record, opts: CreateOptions) -> Result<Created, EngineError> {
        crate::system::reject_if_system_entity(&self.type_name, "create")?;
        let self_id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let drafted = draft(&self.ctx, &self.type_name, partial, &opts.draft).await?;
        if opts.draft_only {
            return Ok(Created::Draft(drafted));
        }

        let field_names: Vec<String> = drafted.refs.keys().cloned().collect();
        let resolved = resolve(&self.ctx, drafted, &self_id, &opts.resolve).await?;

        let persisted = self
            .ctx
            .provider
            .create(&self.type_name, Some(&self_id), resolved.data)
            .await?;

        for field_name in &field_names {
            let Some(field) = self.ctx.schema.field(&self.type_name, field_name) else {
                continue;
            };
            let target_type = crate::hydrate::matched_type(&persisted, field_name)
                .unwrap_or_else(|| field.candidate_types().into_iter().next().unwrap_or_default());
            match persisted.get(field_name) {
                Some(Value::String(child_id)) => {
                    self.ctx
                        .provider
                        .relate(&self.type_name, &self_id, field_name, &target_type, child_id, None)
                        .await?;
                }
                Some(Value::Array(items)) => {
                    for item in items {
                        if let Some(child_id) = item.as_str() {
                            self.ctx
                                .provider
                                .relate(&self.type_name, &self_id, field_name, &target_type, child_id, None)
                                .await?;
                        }
                    }
                }
                _ => {}
            }
        }

        let cascade_report = if let Some(cascade_opts) = &opts.cascade {
            Some(cascade(&self.ctx, &self.type_name, &self_id, cascade_opts).await?)
        } else {
            None
        };

        let final_record = self
            .ctx
            .provider
            .get(&self.type_name, &self_id)
            .await?
            .unwrap_or(persisted);

        Ok(Created::Entity {
            entity: hydrate(&self.ctx, &self.type_name, final_record),
            cascade: cascade_report,
        })
    }

    pub async fn update(&self, id: &str, partial: Record) -> Result<Hydrated, EngineError> {
        crate::system::reject_if_system_entity(&self.type_name, "update")?;
        let record = self.ctx.provider.update(&self.type_name, id, partial).await?;
        Ok(hydrate(&self.ctx, &self.type_name, record))
    }

    pub async fn upsert(&self, id: &str, data: Record) -> Result<Hydrated, EngineError> {
        crate::system::reject_if_system_entity(&self.type_name, "upsert")?;
        let existing = self.ctx.provider.get(&self.type_name, id).await?;
        let record = if existing.is_some() {
            self.ctx.provider.update(&self.type_name, id, data).await?
        } else {
            self.ctx.provider.create(&self.type_name, Some(id), data).await?
        };
        Ok(hydrate(&self.ctx, &self.type_name, record))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, EngineError> {
        crate::system::reject_if_system_entity(&self.type_name, "delete")?;
        Ok(self.ctx.provider.delete(&self.type_name, id).await?)
    }

    /// Concurrency-limited iteration over `items`, bounded by a counting
    /// semaphore (§5's resource policy). A callback error for one item
    /// does not cancel the others already in flight.
    pub async fn for_each<T, F, Fut>(
        &self,
        items: Vec<T>,
        opts: ForEachOptions,
        callback: F,
    ) -> Vec<Result<(), EngineError>>
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), EngineError>> + Send,
    {
        let concurrency = opts.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let callback = Arc::new(callback);
        let total = items.len();
        let completed = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let tasks = items.into_iter().map(|item| {
            let semaphore = semaphore.clone();
            let callback = callback.clone();
            let on_progress = opts.on_progress.clone();
            let completed = completed.clone();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let result = callback(item).await;
                let done = completed.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                if let Some(sink) = &on_progress {
                    sink(done, total);
                }
                result
            }
        });

        futures::future::join_all(tasks).await
    }
}
