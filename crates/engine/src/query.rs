//! The chainable query wrapper and data-loader batching layer referenced
//! by §4.9 — the Rust analogue of the teacher ecosystem's `DBPromise`,
//! minus the thenable trick: results are fetched eagerly and the chain
//! methods then operate on the in-memory page, the way a query builder
//! that has already executed its `list`/`find`/`search` call would.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use graphdb_provider::{Provider, Record};

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::hydrate::{hydrate, Hydrated};

/// Coalesces repeated `provider.get(type, id)` calls within one `.map`
/// pass so fanning relationship loads out across many items doesn't repeat
/// a fetch for the same target — mirroring the teacher's
/// `MultiTypeFetch`/batch-by-id pattern in `terminusdb-orm`.
pub struct DataLoader {
    ctx: EngineContext,
    cache: Mutex<HashMap<(String, String), Option<Record>>>,
}

impl DataLoader {
    pub fn new(ctx: EngineContext) -> Self {
        DataLoader {
            ctx,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn load(&self, type_: &str, id: &str) -> Result<Option<Record>, EngineError> {
        let key = (type_.to_string(), id.to_string());
        if let Some(hit) = self.cache.lock().expect("data loader mutex poisoned").get(&key) {
            return Ok(hit.clone());
        }
        let record = self.ctx.provider.get(type_, id).await?;
        self.cache
            .lock()
            .expect("data loader mutex poisoned")
            .insert(key, record.clone());
        Ok(record)
    }
}

/// A page of hydrated entities with `.filter`/`.sort_by`/`.limit`/`.first`
/// combinators and a concurrent `.map` that shares one [`DataLoader`]
/// across the whole pass.
pub struct EngineQuery {
    ctx: EngineContext,
    items: Vec<Hydrated>,
}

impl EngineQuery {
    pub fn new(ctx: EngineContext, type_name: &str, records: Vec<Record>) -> Self {
        let items = records.into_iter().map(|r| hydrate(&ctx, type_name, r)).collect();
        EngineQuery { ctx, items }
    }

    pub fn filter(mut self, predicate: impl Fn(&Hydrated) -> bool) -> Self {
        self.items.retain(|item| predicate(item));
        self
    }

    pub fn sort_by(mut self, compare: impl FnMut(&Hydrated, &Hydrated) -> std::cmp::Ordering) -> Self {
        self.items.sort_by(compare);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.items.truncate(n);
        self
    }

    pub fn first(mut self) -> Option<Hydrated> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    pub fn into_vec(self) -> Vec<Hydrated> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Run `f` over every item concurrently, sharing one [`DataLoader`] so
    /// relationship loads triggered from inside the callback coalesce by
    /// `(type, id)` across the whole batch.
    pub async fn map<F, Fut, T>(self, f: F) -> Result<Vec<T>, EngineError>
    where
        F: Fn(Hydrated, std::sync::Arc<DataLoader>) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let loader = std::sync::Arc::new(DataLoader::new(self.ctx));
        let futures = self
            .items
            .into_iter()
            .map(|item| f(item, loader.clone()));
        futures::future::try_join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphdb_generator::StubGenerator;
    use graphdb_provider::MemoryProvider;
    use graphdb_schema::{normalize, Declaration, FieldDef};
    use std::sync::Arc;

    fn build_ctx() -> EngineContext {
        let declaration: Declaration =
            [("Post".to_string(), [("title".to_string(), FieldDef::scalar("string"))].into())].into();
        let schema = normalize(&declaration).unwrap();
        EngineContext::new(
            Arc::new(schema),
            Arc::new(MemoryProvider::new()),
            Arc::new(StubGenerator),
        )
    }

    #[tokio::test]
    async fn filter_and_limit_narrow_the_page() {
        let ctx = build_ctx();
        let records: Vec<Record> = (0..5)
            .map(|i| {
                let mut r = Record::new("Post", format!("p_{i}"));
                r.set("views", i);
                r
            })
            .collect();
        let query = EngineQuery::new(ctx, "Post", records)
            .filter(|h| h.data.get("views").and_then(|v| v.as_i64()).unwrap_or(0) >= 2)
            .limit(2);
        assert_eq!(query.len(), 2);
    }

    #[tokio::test]
    async fn map_shares_a_data_loader() {
        let ctx = build_ctx();
        ctx.provider
            .create("Post", Some("dep"), Record::new("Post", "dep"))
            .await
            .unwrap();
        let records: Vec<Record> = (0..3).map(|i| Record::new("Post", format!("p_{i}"))).collect();
        let query = EngineQuery::new(ctx, "Post", records);
        let results = query
            .map(|item, loader| async move {
                let dep = loader.load("Post", "dep").await?;
                Ok::<_, EngineError>((item.data.id().unwrap_or_default().to_string(), dep.is_some()))
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, found)| *found));
    }
}
