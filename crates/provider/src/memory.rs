//! The bundled in-memory [`Provider`] — test scaffolding, the way the
//! teacher project ships its own `TestDb`/embedded-server test double in
//! `terminusdb-orm::testing` rather than a mocking framework.
//!
//! Supports `semantic_search` via plain token-overlap (Jaccard) scoring so
//! fuzzy-resolution tests in `graphdb-engine` have something real to
//! exercise without pulling in an embeddings backend.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ProviderError;
use crate::filter;
use crate::opts::{ListOpts, Order, SearchOpts, SemanticSearchOpts};
use crate::provider::Provider;
use crate::record::{Record, ScoredRecord};

#[derive(Debug, Clone)]
struct EdgeRow {
    from_type: String,
    from_id: String,
    relation: String,
    to_type: String,
    to_id: String,
}

#[derive(Debug, Default)]
pub struct MemoryProvider {
    records: RwLock<HashMap<(String, String), Record>>,
    edges: RwLock<Vec<EdgeRow>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing `create`. Useful in tests that
    /// want a pre-existing entity for `~>` to match against.
    pub async fn seed(&self, record: Record) {
        let key = (
            record.type_name().unwrap_or_default().to_string(),
            record.id().unwrap_or_default().to_string(),
        );
        self.records.write().await.insert(key, record);
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn get(&self, type_: &str, id: &str) -> Result<Option<Record>, ProviderError> {
        let records = self.records.read().await;
        Ok(records.get(&(type_.to_string(), id.to_string())).cloned())
    }

    async fn list(&self, type_: &str, opts: ListOpts) -> Result<Vec<Record>, ProviderError> {
        let records = self.records.read().await;
        let mut matched: Vec<Record> = records
            .values()
            .filter(|r| r.type_name() == Some(type_))
            .filter(|r| {
                opts.where_
                    .as_ref()
                    .map(|w| filter::matches(r, w))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        if let Some(order_by) = &opts.order_by {
            matched.sort_by(|a, b| {
                let av = a.get(order_by);
                let bv = b.get(order_by);
                let ord = av
                    .and_then(|v| v.as_f64())
                    .zip(bv.and_then(|v| v.as_f64()))
                    .map(|(x, y)| x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal))
                    .unwrap_or_else(|| {
                        av.and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .cmp(bv.and_then(|v| v.as_str()).unwrap_or_default())
                    });
                match opts.order {
                    Order::Asc => ord,
                    Order::Desc => ord.reverse(),
                }
            });
        }

        let offset = opts.offset.unwrap_or(0);
        let mut matched: Vec<Record> = matched.into_iter().skip(offset).collect();
        if let Some(limit) = opts.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn search(
        &self,
        type_: &str,
        query: &str,
        opts: SearchOpts,
    ) -> Result<Vec<Record>, ProviderError> {
        let query_lower = query.to_lowercase();
        let records = self.records.read().await;
        let mut matched: Vec<Record> = records
            .values()
            .filter(|r| r.type_name() == Some(type_))
            .filter(|r| record_text(r).to_lowercase().contains(&query_lower))
            .cloned()
            .collect();
        let offset = opts.offset.unwrap_or(0);
        matched = matched.into_iter().skip(offset).collect();
        if let Some(limit) = opts.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn create(
        &self,
        type_: &str,
        id: Option<&str>,
        mut data: Record,
    ) -> Result<Record, ProviderError> {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let key = (type_.to_string(), id.clone());

        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(ProviderError::AlreadyExists {
                type_: type_.to_string(),
                id,
            });
        }
        data.set_type(type_);
        data.set_id(id.clone());
        records.insert(key, data.clone());
        Ok(data)
    }

    async fn update(&self, type_: &str, id: &str, data: Record) -> Result<Record, ProviderError> {
        let key = (type_.to_string(), id.to_string());
        let mut records = self.records.write().await;
        let Some(existing) = records.get_mut(&key) else {
            return Err(ProviderError::NotFound {
                type_: type_.to_string(),
                id: id.to_string(),
            });
        };
        existing.merge(data);
        Ok(existing.clone())
    }

    async fn delete(&self, type_: &str, id: &str) -> Result<bool, ProviderError> {
        let key = (type_.to_string(), id.to_string());
        Ok(self.records.write().await.remove(&key).is_some())
    }

    async fn related(
        &self,
        type_: &str,
        id: &str,
        relation: &str,
    ) -> Result<Vec<Record>, ProviderError> {
        let edges = self.edges.read().await;
        let targets: Vec<(String, String)> = edges
            .iter()
            .filter(|e| e.from_type == type_ && e.from_id == id && e.relation == relation)
            .map(|e| (e.to_type.clone(), e.to_id.clone()))
            .collect();
        drop(edges);

        let records = self.records.read().await;
        Ok(targets
            .into_iter()
            .filter_map(|key| records.get(&key).cloned())
            .collect())
    }

    async fn relate(
        &self,
        from_type: &str,
        from_id: &str,
        relation: &str,
        to_type: &str,
        to_id: &str,
        _meta: Option<Record>,
    ) -> Result<(), ProviderError> {
        let mut edges = self.edges.write().await;
        let duplicate = edges.iter().any(|e| {
            e.from_type == from_type
                && e.from_id == from_id
                && e.relation == relation
                && e.to_type == to_type
                && e.to_id == to_id
        });
        if !duplicate {
            edges.push(EdgeRow {
                from_type: from_type.to_string(),
                from_id: from_id.to_string(),
                relation: relation.to_string(),
                to_type: to_type.to_string(),
                to_id: to_id.to_string(),
            });
        }
        Ok(())
    }

    async fn unrelate(
        &self,
        from_type: &str,
        from_id: &str,
        relation: &str,
        to_type: &str,
        to_id: &str,
    ) -> Result<(), ProviderError> {
        let mut edges = self.edges.write().await;
        edges.retain(|e| {
            !(e.from_type == from_type
                && e.from_id == from_id
                && e.relation == relation
                && e.to_type == to_type
                && e.to_id == to_id)
        });
        Ok(())
    }

    fn has_semantic_search(&self) -> bool {
        true
    }

    async fn semantic_search(
        &self,
        type_: &str,
        query: &str,
        opts: SemanticSearchOpts,
    ) -> Result<Vec<ScoredRecord>, ProviderError> {
        let query_tokens = tokenize(query);
        let records = self.records.read().await;
        let min_score = opts.min_score.unwrap_or(0.0);

        let mut scored: Vec<ScoredRecord> = records
            .values()
            .filter(|r| r.type_name() == Some(type_))
            .filter_map(|r| {
                let text_tokens = tokenize(&record_text(r));
                let score = jaccard(&query_tokens, &text_tokens);
                (score >= min_score).then(|| ScoredRecord {
                    record: r.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(limit) = opts.limit {
            scored.truncate(limit);
        }
        Ok(scored)
    }
}

fn record_text(record: &Record) -> String {
    record
        .as_map()
        .values()
        .filter_map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokenize(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get() {
        let p = MemoryProvider::new();
        let rec = p
            .create("Post", Some("p_1"), {
                let mut r = Record::new("Post", "p_1");
                r.set("title", "Hello");
                r
            })
            .await
            .unwrap();
        assert_eq!(rec.id(), Some("p_1"));
        let fetched = p.get("Post", "p_1").await.unwrap().unwrap();
        assert_eq!(fetched.get_str("title"), Some("Hello"));
    }

    #[tokio::test]
    async fn create_duplicate_errors() {
        let p = MemoryProvider::new();
        p.create("Post", Some("p_1"), Record::new("Post", "p_1"))
            .await
            .unwrap();
        let err = p
            .create("Post", Some("p_1"), Record::new("Post", "p_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn relate_and_related() {
        let p = MemoryProvider::new();
        p.create("Author", Some("a_1"), Record::new("Author", "a_1"))
            .await
            .unwrap();
        p.create("Post", Some("p_1"), Record::new("Post", "p_1"))
            .await
            .unwrap();
        p.relate("Author", "a_1", "posts", "Post", "p_1", None)
            .await
            .unwrap();
        let related = p.related("Author", "a_1", "posts").await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id(), Some("p_1"));
    }

    #[tokio::test]
    async fn relate_is_idempotent() {
        let p = MemoryProvider::new();
        p.relate("A", "a1", "rel", "B", "b1", None).await.unwrap();
        p.relate("A", "a1", "rel", "B", "b1", None).await.unwrap();
        let related = p.related("A", "a1", "rel").await.unwrap();
        assert_eq!(related.len(), 0); // target never created, but no panic/dup edge either
    }

    #[tokio::test]
    async fn semantic_search_scores_overlap() {
        let p = MemoryProvider::new();
        let mut cat = Record::new("Category", "cat_1");
        cat.set("name", "renewable energy");
        p.seed(cat).await;

        let results = p
            .semantic_search("Category", "energy", SemanticSearchOpts::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].score > 0.0);
    }

    #[tokio::test]
    async fn list_with_where_clause() {
        let p = MemoryProvider::new();
        for i in 0..3 {
            let mut r = Record::new("Post", format!("p_{i}"));
            r.set("views", i);
            p.seed(r).await;
        }
        let results = p
            .list(
                "Post",
                ListOpts::where_clause(serde_json::json!({"views": {"$gte": 1}})),
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }
}
