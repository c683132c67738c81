//! The wire shape every provider speaks: a loosely-typed JSON object that
//! always carries `$id` and `$type`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored (or about-to-be-stored) entity, as a JSON object.
///
/// Every persisted record carries `$id` (string) and `$type` (type name),
/// per §3. `Record` is a thin wrapper over the underlying JSON map so the
/// engine can stamp sibling metadata fields (`<field>$matched`,
/// `<field>$score`, `$generated`, …) without a fixed struct shape getting in
/// the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("$type".to_string(), Value::String(type_name.into()));
        map.insert("$id".to_string(), Value::String(id.into()));
        Record(map)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("$id").and_then(Value::as_str)
    }

    pub fn type_name(&self) -> Option<&str> {
        self.0.get("$type").and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.0.insert("$id".to_string(), Value::String(id.into()));
        self
    }

    pub fn set_type(&mut self, type_name: impl Into<String>) -> &mut Self {
        self.0
            .insert("$type".to_string(), Value::String(type_name.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Merge `other`'s keys into `self`, overwriting on conflict — the
    /// shape of a provider `update`/`upsert` patch.
    pub fn merge(&mut self, other: Record) {
        for (k, v) in other.0 {
            self.0.insert(k, v);
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record(map)
    }
}

/// A record scored by semantic similarity — the shape returned by
/// `semantic_search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: Record,
    pub score: f64,
}

/// A record scored by hybrid (full-text + semantic) search, carrying the
/// reciprocal-rank-fusion score plus the component ranks it was derived
/// from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridScoredRecord {
    pub record: Record,
    pub rrf_score: f64,
    pub fts_rank: Option<usize>,
    pub semantic_rank: Option<usize>,
    pub score: f64,
}
