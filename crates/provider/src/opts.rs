//! Option structs accepted by [`crate::Provider`] methods.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOpts {
    pub where_: Option<Value>,
    pub order_by: Option<String>,
    pub order: Order,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListOpts {
    pub fn where_clause(where_: Value) -> Self {
        ListOpts {
            where_: Some(where_),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOpts {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticSearchOpts {
    pub min_score: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridSearchOpts {
    pub rrf_k: Option<f64>,
    pub fts_weight: Option<f64>,
    pub semantic_weight: Option<f64>,
    pub min_score: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmbeddingsConfig {
    pub model: Option<String>,
    pub dimensions: Option<usize>,
}
