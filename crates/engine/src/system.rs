//! Component 3's provider-aware half: merging runtime fuzzy-match `Edge`
//! rows held by the provider into [`graphdb_schema::system::project`]'s
//! purely schema-derived system entities (§4.3's last sentence). The
//! schema crate can't do this merge itself — it has no `Provider` handle —
//! so it lives here, one layer up, where the engine already holds one.

use std::collections::HashMap;

use graphdb_provider::{ListOpts, Provider};
use graphdb_schema::system::{self, Edge, SystemEntities};
use graphdb_schema::Direction;

use crate::context::EngineContext;
use crate::error::EngineError;

/// Project the virtual system entities for the current schema, then fold in
/// every runtime `Edge` row the provider holds (written by fuzzy relation
/// resolution, §4.6). A runtime row shadows a schema-derived row sharing the
/// same `(from, name)` key — it carries the `similarity`/`matchedType`
/// information the static schema projection cannot know.
pub async fn project(ctx: &EngineContext, verbs: &[String]) -> Result<SystemEntities, EngineError> {
    let mut system = system::project(&ctx.schema, verbs);

    let runtime_rows = ctx.provider.list("Edge", ListOpts::default()).await?;
    if runtime_rows.is_empty() {
        return Ok(system);
    }

    let mut by_key: HashMap<(String, String), usize> = HashMap::new();
    for (i, edge) in system.edges.iter().enumerate() {
        by_key.insert((edge.from.clone(), edge.name.clone()), i);
    }

    for row in runtime_rows {
        let Some(from) = row.get_str("from").map(str::to_string) else {
            continue;
        };
        let Some(name) = row.get_str("name").map(str::to_string) else {
            continue;
        };
        let Some(to) = row.get_str("to").map(str::to_string) else {
            continue;
        };
        let direction = match row.get_str("direction") {
            Some("backward") => Direction::Backward,
            _ => Direction::Forward,
        };
        let similarity = row.get("similarity").and_then(|v| v.as_f64());
        let cardinality = by_key
            .get(&(from.clone(), name.clone()))
            .map(|&i| system.edges[i].cardinality)
            .unwrap_or(graphdb_schema::system::Cardinality::ManyToOne);

        let runtime_edge = Edge {
            from: from.clone(),
            name: name.clone(),
            to,
            direction,
            match_mode: Some(graphdb_schema::MatchMode::Fuzzy),
            cardinality,
            similarity,
        };

        match by_key.get(&(from.clone(), name.clone())) {
            Some(&i) => system.edges[i] = runtime_edge,
            None => {
                by_key.insert((from, name), system.edges.len());
                system.edges.push(runtime_edge);
            }
        }
    }

    Ok(system)
}

/// System entities (`Noun`, `Verb`, `Edge`, `Thing`) are derived, never
/// caller-owned. Every CRUD attempt against one of these type names raises
/// this fixed error rather than reaching the provider (§6's last
/// paragraph).
pub fn reject_if_system_entity(type_name: &str, operation: &'static str) -> Result<(), EngineError> {
    if matches!(type_name, "Noun" | "Verb" | "Edge" | "Thing") {
        return Err(EngineError::SystemEntityReadOnly {
            type_: type_name.to_string(),
            operation,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphdb_generator::StubGenerator;
    use graphdb_provider::{MemoryProvider, Record};
    use graphdb_schema::{normalize, Declaration, FieldDef};
    use std::sync::Arc;
    use serde_json::json;

    fn build_ctx() -> EngineContext {
        let declaration: Declaration = [
            (
                "Post".to_string(),
                [
                    ("title".to_string(), FieldDef::scalar("string")),
                    ("category".to_string(), FieldDef::scalar("~>Category(0.5)")),
                ]
                .into(),
            ),
            (
                "Category".to_string(),
                [("name".to_string(), FieldDef::scalar("string"))].into(),
            ),
        ]
        .into();
        let schema = normalize(&declaration).unwrap();
        EngineContext::new(
            Arc::new(schema),
            Arc::new(MemoryProvider::new()),
            Arc::new(StubGenerator),
        )
    }

    #[tokio::test]
    async fn runtime_fuzzy_edge_shadows_schema_row() {
        let ctx = build_ctx();
        let mut edge = Record::new("Edge", "edge:Post:category:p_1:Category:cat_1");
        edge.set("from", "Post");
        edge.set("name", "category");
        edge.set("to", "Category");
        edge.set("direction", "forward");
        edge.set("matchMode", "fuzzy");
        edge.set("similarity", json!(0.87));
        ctx.provider
            .create("Edge", Some("edge:Post:category:p_1:Category:cat_1"), edge)
            .await
            .unwrap();

        let system = project(&ctx, &[]).await.unwrap();
        let edge = system
            .edges
            .iter()
            .find(|e| e.from == "Post" && e.name == "category")
            .unwrap();
        assert_eq!(edge.similarity, Some(0.87));
    }

    #[tokio::test]
    async fn system_entities_reject_direct_writes() {
        let err = reject_if_system_entity("Noun", "create").unwrap_err();
        assert!(matches!(err, EngineError::SystemEntityReadOnly { .. }));
        assert!(reject_if_system_entity("Post", "create").is_ok());
    }
}
