//! Component 6: the reference resolver (§4.6).
//!
//! Turns every `$refs` entry of a [`Draft`] into a concrete target id, by
//! semantic search, recursive generation, or (for values the caller already
//! supplied) plain acceptance. Produces a [`Resolved`] value whose
//! `phase == Phase::Resolved`.

use std::collections::BTreeSet;

use graphdb_provider::{Provider, Record, SemanticSearchOpts};
use graphdb_schema::{OperatorToken, ParsedField};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::context::EngineContext;
use crate::draft::{Draft, Phase, RefEntry, ReferenceSpec};
use crate::error::{EngineError, ResolutionError};

/// §4.6's error policy: abort on the first resolution failure (default), or
/// accumulate every failure into `Resolved::errors` and keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub on_error: ErrorPolicy,
    /// Deferred by the caller when cascade generation is enabled: `->`
    /// array fields with no caller-supplied value are left empty here and
    /// populated later by [`crate::cascade`].
    pub defer_arrays_to_cascade: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            on_error: ErrorPolicy::default(),
            defer_arrays_to_cascade: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub phase: Phase,
    pub data: Record,
    pub errors: Vec<ResolutionError>,
}

/// Resolve every `$refs` entry of `draft` into a concrete value.
///
/// `self_id` is the pre-generated id of the entity being created — threaded
/// through so generated children can stamp `$generatedBy` with it before the
/// parent itself has been persisted (§2's "pre-generated ID ... so children
/// can backlink").
pub async fn resolve(
    ctx: &EngineContext,
    draft: Draft,
    self_id: &str,
    opts: &ResolveOptions,
) -> Result<Resolved, EngineError> {
    let Draft {
        type_name,
        mut data,
        refs,
        ..
    } = draft;

    let mut errors = Vec::new();

    for (field_name, entry) in refs {
        let field = ctx
            .schema
            .field(&type_name, &field_name)
            .cloned()
            .ok_or_else(|| EngineError::NotARelation {
                entity: type_name.clone(),
                field: field_name.clone(),
            })?;

        let single_forward_exact = matches!(
            &entry,
            RefEntry::Single(spec) if spec.operator == OperatorToken::ForwardExact
        );

        let result = match entry {
            RefEntry::Single(spec) => {
                resolve_single(ctx, &type_name, &field, spec, self_id).await
            }
            RefEntry::Many(specs) => {
                resolve_many(ctx, &type_name, &field, specs, self_id, opts.defer_arrays_to_cascade).await
            }
        };

        match result {
            Ok(Some(value)) => {
                // A `->` single only ever reaches `$refs` (and thus this
                // branch) when the caller left it unset, so resolving it
                // here always means it was generated, never merely accepted.
                if single_forward_exact {
                    data.set(format!("{field_name}$autoGenerated"), true);
                }
                data.set(field_name.clone(), value);
            }
            Ok(None) => {
                data.remove(&field_name);
            }
            Err(err) => {
                if opts.on_error == ErrorPolicy::Skip {
                    errors.push(ResolutionError {
                        entity: type_name.clone(),
                        field: field_name.clone(),
                        reason: err.to_string(),
                    });
                    data.remove(&field_name);
                } else {
                    return Err(err);
                }
            }
        }
    }

    stamp_union_matches(ctx, &type_name, &mut data).await?;

    Ok(Resolved {
        phase: Phase::Resolved,
        data,
        errors,
    })
}

/// Resolve one scalar relation field. `Ok(None)` means "leave unset" (an
/// optional forward-exact field with nothing supplied).
async fn resolve_single(
    ctx: &EngineContext,
    entity: &str,
    field: &ParsedField,
    spec: ReferenceSpec,
    self_id: &str,
) -> Result<Option<Value>, EngineError> {
    match spec.operator {
        OperatorToken::ForwardExact => {
            if field.is_optional {
                return Ok(None);
            }
            let child = generate_minimal_entity(ctx, &spec.target_type, self_id, &spec.field).await?;
            Ok(Some(Value::String(child.id().unwrap_or_default().to_string())))
        }
        OperatorToken::ForwardFuzzy => {
            let candidates = candidate_types(&spec);
            let query = spec.prompt.clone().unwrap_or_default();
            if let Some((matched_type, record, score)) =
                best_fuzzy_match(ctx, &candidates, &query, spec.threshold).await?
            {
                write_fuzzy_edge(
                    ctx,
                    entity,
                    &spec.field,
                    self_id,
                    &matched_type,
                    record.id().unwrap_or_default(),
                    score,
                )
                .await?;
                return Ok(Some(Value::String(record.id().unwrap_or_default().to_string())));
            }
            let child = generate_minimal_entity(ctx, &spec.target_type, self_id, &spec.field).await?;
            Ok(Some(Value::String(child.id().unwrap_or_default().to_string())))
        }
        // Backward operators are never drafted (§4.5), so never appear here.
        OperatorToken::BackwardExact | OperatorToken::BackwardFuzzy => Ok(None),
    }
}

async fn resolve_many(
    ctx: &EngineContext,
    entity: &str,
    field: &ParsedField,
    specs: Vec<ReferenceSpec>,
    self_id: &str,
    defer_to_cascade: bool,
) -> Result<Option<Value>, EngineError> {
    if defer_to_cascade
        && specs
            .iter()
            .all(|s| s.operator == OperatorToken::ForwardExact)
    {
        return Ok(None);
    }

    let mut ids = Vec::new();
    for spec in specs {
        match resolve_single(ctx, entity, field, spec, self_id).await? {
            Some(Value::String(id)) => ids.push(id),
            _ => {}
        }
    }
    Ok(Some(json!(ids)))
}

fn candidate_types(spec: &ReferenceSpec) -> Vec<String> {
    spec.union_types
        .clone()
        .unwrap_or_else(|| vec![spec.target_type.clone()])
}

/// Search every candidate type in parallel, returning the single
/// highest-scoring hit across all of them that meets `threshold`.
async fn best_fuzzy_match(
    ctx: &EngineContext,
    candidate_types: &[String],
    query: &str,
    threshold: f64,
) -> Result<Option<(String, Record, f64)>, EngineError> {
    if !ctx.provider.has_semantic_search() {
        return Ok(None);
    }

    let searches = candidate_types.iter().map(|type_| {
        let provider = ctx.provider.clone();
        let type_ = type_.clone();
        let query = query.to_string();
        async move {
            let results = provider
                .semantic_search(
                    &type_,
                    &query,
                    SemanticSearchOpts {
                        min_score: Some(threshold),
                        limit: Some(1),
                    },
                )
                .await;
            (type_, results)
        }
    });

    let outcomes = futures::future::join_all(searches).await;

    let mut best: Option<(String, Record, f64)> = None;
    for (type_, results) in outcomes {
        let results = match results {
            Ok(r) => r,
            Err(graphdb_provider::ProviderError::CapabilityNotSupported { .. }) => continue,
            Err(err) => return Err(err.into()),
        };
        if let Some(top) = results.into_iter().next() {
            if top.score >= threshold {
                let better = best.as_ref().map(|(_, _, s)| top.score > *s).unwrap_or(true);
                if better {
                    best = Some((type_, top.record, top.score));
                }
            }
        }
    }

    Ok(best)
}

async fn write_fuzzy_edge(
    ctx: &EngineContext,
    from_type: &str,
    field: &str,
    from_id: &str,
    to_type: &str,
    to_id: &str,
    similarity: f64,
) -> Result<(), EngineError> {
    let edge_id = format!("edge:{from_type}:{field}:{from_id}:{to_type}:{to_id}");
    let mut record = Record::new("Edge", edge_id.clone());
    record.set("from", from_type);
    record.set("name", field);
    record.set("to", to_type);
    record.set("fromId", from_id);
    record.set("toId", to_id);
    record.set("direction", "forward");
    record.set("matchMode", "fuzzy");
    record.set("similarity", similarity);
    record.set("matchedType", to_type);

    match ctx.provider.create("Edge", Some(&edge_id), record).await {
        Ok(_) => Ok(()),
        // §4.6: "Duplicate-Edge-id errors are swallowed" — the edge is
        // already materialized from a prior resolution of the same pair.
        Err(graphdb_provider::ProviderError::AlreadyExists { .. }) => Ok(()),
        Err(err) => Err(EngineError::database("relate_edge", "Edge", edge_id, err)),
    }
}

/// Recursively generate a minimal target entity of `target_type`: fill
/// required scalars via the generator, recursively resolve nested `->`
/// singles only (per §4.6 — not fuzzy, not arrays, which would otherwise
/// amount to an un-opted-in cascade), then persist stamped as generated.
pub async fn generate_minimal_entity(
    ctx: &EngineContext,
    target_type: &str,
    parent_id: &str,
    source_field: &str,
) -> Result<Record, EngineError> {
    let nested = crate::draft::draft(
        ctx,
        target_type,
        Record::default(),
        &crate::draft::DraftOptions::default(),
    )
    .await?;

    let mut data = nested.data;
    let new_id = Uuid::new_v4().to_string();

    for (field_name, entry) in nested.refs {
        let RefEntry::Single(spec) = entry else {
            // Arrays are not recursed into for minimal generation.
            data.remove(&field_name);
            continue;
        };
        if spec.operator != OperatorToken::ForwardExact {
            data.remove(&field_name);
            continue;
        }
        let field = ctx.schema.field(target_type, &field_name).cloned();
        if field.as_ref().map(|f| f.is_optional).unwrap_or(false) {
            data.remove(&field_name);
            continue;
        }
        let child = Box::pin(generate_minimal_entity(ctx, &spec.target_type, &new_id, &field_name)).await?;
        data.set(
            field_name.clone(),
            Value::String(child.id().unwrap_or_default().to_string()),
        );
        data.set(format!("{field_name}$autoGenerated"), true);
    }

    data.set("$generated", true);
    data.set("$generatedBy", parent_id);
    data.set("$sourceField", source_field);

    ctx.provider
        .create(target_type, Some(&new_id), data)
        .await
        .map_err(|err| EngineError::database("create", target_type, new_id.clone(), err))
}

/// Post-pass: for every union-typed forward relation field on `type_name`
/// whose value is a plain id the caller supplied directly (never entered
/// `$refs` because `draft` only records placeholders for *unset* fields),
/// probe each union member type and stamp `<field>$matchedType` with
/// whichever one actually holds that id (§3, scenario 5).
async fn stamp_union_matches(
    ctx: &EngineContext,
    type_name: &str,
    data: &mut Record,
) -> Result<(), EngineError> {
    let Some(fields) = ctx.schema.fields(type_name) else {
        return Ok(());
    };

    let mut seen: BTreeSet<String> = BTreeSet::new();
    for field in fields.values() {
        if !field.is_relation || field.is_backward() {
            continue;
        }
        let Some(union_types) = &field.union_types else {
            continue;
        };
        if seen.contains(&field.name) {
            continue;
        }
        seen.insert(field.name.clone());

        let matched_key = format!("{}$matchedType", field.name);
        if data.contains_key(&matched_key) {
            continue;
        }
        let Some(id) = data.get_str(&field.name).map(str::to_string) else {
            continue;
        };

        for candidate in union_types {
            if ctx.provider.get(candidate, &id).await?.is_some() {
                data.set(matched_key, candidate.clone());
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{draft, DraftOptions};
    use graphdb_generator::StubGenerator;
    use graphdb_provider::MemoryProvider;
    use graphdb_schema::{normalize, Declaration, FieldDef};
    use std::sync::Arc;

    fn build_ctx(decl: &[(&str, &[(&str, &str)])]) -> EngineContext {
        let declaration: Declaration = decl
            .iter()
            .map(|(entity, fields)| {
                let map = fields
                    .iter()
                    .map(|(n, d)| (n.to_string(), FieldDef::scalar(*d)))
                    .collect();
                (entity.to_string(), map)
            })
            .collect();
        let schema = normalize(&declaration).unwrap();
        EngineContext::new(
            Arc::new(schema),
            Arc::new(MemoryProvider::new()),
            Arc::new(StubGenerator),
        )
    }

    #[tokio::test]
    async fn forward_exact_auto_generates() {
        let ctx = build_ctx(&[
            ("Startup", &[("name", "string"), ("idea", "->Idea")]),
            ("Idea", &[("description", "string")]),
        ]);
        let mut data = Record::default();
        data.set("name", "Acme");
        let d = draft(&ctx, "Startup", data, &DraftOptions::default()).await.unwrap();
        let resolved = resolve(&ctx, d, "s_1", &ResolveOptions::default()).await.unwrap();
        assert_eq!(resolved.phase, Phase::Resolved);
        let idea_id = resolved.data.get_str("idea").unwrap().to_string();
        let idea = ctx.provider.get("Idea", &idea_id).await.unwrap().unwrap();
        assert_eq!(idea.get("$generatedBy").and_then(|v| v.as_str()), Some("s_1"));
    }

    #[tokio::test]
    async fn forward_exact_auto_generation_stamps_sibling_flag() {
        let ctx = build_ctx(&[
            ("Startup", &[("name", "string"), ("idea", "->Idea")]),
            ("Idea", &[("description", "string")]),
        ]);
        let mut data = Record::default();
        data.set("name", "Acme");
        let d = draft(&ctx, "Startup", data, &DraftOptions::default()).await.unwrap();
        let resolved = resolve(&ctx, d, "s_1", &ResolveOptions::default()).await.unwrap();
        assert_eq!(resolved.data.get("idea$autoGenerated"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn optional_forward_exact_is_skipped() {
        let ctx = build_ctx(&[("Node", &[("name", "string"), ("parent", "->Node?")])]);
        let d = draft(&ctx, "Node", {
            let mut r = Record::default();
            r.set("name", "root");
            r
        }, &DraftOptions::default()).await.unwrap();
        let resolved = resolve(&ctx, d, "n_1", &ResolveOptions::default()).await.unwrap();
        assert!(!resolved.data.contains_key("parent"));
    }

    #[tokio::test]
    async fn fuzzy_hits_existing_entity() {
        let ctx = build_ctx(&[
            ("Article", &[("title", "string"), ("category", "~>Category(0.1)")]),
            ("Category", &[("name", "string")]),
        ]);
        let mut cat = Record::new("Category", "cat_1");
        cat.set("name", "renewable energy");
        ctx.provider.create("Category", Some("cat_1"), cat).await.unwrap();

        let mut data = Record::default();
        data.set("title", "Solar");
        data.set("categoryHint", "renewable energy");
        let d = draft(&ctx, "Article", data, &DraftOptions::default()).await.unwrap();
        let resolved = resolve(&ctx, d, "art_1", &ResolveOptions::default()).await.unwrap();
        assert_eq!(resolved.data.get_str("category"), Some("cat_1"));
    }

    #[tokio::test]
    async fn fuzzy_miss_generates_and_stamps_edge() {
        let ctx = build_ctx(&[
            ("Article", &[("title", "string"), ("category", "~>Category(0.9)")]),
            ("Category", &[("name", "string")]),
        ]);
        let mut data = Record::default();
        data.set("title", "Solar");
        data.set("categoryHint", "completely unrelated phrase");
        let d = draft(&ctx, "Article", data, &DraftOptions::default()).await.unwrap();
        let resolved = resolve(&ctx, d, "art_1", &ResolveOptions::default()).await.unwrap();
        let cat_id = resolved.data.get_str("category").unwrap().to_string();
        let cat = ctx.provider.get("Category", &cat_id).await.unwrap().unwrap();
        assert_eq!(cat.get("$generated"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn union_field_supplied_directly_gets_matched_type_stamped() {
        let ctx = build_ctx(&[
            ("Post", &[("subject", "->Person|Company")]),
            ("Person", &[("name", "string")]),
            ("Company", &[("name", "string")]),
        ]);
        ctx.provider
            .create("Person", Some("per_9"), Record::new("Person", "per_9"))
            .await
            .unwrap();

        let mut data = Record::default();
        data.set("subject", "per_9");
        let d = draft(&ctx, "Post", data, &DraftOptions::default()).await.unwrap();
        let resolved = resolve(&ctx, d, "post_1", &ResolveOptions::default()).await.unwrap();
        assert_eq!(resolved.data.get_str("subject$matchedType"), Some("Person"));
    }
}
