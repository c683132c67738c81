//! Component 7: the cascade generator (§4.7).
//!
//! Recursively materializes forward relations of an already-persisted
//! entity, walking `->`/`~>` fields through child entities up to a bounded
//! depth, reporting progress and routing errors through the caller's
//! policy. The only component in the engine with a built-in safety cap —
//! circular schemas (`A.b:"->B"`, `B.a:"->A"`) terminate at the hard
//! ceiling instead of overflowing the stack.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};

use graphdb_provider::Record;
use graphdb_schema::ParsedField;

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::reference::generate_minimal_entity;

/// Hard ceiling on cascade depth, independent of whatever `maxDepth` the
/// caller requests — guards against circular schemas recursing forever.
pub const DEFAULT_MAX_DEPTH: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadePhase {
    Generating,
    Complete,
    Error,
}

#[derive(Debug, Clone)]
pub struct CascadeProgress {
    pub phase: CascadePhase,
    pub current_depth: u32,
    pub current_type: String,
    pub total_entities_created: u64,
    pub types_generated: BTreeSet<String>,
}

pub type ProgressSink = Arc<dyn Fn(&CascadeProgress) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadeErrorPolicy {
    #[default]
    Continue,
    Abort,
}

#[derive(Clone, Default)]
pub struct CascadeOptions {
    pub max_depth: u32,
    /// When set, only relation fields whose target type (or one of a
    /// union's candidates) is in this set are cascaded into; every other
    /// relation field is left untouched.
    pub cascade_types: Option<BTreeSet<String>>,
    pub on_progress: Option<ProgressSink>,
    pub error_policy: CascadeErrorPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct CascadeReport {
    pub total_entities_created: u64,
    pub types_generated: BTreeSet<String>,
}

#[derive(Default)]
struct CascadeState {
    total_entities_created: u64,
    types_generated: BTreeSet<String>,
}

/// Cascade from an already-persisted root entity `type_name/id`.
pub async fn cascade(
    ctx: &EngineContext,
    type_name: &str,
    id: &str,
    opts: &CascadeOptions,
) -> Result<CascadeReport, EngineError> {
    let effective_depth = opts.max_depth.min(DEFAULT_MAX_DEPTH);
    let mut state = CascadeState::default();

    let result = walk(ctx, type_name, id, 0, effective_depth, opts, &mut state).await;

    match result {
        Ok(()) => {
            report(
                opts,
                CascadePhase::Complete,
                effective_depth,
                type_name,
                &state,
            );
            Ok(CascadeReport {
                total_entities_created: state.total_entities_created,
                types_generated: state.types_generated,
            })
        }
        Err(err) => {
            report(opts, CascadePhase::Error, effective_depth, type_name, &state);
            Err(err)
        }
    }
}

fn walk<'a>(
    ctx: &'a EngineContext,
    type_name: &'a str,
    id: &'a str,
    depth: u32,
    max_depth: u32,
    opts: &'a CascadeOptions,
    state: &'a mut CascadeState,
) -> BoxFuture<'a, Result<(), EngineError>> {
    async move {
        if depth >= max_depth {
            return Ok(());
        }

        let Some(record) = ctx.provider.get(type_name, id).await? else {
            return Ok(());
        };
        let Some(fields) = ctx.schema.fields(type_name) else {
            return Ok(());
        };

        for field in fields.values() {
            if !field.is_relation || field.is_backward() {
                continue;
            }
            if let Some(cascade_types) = &opts.cascade_types {
                if !field.candidate_types().iter().any(|t| cascade_types.contains(t)) {
                    continue;
                }
            }

            let step = step_field(ctx, type_name, id, &record, field, depth, max_depth, opts, state).await;
            if let Err(err) = step {
                match opts.error_policy {
                    CascadeErrorPolicy::Abort => return Err(err),
                    CascadeErrorPolicy::Continue => continue,
                }
            }
        }

        Ok(())
    }
    .boxed()
}

#[allow(clippy::too_many_arguments)]
async fn step_field(
    ctx: &EngineContext,
    parent_type: &str,
    parent_id: &str,
    record: &Record,
    field: &ParsedField,
    depth: u32,
    max_depth: u32,
    opts: &CascadeOptions,
    state: &mut CascadeState,
) -> Result<(), EngineError> {
    let existing = record.get(&field.name).cloned();

    match existing {
        Some(Value::String(child_id)) if !child_id.is_empty() => {
            let target_type = concrete_child_type(record, field);
            walk(ctx, &target_type, &child_id, depth + 1, max_depth, opts, state).await
        }
        Some(Value::Array(items)) if !items.is_empty() => {
            let target_type = concrete_child_type(record, field);
            for item in items {
                if let Some(child_id) = item.as_str() {
                    walk(ctx, &target_type, child_id, depth + 1, max_depth, opts, state).await?;
                }
            }
            Ok(())
        }
        _ => {
            // Nothing there yet — generate, persist, relate, stamp the
            // parent's scalar field, then recurse into the new child.
            let target_type = field.candidate_types().into_iter().next().unwrap_or_default();
            if target_type.is_empty() {
                return Ok(());
            }

            let child = generate_minimal_entity(ctx, &target_type, parent_id, &field.name).await?;
            let child_id = child.id().unwrap_or_default().to_string();

            ctx.provider
                .relate(parent_type, parent_id, &field.name, &target_type, &child_id, None)
                .await?;

            let mut patch = Record::new(parent_type, parent_id);
            if field.is_array {
                patch.set(field.name.clone(), json!([child_id.clone()]));
            } else {
                patch.set(field.name.clone(), json!(child_id));
            }
            if field.union_types.is_some() {
                patch.set(format!("{}$matchedType", field.name), target_type.clone());
            }
            ctx.provider.update(parent_type, parent_id, patch).await?;

            state.total_entities_created += 1;
            state.types_generated.insert(target_type.clone());
            report(
                opts,
                CascadePhase::Generating,
                depth + 1,
                &target_type,
                state,
            );

            walk(ctx, &target_type, &child_id, depth + 1, max_depth, opts, state).await
        }
    }
}

/// The concrete type a (possibly union) relation field's stored value
/// actually points at: the `$matchedType` sibling when present, else the
/// field's first candidate type.
fn concrete_child_type(record: &Record, field: &ParsedField) -> String {
    if field.union_types.is_some() {
        let key = format!("{}$matchedType", field.name);
        if let Some(matched) = record.get_str(&key) {
            return matched.to_string();
        }
    }
    field
        .candidate_types()
        .into_iter()
        .next()
        .unwrap_or_default()
}

fn report(
    opts: &CascadeOptions,
    phase: CascadePhase,
    current_depth: u32,
    current_type: &str,
    state: &CascadeState,
) {
    if let Some(sink) = &opts.on_progress {
        sink(&CascadeProgress {
            phase,
            current_depth,
            current_type: current_type.to_string(),
            total_entities_created: state.total_entities_created,
            types_generated: state.types_generated.clone(),
        });
    }
}
