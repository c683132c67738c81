//! Component 5: the draft builder (§4.5).
//!
//! Given partial data for a declared type, emits a [`Draft`] with scalar
//! (including AI-prompt) fields populated and every unresolved *forward*
//! relation field carrying a natural-language placeholder plus a
//! [`ReferenceSpec`] recorded in `refs`. Backward references (`<-`, `<~`)
//! are never drafted — §4.5 defers them to hydration.

use std::collections::BTreeMap;
use std::sync::Arc;

use graphdb_provider::Record;
use graphdb_schema::{Direction, MatchMode, OperatorToken, ParsedField};
use serde_json::Value;

use crate::context::EngineContext;
use crate::error::EngineError;

/// Whether a [`Draft`] still carries unresolved reference placeholders, or
/// has been fully bound to concrete ids by [`crate::reference::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Draft,
    Resolved,
}

/// The runtime descriptor of one unresolved relationship field (§4.6's
/// "Reference spec" glossary entry).
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSpec {
    pub field: String,
    pub operator: OperatorToken,
    pub target_type: String,
    pub union_types: Option<Vec<String>>,
    pub match_mode: MatchMode,
    pub resolved: bool,
    pub prompt: Option<String>,
    pub generated_text: Option<String>,
    pub threshold: f64,
}

/// One `$refs` entry: either a single reference (scalar relation field) or
/// one per array element (array relation field, per-hint).
#[derive(Debug, Clone, PartialEq)]
pub enum RefEntry {
    Single(ReferenceSpec),
    Many(Vec<ReferenceSpec>),
}

/// An entity mid-construction: scalars populated, relations either already
/// concrete (caller supplied a value) or placeholders recorded in `refs`.
///
/// Per §3's invariants, a draft satisfies `phase == Phase::Draft` and
/// carries `refs`; [`crate::reference::resolve`] turns it into data whose
/// `phase == Phase::Resolved` with `refs` gone. Representing this as two
/// distinct struct shapes (rather than a single record with a string
/// `$phase` tag) is the explicit-result-variant realization of §9's note
/// "draft/resolve ... deliberately non-atomic": a `Draft` cannot
/// accidentally be mistaken for resolved data by the type system.
#[derive(Debug, Clone)]
pub struct Draft {
    pub type_name: String,
    pub phase: Phase,
    pub data: Record,
    pub refs: BTreeMap<String, RefEntry>,
}

/// Optional chunk-streaming sink for `draft`'s AI-generated scalar fields
/// (§4.5 step 4). Kept as an `Arc<dyn Fn>` so it can be cloned across the
/// `async` boundary without threading a `&mut` callback through recursion.
pub type ChunkSink = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Default)]
pub struct DraftOptions {
    pub stream: bool,
    pub on_chunk: Option<ChunkSink>,
}

/// Build a [`Draft`] for `type_name` from caller-supplied `partial` data.
pub async fn draft(
    ctx: &EngineContext,
    type_name: &str,
    partial: Record,
    opts: &DraftOptions,
) -> Result<Draft, EngineError> {
    let fields = ctx
        .schema
        .fields(type_name)
        .ok_or_else(|| EngineError::from(graphdb_schema::SchemaError::UnknownEntity {
            entity: type_name.to_string(),
        }))?;

    let mut data = partial;
    let mut refs: BTreeMap<String, RefEntry> = BTreeMap::new();

    let entity_meta = ctx.schema.meta.get(type_name).cloned().unwrap_or_default();

    for field in fields.values() {
        if field.is_relation {
            continue;
        }
        if data.contains_key(&field.name) {
            continue;
        }
        let Some(prompt) = &field.prompt else {
            continue;
        };
        let value = generate_scalar(ctx, type_name, &entity_meta, field, &data, prompt, opts).await?;
        data.set(field.name.clone(), value);
    }

    for field in fields.values() {
        if !field.is_relation {
            continue;
        }
        // §4.5 step 3: only forward, operator-bearing fields are drafted.
        // The legacy implicit-backref form (no explicit operator) behaves
        // like forward-exact for drafting purposes too.
        if matches!(field.direction(), Some(Direction::Backward)) {
            continue;
        }
        if data.contains_key(&field.name) {
            continue;
        }

        let hint_key = format!("{}Hint", field.name);
        let hint = data.remove(&hint_key);

        if field.is_array {
            let hints = array_hints(hint);
            if hints.is_empty() {
                // No hint supplied: a single placeholder entry, matching
                // the scalar-array case ("one per hint", hint count 1
                // absent an explicit hint).
                let spec = make_spec(field, None, entity_meta.fuzzy_threshold);
                data.set(field.name.clone(), Value::String(placeholder_text(&spec)));
                refs.insert(field.name.clone(), RefEntry::Many(vec![spec]));
            } else {
                let specs: Vec<ReferenceSpec> = hints
                    .iter()
                    .map(|h| make_spec(field, Some(h.clone()), entity_meta.fuzzy_threshold))
                    .collect();
                let display = specs
                    .iter()
                    .map(placeholder_text)
                    .collect::<Vec<_>>()
                    .join(", ");
                data.set(field.name.clone(), Value::String(display));
                refs.insert(field.name.clone(), RefEntry::Many(specs));
            }
        } else {
            let hint_text = hint.and_then(|v| v.as_str().map(str::to_string));
            let spec = make_spec(field, hint_text, entity_meta.fuzzy_threshold);
            data.set(field.name.clone(), Value::String(placeholder_text(&spec)));
            refs.insert(field.name.clone(), RefEntry::Single(spec));
        }
    }

    Ok(Draft {
        type_name: type_name.to_string(),
        phase: Phase::Draft,
        data,
        refs,
    })
}

fn array_hints(hint: Option<Value>) -> Vec<String> {
    match hint {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s],
        _ => Vec::new(),
    }
}

fn make_spec(field: &ParsedField, hint: Option<String>, entity_default: Option<f64>) -> ReferenceSpec {
    let operator = field.operator.unwrap_or(OperatorToken::ForwardExact);
    let match_mode = field.match_mode().unwrap_or(MatchMode::Exact);
    ReferenceSpec {
        field: field.name.clone(),
        operator,
        target_type: field.related_type.clone().unwrap_or_default(),
        union_types: field.union_types.clone(),
        match_mode,
        resolved: false,
        prompt: hint.or_else(|| field.prompt.clone()),
        generated_text: None,
        threshold: field.effective_threshold(entity_default),
    }
}

/// The draft-time display placeholder for a still-unresolved reference: the
/// hint/prompt text itself, falling back to a generic description naming
/// the target type so the draft is never blank.
fn placeholder_text(spec: &ReferenceSpec) -> String {
    spec.prompt
        .clone()
        .unwrap_or_else(|| format!("a {}", spec.target_type))
}

async fn generate_scalar(
    ctx: &EngineContext,
    type_name: &str,
    entity_meta: &graphdb_schema::declaration::EntityMeta,
    field: &ParsedField,
    parent_fields: &Record,
    prompt: &str,
    opts: &DraftOptions,
) -> Result<Value, EngineError> {
    let gen_ctx = graphdb_generator::GenerationContext::new(type_name)
        .with_instructions(entity_meta.instructions.clone())
        .with_context(entity_meta.context.clone())
        .with_parent_fields(parent_fields.as_map().clone())
        .with_prompt(Some(prompt.to_string()));
    let request = graphdb_generator::FieldRequest::new(field.name.clone(), Some(prompt.to_string()));
    let value = ctx.generator.generate_field(&gen_ctx, &request).await?;
    if opts.stream {
        if let Some(sink) = &opts.on_chunk {
            let text = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            sink(&text);
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphdb_generator::StubGenerator;
    use graphdb_provider::MemoryProvider;
    use graphdb_schema::{normalize, Declaration, FieldDef};
    use std::sync::Arc;

    fn ctx(decl: &[(&str, &[(&str, &str)])]) -> EngineContext {
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
    async fn draft_sets_phase_and_placeholder() {
        let ctx = ctx(&[
            ("Startup", &[("name", "string"), ("idea", "->Idea")]),
            ("Idea", &[("description", "string")]),
        ]);
        let mut data = Record::default();
        data.set("name", "Acme");
        let draft = draft(&ctx, "Startup", data, &DraftOptions::default())
            .await
            .unwrap();
        assert_eq!(draft.phase, Phase::Draft);
        assert!(draft.refs.contains_key("idea"));
        assert!(draft.data.get_str("idea").unwrap().len() > 0);
        assert!(!draft.data.contains_key("$refs"));
    }

    #[tokio::test]
    async fn draft_generates_prompt_fields() {
        let ctx = ctx(&[("Post", &[("title", "string (write a catchy title)")])]);
        let draft = draft(&ctx, "Post", Record::default(), &DraftOptions::default())
            .await
            .unwrap();
        assert!(draft.data.get_str("title").unwrap().contains("catchy title"));
    }

    #[tokio::test]
    async fn draft_does_not_touch_backward_fields() {
        let ctx = ctx(&[
            ("Post", &[("title", "string"), ("author", "Author.posts")]),
            ("Author", &[("name", "string")]),
        ]);
        let draft = draft(&ctx, "Author", Record::default(), &DraftOptions::default())
            .await
            .unwrap();
        assert!(!draft.refs.contains_key("posts"));
    }

    #[tokio::test]
    async fn array_hints_produce_one_spec_per_hint() {
        let ctx = ctx(&[("Node", &[("name", "string"), ("children", "->Node[]?")])]);
        let mut data = Record::default();
        data.set("name", "root");
        data.set("childrenHint", serde_json::json!(["left", "right"]));
        let draft = draft(&ctx, "Node", data, &DraftOptions::default())
            .await
            .unwrap();
        match draft.refs.get("children").unwrap() {
            RefEntry::Many(specs) => assert_eq!(specs.len(), 2),
            _ => panic!("expected Many"),
        }
    }
}
