//! The pluggable AI `Generator` trait that backs draft-field synthesis
//! (§4.5), forward-exact/fuzzy-miss auto-generation (§4.6), and cascade
//! generation (§4.7). A real implementation wraps an LLM call; the
//! [`StubGenerator`] bundled here is deterministic test scaffolding, in the
//! same spirit as `graphdb_provider::MemoryProvider`.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::{FieldRequest, GenerationContext};
use crate::error::GeneratorError;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a value for one field, given its prompt and the
    /// surrounding context.
    async fn generate_field(
        &self,
        ctx: &GenerationContext,
        field: &FieldRequest,
    ) -> Result<Value, GeneratorError>;

    /// Generate a natural-language placeholder for a relation field during
    /// drafting (§4.5 step 3) — distinct from `generate_field` because the
    /// draft placeholder is never the final value, only display text plus
    /// the seed for later resolution.
    async fn generate_placeholder(
        &self,
        ctx: &GenerationContext,
        field: &FieldRequest,
    ) -> Result<String, GeneratorError> {
        let value = self.generate_field(ctx, field).await?;
        Ok(value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()))
    }

    /// Generate every requested scalar field for a whole entity, in order.
    /// The default simply calls `generate_field` per request; a real
    /// implementation may override this to batch multiple fields into one
    /// model call.
    async fn generate_entity(
        &self,
        ctx: &GenerationContext,
        fields: &[FieldRequest],
    ) -> Result<serde_json::Map<String, Value>, GeneratorError> {
        let mut out = serde_json::Map::new();
        for field in fields {
            let value = self.generate_field(ctx, field).await?;
            out.insert(field.name.clone(), value);
        }
        Ok(out)
    }
}

/// A deterministic test double: never calls out to a model, just echoes the
/// prompt (or field name, absent a prompt) into a fixed template. Good
/// enough to drive the draft/resolve/cascade pipelines in tests without an
/// AI backend.
#[derive(Debug, Clone, Default)]
pub struct StubGenerator;

#[async_trait]
impl Generator for StubGenerator {
    async fn generate_field(
        &self,
        ctx: &GenerationContext,
        field: &FieldRequest,
    ) -> Result<Value, GeneratorError> {
        let prompt = field
            .prompt
            .clone()
            .unwrap_or_else(|| field.name.clone());
        Ok(Value::String(format!(
            "Generated {}.{}: {}",
            ctx.entity_type, field.name, prompt
        )))
    }
}
