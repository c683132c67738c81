//! The context a [`crate::Generator`] is handed for one generation call.

use serde_json::{Map, Value};

/// One field the generator is asked to fill, drawn from §4.5: a prompt
/// field's embedded natural-language instruction, or a relation field's
/// placeholder prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRequest {
    pub name: String,
    pub prompt: Option<String>,
}

impl FieldRequest {
    pub fn new(name: impl Into<String>, prompt: Option<String>) -> Self {
        FieldRequest {
            name: name.into(),
            prompt,
        }
    }
}

/// Generation context for one entity: the schema-level `$instructions`/
/// `$context` metadata (§3) plus whatever scalar fields the parent already
/// carries, combined per §4.5 step 2 ("the combined generation context").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationContext {
    pub entity_type: String,
    pub instructions: Option<String>,
    pub context: Option<String>,
    pub parent_fields: Map<String, Value>,
    /// The relation or prompt field's own natural-language prompt, when
    /// generating for a single field rather than a whole entity.
    pub prompt: Option<String>,
}

impl GenerationContext {
    pub fn new(entity_type: impl Into<String>) -> Self {
        GenerationContext {
            entity_type: entity_type.into(),
            ..Default::default()
        }
    }

    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn with_parent_fields(mut self, fields: Map<String, Value>) -> Self {
        self.parent_fields = fields;
        self
    }

    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Flatten instructions, context, and prompt into one text blob a
    /// simple generator can consume verbatim.
    pub fn combined_prompt(&self) -> String {
        let mut parts = Vec::new();
        if let Some(i) = &self.instructions {
            parts.push(i.clone());
        }
        if let Some(c) = &self.context {
            parts.push(c.clone());
        }
        if let Some(p) = &self.prompt {
            parts.push(p.clone());
        }
        parts.join(" — ")
    }
}
