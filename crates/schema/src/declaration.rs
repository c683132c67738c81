//! The raw authoring surface: a flat map of entity name to field definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single field definition as written by the schema author.
///
/// Authors write either a bare string (`"string?"`, `"->Author"`) or a
/// one-element sequence wrapping a string (`["Type.backref"]`), the latter
/// being shorthand for "array of the inner definition".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldDef {
    Scalar(String),
    ArrayLiteral([String; 1]),
}

impl FieldDef {
    pub fn scalar(s: impl Into<String>) -> Self {
        FieldDef::Scalar(s.into())
    }

    pub fn array(s: impl Into<String>) -> Self {
        FieldDef::ArrayLiteral([s.into()])
    }

    /// The inner definition string, independent of the array-literal wrapper.
    pub fn inner(&self) -> &str {
        match self {
            FieldDef::Scalar(s) => s,
            FieldDef::ArrayLiteral([s]) => s,
        }
    }

    /// Whether this definition forces array cardinality via the
    /// one-element-sequence literal form (as opposed to a `[]` suffix).
    pub fn is_array_literal(&self) -> bool {
        matches!(self, FieldDef::ArrayLiteral(_))
    }
}

/// One entity's field definitions, keyed by field name.
///
/// Keys beginning with `$` are schema-level metadata, not fields; see
/// [`EntityMeta::extract`].
pub type FieldMap = BTreeMap<String, FieldDef>;

/// The full declaration: entity type name to its field map.
pub type Declaration = BTreeMap<String, FieldMap>;

/// Schema-level metadata extracted from `$`-prefixed keys in an entity's
/// field map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    /// `$fuzzyThreshold` — default similarity threshold for fuzzy relations
    /// declared on this entity, absent a per-field threshold.
    pub fuzzy_threshold: Option<f64>,
    /// `$instructions` — free text injected into generation context for
    /// every field generated on this entity.
    pub instructions: Option<String>,
    /// `$context` — supplementary free text for generation context.
    pub context: Option<String>,
    /// `$seed` — a URL pointing at a seed dataset.
    pub seed: Option<String>,
    /// `$id` — the seed column mapped to this entity's `$id`.
    pub id_column: Option<String>,
}

impl EntityMeta {
    /// Split a field map into (metadata, remaining field definitions).
    ///
    /// `$`-prefixed keys are metadata; everything else is a field. A bare
    /// `'$.columnName'` *value* elsewhere (i.e. a field definition string
    /// that equals `$.<col>`) is a seed mapping, not metadata, and is left
    /// untouched here — see [`crate::field::ParsedField::seed_mapping`].
    pub fn extract(fields: &FieldMap) -> (Self, FieldMap) {
        let mut meta = EntityMeta::default();
        let mut rest = FieldMap::new();

        for (key, def) in fields {
            match key.as_str() {
                "$fuzzyThreshold" => {
                    meta.fuzzy_threshold = def.inner().parse::<f64>().ok();
                }
                "$instructions" => meta.instructions = Some(def.inner().to_string()),
                "$context" => meta.context = Some(def.inner().to_string()),
                "$seed" => meta.seed = Some(def.inner().to_string()),
                "$id" => meta.id_column = Some(def.inner().to_string()),
                _ if key.starts_with('$') => {
                    // Unknown schema-level metadata key: ignored, not a field.
                }
                _ => {
                    rest.insert(key.clone(), def.clone());
                }
            }
        }

        (meta, rest)
    }
}
