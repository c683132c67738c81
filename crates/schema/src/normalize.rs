//! Component 2: the schema normalizer.
//!
//! Folds a raw [`Declaration`] into a [`ParsedSchema`]: every field parsed
//! (pass 1), every operator-bearing relation checked against the set of
//! declared entities (pass 2), and every explicit `backref` synthesized onto
//! its target entity (pass 3).

use std::collections::BTreeMap;

use tracing::instrument;

use crate::declaration::{Declaration, EntityMeta};
use crate::error::SchemaError;
use crate::field::ParsedField;
use crate::field_parse::parse_field;

/// One entity's normalized fields, in declaration order (plus any fields
/// synthesized by bidirectional-edge synthesis, appended after).
pub type EntityFields = BTreeMap<String, ParsedField>;

/// The normalized schema: every declared entity, its metadata, and its
/// fully parsed field map (including synthesized inverse fields).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSchema {
    pub entities: BTreeMap<String, EntityFields>,
    pub meta: BTreeMap<String, EntityMeta>,
}

impl ParsedSchema {
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn fields(&self, entity: &str) -> Option<&EntityFields> {
        self.entities.get(entity)
    }

    pub fn field(&self, entity: &str, field: &str) -> Option<&ParsedField> {
        self.entities.get(entity)?.get(field)
    }

    pub fn has_entity(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    /// The effective fuzzy threshold for a field on an entity: the field's
    /// own threshold, else the entity's `$fuzzyThreshold`, else the global
    /// default.
    pub fn effective_threshold(&self, entity: &str, field: &str) -> f64 {
        let entity_default = self.meta.get(entity).and_then(|m| m.fuzzy_threshold);
        self.field(entity, field)
            .map(|f| f.effective_threshold(entity_default))
            .unwrap_or(crate::DEFAULT_FUZZY_THRESHOLD)
    }
}

/// Normalize a raw declaration into a [`ParsedSchema`].
///
/// See §4.2: pass 1 parses every field, pass 2 validates non-union operator
/// targets exist, pass 3 synthesizes the inverse side of every explicit
/// `backref`.
#[instrument(skip(declaration))]
pub fn normalize(declaration: &Declaration) -> Result<ParsedSchema, SchemaError> {
    let mut entities: BTreeMap<String, EntityFields> = BTreeMap::new();
    let mut meta: BTreeMap<String, EntityMeta> = BTreeMap::new();

    // Pass 1: parse every field on every entity.
    for (entity, raw_fields) in declaration {
        let (entity_meta, field_defs) = EntityMeta::extract(raw_fields);
        meta.insert(entity.clone(), entity_meta);

        let mut parsed_fields = EntityFields::new();
        for (name, def) in &field_defs {
            let parsed = parse_field(entity, name, def)?;
            parsed_fields.insert(name.clone(), parsed);
        }
        entities.insert(entity.clone(), parsed_fields);
    }

    // Pass 2: validate that every operator-bearing, non-union relational
    // field references a declared entity. Self-reference is permitted.
    for (entity, fields) in &entities {
        for field in fields.values() {
            if !field.is_relation || field.operator.is_none() {
                continue;
            }
            if let Some(union_types) = &field.union_types {
                for target in union_types {
                    if !entities.contains_key(target) {
                        return Err(SchemaError::UnknownUnionMember {
                            entity: entity.clone(),
                            field: field.name.clone(),
                            target: target.clone(),
                        });
                    }
                }
                continue;
            }
            if let Some(target) = &field.related_type {
                if !entities.contains_key(target) {
                    return Err(SchemaError::UnknownTarget {
                        entity: entity.clone(),
                        field: field.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }

    // Pass 3: synthesize the inverse side of every explicit backref.
    //
    // Collect first, then apply — we're mutating `entities` while iterating
    // a snapshot of the fields that declare a backref.
    let mut synthesized: Vec<(String, ParsedField)> = Vec::new();
    for (entity, fields) in &entities {
        for field in fields.values() {
            let (Some(target), Some(backref)) = (&field.related_type, &field.backref) else {
                continue;
            };
            if !field.is_relation {
                continue;
            }
            let already_present = entities
                .get(target)
                .map(|f| f.contains_key(backref))
                .unwrap_or(false);
            if already_present {
                continue;
            }
            synthesized.push((
                target.clone(),
                ParsedField {
                    name: backref.clone(),
                    field_type: crate::field::FieldType::Relation,
                    is_array: true,
                    is_optional: false,
                    is_relation: true,
                    related_type: Some(entity.clone()),
                    backref: Some(field.name.clone()),
                    operator: None,
                    prompt: None,
                    threshold: None,
                    union_types: None,
                    seed_mapping: None,
                    synthesized: true,
                },
            ));
        }
    }

    for (target, inverse_field) in synthesized {
        let Some(target_fields) = entities.get_mut(&target) else {
            continue;
        };
        target_fields
            .entry(inverse_field.name.clone())
            .or_insert(inverse_field);
    }

    Ok(ParsedSchema { entities, meta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::FieldDef;

    fn decl(pairs: &[(&str, &[(&str, &str)])]) -> Declaration {
        pairs
            .iter()
            .map(|(entity, fields)| {
                let field_map = fields
                    .iter()
                    .map(|(name, def)| (name.to_string(), FieldDef::scalar(*def)))
                    .collect();
                (entity.to_string(), field_map)
            })
            .collect()
    }

    #[test]
    fn bidirectional_synthesis() {
        let declaration = decl(&[
            ("Post", &[("title", "string"), ("author", "Author.posts")]),
            ("Author", &[("name", "string")]),
        ]);
        let schema = normalize(&declaration).unwrap();
        let posts = schema.field("Author", "posts").unwrap();
        assert!(posts.is_array);
        assert!(!posts.is_optional);
        assert!(posts.is_relation);
        assert_eq!(posts.related_type.as_deref(), Some("Post"));
        assert_eq!(posts.backref.as_deref(), Some("author"));
        assert!(posts.synthesized);
    }

    #[test]
    fn existing_inverse_field_is_not_overwritten() {
        let declaration = decl(&[
            (
                "Post",
                &[("title", "string"), ("author", "Author.posts")],
            ),
            (
                "Author",
                &[("name", "string"), ("posts", "Post.author")],
            ),
        ]);
        let schema = normalize(&declaration).unwrap();
        let posts = schema.field("Author", "posts").unwrap();
        assert!(!posts.synthesized);
    }

    #[test]
    fn missing_target_errors() {
        let declaration = decl(&[("Post", &[("author", "->Missing")])]);
        let err = normalize(&declaration).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTarget { .. }));
    }

    #[test]
    fn missing_union_member_errors() {
        let declaration = decl(&[
            ("Post", &[("subject", "->A|B")]),
            ("A", &[("name", "string")]),
        ]);
        let err = normalize(&declaration).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownUnionMember { .. }));
    }

    #[test]
    fn self_reference_permitted() {
        let declaration = decl(&[("Node", &[("name", "string"), ("parent", "->Node?")])]);
        let schema = normalize(&declaration).unwrap();
        assert!(schema.field("Node", "parent").is_some());
    }

    #[test]
    fn fuzzy_threshold_effective_falls_back_to_entity_then_default() {
        let declaration = decl(&[(
            "Article",
            &[("category", "~>Category"), ("$fuzzyThreshold", "0.6")],
        )]);
        let declaration = {
            let mut d = declaration;
            d.insert(
                "Category".to_string(),
                [("name".to_string(), FieldDef::scalar("string"))].into(),
            );
            d
        };
        let schema = normalize(&declaration).unwrap();
        assert_eq!(schema.effective_threshold("Article", "category"), 0.6);
    }
}
