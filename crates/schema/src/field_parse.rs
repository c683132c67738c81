//! Assembling a [`ParsedField`] from a single [`FieldDef`] — the "calling
//! field parser" referenced by §4.1 step 5, which layers optional/array/
//! backref/prompt handling on top of [`parse_operator`].

use crate::declaration::FieldDef;
use crate::error::SchemaError;
use crate::field::{FieldType, ParsedField};
use crate::operator::parse_operator;

pub fn parse_field(entity: &str, name: &str, def: &FieldDef) -> Result<ParsedField, SchemaError> {
    if def.is_array_literal() {
        let inner = FieldDef::scalar(def.inner().to_string());
        let mut parsed = parse_field(entity, name, &inner)?;
        parsed.is_array = true;
        return Ok(parsed);
    }

    let raw = def.inner().trim();

    if let Some(col) = raw.strip_prefix("$.") {
        return Ok(ParsedField {
            name: name.to_string(),
            field_type: FieldType::String,
            is_array: false,
            is_optional: true,
            is_relation: false,
            related_type: None,
            backref: None,
            operator: None,
            prompt: None,
            threshold: None,
            union_types: None,
            seed_mapping: Some(col.to_string()),
            synthesized: false,
        });
    }

    if let Some(op) = parse_operator(raw) {
        let (base, is_optional, is_array) = strip_opt_array(&op.target_type);
        let (related_type, backref) = split_backref(base);
        return Ok(ParsedField {
            name: name.to_string(),
            field_type: FieldType::Relation,
            is_array,
            is_optional,
            is_relation: true,
            related_type: Some(related_type),
            backref,
            operator: Some(op.operator),
            prompt: op.prompt,
            threshold: op.threshold,
            union_types: op.union_types,
            seed_mapping: None,
            synthesized: false,
        });
    }

    if raw.chars().any(char::is_whitespace) {
        return parse_primitive_with_prompt(entity, name, raw);
    }

    if let Some(parsed) = try_parse_primitive(name, raw) {
        return Ok(parsed);
    }

    let (base, is_optional, is_array) = strip_opt_array(raw);
    let (related_type, backref) = split_backref(base);
    if is_pascal_case(&related_type) {
        return Ok(ParsedField {
            name: name.to_string(),
            field_type: FieldType::Relation,
            is_array,
            is_optional,
            is_relation: true,
            related_type: Some(related_type),
            backref,
            operator: None,
            prompt: None,
            threshold: None,
            union_types: None,
            seed_mapping: None,
            synthesized: false,
        });
    }

    Err(SchemaError::InvalidFieldDefinition {
        entity: entity.to_string(),
        field: name.to_string(),
        reason: format!("unrecognized field definition '{raw}'"),
    })
}

/// A primitive field whose definition embeds a natural-language generation
/// prompt, e.g. `"string (write a catchy title)"`. Per §4.1, any definition
/// containing whitespace and no operator is never a relation.
fn parse_primitive_with_prompt(
    entity: &str,
    name: &str,
    raw: &str,
) -> Result<ParsedField, SchemaError> {
    let mut parts = raw.splitn(2, char::is_whitespace);
    let type_token = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();
    let prompt = rest
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(rest)
        .trim();

    let (base, is_optional, is_array) = strip_opt_array(type_token);
    let field_type = FieldType::from_keyword(base).ok_or_else(|| SchemaError::InvalidFieldDefinition {
        entity: entity.to_string(),
        field: name.to_string(),
        reason: format!("'{type_token}' is not a primitive type"),
    })?;

    Ok(ParsedField {
        name: name.to_string(),
        field_type,
        is_array,
        is_optional,
        is_relation: false,
        related_type: None,
        backref: None,
        operator: None,
        prompt: if prompt.is_empty() {
            None
        } else {
            Some(prompt.to_string())
        },
        threshold: None,
        union_types: None,
        seed_mapping: None,
        synthesized: false,
    })
}

fn try_parse_primitive(name: &str, raw: &str) -> Option<ParsedField> {
    let (base, is_optional, is_array) = strip_opt_array(raw);
    let field_type = FieldType::from_keyword(base)?;
    Some(ParsedField {
        name: name.to_string(),
        field_type,
        is_array,
        is_optional,
        is_relation: false,
        related_type: None,
        backref: None,
        operator: None,
        prompt: None,
        threshold: None,
        union_types: None,
        seed_mapping: None,
        synthesized: false,
    })
}

/// Strip trailing `?`/`[]` suffixes in any order, as many times as present.
fn strip_opt_array(mut s: &str) -> (&str, bool, bool) {
    let mut is_optional = false;
    let mut is_array = false;
    loop {
        if let Some(stripped) = s.strip_suffix('?') {
            is_optional = true;
            s = stripped;
            continue;
        }
        if let Some(stripped) = s.strip_suffix("[]") {
            is_array = true;
            s = stripped;
            continue;
        }
        break;
    }
    (s, is_optional, is_array)
}

fn split_backref(s: &str) -> (String, Option<String>) {
    match s.split_once('.') {
        Some((rel, back)) if !back.is_empty() => (rel.to_string(), Some(back.to_string())),
        _ => (s.to_string(), None),
    }
}

fn is_pascal_case(s: &str) -> bool {
    s.chars()
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::FieldDef;
    use crate::field::{Direction, MatchMode, OperatorToken};

    #[test]
    fn primitive_scalar() {
        let f = parse_field("Post", "title", &FieldDef::scalar("string")).unwrap();
        assert!(!f.is_relation);
        assert!(!f.is_optional);
        assert!(!f.is_array);
    }

    #[test]
    fn primitive_optional_array() {
        let f = parse_field("Post", "tags", &FieldDef::scalar("string[]?")).unwrap();
        assert!(f.is_optional);
        assert!(f.is_array);
    }

    #[test]
    fn primitive_with_prompt() {
        let f = parse_field(
            "Post",
            "title",
            &FieldDef::scalar("string (write a catchy title)"),
        )
        .unwrap();
        assert!(!f.is_relation);
        assert_eq!(f.prompt.as_deref(), Some("write a catchy title"));
    }

    #[test]
    fn implicit_backref_relation() {
        let f = parse_field("Post", "author", &FieldDef::scalar("Author.posts")).unwrap();
        assert!(f.is_relation);
        assert_eq!(f.related_type.as_deref(), Some("Author"));
        assert_eq!(f.backref.as_deref(), Some("posts"));
        assert!(f.operator.is_none());
    }

    #[test]
    fn array_literal_backref() {
        let f = parse_field("Author", "posts", &FieldDef::array("Post.author")).unwrap();
        assert!(f.is_array);
        assert!(f.is_relation);
        assert_eq!(f.related_type.as_deref(), Some("Post"));
        assert_eq!(f.backref.as_deref(), Some("author"));
    }

    #[test]
    fn forward_exact_optional() {
        let f = parse_field("Startup", "idea", &FieldDef::scalar("->Idea")).unwrap();
        assert_eq!(f.operator, Some(OperatorToken::ForwardExact));
        assert_eq!(f.direction(), Some(Direction::Forward));
        assert!(!f.is_optional);
    }

    #[test]
    fn forward_fuzzy_threshold() {
        let f = parse_field("Article", "category", &FieldDef::scalar("~>Category(0.75)")).unwrap();
        assert_eq!(f.match_mode(), Some(MatchMode::Fuzzy));
        assert_eq!(f.threshold, Some(0.75));
    }

    #[test]
    fn union_forward() {
        let f = parse_field("Post", "subject", &FieldDef::scalar("->Person|Company")).unwrap();
        assert_eq!(f.related_type.as_deref(), Some("Person"));
        assert_eq!(
            f.union_types,
            Some(vec!["Person".to_string(), "Company".to_string()])
        );
    }

    #[test]
    fn seed_mapping() {
        let f = parse_field("Author", "name", &FieldDef::scalar("$.author_name")).unwrap();
        assert_eq!(f.seed_mapping.as_deref(), Some("author_name"));
    }

    #[test]
    fn invalid_definition_errors() {
        let err = parse_field("Post", "weird", &FieldDef::scalar("not a type 123")).is_err();
        // contains whitespace with no operator -> treated as primitive-prompt,
        // whose first token "not" is not a primitive keyword -> error.
        assert!(err);
    }
}
