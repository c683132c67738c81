//! Component 3: the system-entity projector.
//!
//! Projects four fixed virtual entity types (`Noun`, `Verb`, `Edge`,
//! `Thing`) out of a normalized [`ParsedSchema`]. These rows are never
//! persisted through the provider by the caller — they're derived here, and
//! (for `Edge`) merged with provider-held runtime rows one layer up, in
//! `graphdb-engine`, where the provider is in scope.

use crate::field::{Direction, MatchMode, ParsedField};
use crate::normalize::ParsedSchema;

/// Many-to-many / one-to-many / many-to-one, inferred from array + backref
/// combination per §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ManyToMany,
    OneToMany,
    ManyToOne,
}

impl Cardinality {
    fn infer(field: &ParsedField) -> Self {
        match (field.is_array, field.backref.is_some()) {
            (true, true) => Cardinality::ManyToMany,
            (true, false) => Cardinality::OneToMany,
            (false, _) => Cardinality::ManyToOne,
        }
    }
}

/// One row of the virtual `Noun` entity: reflective metadata about a
/// user-declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Noun {
    pub type_name: String,
    pub singular: String,
    pub plural: String,
    pub slug: String,
    pub description: Option<String>,
    pub properties: Vec<String>,
    pub relationships: Vec<String>,
}

/// One row of the virtual `Verb` entity: a registered action/event verb.
/// Verb registration itself lives in the out-of-scope actions/events
/// bookkeeping API; the projector only reflects whatever verb names it is
/// handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verb {
    pub name: String,
}

/// One row of the virtual `Edge` entity: one relationship field, reflected
/// as a graph edge. Backward-direction fields are emitted with `from`/`to`
/// inverted so graph traversal always reads in the forward sense.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub name: String,
    pub to: String,
    pub direction: Direction,
    pub match_mode: Option<MatchMode>,
    pub cardinality: Cardinality,
    /// Recorded only for runtime fuzzy-match edges merged in by the engine;
    /// schema-derived edges never carry one.
    pub similarity: Option<f64>,
}

/// The abstract parent every stored record is conceptually an instance of.
/// `Thing` carries no rows of its own — every entity IS a Thing whose
/// `type` relation points at its `Noun` row — so it is represented as a
/// marker rather than a record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thing;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemEntities {
    pub nouns: Vec<Noun>,
    pub verbs: Vec<Verb>,
    pub edges: Vec<Edge>,
}

/// Project the four virtual system entity shapes out of a normalized
/// schema. `verbs` lists whatever verb names the caller's action/event
/// registry has registered (empty if none); the core does not itself
/// register verbs.
pub fn project(schema: &ParsedSchema, verbs: &[String]) -> SystemEntities {
    let nouns = schema
        .entities
        .iter()
        .map(|(type_name, fields)| {
            let properties = fields
                .values()
                .filter(|f| !f.is_relation)
                .map(|f| f.name.clone())
                .collect();
            let relationships = fields
                .values()
                .filter(|f| f.is_relation)
                .map(|f| f.name.clone())
                .collect();
            Noun {
                singular: type_name.clone(),
                plural: pluralize(type_name),
                slug: slugify(type_name),
                description: schema
                    .meta
                    .get(type_name)
                    .and_then(|m| m.instructions.clone()),
                type_name: type_name.clone(),
                properties,
                relationships,
            }
        })
        .collect();

    let verbs = verbs
        .iter()
        .map(|name| Verb { name: name.clone() })
        .collect();

    let mut edges = Vec::new();
    for (entity, fields) in &schema.entities {
        for field in fields.values() {
            if !field.is_relation {
                continue;
            }
            let Some(related) = &field.related_type else {
                continue;
            };
            let cardinality = Cardinality::infer(field);
            let direction = field.direction().unwrap_or(Direction::Forward);
            let (from, to) = match direction {
                Direction::Forward => (entity.clone(), related.clone()),
                Direction::Backward => (related.clone(), entity.clone()),
            };
            edges.push(Edge {
                from,
                name: field.name.clone(),
                to,
                direction,
                match_mode: field.match_mode(),
                cardinality,
                similarity: None,
            });
        }
    }

    SystemEntities {
        nouns,
        verbs,
        edges,
    }
}

/// Very small English pluralizer: handles the common suffix classes a
/// schema author's PascalCase type names actually hit (`Category` ->
/// `Categories`, `Bus` -> `Buses`, `Post` -> `Posts`). Not a general NLP
/// pluralizer — good enough for reflective display, not round-trip-correct
/// for every irregular noun.
fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        if !stem.ends_with(|c: char| "aeiouAEIOU".contains(c)) {
            return format!("{stem}ies");
        }
    }
    if name.ends_with('s') || name.ends_with('x') || name.ends_with("ch") || name.ends_with("sh") {
        return format!("{name}es");
    }
    format!("{name}s")
}

fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for (i, c) in name.char_indices() {
        if c.is_uppercase() && i > 0 {
            slug.push('-');
        }
        slug.extend(c.to_lowercase());
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::declaration::{Declaration, FieldDef};

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
    fn projects_noun_per_type() {
        let declaration = decl(&[
            ("Post", &[("title", "string"), ("author", "Author.posts")]),
            ("Author", &[("name", "string")]),
        ]);
        let schema = normalize(&declaration).unwrap();
        let system = project(&schema, &[]);
        assert_eq!(system.nouns.len(), 2);
        let post = system.nouns.iter().find(|n| n.type_name == "Post").unwrap();
        assert_eq!(post.plural, "Posts");
        assert_eq!(post.slug, "post");
        assert_eq!(post.properties, vec!["title".to_string()]);
        assert_eq!(post.relationships, vec!["author".to_string()]);
    }

    #[test]
    fn backward_edge_inverts_from_to() {
        let declaration = decl(&[
            ("Post", &[("title", "string"), ("author", "Author.posts")]),
            ("Author", &[("name", "string")]),
        ]);
        let schema = normalize(&declaration).unwrap();
        let system = project(&schema, &[]);
        let forward = system
            .edges
            .iter()
            .find(|e| e.from == "Post" && e.name == "author")
            .unwrap();
        assert_eq!(forward.to, "Author");
        assert_eq!(forward.cardinality, Cardinality::ManyToOne);

        let backward = system
            .edges
            .iter()
            .find(|e| e.name == "posts")
            .unwrap();
        assert_eq!(backward.from, "Author");
        assert_eq!(backward.to, "Post");
        assert_eq!(backward.cardinality, Cardinality::ManyToMany);
    }

    #[test]
    fn pluralize_rules() {
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Bus"), "Buses");
        assert_eq!(pluralize("Post"), "Posts");
        assert_eq!(pluralize("Key"), "Keys");
    }

    #[test]
    fn slugify_pascal_case() {
        assert_eq!(slugify("BlogPost"), "blog-post");
        assert_eq!(slugify("Post"), "post");
    }
}
