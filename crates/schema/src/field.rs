//! The parsed, normalized representation of a single field.

use serde::{Deserialize, Serialize};

/// One of the four relationship operator tokens.
///
/// `direction()`/`match_mode()` decompose the token into the two orthogonal
/// axes the rest of the engine actually dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorToken {
    /// `->` forward exact
    ForwardExact,
    /// `~>` forward fuzzy
    ForwardFuzzy,
    /// `<-` backward exact
    BackwardExact,
    /// `<~` backward fuzzy
    BackwardFuzzy,
}

impl OperatorToken {
    pub const fn as_str(self) -> &'static str {
        match self {
            OperatorToken::ForwardExact => "->",
            OperatorToken::ForwardFuzzy => "~>",
            OperatorToken::BackwardExact => "<-",
            OperatorToken::BackwardFuzzy => "<~",
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            OperatorToken::ForwardExact | OperatorToken::ForwardFuzzy => Direction::Forward,
            OperatorToken::BackwardExact | OperatorToken::BackwardFuzzy => Direction::Backward,
        }
    }

    pub const fn match_mode(self) -> MatchMode {
        match self {
            OperatorToken::ForwardExact | OperatorToken::BackwardExact => MatchMode::Exact,
            OperatorToken::ForwardFuzzy | OperatorToken::BackwardFuzzy => MatchMode::Fuzzy,
        }
    }

    pub const fn from_tokens(direction: Direction, match_mode: MatchMode) -> Self {
        match (direction, match_mode) {
            (Direction::Forward, MatchMode::Exact) => OperatorToken::ForwardExact,
            (Direction::Forward, MatchMode::Fuzzy) => OperatorToken::ForwardFuzzy,
            (Direction::Backward, MatchMode::Exact) => OperatorToken::BackwardExact,
            (Direction::Backward, MatchMode::Fuzzy) => OperatorToken::BackwardFuzzy,
        }
    }
}

/// Whether the edge is declared on this entity (forward) or synthesized /
/// resolved as an inverse (backward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

/// Whether the target is bound by exact reference/generation, or by
/// semantic similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    Exact,
    Fuzzy,
}

/// Primitive (non-relational) field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    DateTime,
    Json,
    Markdown,
    Url,
    /// Not a primitive: the field is a relationship. `related_type` /
    /// `union_types` on [`ParsedField`] carry the target(s).
    Relation,
}

impl FieldType {
    /// Parse a bare primitive keyword. Returns `None` for anything else,
    /// including `"Relation"`-shaped type names (those are never spelled
    /// out literally; they're inferred from PascalCase target names).
    pub fn from_keyword(s: &str) -> Option<Self> {
        Some(match s {
            "string" => FieldType::String,
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "datetime" => FieldType::DateTime,
            "json" => FieldType::Json,
            "markdown" => FieldType::Markdown,
            "url" => FieldType::Url,
            _ => return None,
        })
    }
}

/// The fully parsed, normalized description of one field on one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedField {
    pub name: String,
    pub field_type: FieldType,
    pub is_array: bool,
    pub is_optional: bool,
    pub is_relation: bool,
    pub related_type: Option<String>,
    pub backref: Option<String>,
    pub operator: Option<OperatorToken>,
    pub prompt: Option<String>,
    pub threshold: Option<f64>,
    pub union_types: Option<Vec<String>>,
    pub seed_mapping: Option<String>,
    /// `true` when this field was synthesized by bidirectional-edge
    /// synthesis (§4.2 pass 3) rather than declared directly by the author.
    pub synthesized: bool,
}

impl ParsedField {
    pub fn direction(&self) -> Option<Direction> {
        self.operator.map(OperatorToken::direction)
    }

    pub fn match_mode(&self) -> Option<MatchMode> {
        self.operator.map(OperatorToken::match_mode)
    }

    /// A relation is "forward" either because it carries an explicit
    /// forward operator, or because it's the legacy implicit form (no
    /// operator at all), which behaves like a forward-exact relation.
    pub fn is_forward(&self) -> bool {
        self.is_relation
            && !matches!(self.direction(), Some(Direction::Backward))
    }

    pub fn is_backward(&self) -> bool {
        matches!(self.direction(), Some(Direction::Backward))
    }

    pub fn effective_threshold(&self, entity_default: Option<f64>) -> f64 {
        self.threshold
            .or(entity_default)
            .unwrap_or(crate::DEFAULT_FUZZY_THRESHOLD)
    }

    /// All candidate target types this field can point at: the union list
    /// if declared, otherwise the single `related_type`.
    pub fn candidate_types(&self) -> Vec<String> {
        match &self.union_types {
            Some(types) => types.clone(),
            None => self.related_type.clone().into_iter().collect(),
        }
    }
}
