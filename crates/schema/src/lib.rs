//! Declarative schema parsing and bidirectional-edge normalization.
//!
//! A schema is authored as a flat map of entity name to field definitions
//! (see [`declaration`]). [`operator::parse_operator`] turns a single field
//! definition string into a relationship descriptor; [`normalize::normalize`]
//! folds an entire declaration map into a [`ParsedSchema`], synthesizing the
//! inverse side of every `backref`-bearing relation. [`system`] projects the
//! four virtual reflective entity types (`Noun`, `Verb`, `Edge`, `Thing`) on
//! top of a normalized schema.

pub mod declaration;
pub mod error;
pub mod field;
mod field_parse;
pub mod normalize;
pub mod operator;
pub mod system;

pub use declaration::{Declaration, FieldDef};
pub use error::SchemaError;
pub use field::{Direction, FieldType, MatchMode, OperatorToken, ParsedField};
pub use field_parse::parse_field;
pub use normalize::{normalize, ParsedSchema};
pub use operator::{parse_operator, OperatorMatch};
pub use system::{Edge, Noun, SystemEntities, Thing, Verb};

/// Default similarity threshold applied to a fuzzy relation when the field
/// and schema both omit one.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.75;
