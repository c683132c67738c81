use thiserror::Error;

/// Errors surfaced while parsing or normalizing a schema declaration.
///
/// These are programming errors: they surface at database construction
/// time, not at request time, mirroring the teacher's
/// `OpenDatabaseError::SchemaMigrationRequired` in spirit (a fixed
/// precondition violated before any traffic is served).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("field '{field}' on type '{entity}' references unknown type '{target}'")]
    UnknownTarget {
        entity: String,
        field: String,
        target: String,
    },

    #[error("field '{field}' on type '{entity}' references unknown type '{target}' in union")]
    UnknownUnionMember {
        entity: String,
        field: String,
        target: String,
    },

    #[error("field '{field}' on type '{entity}' has an invalid definition: {reason}")]
    InvalidFieldDefinition {
        entity: String,
        field: String,
        reason: String,
    },

    #[error("type '{entity}' is not declared in the schema")]
    UnknownEntity { entity: String },

    #[error(
        "backref synthesis conflict: type '{target}' already declares a field named '{field}' \
         that is incompatible with the inverse of '{entity}.{source_field}'"
    )]
    BackrefConflict {
        entity: String,
        source_field: String,
        target: String,
        field: String,
    },
}
