use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator failed for field '{field}' on type '{entity_type}': {reason}")]
    FieldGeneration {
        entity_type: String,
        field: String,
        reason: String,
    },

    #[error("generator backend error: {0}")]
    Backend(#[from] anyhow::Error),
}
