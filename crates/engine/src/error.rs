//! Component 10: the closed error taxonomy of §4.10/§7, composed so
//! `EngineError` wraps `SchemaError` and `ProviderError` via `#[from]`, plus
//! an `anyhow::Error` catch-all for generator/adapter failures it has no
//! structural name for — mirroring the teacher's
//! `OpenDatabaseError { SchemaMigrationRequired, InitializationFailed(#[from] anyhow::Error) }`
//! shape in `client/src/http/open.rs`.

use graphdb_provider::ProviderError;
use graphdb_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("entity '{type_}/{id}' not found")]
    EntityNotFound { type_: String, id: String },

    #[error("entity '{type_}/{id}' already exists")]
    EntityExists { type_: String, id: String },

    #[error("provider does not support capability '{capability}'{}", .fallback.as_ref().map(|f| format!(" (fallback: {f})")).unwrap_or_default())]
    CapabilityNotSupported {
        capability: &'static str,
        fallback: Option<&'static str>,
    },

    #[error("database error during {operation} on {type_}/{id}: {source}")]
    Database {
        operation: &'static str,
        type_: String,
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{type_} is a system entity; {operation} is not permitted")]
    SystemEntityReadOnly { type_: String, operation: &'static str },

    #[error("field '{field}' on type '{entity}' is not declared as a relation")]
    NotARelation { entity: String, field: String },

    #[error(transparent)]
    Generator(#[from] graphdb_generator::GeneratorError),

    #[error("resolution aborted: {0}")]
    Resolution(#[from] Box<ResolutionError>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One failure encountered while resolving a single `$refs` entry (§4.6).
/// With `onError:'skip'` these accumulate into `Resolved::errors` instead of
/// aborting the whole `resolve` call.
#[derive(Debug, Error, Clone)]
#[error("failed to resolve field '{field}' on '{entity}': {reason}")]
pub struct ResolutionError {
    pub entity: String,
    pub field: String,
    pub reason: String,
}

impl From<ProviderError> for EngineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound { type_, id } => EngineError::EntityNotFound { type_, id },
            ProviderError::AlreadyExists { type_, id } => EngineError::EntityExists { type_, id },
            ProviderError::CapabilityNotSupported {
                capability,
                fallback,
            } => EngineError::CapabilityNotSupported {
                capability,
                fallback,
            },
            other => EngineError::Database {
                operation: "provider_call",
                type_: String::new(),
                id: String::new(),
                source: other.into(),
            },
        }
    }
}

impl EngineError {
    pub fn database(
        operation: &'static str,
        type_: impl Into<String>,
        id: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        EngineError::Database {
            operation,
            type_: type_.into(),
            id: id.into(),
            source: source.into(),
        }
    }
}
