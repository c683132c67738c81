use thiserror::Error;

/// Errors a [`crate::Provider`] can raise, independent of backend.
///
/// Mirrors the teacher's `OpenDatabaseError` shape in `client/src/http/open.rs`:
/// named variants for the conditions callers branch on, with an
/// `anyhow`-backed catch-all for whatever the concrete adapter throws that
/// the core has no structural name for.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("entity '{type_}/{id}' not found")]
    NotFound { type_: String, id: String },

    #[error("entity '{type_}/{id}' already exists")]
    AlreadyExists { type_: String, id: String },

    #[error("provider does not support capability '{capability}'{}", .fallback.as_ref().map(|f| format!(" (fallback: {f})")).unwrap_or_default())]
    CapabilityNotSupported {
        capability: &'static str,
        fallback: Option<&'static str>,
    },

    #[error("invalid query options: {0}")]
    InvalidQuery(String),

    #[error("provider backend error during {operation} on {type_}/{id}: {source}")]
    Backend {
        operation: &'static str,
        type_: String,
        id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ProviderError {
    pub fn capability_not_supported(capability: &'static str) -> Self {
        ProviderError::CapabilityNotSupported {
            capability,
            fallback: None,
        }
    }

    pub fn capability_not_supported_with_fallback(
        capability: &'static str,
        fallback: &'static str,
    ) -> Self {
        ProviderError::CapabilityNotSupported {
            capability,
            fallback: Some(fallback),
        }
    }

    pub fn backend(
        operation: &'static str,
        type_: impl Into<String>,
        id: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        ProviderError::Backend {
            operation,
            type_: type_.into(),
            id: id.into(),
            source: source.into(),
        }
    }
}
