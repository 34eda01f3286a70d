// ============================
// crates/engine/src/error.rs
// ============================
//! Central error type for the engine.
use thiserror::Error;

/// Engine error taxonomy with stable error codes.
///
/// Plain lookups that miss return `Ok(None)`; `NotFound` only appears where
/// a caller opted into strict resolution and required the entity to exist.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{0} records do not implement updates")]
    UpdateNotSupported(&'static str),

    #[error("duplicate {entity} name: {name}")]
    DuplicateName { entity: &'static str, name: String },

    #[error("cannot resolve {entity} reference: {reference}")]
    Resolution {
        entity: &'static str,
        reference: String,
    },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Short-hand for strict lookups that came back empty.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        AuthError::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Get the stable error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NotFound { .. } => "NF_001",
            AuthError::UpdateNotSupported(_) => "STORE_001",
            AuthError::DuplicateName { .. } => "STORE_002",
            AuthError::Resolution { .. } => "RES_001",
            AuthError::Validation { .. } => "VAL_001",
            AuthError::Config(_) => "CFG_001",
            AuthError::Storage(_) => "STORE_003",
        }
    }

    /// Whether the caller may treat the condition as recoverable.
    ///
    /// Mutation misuse (updating an immutable record, duplicate unique name)
    /// is final for that call; lookup and resolution misses are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuthError::NotFound { .. } | AuthError::Resolution { .. }
        )
    }
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        AuthError::Config(err.to_string())
    }
}
