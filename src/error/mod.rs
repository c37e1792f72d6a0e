//! Unified error taxonomy for engine operations
//!
//! Every public operation returns `Result<T, EngineError>` so bulk callers
//! can continue past individual failures. Only the `Storage` variant wraps a
//! hard failure class; the rest describe recoverable domain outcomes.

use thiserror::Error;

use crate::storage::StorageError;

/// Result alias used across the engine's public surface
pub type EngineResult<T> = Result<T, EngineError>;

/// The unified error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid {entity} transition: {from} does not allow {attempted}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        attempted: String,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        field: Option<&'static str>,
    },

    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Create a not-found error for an entity id
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create an invalid-transition error
    pub fn invalid_transition(
        entity: &'static str,
        from: impl Into<String>,
        attempted: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.into(),
            attempted: attempted.into(),
        }
    }

    /// Create a validation error without a field
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error for a specific field
    pub fn validation_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field),
        }
    }

    /// Whether this is a not-found outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is an invalid-transition outcome
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Whether this is a validation outcome
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
