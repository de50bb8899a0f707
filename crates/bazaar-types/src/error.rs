//! Failure taxonomy shared by the store and the HTTP layer.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BazaarError {
    /// Referenced id (or id under its parent scope) does not exist.
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Payload violates a field constraint or a cross-field invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A well-formed foreign reference that points somewhere it may not.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Operation would break a structural invariant.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage was busy or locked; safe to retry.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BazaarError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Only concurrency conflicts can be retried without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }

    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation_error",
            Self::InvalidReference(_) => "invalid_reference",
            Self::Conflict(_) => "conflict",
            Self::ConcurrencyConflict(_) => "concurrency_conflict",
            Self::Internal(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, BazaarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_concurrency_conflicts_are_retryable() {
        assert!(BazaarError::ConcurrencyConflict("busy".into()).is_retryable());
        assert!(!BazaarError::Conflict("has replies".into()).is_retryable());
        assert!(!BazaarError::not_found("Thread", "x").is_retryable());
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = BazaarError::not_found("Comment", "42");
        assert_eq!(err.to_string(), "Comment not found with ID 42");
        assert_eq!(err.kind(), "not_found");
    }
}
