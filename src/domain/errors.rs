//! Domain errors for the emergence engine.

use thiserror::Error;

/// Domain-level errors that can occur in the emergence engine.
///
/// Expected outcomes (a candidate failing the gate, a blocked domain, an
/// oracle that could not be generated, a solution failing its oracle) are
/// modelled as values, not as errors. What remains here are contract
/// violations and infrastructure failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Constitution is write-once and has already been written")]
    ConstitutionImmutable,

    #[error("Append conflict: {entity} {id} already exists")]
    AppendConflict { entity: String, id: String },

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Judgment capability unavailable: {0}")]
    JudgmentUnavailable(String),

    #[error("Random source unavailable: {0}")]
    RandomSourceUnavailable(String),

    #[error("Reflection capability unavailable: {0}")]
    ReflectionUnavailable(String),

    #[error("Oracle execution failed: {0}")]
    OracleExecutionFailed(String),
}

impl DomainError {
    /// Whether this error belongs to the infrastructure tier: the store,
    /// judgment, reflection or random capability is unavailable.
    ///
    /// Infrastructure failures abort the current cycle and propagate to the
    /// orchestrator's caller; everything else is recovered locally.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_)
                | Self::JudgmentUnavailable(_)
                | Self::RandomSourceUnavailable(_)
                | Self::ReflectionUnavailable(_)
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_classification() {
        assert!(DomainError::DatabaseError("locked".into()).is_infrastructure());
        assert!(DomainError::JudgmentUnavailable("503".into()).is_infrastructure());
        assert!(DomainError::RandomSourceUnavailable("timeout".into()).is_infrastructure());
        assert!(!DomainError::ValidationFailed("bad".into()).is_infrastructure());
        assert!(!DomainError::ConstitutionImmutable.is_infrastructure());
        assert!(!DomainError::OracleExecutionFailed("exit 1".into()).is_infrastructure());
    }

    #[test]
    fn test_error_messages() {
        let err = DomainError::AppendConflict {
            entity: "trajectory".into(),
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "Append conflict: trajectory abc already exists");
    }
}
