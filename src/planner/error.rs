//! Planner error taxonomy.

use crate::llm::LlmError;
use crate::store::StoreError;
use crate::task::TaskError;

/// Failures surfaced by planner operations.
///
/// Each variant maps to exactly one HTTP status at the API boundary.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Missing or empty request field.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Unsupported model '{0}'")]
    UnsupportedModel(String),

    /// Transport failure, timeout, non-success status, or provider not configured.
    #[error("Completion provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider output unusable after parsing and validation.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Insert or update failed. Earlier inserts of the same batch are kept.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl From<LlmError> for PlanError {
    fn from(err: LlmError) -> Self {
        if err.is_unavailable() {
            PlanError::ProviderUnavailable(err.to_string())
        } else {
            PlanError::MalformedResponse(err.to_string())
        }
    }
}

impl From<StoreError> for PlanError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => PlanError::NotFound(what),
            other => PlanError::PersistenceFailure(other.to_string()),
        }
    }
}

impl From<TaskError> for PlanError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::InvalidDate(raw) => PlanError::InvalidDate(raw),
            TaskError::EmptyName => PlanError::MalformedResponse(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_split_by_kind() {
        let down: PlanError = LlmError::from_status(503, "overloaded".into()).into();
        assert!(matches!(down, PlanError::ProviderUnavailable(_)));

        let garbled: PlanError = LlmError::parse_error("not json".into()).into();
        assert!(matches!(garbled, PlanError::MalformedResponse(_)));
    }

    #[test]
    fn store_not_found_stays_not_found() {
        let err: PlanError = StoreError::NotFound("task 1".into()).into();
        assert_eq!(err.to_string(), "task 1 not found");

        let err: PlanError = StoreError::EmptyRepresentation("tasks").into();
        assert!(matches!(err, PlanError::PersistenceFailure(_)));
    }
}
