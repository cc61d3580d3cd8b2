//! HTTP mapping for planner errors.
//!
//! Every failure is returned as `{"detail": "<message>"}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::planner::PlanError;

pub fn status_for(err: &PlanError) -> StatusCode {
    match err {
        PlanError::InvalidInput(_) | PlanError::InvalidDate(_) | PlanError::UnsupportedModel(_) => {
            StatusCode::BAD_REQUEST
        }
        PlanError::NotFound(_) => StatusCode::NOT_FOUND,
        PlanError::ProviderUnavailable(_)
        | PlanError::MalformedResponse(_)
        | PlanError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for PlanError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for PlanError {
    fn from(rejection: JsonRejection) -> Self {
        PlanError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for PlanError {
    fn from(rejection: QueryRejection) -> Self {
        PlanError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for PlanError {
    fn from(rejection: PathRejection) -> Self {
        PlanError::InvalidInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_400() {
        for err in [
            PlanError::InvalidInput("x".into()),
            PlanError::InvalidDate("2024-13-45".into()),
            PlanError::UnsupportedModel("invalid_model".into()),
        ] {
            assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);
        }
        assert_eq!(
            status_for(&PlanError::NotFound("Task 1".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn upstream_and_storage_errors_are_500() {
        for err in [
            PlanError::ProviderUnavailable("down".into()),
            PlanError::MalformedResponse("bad".into()),
            PlanError::PersistenceFailure("insert".into()),
        ] {
            assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
