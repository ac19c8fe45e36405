use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::error::SubmissionError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::DuplicateSubmission { .. } => ApiError::Conflict(err.to_string()),
            SubmissionError::NotFound(_) => ApiError::NotFound(err.to_string()),
            SubmissionError::AlreadyEvaluating(_)
            | SubmissionError::AlreadyEvaluated(_)
            | SubmissionError::AlreadyRevised(_) => ApiError::BadRequest(err.to_string()),
            SubmissionError::Provider(provider) => {
                ApiError::ServiceUnavailable(provider.to_string())
            }
            SubmissionError::Database(db) => ApiError::internal(db, "Database query failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                let status = StatusCode::SERVICE_UNAVAILABLE;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::error::SubmissionError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn maps_service_errors_to_statuses() {
        let duplicate: ApiError = SubmissionError::DuplicateSubmission {
            student_id: 1,
            component_type: "ESSAY".to_string(),
        }
        .into();
        assert_eq!(duplicate.into_response().status(), StatusCode::CONFLICT);

        let missing: ApiError = SubmissionError::NotFound(9).into();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let revised: ApiError = SubmissionError::AlreadyRevised(9).into();
        assert_eq!(revised.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
