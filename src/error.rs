use crate::orchestration::OrchestrationError;
use crate::recompute::{PipelineError, StageFailure};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Db(e) => AppError::Internal(e.to_string()),
            PipelineError::NotFound(what) => AppError::NotFound(what),
            e @ PipelineError::NotTripMember { .. } => AppError::Conflict(e.to_string()),
        }
    }
}

impl From<StageFailure> for AppError {
    fn from(err: StageFailure) -> Self {
        err.source.into()
    }
}

impl From<OrchestrationError> for AppError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::Pipeline(e) => e.into(),
            OrchestrationError::Stage(e) => e.into(),
            OrchestrationError::Db(e) => e.into(),
            OrchestrationError::NotFound(what) => AppError::NotFound(what),
            OrchestrationError::InvalidInput(msg) => AppError::BadRequest(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %error_message, "Request failed");
        }

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomerId, TripId};

    #[test]
    fn test_not_trip_member_maps_to_conflict() {
        let err: AppError = PipelineError::NotTripMember {
            trip_id: TripId::new(1),
            customer_id: CustomerId::new(2),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let err: AppError = OrchestrationError::InvalidInput("amount".to_string()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err: AppError = OrchestrationError::NotFound("trip 9".to_string()).into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
