use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::backtest::BacktestError;
use crate::services::conditions::SeriesError;
use crate::services::lab_data::LabDataError;
use crate::services::risk::RiskError;
use crate::store::StoreError;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Invalid risk configuration: {0}")]
    Configuration(#[from] RiskError),

    #[error("Lake store error: {0}")]
    Store(StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::ExternalServiceError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Configuration(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::Store(err) => {
                tracing::error!("Lake store error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal storage error".to_string(),
                )
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateLake { .. } => AppError::Conflict(err.to_string()),
            other => AppError::Store(other),
        }
    }
}

impl From<SeriesError> for AppError {
    fn from(err: SeriesError) -> Self {
        AppError::BadRequest(format!("Invalid weather series: {}", err))
    }
}

impl From<LabDataError> for AppError {
    fn from(err: LabDataError) -> Self {
        AppError::InternalError(format!("Lab data error: {}", err))
    }
}

impl From<BacktestError> for AppError {
    fn from(err: BacktestError) -> Self {
        AppError::InternalError(format!("Backtest error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::ExternalServiceError("x".into()), StatusCode::BAD_GATEWAY),
            (
                AppError::Configuration(RiskError::MissingStratification),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_duplicate_lake_maps_to_conflict() {
        let err = AppError::from(StoreError::DuplicateLake {
            owner: "alice".into(),
            name: "Buckhorn".into(),
        });
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
