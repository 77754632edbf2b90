//! API Error Mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use data_validator::ValidationError;
use metrics::counter;
use serde::{Deserialize, Serialize};
use stats::StatsError;
use storage::StorageError;
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(e) if e.is_envelope_fault() => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(e) => storage_status(e),
            ApiError::Stats(StatsError::NoData) => StatusCode::NOT_FOUND,
            ApiError::Stats(StatsError::Overflow) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Stats(StatsError::Storage(e)) => storage_status(e),
        }
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::EmptyRecord | StorageError::EmptyItem { .. } => StatusCode::BAD_REQUEST,
        StorageError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self);
        }
        counter!("request_errors_total", "status" => status.as_u16().to_string()).increment(1);

        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
