//! Statistics Routes

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{error::ApiError, AppState};
use ::stats::Summary;

/// Mean and sample standard deviation of every stored dimension
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<Summary>, ApiError> {
    let summary = ::stats::aggregate(&state.repository).await?;
    Ok(Json(summary))
}
