//! Record Routes

use axum::{body::Bytes, extract::State, Json};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::{error::ApiError, AppState};
use storage::Record;

/// Response for the single-record save endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub message: String,
    pub id: i64,
}

/// Response for the bulk endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkResponse {
    pub message: String,
}

/// List every record
pub async fn list_records(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let records = state.repository.list().await?;
    Ok(Json(records))
}

/// Create or fully overwrite one record
pub async fn save_record(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SaveResponse>, ApiError> {
    let patch = state.validator.parse_record(&body)?;
    let id = state.repository.save(&patch).await?;

    Ok(Json(SaveResponse {
        message: "Data saved successfully".to_string(),
        id,
    }))
}

/// Create or partially update a batch of records in one transaction
pub async fn bulk_upsert(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<BulkResponse>, ApiError> {
    counter!("bulk_requests_total").increment(1);

    let request = state.validator.parse_bulk(&body)?;
    let outcome = state.repository.bulk_upsert(&request.items).await?;
    info!(
        "Bulk request applied: {} items ({} new)",
        request.items.len(),
        outcome.created.len()
    );

    Ok(Json(BulkResponse {
        message: "Data updated successfully".to_string(),
    }))
}
