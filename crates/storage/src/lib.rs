//! Storage Layer
//!
//! SQLite persistence for measurement records. Every write runs inside a
//! single transaction that rolls back when dropped uncommitted.

mod repository;
mod upsert;

pub use repository::{Record, Repository, StoreConfig};
pub use upsert::BulkOutcome;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record with id {0} not found")]
    NotFound(i64),
    #[error("New record must have at least one non-null field")]
    EmptyRecord,
    #[error("New record must have at least one non-null field (item {index})")]
    EmptyItem { index: usize },
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}
