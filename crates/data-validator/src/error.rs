//! Validation Error Types

use thiserror::Error;

/// Errors during payload validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Dimension below zero
    #[error("{field} must be greater than or equal to 0, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// Body is not valid JSON
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// Bulk envelope has the wrong shape
    #[error("Malformed bulk request: {0}")]
    MalformedEnvelope(String),

    /// Single payload could not be decoded as a record
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Bulk item could not be decoded as a record payload
    #[error("Invalid item at index {index}: {reason}")]
    InvalidItem { index: usize, reason: String },
}

impl ValidationError {
    /// Whether the error concerns the request envelope rather than a record's schema
    pub fn is_envelope_fault(&self) -> bool {
        matches!(
            self,
            ValidationError::MalformedBody(_) | ValidationError::MalformedEnvelope(_)
        )
    }
}
