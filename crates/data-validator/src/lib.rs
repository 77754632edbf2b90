//! Record Payload Validation
//!
//! Payload types for measurement records and the schema checks applied
//! before anything reaches the store.

mod error;
mod payload;
mod validator;

pub use error::ValidationError;
pub use payload::{BulkRequest, Field, RecordPatch, DIMENSION_FIELDS};
pub use validator::Validator;
