//! Payload Validator

use crate::error::ValidationError;
use crate::payload::{BulkRequest, RecordPatch};
use serde_json::Value;
use tracing::debug;

/// Schema validator for record payloads.
///
/// Dimensions are physical measurements and may never be negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a single dimension value
    pub fn validate_dimension(
        &self,
        field: &'static str,
        value: f64,
    ) -> Result<(), ValidationError> {
        if value < 0.0 {
            Err(ValidationError::Negative { field, value })
        } else {
            Ok(())
        }
    }

    /// Validate every dimension the payload sets
    pub fn validate_patch(&self, patch: &RecordPatch) -> Result<(), ValidationError> {
        for (field, value) in patch.dimensions() {
            if let Some(&v) = value.value() {
                self.validate_dimension(field, v)?;
            }
        }
        Ok(())
    }

    /// Decode and validate a single record payload
    pub fn parse_record(&self, body: &[u8]) -> Result<RecordPatch, ValidationError> {
        let value = decode_body(body)?;
        let patch: RecordPatch = serde_json::from_value(value)
            .map_err(|e| ValidationError::InvalidRecord(e.to_string()))?;
        self.validate_patch(&patch)?;
        Ok(patch)
    }

    /// Decode and validate a bulk envelope
    pub fn parse_bulk(&self, body: &[u8]) -> Result<BulkRequest, ValidationError> {
        let items = match decode_body(body)? {
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(ValidationError::MalformedEnvelope(
                        "`items` must be an array".to_string(),
                    ))
                }
                None => {
                    return Err(ValidationError::MalformedEnvelope(
                        "missing `items` field".to_string(),
                    ))
                }
            },
            _ => {
                return Err(ValidationError::MalformedEnvelope(
                    "expected a JSON object".to_string(),
                ))
            }
        };

        let mut patches = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let patch: RecordPatch = serde_json::from_value(item)
                .map_err(|e| ValidationError::InvalidItem {
                    index,
                    reason: e.to_string(),
                })?;
            if let Err(e) = self.validate_patch(&patch) {
                debug!("Bulk item {} rejected: {}", index, e);
                return Err(e);
            }
            patches.push(patch);
        }

        Ok(BulkRequest { items: patches })
    }
}

fn decode_body(body: &[u8]) -> Result<Value, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Field;
    use proptest::prelude::*;

    #[test]
    fn test_valid_dimensions() {
        let validator = Validator::new();
        assert!(validator.validate_dimension("length1", 0.0).is_ok());
        assert!(validator.validate_dimension("length1", 12.5).is_ok());
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let validator = Validator::new();
        let err = validator
            .parse_bulk(br#"{"items": [{"customer": "A", "length1": -10.0}]}"#)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Negative {
                field: "length1",
                value: -10.0
            }
        );
        assert!(!err.is_envelope_fault());
    }

    #[test]
    fn test_null_dimension_is_not_checked() {
        let validator = Validator::new();
        let request = validator
            .parse_bulk(br#"{"items": [{"id": 1, "width2": null}]}"#)
            .unwrap();
        assert_eq!(request.items[0].width2, Field::Null);
    }

    #[test]
    fn test_envelope_shape() {
        let validator = Validator::new();

        let err = validator.parse_bulk(b"[1, 2]").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedEnvelope(_)));

        let err = validator.parse_bulk(br#"{"items": {}}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedEnvelope(_)));

        let err = validator.parse_bulk(br#"{"rows": []}"#).unwrap_err();
        assert!(err.is_envelope_fault());

        let err = validator.parse_bulk(b"{not json").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedBody(_)));
    }

    #[test]
    fn test_wrong_item_type_reports_index() {
        let validator = Validator::new();
        let err = validator
            .parse_bulk(br#"{"items": [{}, {"length2": "long"}]}"#)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidItem { index: 1, .. }));
    }

    #[test]
    fn test_empty_item_passes_schema() {
        // "at least one field" is a business rule enforced by the store
        let validator = Validator::new();
        let request = validator.parse_bulk(br#"{"items": [{}]}"#).unwrap();
        assert_eq!(request.items.len(), 1);
        assert!(!request.items[0].has_any_value());
    }

    #[test]
    fn test_parse_record() {
        let validator = Validator::new();
        let patch = validator
            .parse_record(br#"{"customer": "C", "product": "P", "width1": 3}"#)
            .unwrap();
        assert_eq!(patch.customer, Field::Value("C".to_string()));

        let err = validator.parse_record(br#"{"width1": -0.5}"#).unwrap_err();
        assert!(matches!(err, ValidationError::Negative { field: "width1", .. }));

        let err = validator.parse_record(br#""text""#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRecord(_)));
    }

    proptest! {
        #[test]
        fn prop_negative_values_always_rejected(value in -1.0e9f64..-1.0e-9) {
            let body = format!(r#"{{"items": [{{"width3": {}}}]}}"#, value);
            let result = Validator::new().parse_bulk(body.as_bytes());
            let is_negative = matches!(result, Err(ValidationError::Negative { .. }));
            prop_assert!(is_negative);
        }

        #[test]
        fn prop_non_negative_values_accepted(value in 0.0f64..1.0e9) {
            let body = format!(r#"{{"items": [{{"length3": {}}}]}}"#, value);
            prop_assert!(Validator::new().parse_bulk(body.as_bytes()).is_ok());
        }
    }
}
