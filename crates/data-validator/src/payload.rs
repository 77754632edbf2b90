//! Record Payload Types

use serde::{Deserialize, Deserializer};

/// A payload field that remembers whether it was sent.
///
/// A missing key decodes to `Absent` (through `#[serde(default)]` on the
/// containing struct), a JSON `null` to `Null`, and anything else to
/// `Value`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Field<T> {
    /// The carried value, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Whether a non-null value was sent
    pub fn is_set(&self) -> bool {
        matches!(self, Field::Value(_))
    }
}

impl<T: Clone> Field<T> {
    /// Value for a full overwrite: absent and null both become `None`
    pub fn to_option(&self) -> Option<T> {
        self.value().cloned()
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Value(v),
            None => Field::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Field::from)
    }
}

/// Names of the six measurement columns, in storage order
pub const DIMENSION_FIELDS: [&str; 6] =
    ["length1", "length2", "length3", "width1", "width2", "width3"];

/// Partial record as received from a client
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordPatch {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub customer: Field<String>,
    #[serde(default)]
    pub product: Field<String>,
    #[serde(default)]
    pub length1: Field<f64>,
    #[serde(default)]
    pub length2: Field<f64>,
    #[serde(default)]
    pub length3: Field<f64>,
    #[serde(default)]
    pub width1: Field<f64>,
    #[serde(default)]
    pub width2: Field<f64>,
    #[serde(default)]
    pub width3: Field<f64>,
}

impl RecordPatch {
    /// Measurement fields paired with their column names
    pub fn dimensions(&self) -> [(&'static str, &Field<f64>); 6] {
        [
            (DIMENSION_FIELDS[0], &self.length1),
            (DIMENSION_FIELDS[1], &self.length2),
            (DIMENSION_FIELDS[2], &self.length3),
            (DIMENSION_FIELDS[3], &self.width1),
            (DIMENSION_FIELDS[4], &self.width2),
            (DIMENSION_FIELDS[5], &self.width3),
        ]
    }

    /// Whether any non-id field carries a value
    pub fn has_any_value(&self) -> bool {
        self.customer.is_set()
            || self.product.is_set()
            || self.dimensions().iter().any(|(_, f)| f.is_set())
    }
}

/// Bulk upsert envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkRequest {
    pub items: Vec<RecordPatch>,
}
