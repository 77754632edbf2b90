//! Summary Statistics Computation

use crate::StatsError;
use serde::{Deserialize, Serialize};
use storage::Record;
use tracing::debug;

/// Mean and spread of every stored dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Arithmetic mean
    pub average: f64,
    /// Sample standard deviation (n - 1 denominator)
    #[serde(rename = "standardDeviation")]
    pub standard_deviation: f64,
    /// Number of samples behind the figures
    #[serde(skip)]
    pub samples: usize,
}

impl Summary {
    /// Compute mean and sample standard deviation from a slice of values
    pub fn compute(values: &[f64]) -> Result<Self, StatsError> {
        if values.is_empty() {
            return Err(StatsError::NoData);
        }

        // running mean stays within the range of the inputs
        let mut average = 0.0;
        for (k, v) in values.iter().enumerate() {
            average += (v - average) / (k + 1) as f64;
        }

        // a single sample has no spread
        let standard_deviation = if values.len() > 1 {
            let scale = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
            if scale == 0.0 {
                0.0
            } else {
                let m2: f64 = values
                    .iter()
                    .map(|v| {
                        let d = (v - average) / scale;
                        d * d
                    })
                    .sum();
                (m2 / (values.len() - 1) as f64).sqrt() * scale
            }
        } else {
            0.0
        };

        if !average.is_finite() || !standard_deviation.is_finite() {
            return Err(StatsError::Overflow);
        }

        Ok(Self {
            average,
            standard_deviation,
            samples: values.len(),
        })
    }

    /// Flatten the dimensions of every record, skipping nulls
    pub fn extract_samples(records: &[Record]) -> Vec<f64> {
        records
            .iter()
            .flat_map(|r| r.dimensions())
            .flatten()
            .collect()
    }

    /// Summarise every non-null dimension across `records`
    pub fn from_records(records: &[Record]) -> Result<Self, StatsError> {
        let samples = Self::extract_samples(records);
        debug!(
            "Aggregating {} samples from {} records",
            samples.len(),
            records.len()
        );
        Self::compute(&samples)
    }
}
