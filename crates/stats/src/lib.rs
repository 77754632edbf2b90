//! Record Statistics
//!
//! Mean and sample standard deviation over every stored dimension.

mod summary;

pub use summary::Summary;

use storage::{Repository, StorageError};
use thiserror::Error;

/// Aggregation errors
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("No data available")]
    NoData,
    #[error("Statistics exceed the floating point range")]
    Overflow,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Read every record from the store and summarise its dimensions
pub async fn aggregate(repository: &Repository) -> Result<Summary, StatsError> {
    let records = repository.list().await?;
    Summary::from_records(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_validator::{Field, RecordPatch};

    #[tokio::test]
    async fn test_aggregate_empty_store() {
        let repo = Repository::in_memory().await.unwrap();
        assert!(matches!(aggregate(&repo).await, Err(StatsError::NoData)));
    }

    #[tokio::test]
    async fn test_aggregate_reads_all_records() {
        let repo = Repository::in_memory().await.unwrap();
        for value in [2.0, 4.0] {
            let patch = RecordPatch {
                customer: Field::Value("C".to_string()),
                length1: Field::Value(value),
                ..Default::default()
            };
            repo.save(&patch).await.unwrap();
        }

        let summary = aggregate(&repo).await.unwrap();
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.average, 3.0);
        assert!((summary.standard_deviation - 2.0f64.sqrt()).abs() < 1e-9);
    }
}
