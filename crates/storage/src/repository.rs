//! Repository Implementation

use crate::StorageError;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS data (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    customer TEXT,
    product  TEXT,
    length1  REAL,
    length2  REAL,
    length3  REAL,
    width1   REAL,
    width2   REAL,
    width3   REAL
);
CREATE INDEX IF NOT EXISTS ix_data_customer ON data (customer);
CREATE INDEX IF NOT EXISTS ix_data_product ON data (product);
"#;

const SELECT_SQL: &str = "SELECT id, customer, product, length1, length2, length3, \
                          width1, width2, width3 FROM data";

/// Store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// sqlx connection URL
    pub database_url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// How long a writer waits on a locked database (ms)
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://measurements.db?mode=rwc".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}

impl StoreConfig {
    /// Private in-memory database, used by tests
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

/// Persisted measurement record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    pub id: i64,
    pub customer: Option<String>,
    pub product: Option<String>,
    pub length1: Option<f64>,
    pub length2: Option<f64>,
    pub length3: Option<f64>,
    pub width1: Option<f64>,
    pub width2: Option<f64>,
    pub width3: Option<f64>,
}

impl Record {
    /// The six measurement columns in storage order
    pub fn dimensions(&self) -> [Option<f64>; 6] {
        [
            self.length1,
            self.length2,
            self.length3,
            self.width1,
            self.width2,
            self.width3,
        ]
    }
}

/// Repository for measurement records
#[derive(Clone)]
pub struct Repository {
    pub(crate) pool: SqlitePool,
}

impl Repository {
    /// Open the store described by `config` and make sure the schema exists
    pub async fn connect(config: &StoreConfig) -> Result<Self, StorageError> {
        let mut max_connections = config.max_connections.max(1);
        if config.is_in_memory() && max_connections > 1 {
            // each in-memory connection would see its own database
            warn!("In-memory store limited to a single connection");
            max_connections = 1;
        }

        let opts = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;

        info!(
            "Opened record store at {} ({} connections)",
            config.database_url, max_connections
        );
        Ok(repo)
    }

    /// Open a fresh in-memory store
    pub async fn in_memory() -> Result<Self, StorageError> {
        Self::connect(&StoreConfig::in_memory()).await
    }

    /// Create the records table and its indexes if missing
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        debug!("Record schema ready");
        Ok(())
    }

    /// All records ordered by id
    pub async fn list(&self) -> Result<Vec<Record>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let records = sqlx::query_as::<_, Record>(&format!("{SELECT_SQL} ORDER BY id"))
            .fetch_all(&mut *conn)
            .await?;
        Ok(records)
    }

    /// Single record by id
    pub async fn get(&self, id: i64) -> Result<Option<Record>, StorageError> {
        let record = sqlx::query_as::<_, Record>(&format!("{SELECT_SQL} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Number of stored records
    pub async fn count(&self) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM data")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Delete every record. Administrative use only.
    pub async fn clear(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM data").execute(&self.pool).await?;
        info!("Cleared {} records", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Close the pool, waiting for checked-out connections to return
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
