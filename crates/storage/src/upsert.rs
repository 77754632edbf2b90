//! Upsert Engine
//!
//! Two write paths share one transaction discipline: every change in a
//! request is applied on a single transaction, and any error drops that
//! transaction uncommitted so the store is left as it was.
//!
//! - [`Repository::save`] overwrites every column of the target record.
//! - [`Repository::bulk_upsert`] merges only the fields a client sent with
//!   a non-null value.

use crate::{Repository, StorageError};
use data_validator::RecordPatch;
use metrics::counter;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, warn};

const INSERT_SQL: &str = "INSERT INTO data \
    (customer, product, length1, length2, length3, width1, width2, width3) \
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

const OVERWRITE_SQL: &str = "UPDATE data SET \
    customer = ?, product = ?, length1 = ?, length2 = ?, length3 = ?, \
    width1 = ?, width2 = ?, width3 = ? WHERE id = ?";

/// Ids touched by a committed bulk upsert, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub created: Vec<i64>,
    pub updated: Vec<i64>,
}

impl Repository {
    /// Create or fully overwrite a single record, returning its id
    pub async fn save(&self, patch: &RecordPatch) -> Result<i64, StorageError> {
        let mut tx = self.pool.begin().await?;

        let id = match patch.id {
            Some(id) => {
                overwrite(&mut tx, id, patch).await?;
                counter!("records_updated_total").increment(1);
                id
            }
            None => {
                if !patch.has_any_value() {
                    return Err(StorageError::EmptyRecord);
                }
                let id = insert(&mut tx, patch).await?;
                counter!("records_created_total").increment(1);
                id
            }
        };

        tx.commit().await?;
        debug!("Saved record {}", id);
        Ok(id)
    }

    /// Apply a batch of partial records atomically.
    ///
    /// Items with an id are merged into the existing record; items without
    /// one are inserted. A missing id or an empty new item aborts the whole
    /// batch.
    pub async fn bulk_upsert(&self, items: &[RecordPatch]) -> Result<BulkOutcome, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = BulkOutcome::default();

        for (index, item) in items.iter().enumerate() {
            match item.id {
                Some(id) => {
                    if let Err(e) = merge(&mut tx, id, item).await {
                        warn!("Bulk upsert rolled back at item {}: {}", index, e);
                        return Err(e);
                    }
                    outcome.updated.push(id);
                }
                None => {
                    if !item.has_any_value() {
                        warn!("Bulk upsert rolled back at item {}: empty new record", index);
                        return Err(StorageError::EmptyItem { index });
                    }
                    outcome.created.push(insert(&mut tx, item).await?);
                }
            }
        }

        tx.commit().await?;

        counter!("records_created_total").increment(outcome.created.len() as u64);
        counter!("records_updated_total").increment(outcome.updated.len() as u64);
        info!(
            "Bulk upsert committed: {} created, {} updated",
            outcome.created.len(),
            outcome.updated.len()
        );
        Ok(outcome)
    }
}

fn bind_fields<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    patch: &RecordPatch,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let mut query = query
        .bind(patch.customer.to_option())
        .bind(patch.product.to_option());
    for (_, field) in patch.dimensions() {
        query = query.bind(field.to_option());
    }
    query
}

async fn insert(conn: &mut SqliteConnection, patch: &RecordPatch) -> Result<i64, StorageError> {
    let result = bind_fields(sqlx::query(INSERT_SQL), patch)
        .execute(&mut *conn)
        .await?;
    Ok(result.last_insert_rowid())
}

async fn overwrite(
    conn: &mut SqliteConnection,
    id: i64,
    patch: &RecordPatch,
) -> Result<(), StorageError> {
    let result = bind_fields(sqlx::query(OVERWRITE_SQL), patch)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound(id));
    }
    Ok(())
}

async fn merge(
    conn: &mut SqliteConnection,
    id: i64,
    patch: &RecordPatch,
) -> Result<(), StorageError> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM data WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    if existing.is_none() {
        return Err(StorageError::NotFound(id));
    }

    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE data SET ");
    let mut assigned = 0;
    {
        let mut set = builder.separated(", ");
        if let Some(customer) = patch.customer.value() {
            set.push("customer = ").push_bind_unseparated(customer.clone());
            assigned += 1;
        }
        if let Some(product) = patch.product.value() {
            set.push("product = ").push_bind_unseparated(product.clone());
            assigned += 1;
        }
        for (column, field) in patch.dimensions() {
            if let Some(&value) = field.value() {
                set.push(format!("{column} = ")).push_bind_unseparated(value);
                assigned += 1;
            }
        }
    }

    if assigned == 0 {
        debug!("Record {} unchanged: no values supplied", id);
        return Ok(());
    }

    builder.push(" WHERE id = ").push_bind(id);
    builder.build().execute(&mut *conn).await?;
    Ok(())
}
