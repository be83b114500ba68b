//! Structured local store
//!
//! Holds the four record collections, one table per collection.
//! Records are kept as JSON bodies keyed by id, in insertion order.
//! Writers replace a whole collection inside one transaction.

use super::models::{Collection, Record};
use super::schema::{initialize_database, schema_version};
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Versioned, key-indexed store for all collections
#[derive(Clone)]
pub struct CollectionStore {
    pool: SqlitePool,
    locks: Arc<[Mutex<()>; 4]>,
}

impl CollectionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: Arc::new([Mutex::new(()), Mutex::new(()), Mutex::new(()), Mutex::new(())]),
        }
    }

    /// Open (creating on first use) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = super::create_pool(db_path).await.map_err(|e| {
            tracing::error!("Could not open local store at {:?}: {}", db_path, e);
            AppError::StorageUnavailable(e.to_string())
        })?;
        Ok(Self::new(pool))
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Serialize read-modify-write sequences on one collection.
    ///
    /// Waiters are served in FIFO order, so mutations apply in the order
    /// they were issued. Hold the guard across read and replace.
    pub async fn lock(&self, collection: Collection) -> MutexGuard<'_, ()> {
        self.locks[collection.index()].lock().await
    }

    pub async fn schema_version(&self) -> Result<i32> {
        schema_version(&self.pool).await
    }

    /// Full collection in insertion order. Undecodable rows are skipped.
    pub async fn read_collection<R: Record>(&self) -> Result<Vec<R>> {
        let collection = R::COLLECTION;
        if !self.ensure_collection(collection).await? {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, body FROM {} ORDER BY position ASC",
            collection.table_name()
        );
        let rows: Vec<(String, String)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        let records = rows
            .into_iter()
            .filter_map(|(id, body)| match serde_json::from_str::<R>(&body) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping unreadable {} record {}: {}", collection, id, e);
                    None
                }
            })
            .collect();

        Ok(records)
    }

    /// Atomically rewrite a collection with `records`.
    ///
    /// Duplicate ids within `records` are last-write-wins and keep the
    /// position of their first occurrence. Stored rows this build cannot
    /// decode as `R` are carried over verbatim after the new records, so a
    /// rewrite never drops data written by a newer version. Returns the
    /// number of distinct records from `records` stored.
    pub async fn replace_collection<R: Record>(&self, records: &[R]) -> Result<usize> {
        self.write_collection(records, true).await
    }

    /// Like [`replace_collection`](Self::replace_collection), but discards
    /// every existing row, readable or not. Used for explicit imports.
    pub async fn overwrite_collection<R: Record>(&self, records: &[R]) -> Result<usize> {
        self.write_collection(records, false).await
    }

    async fn write_collection<R: Record>(&self, records: &[R], keep_unreadable: bool) -> Result<usize> {
        let collection = R::COLLECTION;
        if !self.ensure_collection(collection).await? {
            return Ok(0);
        }

        // Serialize everything up front so a bad record never opens a transaction
        let mut bodies = Vec::with_capacity(records.len());
        for record in records {
            bodies.push((record.id(), serde_json::to_string(record)?));
        }

        let table = collection.table_name();
        let insert_sql = format!(
            "INSERT INTO {} (id, position, body, stored_at) VALUES (?, ?, ?, ?)",
            table
        );
        let update_sql = format!("UPDATE {} SET body = ?, stored_at = ? WHERE id = ?", table);
        let now = Utc::now();
        let mut seen = HashSet::new();

        let mut tx = self.pool.begin().await?;

        let unreadable: Vec<(String, String)> = if keep_unreadable {
            let incoming: HashSet<&str> = bodies.iter().map(|(id, _)| *id).collect();
            let existing: Vec<(String, String)> = sqlx::query_as(&format!(
                "SELECT id, body FROM {} ORDER BY position ASC",
                table
            ))
            .fetch_all(&mut *tx)
            .await?;
            existing
                .into_iter()
                .filter(|(id, body)| {
                    !incoming.contains(id.as_str()) && serde_json::from_str::<R>(body).is_err()
                })
                .collect()
        } else {
            Vec::new()
        };

        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await?;

        for (position, (id, body)) in bodies.iter().enumerate() {
            let inserted = sqlx::query(&insert_sql)
                .bind(*id)
                .bind(position as i64)
                .bind(body)
                .bind(now)
                .execute(&mut *tx)
                .await;

            match inserted {
                Ok(_) => {}
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    tracing::debug!("Duplicate id {} in {} batch, updating in place", id, collection);
                    sqlx::query(&update_sql)
                        .bind(body)
                        .bind(now)
                        .bind(*id)
                        .execute(&mut *tx)
                        .await?;
                }
                Err(e) => return Err(e.into()),
            }
            seen.insert(*id);
        }

        for (offset, (id, body)) in unreadable.iter().enumerate() {
            sqlx::query(&insert_sql)
                .bind(id)
                .bind((bodies.len() + offset) as i64)
                .bind(body)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        if !unreadable.is_empty() {
            tracing::warn!(
                "Kept {} unreadable {} records unchanged",
                unreadable.len(),
                collection
            );
        }
        tracing::debug!("Stored {} records in {}", seen.len(), collection);
        Ok(seen.len())
    }

    /// Number of records in a collection, 0 when it does not exist yet
    pub async fn count(&self, collection: Collection) -> Result<usize> {
        if !self.ensure_collection(collection).await? {
            return Ok(0);
        }
        let sql = format!("SELECT COUNT(*) FROM {}", collection.table_name());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count as usize)
    }

    /// Ids currently stored in a collection
    pub async fn ids(&self, collection: Collection) -> Result<HashSet<String>> {
        if !self.ensure_collection(collection).await? {
            return Ok(HashSet::new());
        }
        let sql = format!("SELECT id FROM {}", collection.table_name());
        let ids: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(ids.into_iter().collect())
    }

    /// Make sure the collection table exists, running pending migrations
    /// once if it does not. `false` means the caller should degrade to an
    /// empty result.
    async fn ensure_collection(&self, collection: Collection) -> Result<bool> {
        if self.table_exists(collection).await? {
            return Ok(true);
        }

        tracing::warn!("Collection {} missing, applying pending migrations", collection);
        initialize_database(&self.pool).await?;

        if self.table_exists(collection).await? {
            return Ok(true);
        }

        let missing = AppError::CollectionMissing(collection.to_string());
        tracing::warn!("{}; treating as empty", missing);
        Ok(false)
    }

    async fn table_exists(&self, collection: Collection) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(collection.table_name())
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}

/// Collapse duplicate ids: the last value wins, at the first position.
///
/// Mirrors what [`CollectionStore::replace_collection`] keeps, so callers
/// can serialize exactly what was stored.
pub fn collapse_duplicates<R: Record>(records: &[R]) -> Vec<R> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut collapsed: Vec<R> = Vec::with_capacity(records.len());
    for record in records {
        match positions.get(record.id()) {
            Some(&index) => collapsed[index] = record.clone(),
            None => {
                positions.insert(record.id(), collapsed.len());
                collapsed.push(record.clone());
            }
        }
    }
    collapsed
}
