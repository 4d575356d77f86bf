// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Crash-durable mutation queue backed by SQLite.
//!
//! The database is opened lazily: constructing a [`SqliteMutationStore`]
//! touches nothing on disk, and the first operation creates the file and
//! schema. Every operation waits on that initialization before proceeding.
//!
//! Schema:
//! ```sql
//! CREATE TABLE pending_mutations (
//!   id INTEGER PRIMARY KEY AUTOINCREMENT,
//!   url TEXT NOT NULL,
//!   method TEXT NOT NULL,
//!   headers TEXT NOT NULL,      -- JSON array of [name, value] pairs
//!   body BLOB,
//!   enqueued_at INTEGER NOT NULL,
//!   retry_count INTEGER NOT NULL DEFAULT 0
//! )
//! ```
//!
//! `AUTOINCREMENT` keeps ids strictly increasing even after the newest row is
//! deleted, so `ORDER BY id` is enqueue order for the life of the file.

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::traits::{
    CorruptMutation, MutationPatch, MutationStore, NewMutation, PendingMutation, QueueScan,
    StorageError,
};
use crate::resilience::backoff::{with_backoff, BackoffConfig};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS pending_mutations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL,
        method TEXT NOT NULL,
        headers TEXT NOT NULL,
        body BLOB,
        enqueued_at INTEGER NOT NULL,
        retry_count INTEGER NOT NULL DEFAULT 0
    )
"#;

pub struct SqliteMutationStore {
    path: PathBuf,
    backoff: BackoffConfig,
    pool: OnceCell<SqlitePool>,
}

impl SqliteMutationStore {
    /// Create a handle; nothing is opened until first use.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            backoff: BackoffConfig::store_open(),
            pool: OnceCell::new(),
        }
    }

    /// Create a handle and open the database immediately.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let store = Self::new(path);
        store.pool().await?;
        Ok(store)
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the database has been opened yet.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    async fn pool(&self) -> Result<&SqlitePool, StorageError> {
        self.pool
            .get_or_try_init(|| Self::connect(&self.path, &self.backoff))
            .await
    }

    async fn connect(path: &Path, backoff: &BackoffConfig) -> Result<SqlitePool, StorageError> {
        info!(path = %path.display(), "Opening offline mutation queue");

        // FULL sync: an acknowledged enqueue must survive power loss
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        let pool = with_backoff("queue_open", backoff, || {
            let options = options.clone();
            async move {
                SqlitePoolOptions::new()
                    .max_connections(4)
                    .connect_with(options)
                    .await
                    .map_err(|e| StorageError::Backend(format!("Failed to open queue: {}", e)))
            }
        })
        .await?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to create queue schema: {}", e)))?;

        let pending: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_mutations")
            .fetch_one(&pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if pending > 0 {
            warn!(pending, "Queue has mutations from a previous run, will replay");
        }

        Ok(pool)
    }

    fn row_to_mutation(row: &SqliteRow) -> Result<PendingMutation, StorageError> {
        let backend = |e: sqlx::Error| StorageError::Backend(e.to_string());

        let id: i64 = row.try_get("id").map_err(backend)?;
        let headers_json: String = row.try_get("headers").map_err(backend)?;
        let headers: Vec<(String, String)> =
            serde_json::from_str(&headers_json).map_err(|e| StorageError::Corrupt {
                id,
                reason: format!("headers: {}", e),
            })?;
        let body: Option<Vec<u8>> = row.try_get("body").map_err(backend)?;
        let retry_count: i64 = row.try_get("retry_count").map_err(backend)?;
        let retry_count = u32::try_from(retry_count).map_err(|_| StorageError::Corrupt {
            id,
            reason: format!("retry_count out of range: {}", retry_count),
        })?;

        Ok(PendingMutation {
            id,
            url: row.try_get("url").map_err(backend)?,
            method: row.try_get("method").map_err(backend)?,
            headers,
            body: body.map(Bytes::from),
            enqueued_at: row.try_get("enqueued_at").map_err(backend)?,
            retry_count,
        })
    }
}

#[async_trait]
impl MutationStore for SqliteMutationStore {
    async fn enqueue(&self, mutation: NewMutation) -> Result<i64, StorageError> {
        let pool = self.pool().await?;
        let headers = serde_json::to_string(&mutation.headers)
            .map_err(|e| StorageError::Backend(format!("Failed to encode headers: {}", e)))?;

        let result = sqlx::query(
            "INSERT INTO pending_mutations (url, method, headers, body, enqueued_at, retry_count)
             VALUES (?, ?, ?, ?, ?, 0)",
        )
        .bind(mutation.url.as_str())
        .bind(mutation.method.as_str())
        .bind(headers)
        .bind(mutation.body.as_deref())
        .bind(mutation.enqueued_at)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Backend(format!("Failed to enqueue mutation: {}", e)))?;

        let id = result.last_insert_rowid();
        debug!(id, url = %mutation.url, method = %mutation.method, "Mutation enqueued");
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<PendingMutation>, StorageError> {
        Ok(self.scan().await?.pending)
    }

    async fn scan(&self) -> Result<QueueScan, StorageError> {
        let pool = self.pool().await?;
        let rows = sqlx::query(
            "SELECT id, url, method, headers, body, enqueued_at, retry_count
             FROM pending_mutations ORDER BY id ASC",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| StorageError::Backend(format!("Failed to list mutations: {}", e)))?;

        let mut scan = QueueScan::default();
        for row in &rows {
            match Self::row_to_mutation(row) {
                Ok(mutation) => scan.pending.push(mutation),
                Err(StorageError::Corrupt { id, reason }) => {
                    warn!(id, reason = %reason, "Undecodable row in mutation queue");
                    let url: String = row.try_get("url").unwrap_or_default();
                    scan.corrupt.push(CorruptMutation { id, url, reason });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(scan)
    }

    async fn update(&self, id: i64, patch: MutationPatch) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        let Some(retry_count) = patch.retry_count else {
            return Ok(());
        };

        let result = sqlx::query("UPDATE pending_mutations SET retry_count = ? WHERE id = ?")
            .bind(i64::from(retry_count))
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to update mutation {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        sqlx::query("DELETE FROM pending_mutations WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to delete mutation {}: {}", id, e)))?;
        Ok(())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let pool = self.pool().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_mutations")
            .fetch_one(pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(count as u64)
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            debug!(path = %self.path.display(), "Closed offline mutation queue");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn report(n: u32) -> NewMutation {
        NewMutation {
            url: format!("https://api.example/reports/{n}"),
            method: "POST".into(),
            headers: vec![
                ("content-type".into(), "application/json".into()),
                ("x-client".into(), "field-app".into()),
            ],
            body: Some(Bytes::from(format!(r#"{{"report":{n}}}"#))),
            enqueued_at: 1_700_000_000_000 + i64::from(n),
        }
    }

    #[tokio::test]
    async fn test_store_is_lazy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.db");

        let store = SqliteMutationStore::new(&path);
        assert!(!store.is_initialized());
        assert!(!path.exists());

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.is_initialized());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_enqueue_and_list_roundtrip_fields() {
        let dir = tempdir().unwrap();
        let store = SqliteMutationStore::open(dir.path().join("queue.db")).await.unwrap();

        let id = store.enqueue(report(1)).await.unwrap();
        let rows = store.list_all().await.unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.url, "https://api.example/reports/1");
        assert_eq!(row.method, "POST");
        assert_eq!(row.headers[1], ("x-client".to_string(), "field-app".to_string()));
        assert_eq!(row.body.as_deref(), Some(&br#"{"report":1}"#[..]));
        assert_eq!(row.enqueued_at, 1_700_000_000_001);
        assert_eq!(row.retry_count, 0);
    }

    #[tokio::test]
    async fn test_bodyless_mutation() {
        let dir = tempdir().unwrap();
        let store = SqliteMutationStore::open(dir.path().join("queue.db")).await.unwrap();

        let mut mutation = report(1);
        mutation.body = None;
        mutation.method = "DELETE".into();
        store.enqueue(mutation).await.unwrap();

        let rows = store.list_all().await.unwrap();
        assert!(rows[0].body.is_none());
        assert_eq!(rows[0].method, "DELETE");
    }

    #[tokio::test]
    async fn test_list_in_enqueue_order() {
        let dir = tempdir().unwrap();
        let store = SqliteMutationStore::open(dir.path().join("queue.db")).await.unwrap();

        for n in 0..5 {
            store.enqueue(report(n)).await.unwrap();
        }
        let ids: Vec<i64> = store.list_all().await.unwrap().iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_update_retry_count() {
        let dir = tempdir().unwrap();
        let store = SqliteMutationStore::open(dir.path().join("queue.db")).await.unwrap();

        let id = store.enqueue(report(1)).await.unwrap();
        store.update(id, MutationPatch::retry_count(2)).await.unwrap();
        assert_eq!(store.list_all().await.unwrap()[0].retry_count, 2);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = SqliteMutationStore::open(dir.path().join("queue.db")).await.unwrap();

        let result = store.update(42, MutationPatch::retry_count(1)).await;
        assert!(matches!(result, Err(StorageError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = SqliteMutationStore::open(dir.path().join("queue.db")).await.unwrap();

        let id = store.enqueue(report(1)).await.unwrap();
        store.delete(id).await.unwrap();
        store.delete(id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_deleting_newest() {
        let dir = tempdir().unwrap();
        let store = SqliteMutationStore::open(dir.path().join("queue.db")).await.unwrap();

        let first = store.enqueue(report(1)).await.unwrap();
        store.delete(first).await.unwrap();
        let second = store.enqueue(report(2)).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_persistence_across_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("restart.db");

        {
            let store = SqliteMutationStore::open(&path).await.unwrap();
            store.enqueue(report(1)).await.unwrap();
            let id = store.enqueue(report(2)).await.unwrap();
            store.update(id, MutationPatch::retry_count(1)).await.unwrap();
            store.enqueue(report(3)).await.unwrap();
        }

        let store = SqliteMutationStore::new(&path);
        let rows = store.list_all().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].retry_count, 1);
        assert_eq!(rows[2].url, "https://api.example/reports/3");
    }

    #[tokio::test]
    async fn test_unopenable_path_is_error() {
        let dir = tempdir().unwrap();
        // Parent directory does not exist
        let path = dir.path().join("missing").join("queue.db");
        let store = SqliteMutationStore::new(&path).with_backoff(BackoffConfig::test());

        let result = store.enqueue(report(1)).await;
        assert!(matches!(result, Err(StorageError::Backend(_))));
    }

    async fn corrupt_headers(store: &SqliteMutationStore, id: i64) {
        sqlx::query("UPDATE pending_mutations SET headers = 'not json' WHERE id = ?")
            .bind(id)
            .execute(store.pool().await.unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_scan_reports_corrupt_rows_separately() {
        let dir = tempdir().unwrap();
        let store = SqliteMutationStore::open(dir.path().join("queue.db")).await.unwrap();
        store.enqueue(report(1)).await.unwrap();
        let bad = store.enqueue(report(2)).await.unwrap();
        store.enqueue(report(3)).await.unwrap();
        corrupt_headers(&store, bad).await;

        let scan = store.scan().await.unwrap();
        assert_eq!(scan.len(), 3);
        assert_eq!(scan.pending.len(), 2);
        assert_eq!(scan.corrupt.len(), 1);
        assert_eq!(scan.corrupt[0].id, bad);
        assert_eq!(scan.corrupt[0].url, "https://api.example/reports/2");
        assert!(scan.corrupt[0].reason.starts_with("headers"));

        // Readable rows still list
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_replay_discards_corrupt_row_and_delivers_the_rest() {
        use crate::messages::SyncMessage;
        use crate::notify::NotificationHub;
        use crate::replay::ReplayEngine;
        use crate::resilience::retry::RetryPolicy;
        use crate::testing::StubNetwork;
        use std::sync::Arc;

        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteMutationStore::open(dir.path().join("queue.db")).await.unwrap());
        store.enqueue(report(1)).await.unwrap();
        let bad = store.enqueue(report(2)).await.unwrap();
        corrupt_headers(&store, bad).await;

        let network = Arc::new(StubNetwork::ok("{}"));
        let hub = Arc::new(NotificationHub::new());
        let mut client = hub.subscribe();
        let engine = ReplayEngine::new(store.clone(), network.clone(), hub, RetryPolicy::default());

        let summary = engine.replay().await.unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(network.calls(), 1);
        assert_eq!(store.count().await.unwrap(), 0);

        let messages = client.drain();
        assert!(messages.iter().any(|m| matches!(
            m,
            SyncMessage::SyncFailed { url, .. } if url == "https://api.example/reports/2"
        )));

        // Later passes are no longer blocked
        assert_eq!(engine.replay().await.unwrap().attempted, 0);
    }
}
