//! SQLite ledger backed by sqlx's async driver.
//!
//! Queries run on sqlx's connection pool, so ledger calls never block the
//! tokio workers running the pipeline stages.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::error::Result;
use crate::storage::SeenLedger;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS scrapedItems (
    itemID        TEXT NOT NULL PRIMARY KEY,
    creation_date TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Format SQLite's `datetime('now')` writes.
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// Seen-item ledger stored in a single SQLite table.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (creating if missing) the ledger file, then purge expired entries.
    pub async fn open(path: impl AsRef<Path>, retention: chrono::Duration) -> Result<Self> {
        let path = path.as_ref();
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        let ledger = Self { pool };
        let purged = ledger.purge(retention).await?;
        log::info!(
            "Seen-item ledger opened at {} ({} expired entries purged)",
            path.display(),
            purged
        );
        Ok(ledger)
    }

    /// Delete entries created before `cutoff`.
    pub async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM scrapedItems WHERE creation_date < ?1")
            .bind(cutoff.format(SQLITE_DATETIME).to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SeenLedger for SqliteLedger {
    async fn exists(&self, item_id: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT itemID FROM scrapedItems WHERE itemID = ?1")
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn insert(&self, item_id: &str) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO scrapedItems (itemID) VALUES (?1)")
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn purge(&self, retention: chrono::Duration) -> Result<u64> {
        self.purge_before(Utc::now() - retention).await
    }

    async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scrapedItems")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
