//! Persistence for previously alerted items.
//!
//! The ledger is an existence set keyed by item id. Each entry carries its
//! insertion time and is purged once it is older than the retention window,
//! after which the item becomes eligible for alerting again.
//!
//! ## Schema
//!
//! ```text
//! scrapedItems(
//!     itemID        TEXT PRIMARY KEY,
//!     creation_date TEXT DEFAULT (datetime('now'))
//! )
//! ```

pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use sqlite::SqliteLedger;

/// Trait for seen-item ledger backends.
///
/// Implementations must be safe to call from any number of concurrent workers.
#[async_trait]
pub trait SeenLedger: Send + Sync {
    /// Whether the id is currently recorded.
    async fn exists(&self, item_id: &str) -> Result<bool>;

    /// Record the id if absent. Returns `true` only for the caller that inserted it.
    async fn insert(&self, item_id: &str) -> Result<bool>;

    /// Delete entries older than the retention window. Returns the number removed.
    async fn purge(&self, retention: chrono::Duration) -> Result<u64>;

    /// Number of recorded ids.
    async fn count(&self) -> Result<u64>;

    /// Release the underlying resources.
    async fn close(&self);
}
