//! Storage abstraction for harvested reviews.
//!
//! The [`ReviewStore`] trait is the only way the pipeline and the read
//! service touch persisted rows. Rows are insert-only: there is no update
//! or upsert path, and a row whose `(source, subject_id, text)` already
//! exists is rejected rather than merged.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`SqliteReviewStore`] | production, shared by producers and the HTTP server |
//! | [`InMemoryReviewStore`] | tests |

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{NewReview, StoredReview};

pub use memory::InMemoryReviewStore;
pub use sqlite::SqliteReviewStore;

/// Result of a single insert attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The row was written; carries the assigned `id` and `ingested_at`.
    Inserted(StoredReview),
    /// A row with the same dedup key exists. Nothing was written.
    DuplicateRejected,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Persistent review storage.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert one review. A dedup-key conflict yields
    /// [`InsertOutcome::DuplicateRejected`]; any other failure is an `Err`.
    async fn insert(&self, review: &NewReview) -> Result<InsertOutcome>;

    /// The `limit` most recently ingested rows, highest `id` first.
    async fn recent(&self, limit: i64) -> Result<Vec<StoredReview>>;
}
