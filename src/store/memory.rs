//! In-memory [`ReviewStore`] for tests.
//!
//! Mirrors the SQLite backend: ids start at 1 and increase, and the dedup
//! key is checked under the same lock as the write.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use super::{InsertOutcome, ReviewStore};
use crate::models::{NewReview, StoredReview};

#[derive(Default)]
struct Inner {
    rows: Vec<StoredReview>,
    keys: HashSet<(String, String, String)>,
    insert_calls: usize,
}

#[derive(Default)]
pub struct InMemoryReviewStore {
    inner: Mutex<Inner>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `insert` calls so far, duplicates included.
    pub fn insert_calls(&self) -> usize {
        self.inner.lock().map(|g| g.insert_calls).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|g| g.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn insert(&self, review: &NewReview) -> Result<InsertOutcome> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("review store lock poisoned"))?;
        inner.insert_calls += 1;

        let (source, subject, text) = review.dedup_key();
        let key = (source.to_string(), subject.to_string(), text.to_string());
        if !inner.keys.insert(key) {
            return Ok(InsertOutcome::DuplicateRejected);
        }

        let id = inner.rows.len() as i64 + 1;
        let stored = StoredReview::from_new(review, id, Utc::now());
        inner.rows.push(stored.clone());
        Ok(InsertOutcome::Inserted(stored))
    }

    async fn recent(&self, limit: i64) -> Result<Vec<StoredReview>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("review store lock poisoned"))?;
        let take = usize::try_from(limit.max(0)).unwrap_or(0);
        Ok(inner.rows.iter().rev().take(take).cloned().collect())
    }
}
