//! SQLite-backed [`ReviewStore`].
//!
//! `id` comes from `INTEGER PRIMARY KEY AUTOINCREMENT` and `ingested_at`
//! from the column default; both are read back with `RETURNING`. The
//! `UNIQUE(source, subject_id, text)` constraint decides duplicates, so
//! several producers may share one database file.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{InsertOutcome, ReviewStore};
use crate::models::{NewReview, SentimentLabel, StoredReview};

pub struct SqliteReviewStore {
    pool: SqlitePool,
}

impl SqliteReviewStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn ts_to_utc(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

fn row_to_review(row: &SqliteRow) -> Result<StoredReview> {
    let label: String = row.try_get("sentiment_label")?;
    let reviewed_at: Option<i64> = row.try_get("reviewed_at")?;
    let ingested_at: i64 = row.try_get("ingested_at")?;

    Ok(StoredReview {
        id: row.try_get("id")?,
        source: row.try_get("source")?,
        subject_id: row.try_get("subject_id")?,
        text: row.try_get("text")?,
        author: row.try_get("author")?,
        url: row.try_get("url")?,
        language: row.try_get("language")?,
        rating: row.try_get("rating")?,
        reviewed_at: reviewed_at.map(ts_to_utc),
        sentiment_score: row.try_get("sentiment_score")?,
        sentiment_label: label.parse::<SentimentLabel>()?,
        ingested_at: ts_to_utc(ingested_at),
    })
}

#[async_trait]
impl ReviewStore for SqliteReviewStore {
    async fn insert(&self, review: &NewReview) -> Result<InsertOutcome> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO reviews (source, subject_id, text, author, url, language,
                                 rating, reviewed_at, sentiment_score, sentiment_label)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, ingested_at
            "#,
        )
        .bind(&review.source)
        .bind(&review.subject_id)
        .bind(&review.text)
        .bind(&review.author)
        .bind(&review.url)
        .bind(&review.language)
        .bind(review.rating)
        .bind(review.reviewed_at.map(|t| t.timestamp()))
        .bind(review.sentiment_score)
        .bind(review.sentiment_label.as_str())
        .fetch_one(&mut *tx)
        .await;

        match result {
            Ok(row) => {
                let id: i64 = row.try_get("id")?;
                let ingested_at: i64 = row.try_get("ingested_at")?;
                tx.commit().await?;
                Ok(InsertOutcome::Inserted(StoredReview::from_new(
                    review,
                    id,
                    ts_to_utc(ingested_at),
                )))
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tx.rollback().await?;
                Ok(InsertOutcome::DuplicateRejected)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e.into())
            }
        }
    }

    async fn recent(&self, limit: i64) -> Result<Vec<StoredReview>> {
        let rows = sqlx::query(
            r#"
            SELECT id, source, subject_id, text, author, url, language, rating,
                   reviewed_at, sentiment_score, sentiment_label, ingested_at
            FROM reviews
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_review).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteReviewStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::create_schema(&pool).await.unwrap();
        SqliteReviewStore::new(pool)
    }

    fn review(subject: &str, text: &str) -> NewReview {
        NewReview {
            source: "letterboxd".into(),
            subject_id: subject.into(),
            text: text.into(),
            author: "alice".into(),
            url: format!("https://letterboxd.com/alice/film/{}/", subject),
            language: "en".into(),
            rating: Some(9.0),
            reviewed_at: DateTime::from_timestamp(1_700_000_000, 0),
            sentiment_score: 0.62,
            sentiment_label: SentimentLabel::Pos,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_ingested_at() {
        let store = memory_store().await;
        let before = Utc::now().timestamp() - 1;
        let outcome = store.insert(&review("hot-fuzz", "Cornetto trilogy at its best.")).await.unwrap();
        let InsertOutcome::Inserted(row) = outcome else {
            panic!("expected insert");
        };
        assert_eq!(row.id, 1);
        assert!(row.ingested_at.timestamp() >= before);
        assert_eq!(row.rating, Some(9.0));
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected_and_batch_continues() {
        let store = memory_store().await;
        let r = review("hot-fuzz", "Cornetto trilogy at its best.");
        assert!(store.insert(&r).await.unwrap().is_inserted());

        // different author and url, same dedup key
        let mut again = r.clone();
        again.author = "bob".into();
        again.url = "https://letterboxd.com/bob/film/hot-fuzz/".into();
        assert_eq!(
            store.insert(&again).await.unwrap(),
            InsertOutcome::DuplicateRejected
        );

        // the pool is still usable after the rollback
        assert!(store
            .insert(&review("hot-fuzz", "Second review, distinct text."))
            .await
            .unwrap()
            .is_inserted());
        assert_eq!(store.recent(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_same_text_other_subject_or_source_is_distinct() {
        let store = memory_store().await;
        let text = "Shared words across two films.";
        assert!(store.insert(&review("hot-fuzz", text)).await.unwrap().is_inserted());
        assert!(store.insert(&review("nightcrawler", text)).await.unwrap().is_inserted());
        let mut other_source = review("hot-fuzz", text);
        other_source.source = "mirror".into();
        assert!(store.insert(&other_source).await.unwrap().is_inserted());
    }

    #[tokio::test]
    async fn test_recent_orders_by_id_desc_and_round_trips() {
        let store = memory_store().await;
        for i in 1..=5 {
            store
                .insert(&review("the-batman", &format!("Review number {} of the batman.", i)))
                .await
                .unwrap();
        }
        let rows = store.recent(2).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 4]);
        assert_eq!(rows[0].sentiment_label, SentimentLabel::Pos);
        assert_eq!(rows[0].reviewed_at, DateTime::from_timestamp(1_700_000_000, 0));
    }

    #[tokio::test]
    async fn test_recent_on_empty_store() {
        let store = memory_store().await;
        assert!(store.recent(20).await.unwrap().is_empty());
    }
}
