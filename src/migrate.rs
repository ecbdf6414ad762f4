use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent schema creation on an open pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // (source, subject_id, text) is the dedup key; nothing else is unique
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            text TEXT NOT NULL,
            author TEXT NOT NULL,
            url TEXT NOT NULL,
            language TEXT NOT NULL,
            rating REAL,
            reviewed_at INTEGER,
            sentiment_score REAL NOT NULL,
            sentiment_label TEXT NOT NULL,
            ingested_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER)),
            UNIQUE(source, subject_id, text)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
