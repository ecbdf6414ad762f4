//! Sentiment statistics over stored reviews.
//!
//! Summarises what has been harvested: per-subject review counts, label
//! distribution, mean polarity and mean rating. Used by `harvest stats`.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::migrate;

/// Per-subject breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectStats {
    pub subject_id: String,
    pub total: i64,
    pub pos: i64,
    pub neu: i64,
    pub neg: i64,
    pub mean_score: f64,
    pub mean_rating: Option<f64>,
    pub last_ingested_at: i64,
}

pub async fn collect_stats(pool: &SqlitePool) -> Result<Vec<SubjectStats>> {
    let rows = sqlx::query(
        r#"
        SELECT
            subject_id,
            COUNT(*) AS total,
            SUM(CASE WHEN sentiment_label = 'pos' THEN 1 ELSE 0 END) AS pos,
            SUM(CASE WHEN sentiment_label = 'neu' THEN 1 ELSE 0 END) AS neu,
            SUM(CASE WHEN sentiment_label = 'neg' THEN 1 ELSE 0 END) AS neg,
            AVG(sentiment_score) AS mean_score,
            AVG(rating) AS mean_rating,
            MAX(ingested_at) AS last_ingested_at
        FROM reviews
        GROUP BY subject_id
        ORDER BY total DESC, subject_id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut stats = Vec::with_capacity(rows.len());
    for row in &rows {
        stats.push(SubjectStats {
            subject_id: row.try_get("subject_id")?,
            total: row.try_get("total")?,
            pos: row.try_get("pos")?,
            neu: row.try_get("neu")?,
            neg: row.try_get("neg")?,
            mean_score: row.try_get("mean_score")?,
            mean_rating: row.try_get("mean_rating")?,
            last_ingested_at: row.try_get("last_ingested_at")?,
        });
    }
    Ok(stats)
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;
    let stats = collect_stats(&pool).await?;
    pool.close().await;

    let total: i64 = stats.iter().map(|s| s.total).sum();

    println!("Review Harvester Stats");
    println!("======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Reviews:     {}", total);

    if stats.is_empty() {
        println!();
        println!("  No reviews stored yet.");
        return Ok(());
    }

    println!();
    println!(
        "  {:<40} {:>6} {:>6} {:>6} {:>6} {:>7} {:>7}   {}",
        "SUBJECT", "TOTAL", "POS%", "NEU%", "NEG%", "SCORE", "RATING", "LAST INGEST"
    );
    println!("  {}", "-".repeat(104));

    for s in &stats {
        let rating = s
            .mean_rating
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<40} {:>6} {:>6} {:>6} {:>6} {:>7.2} {:>7}   {}",
            s.subject_id,
            s.total,
            percent(s.pos, s.total),
            percent(s.neu, s.total),
            percent(s.neg, s.total),
            s.mean_score,
            rating,
            format_ts(s.last_ingested_at)
        );
    }
    println!();

    Ok(())
}

fn percent(part: i64, total: i64) -> i64 {
    if total > 0 {
        (part * 100) / total
    } else {
        0
    }
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
