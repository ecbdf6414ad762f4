//! Terminal listing of the most recently ingested reviews.
//!
//! Reads through the same [`ReviewStore::recent`] path as `GET /reviews`.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::StoredReview;
use crate::store::{ReviewStore, SqliteReviewStore};

const SNIPPET_CHARS: usize = 80;

pub async fn run_recent(config: &Config, limit: i64) -> Result<()> {
    if limit < 1 {
        bail!("limit must be >= 1");
    }

    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;
    let store = SqliteReviewStore::new(pool);
    let rows = store.recent(limit).await?;
    store.pool().close().await;

    if rows.is_empty() {
        println!("No reviews stored yet.");
        return Ok(());
    }

    for row in &rows {
        print_row(row);
    }
    Ok(())
}

fn print_row(row: &StoredReview) {
    let rating = row
        .rating
        .map(|r| format!("{}/10", r))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "#{:<6} {:<3} {:>6.3}  {:<28} {:<16} {:<5} {}",
        row.id,
        row.sentiment_label,
        row.sentiment_score,
        truncate(&row.subject_id, 28),
        truncate(&row.author, 16),
        rating,
        row.ingested_at.format("%Y-%m-%d %H:%M")
    );
    println!("        {}", truncate(&row.text, SNIPPET_CHARS));
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("ééééé", 5), "ééééé");
    }
}
