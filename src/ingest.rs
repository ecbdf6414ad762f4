//! Ingestion entry points used by the CLI.
//!
//! Wires a [`Scheduler`] from configuration (HTTP fetcher, extractor,
//! sentiment analyzer, SQLite store) and either runs it until shutdown or
//! runs a single cycle. Failing to open or migrate the database is the
//! only fatal error here.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::extract::Extractor;
use crate::fetch::HttpFetcher;
use crate::migrate;
use crate::scheduler::{CycleSummary, Scheduler, SchedulerSettings};
use crate::sentiment::SentimentAnalyzer;
use crate::store::SqliteReviewStore;

/// Connect to the store and assemble a scheduler over it.
pub async fn build_scheduler(config: &Config) -> Result<Scheduler> {
    let pool = db::connect(config)
        .await
        .context("review store is unavailable")?;
    migrate::create_schema(&pool).await?;

    Ok(Scheduler::new(
        Arc::new(HttpFetcher::new(config)?),
        Extractor::from_config(config)?,
        SentimentAnalyzer::new(),
        Arc::new(SqliteReviewStore::new(pool)),
        SchedulerSettings::from_config(config),
    ))
}

/// Poll until Ctrl+C or SIGTERM.
pub async fn run_forever(config: &Config) -> Result<()> {
    let mut scheduler = build_scheduler(config).await?;
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    scheduler.run(cancel).await
}

/// Run exactly one cycle for `subject` and print its summary.
pub async fn run_once(config: &Config, subject: &str) -> Result<CycleSummary> {
    if subject.is_empty() || subject.contains('/') {
        bail!("invalid subject slug: '{}'", subject);
    }

    let scheduler = build_scheduler(config).await?;
    let summary = scheduler.run_cycle(subject).await;

    println!("cycle {}", summary.subject);
    println!("  found: {}", summary.found);
    println!("  extracted: {}", summary.extracted);
    println!("  rejected: {}", summary.rejected);
    println!("  inserted: {}", summary.inserted);
    println!("  duplicates: {}", summary.duplicates);
    println!("  failed: {}", summary.failed);
    println!("ok");

    Ok(summary)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, stopping after current cycle"),
        _ = terminate => info!("received terminate signal, stopping after current cycle"),
    }
}
