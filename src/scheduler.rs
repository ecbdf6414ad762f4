//! The polling loop.
//!
//! A [`Scheduler`] owns one fetcher, one extractor, one sentiment analyzer
//! and one store handle for its whole lifetime. Each cycle picks a subject
//! at random and runs fetch → extract → classify → store strictly in
//! sequence. Per-record failures are absorbed and counted; nothing a cycle
//! does can stop the loop. Only the [`CancellationToken`] ends it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::extract::Extractor;
use crate::fetch::{FetchOutcome, ListingFetcher};
use crate::models::NewReview;
use crate::sentiment::SentimentAnalyzer;
use crate::store::{InsertOutcome, ReviewStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Between cycles.
    Idle,
    /// Executing one cycle.
    Running,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Origin tag stored with every row.
    pub source: String,
    pub subjects: Vec<String>,
    pub interval: Duration,
    pub fetch_limit: usize,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source: config.source.name.clone(),
            subjects: config.scheduler.subjects.clone(),
            interval: config.scheduler.interval(),
            fetch_limit: config.scheduler.fetch_limit,
        }
    }
}

/// Counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub subject: String,
    /// Whether the fetcher returned markup.
    pub found: bool,
    pub extracted: usize,
    pub rejected: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Records dropped because the store returned an error.
    pub failed: usize,
}

pub struct Scheduler {
    fetcher: Arc<dyn ListingFetcher>,
    extractor: Extractor,
    analyzer: SentimentAnalyzer,
    store: Arc<dyn ReviewStore>,
    settings: SchedulerSettings,
    state: SchedulerState,
    cycles: u64,
}

impl Scheduler {
    pub fn new(
        fetcher: Arc<dyn ListingFetcher>,
        extractor: Extractor,
        analyzer: SentimentAnalyzer,
        store: Arc<dyn ReviewStore>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            analyzer,
            store,
            settings,
            state: SchedulerState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Completed cycles since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Uniformly random subject from the configured set.
    pub fn pick_subject(&self) -> Option<String> {
        self.settings
            .subjects
            .choose(&mut rand::thread_rng())
            .cloned()
    }

    /// Run cycles until `cancel` fires. The first cycle starts immediately;
    /// cancellation is observed between cycles and during the sleep.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!(
            subjects = self.settings.subjects.len(),
            interval_secs = self.settings.interval.as_secs(),
            fetch_limit = self.settings.fetch_limit,
            "scheduler started"
        );

        while !cancel.is_cancelled() {
            let Some(subject) = self.pick_subject() else {
                anyhow::bail!("no subjects configured");
            };

            self.state = SchedulerState::Running;
            let summary = self.run_cycle(&subject).await;
            self.state = SchedulerState::Idle;
            self.cycles += 1;
            log_summary(&summary);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        info!(cycles = self.cycles, "scheduler stopped");
        Ok(())
    }

    /// One fetch → extract → classify → store pass for `subject`.
    pub async fn run_cycle(&self, subject: &str) -> CycleSummary {
        let mut summary = CycleSummary {
            subject: subject.to_string(),
            ..Default::default()
        };

        let markup = match self.fetcher.fetch(subject).await {
            FetchOutcome::Found { url, markup } => {
                debug!(subject, url = %url, bytes = markup.len(), "fetched listing");
                markup
            }
            FetchOutcome::NotFound => {
                info!(subject, "no reviews found");
                return summary;
            }
        };
        summary.found = true;

        let extraction = self
            .extractor
            .extract(&markup, subject, self.settings.fetch_limit);
        summary.extracted = extraction.reviews.len();
        summary.rejected = extraction.rejected;

        for raw in extraction.reviews {
            let sentiment = self.analyzer.classify(&raw.text);
            let review = NewReview::from_raw(&self.settings.source, raw, sentiment);

            match self.store.insert(&review).await {
                Ok(InsertOutcome::Inserted(row)) => {
                    debug!(subject, id = row.id, label = %row.sentiment_label, "review stored");
                    summary.inserted += 1;
                }
                Ok(InsertOutcome::DuplicateRejected) => summary.duplicates += 1,
                Err(e) => {
                    warn!(subject, url = %review.url, "dropping review: {:#}", e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

fn log_summary(summary: &CycleSummary) {
    info!(
        subject = %summary.subject,
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        rejected = summary.rejected,
        failed = summary.failed,
        "{} new reviews added for {}",
        summary.inserted,
        summary.subject
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewReview, StoredReview};
    use crate::store::InMemoryReviewStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticFetcher {
        markup: Option<String>,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        fn found(markup: String) -> Self {
            Self {
                markup: Some(markup),
                calls: AtomicUsize::new(0),
            }
        }

        fn not_found() -> Self {
            Self {
                markup: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ListingFetcher for StaticFetcher {
        async fn fetch(&self, _subject_id: &str) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.markup {
                Some(markup) => FetchOutcome::Found {
                    url: "http://fixture/".to_string(),
                    markup: markup.clone(),
                },
                None => FetchOutcome::NotFound,
            }
        }
    }

    /// Fails every insert whose text contains "explode".
    struct FlakyStore {
        inner: InMemoryReviewStore,
    }

    #[async_trait]
    impl ReviewStore for FlakyStore {
        async fn insert(&self, review: &NewReview) -> Result<InsertOutcome> {
            if review.text.contains("explode") {
                anyhow::bail!("disk I/O error");
            }
            self.inner.insert(review).await
        }

        async fn recent(&self, limit: i64) -> Result<Vec<StoredReview>> {
            self.inner.recent(limit).await
        }
    }

    fn article(user: &str, body: &str) -> String {
        format!(
            r#"<div class="listitem"><article class="production-viewing">
                <a class="avatar" href="/{user}/"></a>
                <a class="context" href="/{user}/film/hot-fuzz/">Review</a>
                <div class="js-review"><div class="body-text -prose"><p>{body}</p></div></div>
            </article></div>"#
        )
    }

    fn settings(limit: usize) -> SchedulerSettings {
        SchedulerSettings {
            source: "letterboxd".to_string(),
            subjects: vec!["hot-fuzz".to_string()],
            interval: Duration::from_millis(10),
            fetch_limit: limit,
        }
    }

    fn scheduler(fetcher: Arc<dyn ListingFetcher>, store: Arc<dyn ReviewStore>) -> Scheduler {
        Scheduler::new(
            fetcher,
            Extractor::new("https://letterboxd.com", 20, "en").unwrap(),
            SentimentAnalyzer::new(),
            store,
            settings(5),
        )
    }

    #[tokio::test]
    async fn test_not_found_makes_no_store_calls() {
        let store = Arc::new(InMemoryReviewStore::new());
        let sched = scheduler(Arc::new(StaticFetcher::not_found()), store.clone());

        let summary = sched.run_cycle("hot-fuzz").await;
        assert!(!summary.found);
        assert_eq!(summary.inserted, 0);
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_cycle_classifies_and_stores() {
        let markup = format!(
            "<html><body>{}{}</body></html>",
            article("alice", "A wonderful, hilarious and clever comedy."),
            article("bob", "Boring, tedious and a total waste of time."),
        );
        let store = Arc::new(InMemoryReviewStore::new());
        let sched = scheduler(Arc::new(StaticFetcher::found(markup)), store.clone());

        let summary = sched.run_cycle("hot-fuzz").await;
        assert_eq!(summary.inserted, 2);

        let rows = store.recent(10).await.unwrap();
        assert_eq!(rows[1].author, "alice");
        assert_eq!(rows[1].sentiment_label, crate::models::SentimentLabel::Pos);
        assert_eq!(rows[0].author, "bob");
        assert_eq!(rows[0].sentiment_label, crate::models::SentimentLabel::Neg);
        assert!(rows.iter().all(|r| r.source == "letterboxd"));
    }

    #[tokio::test]
    async fn test_rerun_counts_duplicates() {
        let markup = article("alice", "A wonderful, hilarious and clever comedy.");
        let store = Arc::new(InMemoryReviewStore::new());
        let sched = scheduler(Arc::new(StaticFetcher::found(markup)), store.clone());

        assert_eq!(sched.run_cycle("hot-fuzz").await.inserted, 1);
        let second = sched.run_cycle("hot-fuzz").await;
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_store_error_drops_only_that_record() {
        let markup = format!(
            "{}{}{}",
            article("a", "First review is long enough to keep."),
            article("b", "This one will explode inside the store."),
            article("c", "Third review is also long enough."),
        );
        let store = Arc::new(FlakyStore {
            inner: InMemoryReviewStore::new(),
        });
        let sched = scheduler(Arc::new(StaticFetcher::found(markup)), store.clone());

        let summary = sched.run_cycle("hot-fuzz").await;
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.inner.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_limit_caps_records() {
        let markup: String = (0..8)
            .map(|i| article(&format!("user{}", i), &format!("Review body number {} is long.", i)))
            .collect();
        let store = Arc::new(InMemoryReviewStore::new());
        let mut sched = scheduler(Arc::new(StaticFetcher::found(markup)), store.clone());
        sched.settings.fetch_limit = 3;

        let summary = sched.run_cycle("hot-fuzz").await;
        assert_eq!(summary.extracted, 3);
        assert_eq!(store.insert_calls(), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let fetcher = Arc::new(StaticFetcher::not_found());
        let store = Arc::new(InMemoryReviewStore::new());
        let mut sched = scheduler(fetcher.clone(), store);
        let cancel = CancellationToken::new();

        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(35)).await;
            stopper.cancel();
        });

        sched.run(cancel).await.unwrap();
        assert_eq!(sched.state(), SchedulerState::Idle);
        assert!(sched.cycles() >= 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst) as u64, sched.cycles());
    }

    #[tokio::test]
    async fn test_already_cancelled_runs_no_cycle() {
        let fetcher = Arc::new(StaticFetcher::not_found());
        let mut sched = scheduler(fetcher.clone(), Arc::new(InMemoryReviewStore::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        sched.run(cancel).await.unwrap();
        assert_eq!(sched.cycles(), 0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pick_subject_from_configured_set() {
        let mut s = settings(5);
        s.subjects = vec!["a".into(), "b".into(), "c".into()];
        let sched = Scheduler::new(
            Arc::new(StaticFetcher::not_found()),
            Extractor::new("https://letterboxd.com", 20, "en").unwrap(),
            SentimentAnalyzer::new(),
            Arc::new(InMemoryReviewStore::new()),
            s,
        );
        for _ in 0..50 {
            let picked = sched.pick_subject().unwrap();
            assert!(["a", "b", "c"].contains(&picked.as_str()));
        }
    }
}
