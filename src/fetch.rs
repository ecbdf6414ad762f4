//! Listing page retrieval.
//!
//! [`HttpFetcher`] tries the configured listing variants for a subject in
//! order and accepts the first one that answers 2xx and yields at least
//! one valid review. A page whose containers are all rejected falls
//! through to the next variant. Failed variants are logged and skipped; nothing is
//! retried within a cycle.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::FetchError;
use crate::extract::Extractor;

/// Outcome of fetching one subject's listing.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Markup from the first accepted variant.
    Found { url: String, markup: String },
    /// No variant produced review markup.
    NotFound,
}

/// Source of listing markup for a subject.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    async fn fetch(&self, subject_id: &str) -> FetchOutcome;
}

/// Fetches listing pages over HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    listing_paths: Vec<String>,
    extractor: Extractor,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.source.timeout_secs))
            .user_agent(config.source.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.source.base_url.trim_end_matches('/').to_string(),
            listing_paths: config.source.listing_paths.clone(),
            extractor: Extractor::from_config(config)?,
        })
    }

    /// Candidate listing URLs for a subject, in the order they are tried.
    pub fn variant_urls(&self, subject_id: &str) -> Vec<String> {
        self.listing_paths
            .iter()
            .map(|path| {
                format!(
                    "{}/film/{}/{}",
                    self.base_url,
                    subject_id,
                    path.trim_start_matches('/')
                )
            })
            .collect()
    }

    async fn try_variant(&self, url: &str, subject_id: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let markup = response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !self.extractor.has_review_containers(&markup) {
            return Err(FetchError::NoContainers {
                url: url.to_string(),
            });
        }

        if self.extractor.extract(&markup, subject_id, 1).reviews.is_empty() {
            return Err(FetchError::NoValidReviews {
                url: url.to_string(),
            });
        }

        Ok(markup)
    }
}

#[async_trait]
impl ListingFetcher for HttpFetcher {
    async fn fetch(&self, subject_id: &str) -> FetchOutcome {
        for url in self.variant_urls(subject_id) {
            match self.try_variant(&url, subject_id).await {
                Ok(markup) => {
                    debug!(subject = subject_id, url = %url, "listing variant accepted");
                    return FetchOutcome::Found { url, markup };
                }
                Err(e @ (FetchError::NoContainers { .. } | FetchError::NoValidReviews { .. })) => {
                    debug!(subject = subject_id, "{}", e);
                }
                Err(e) => {
                    warn!(subject = subject_id, "{}", e);
                }
            }
        }
        FetchOutcome::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_urls_in_configured_order() {
        let mut cfg = Config::minimal();
        cfg.source.base_url = "https://example.org/".to_string();
        let fetcher = HttpFetcher::new(&cfg).unwrap();
        assert_eq!(
            fetcher.variant_urls("hot-fuzz"),
            vec![
                "https://example.org/film/hot-fuzz/reviews/popular/",
                "https://example.org/film/hot-fuzz/reviews/",
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_not_found() {
        let mut cfg = Config::minimal();
        // Port 9 (discard) on localhost is almost never listening
        cfg.source.base_url = "http://127.0.0.1:9".to_string();
        cfg.source.timeout_secs = 2;
        let fetcher = HttpFetcher::new(&cfg).unwrap();
        assert_eq!(fetcher.fetch("hot-fuzz").await, FetchOutcome::NotFound);
    }
}
