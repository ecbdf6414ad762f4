//! Core data models used throughout the harvester.
//!
//! A [`RawReview`] comes out of the extractor, gets a [`Sentiment`] from the
//! classifier, becomes a [`NewReview`] for the store, and is read back as a
//! [`StoredReview`] once the store has assigned `id` and `ingested_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A review recovered from listing markup, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReview {
    pub subject_id: String,
    pub text: String,
    pub author: String,
    pub url: String,
    pub language: String,
    /// Score on the source's 0–10 scale.
    pub rating: Option<f64>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Discrete sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Pos,
    Neu,
    Neg,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Pos => "pos",
            SentimentLabel::Neu => "neu",
            SentimentLabel::Neg => "neg",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pos" => Ok(SentimentLabel::Pos),
            "neu" => Ok(SentimentLabel::Neu),
            "neg" => Ok(SentimentLabel::Neg),
            other => anyhow::bail!("unknown sentiment label: '{}'", other),
        }
    }
}

/// Compound polarity score in [-1, 1] and its label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    pub score: f64,
    pub label: SentimentLabel,
}

/// Everything the caller supplies to [`ReviewStore::insert`](crate::store::ReviewStore::insert).
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub source: String,
    pub subject_id: String,
    pub text: String,
    pub author: String,
    pub url: String,
    pub language: String,
    pub rating: Option<f64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
}

impl NewReview {
    pub fn from_raw(source: &str, raw: RawReview, sentiment: Sentiment) -> Self {
        Self {
            source: source.to_string(),
            subject_id: raw.subject_id,
            text: raw.text,
            author: raw.author,
            url: raw.url,
            language: raw.language,
            rating: raw.rating,
            reviewed_at: raw.reviewed_at,
            sentiment_score: sentiment.score,
            sentiment_label: sentiment.label,
        }
    }

    /// The `(source, subject_id, text)` tuple enforced unique by the store.
    pub fn dedup_key(&self) -> (&str, &str, &str) {
        (&self.source, &self.subject_id, &self.text)
    }
}

/// A persisted review. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredReview {
    pub id: i64,
    pub source: String,
    pub subject_id: String,
    pub text: String,
    pub author: String,
    pub url: String,
    pub language: String,
    pub rating: Option<f64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
    pub ingested_at: DateTime<Utc>,
}

impl StoredReview {
    pub fn from_new(review: &NewReview, id: i64, ingested_at: DateTime<Utc>) -> Self {
        Self {
            id,
            source: review.source.clone(),
            subject_id: review.subject_id.clone(),
            text: review.text.clone(),
            author: review.author.clone(),
            url: review.url.clone(),
            language: review.language.clone(),
            rating: review.rating,
            reviewed_at: review.reviewed_at,
            sentiment_score: review.sentiment_score,
            sentiment_label: review.sentiment_label,
            ingested_at,
        }
    }
}
