//! Lexicon and rule-based sentiment scoring.
//!
//! Scoring is VADER: each word with a valence in the full VADER lexicon
//! contributes a sentiment, adjusted by nearby boosters, negations and
//! capitalization; a "but" shifts weight to the clause after it;
//! exclamation and question marks amplify the total; the sum is then
//! squashed into a compound score in [-1, 1]. This module maps that
//! compound to a [`Sentiment`] with fixed symmetric thresholds.
//! [`SentimentAnalyzer::classify`] is a pure function of its input.

use vader_sentiment::SentimentIntensityAnalyzer;

use crate::models::{Sentiment, SentimentLabel};

/// Scores at or above this are labelled positive; at or below its negation, negative.
pub const LABEL_THRESHOLD: f64 = 0.1;

/// Map a compound score to its label using the fixed symmetric thresholds.
pub fn label_for_score(score: f64) -> SentimentLabel {
    if score >= LABEL_THRESHOLD {
        SentimentLabel::Pos
    } else if score <= -LABEL_THRESHOLD {
        SentimentLabel::Neg
    } else {
        SentimentLabel::Neu
    }
}

/// Scores review text. The lexicon is loaded once per process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Score `text` and label it.
    pub fn classify(&self, text: &str) -> Sentiment {
        let score = self.compound(text);
        Sentiment {
            score,
            label: label_for_score(score),
        }
    }

    /// Compound polarity in [-1, 1].
    pub fn compound(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let analyzer = SentimentIntensityAnalyzer::new();
        let scores = analyzer.polarity_scores(text);
        scores
            .get("compound")
            .copied()
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0)
    }
}
