//! Typed errors for the places where callers branch on the failure kind.

use thiserror::Error;

/// A single listing-page request that did not produce usable markup.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connect failure, timeout, or body read error.
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    /// The page loaded but holds no review containers.
    #[error("no review containers at {url}")]
    NoContainers { url: String },

    /// Every review container on the page was rejected.
    #[error("no valid reviews at {url}")]
    NoValidReviews { url: String },
}
