//! Error types shared across the crawl and aggregation pipelines.

use thiserror::Error;

/// Crate-level error. Each variant maps to one recovery policy: invalid
/// input skips the hotel, transient faults retry, page fetch failures skip
/// the page, parse failures fall back to a safe value, storage failures
/// bubble per row, and fatal errors abort the process.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Missing or blank hotel id, malformed seed URL.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Browser navigation, LLM HTTP, or DB connectivity fault that may
    /// succeed on retry.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The page itself is broken: HTTP >= 400, empty HTML, error title.
    #[error("page fetch failed for {url}: {reason}")]
    PageFetch { url: String, reason: String },

    /// An LLM response that could not be coerced into the required shape.
    #[error("parse failure: {0}")]
    Parse(String),

    /// Row-level database failure.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    /// HTTP transport failure talking to the LLM endpoint.
    #[error("llm http failure: {0}")]
    Http(#[from] reqwest::Error),

    /// Unrecoverable process-level failure (e.g. pool initialization).
    #[error("fatal: {0}")]
    Fatal(String),
}

impl ScrapeError {
    /// Whether the unit of work (page or field) is worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Convenience alias used by the public entry points.
pub type Result<T> = std::result::Result<T, ScrapeError>;
