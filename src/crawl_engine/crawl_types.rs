//! Core types for the crawl engine.

/// One unit of crawl work: a URL and the depth it was discovered at.
#[derive(Debug, Clone)]
pub struct CrawlItem {
    pub url: String,
    pub depth: u32,
    /// Number of retry attempts for this URL (0 = first attempt).
    pub retry_count: u32,
}

impl CrawlItem {
    #[must_use]
    pub fn seed(url: String) -> Self {
        Self {
            url,
            depth: 0,
            retry_count: 0,
        }
    }
}

/// What one hotel crawl produced.
#[derive(Debug, Default)]
pub struct ScrapeSummary {
    /// Post-redirect URLs whose artifacts were saved this run.
    pub scraped_urls: Vec<String>,
    /// Pages that errored out (after retries).
    pub error_count: usize,
    /// Previously-known pages deactivated because this run did not see them.
    pub deactivated: u64,
}

/// Categorizes page failures for retry decisions. Network and browser
/// faults are usually transient; content faults are usually permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Timeout, DNS, connection refused.
    Network,
    /// Browser/page crash or CDP error.
    Browser,
    /// The page content itself is unusable (error page, empty HTML).
    Content,
    /// Unclassified.
    Unknown,
}

impl FailureKind {
    /// Classify an error. Typed page-fetch failures are content faults;
    /// everything else is classified from its message.
    #[must_use]
    pub fn classify(error: &anyhow::Error) -> Self {
        if matches!(
            error.downcast_ref::<crate::error::ScrapeError>(),
            Some(crate::error::ScrapeError::PageFetch { .. })
        ) {
            return Self::Content;
        }
        let msg = error.to_string().to_lowercase();
        if msg.contains("timeout")
            || msg.contains("timed out")
            || msg.contains("connection refused")
            || msg.contains("connection reset")
            || msg.contains("dns")
            || msg.contains("network")
        {
            return Self::Network;
        }
        if msg.contains("browser")
            || msg.contains("chrome")
            || msg.contains("cdp")
            || msg.contains("target")
            || msg.contains("session")
        {
            return Self::Browser;
        }
        if msg.contains("http error")
            || msg.contains("error page")
            || msg.contains("empty html")
        {
            return Self::Content;
        }
        Self::Unknown
    }

    /// Whether a failure of this kind should be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network | Self::Browser | Self::Unknown => true,
            Self::Content => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_retryable() {
        let kind = FailureKind::classify(&anyhow::anyhow!("navigation timed out after 60s"));
        assert_eq!(kind, FailureKind::Network);
        assert!(kind.is_retryable());
    }

    #[test]
    fn error_pages_are_not_retryable() {
        let kind = FailureKind::classify(&anyhow::anyhow!("HTTP error 404 for page"));
        assert_eq!(kind, FailureKind::Content);
        assert!(!kind.is_retryable());
    }

    #[test]
    fn unknown_errors_default_to_retryable() {
        assert!(FailureKind::classify(&anyhow::anyhow!("mystery")).is_retryable());
    }

    #[test]
    fn typed_page_fetch_failures_are_content_faults() {
        let err: anyhow::Error = crate::error::ScrapeError::PageFetch {
            url: "https://h.example/missing".into(),
            reason: "HTTP error 404".into(),
        }
        .into();
        assert_eq!(FailureKind::classify(&err), FailureKind::Content);
    }
}
