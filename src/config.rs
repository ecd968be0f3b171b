//! Process configuration, materialized once from the environment.

use std::env;
use std::time::Duration;

/// Identifier charset accepted for environment-supplied table names. Table
/// names are interpolated into SQL text (placeholders cannot bind
/// identifiers), so anything outside this charset is rejected up front.
fn is_sql_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Runtime configuration for one process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    page_table: String,
    market_table: String,
    /// Crawl depth bound; `None` means unlimited.
    max_depth: Option<u32>,
    max_concurrency: usize,
    max_retries: u32,
    request_timeout: Duration,
    llm_api_key: String,
    llm_base_url: String,
    debug_logging: bool,
    unit_test_module: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_table: "hotel_page_data".to_string(),
            market_table: "market_data".to_string(),
            max_depth: None,
            max_concurrency: 3,
            max_retries: 2,
            request_timeout: Duration::from_secs(60),
            llm_api_key: String::new(),
            llm_base_url: "https://api.perplexity.ai".to_string(),
            debug_logging: false,
            unit_test_module: None,
        }
    }
}

impl AppConfig {
    /// Build the configuration from the process environment. Unknown or
    /// malformed numeric values fall back to their defaults; a non-numeric
    /// `CRAWLER_MAX_DEPTH` means unlimited depth.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let page_table =
            env::var("HOTEL_PAGE_DATA_TABLE").unwrap_or(defaults.page_table);
        let market_table = env::var("MARKET_DATA_TABLE").unwrap_or(defaults.market_table);
        for table in [&page_table, &market_table] {
            if !is_sql_identifier(table) {
                anyhow::bail!("table name {table:?} is not a valid SQL identifier");
            }
        }

        let max_depth = env::var("CRAWLER_MAX_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok());

        let unit_test = env::var("UNIT_TEST").is_ok_and(|v| v == "1" || v == "true");
        let unit_test_module = if unit_test {
            env::var("UNIT_TEST_MODULE").ok()
        } else {
            None
        };

        Ok(Self {
            page_table,
            market_table,
            max_depth,
            max_concurrency: env_usize("CRAWLER_MAX_CONCURRENCY", defaults.max_concurrency),
            max_retries: env_usize("CRAWLER_MAX_RETRIES", defaults.max_retries as usize) as u32,
            request_timeout: Duration::from_secs(env_usize(
                "CRAWLER_TIMEOUT_SECS",
                defaults.request_timeout.as_secs() as usize,
            ) as u64),
            llm_api_key: env::var("PERPLEXITY_API_KEY").unwrap_or_default(),
            llm_base_url: env::var("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            debug_logging: env::var("NODE_ENV").is_ok_and(|v| v == "development"),
            unit_test_module,
        })
    }

    #[must_use]
    pub fn page_table(&self) -> &str {
        &self.page_table
    }

    #[must_use]
    pub fn market_table(&self) -> &str {
        &self.market_table
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }

    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn llm_api_key(&self) -> &str {
        &self.llm_api_key
    }

    #[must_use]
    pub fn llm_base_url(&self) -> &str {
        &self.llm_base_url
    }

    #[must_use]
    pub fn debug_logging(&self) -> bool {
        self.debug_logging
    }

    /// `Some("scrape" | "aggregate")` when single-phase execution was
    /// requested via `UNIT_TEST` / `UNIT_TEST_MODULE`.
    #[must_use]
    pub fn unit_test_module(&self) -> Option<&str> {
        self.unit_test_module.as_deref()
    }
}
