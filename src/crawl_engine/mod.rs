//! Browser-driven crawl of one hotel website.
//!
//! Bounded same-origin BFS from the seed URL. Every visited page runs
//! through stabilization, cleanup, markdown conversion, and hashing before
//! its artifact is persisted; pages the run did not see are deactivated at
//! the end.

pub mod core;
pub mod crawl_types;
pub mod page_processor;
pub mod url_filter;

pub use crawl_types::{CrawlItem, FailureKind, ScrapeSummary};
pub use url_filter::{BLOCKED_EXTENSIONS, accept_link, is_blocked_asset};

use std::sync::Arc;

use sqlx::MySqlPool;
use tracing::info;
use url::Url;

use crate::browser_setup;
use crate::config::AppConfig;
use crate::error::{Result, ScrapeError};
use crate::store::PageStore;

/// Crawl one hotel website and persist a page artifact per reachable URL.
///
/// Launches a dedicated headless browser, runs the bounded BFS, then marks
/// every previously-known page the run did not visit as inactive.
pub async fn scrape(
    pool: &MySqlPool,
    config: &AppConfig,
    hotel_url: &str,
    hotel_id: &str,
    hotel_name: &str,
) -> Result<ScrapeSummary> {
    if hotel_id.trim().is_empty() {
        return Err(ScrapeError::InvalidInput("blank hotel id".into()));
    }
    let seed = Url::parse(hotel_url)
        .map_err(|e| ScrapeError::InvalidInput(format!("bad hotel url {hotel_url:?}: {e}")))?;
    if !matches!(seed.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidInput(format!(
            "hotel url must be http(s), got {hotel_url:?}"
        )));
    }

    info!(hotel_id, hotel_name, url = %seed, "scrape starting");

    let store = PageStore::new(pool.clone(), config.page_table());

    let (browser, handler_task, profile_dir) = browser_setup::launch_browser(config.request_timeout())
        .await
        .map_err(|e| ScrapeError::Transient(format!("browser launch failed: {e}")))?;
    let browser = Arc::new(browser);

    let crawl_result =
        core::crawl_pages(Arc::clone(&browser), config, &store, hotel_id, seed.as_str()).await;

    // Browser teardown happens regardless of the crawl outcome.
    match Arc::try_unwrap(browser) {
        Ok(browser) => browser_setup::shutdown_browser(browser, handler_task, profile_dir).await,
        Err(_) => handler_task.abort(),
    }

    let mut summary = crawl_result.map_err(|e| ScrapeError::Transient(format!("{e:#}")))?;

    // Invariant: after a run, the active set equals exactly the URLs saved
    // by that run.
    summary.deactivated = store
        .deactivate_missing(hotel_id, &summary.scraped_urls)
        .await?;

    info!(
        hotel_id,
        scraped = summary.scraped_urls.len(),
        deactivated = summary.deactivated,
        errors = summary.error_count,
        "scrape complete"
    );

    Ok(summary)
}
