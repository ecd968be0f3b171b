//! Single page processing.
//!
//! Drives one URL through the full canonicalization pipeline: navigate,
//! settle, snapshot, clean, convert, hash, persist. Link discovery reads
//! the live DOM before cleanup mutates it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::{EventResponseReceived, ResourceType};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::crawl_types::CrawlItem;
use crate::content_hash;
use crate::dom::{self, StabilizeParams};
use crate::error::ScrapeError;
use crate::markdown;
use crate::store::{PageArtifact, PageStore};

/// Upper bound on lazy-load scroll iterations.
const MAX_SCROLL_ITERATIONS: usize = 25;
/// Settle time after each scroll step.
const SCROLL_SETTLE: Duration = Duration::from_millis(1500);
/// Budget for the initial body-exists poll.
const BODY_WAIT: Duration = Duration::from_secs(5);

/// Result of processing one URL.
pub struct PageOutcome {
    /// Post-redirect URL; the storage key for the artifact.
    pub final_url: String,
    /// Raw candidate links captured from the live DOM.
    pub links: Vec<String>,
}

/// Wrap an async page operation with an explicit timeout so a wedged CDP
/// call can never hang a worker.
async fn with_page_timeout<F, T>(operation: F, timeout: Duration, name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("{name} timeout after {timeout:?}")),
    }
}

/// Process one crawl item end to end. Returns `Ok(None)` when the page
/// redirected onto a URL that was already processed this run.
pub async fn process_page(
    browser: Arc<Browser>,
    item: &CrawlItem,
    store: &PageStore,
    hotel_id: &str,
    request_timeout: Duration,
    already_processed: impl Fn(&str) -> bool,
) -> Result<Option<PageOutcome>> {
    info!(url = %item.url, depth = item.depth, "crawling");

    let page = browser
        .new_page("about:blank")
        .await
        .context("failed to create browser page")?;

    let result = process_on_page(
        &page,
        item,
        store,
        hotel_id,
        request_timeout,
        already_processed,
    )
    .await;

    if let Err(e) = page.close().await {
        debug!(url = %item.url, error = %e, "page close failed");
    }

    result
}

async fn process_on_page(
    page: &Page,
    item: &CrawlItem,
    store: &PageStore,
    hotel_id: &str,
    request_timeout: Duration,
    already_processed: impl Fn(&str) -> bool,
) -> Result<Option<PageOutcome>> {
    // Capture document response statuses before navigation starts; the
    // main-frame status is looked up by final URL afterwards.
    let statuses: Arc<tokio::sync::Mutex<Vec<(String, i64)>>> = Arc::default();
    let status_listener = match page.event_listener::<EventResponseReceived>().await {
        Ok(mut events) => {
            let sink = Arc::clone(&statuses);
            Some(tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    if event.r#type == ResourceType::Document {
                        sink.lock()
                            .await
                            .push((event.response.url.clone(), event.response.status));
                    }
                }
            }))
        }
        Err(e) => {
            warn!(url = %item.url, error = %e, "no network event listener, status check degraded");
            None
        }
    };

    let navigation = async {
        with_page_timeout(
            async { page.goto(&item.url).await.map_err(|e| anyhow::anyhow!("{e}")) },
            request_timeout,
            "navigation",
        )
        .await?;
        // Load-event wait is best effort; heavy pages are handled by the
        // stabilizer below.
        if let Err(e) = with_page_timeout(
            async {
                page.wait_for_navigation()
                    .await
                    .map_err(|e| anyhow::anyhow!("{e}"))
            },
            request_timeout,
            "page load",
        )
        .await
        {
            debug!(url = %item.url, error = %e, "load wait incomplete");
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    if let Err(e) = navigation {
        if let Some(task) = status_listener {
            task.abort();
        }
        return Err(e);
    }

    // Redirects are honored: the effective URL is the storage key.
    let final_url = page
        .url()
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| item.url.clone());
    if final_url != item.url && already_processed(&final_url) {
        debug!(from = %item.url, to = %final_url, "redirect target already processed");
        if let Some(task) = status_listener {
            task.abort();
        }
        return Ok(None);
    }

    wait_for_body(page).await;
    lazy_scroll(page).await;
    dom::wait_for_quiescence(page, StabilizeParams::for_depth(item.depth)).await;

    let status = document_status(&statuses, &final_url).await;
    if let Some(task) = status_listener {
        task.abort();
    }
    if let Some(code) = status
        && code >= 400
    {
        return Err(ScrapeError::PageFetch {
            url: final_url,
            reason: format!("HTTP error {code}"),
        }
        .into());
    }
    if let Ok(Some(title)) = page.get_title().await
        && (title.contains("404") || title.contains("500"))
    {
        return Err(ScrapeError::PageFetch {
            url: final_url,
            reason: format!("error page title {title:?}"),
        }
        .into());
    }

    let raw_html = page
        .content()
        .await
        .map_err(|e| anyhow::anyhow!("failed to read page content: {e}"))?;
    if raw_html.trim().is_empty() {
        return Err(ScrapeError::PageFetch {
            url: final_url,
            reason: "empty html".into(),
        }
        .into());
    }

    // Raw links come from the live DOM, before cleanup removes chrome.
    let links = extract_links(page).await;

    let canonical_html = dom::canonical_html(page, item.depth).await?;
    let md = markdown::to_markdown(&canonical_html)?;
    let checksum = content_hash::checksum(&md);

    store
        .upsert(&PageArtifact {
            hotel_id: hotel_id.to_string(),
            page_url: final_url.clone(),
            raw_html,
            canonical_html,
            markdown: md,
            checksum,
            depth: item.depth,
        })
        .await
        .context("failed to persist page artifact")?;

    Ok(Some(PageOutcome { final_url, links }))
}

/// Poll until `document.body` exists. Bounded; failure is non-fatal.
async fn wait_for_body(page: &Page) {
    let deadline = tokio::time::Instant::now() + BODY_WAIT;
    while tokio::time::Instant::now() < deadline {
        let ready = page
            .evaluate(crate::dom::js_scripts::BODY_READY_SCRIPT)
            .await
            .ok()
            .and_then(|r| r.into_value::<bool>().ok())
            .unwrap_or(false);
        if ready {
            return;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Scroll to the bottom repeatedly to trigger lazy loading, stopping when
/// the scroll height stops growing, then return to the top.
async fn lazy_scroll(page: &Page) {
    let mut last_height = -1.0f64;
    for _ in 0..MAX_SCROLL_ITERATIONS {
        let height = page
            .evaluate(crate::dom::js_scripts::SCROLL_BOTTOM_SCRIPT)
            .await
            .ok()
            .and_then(|r| r.into_value::<f64>().ok());
        match height {
            Some(h) if (h - last_height).abs() > f64::EPSILON => {
                last_height = h;
                tokio::time::sleep(SCROLL_SETTLE).await;
            }
            _ => break,
        }
    }
    if let Err(e) = page.evaluate(crate::dom::js_scripts::SCROLL_TOP_SCRIPT).await {
        debug!(error = %e, "scroll-to-top failed");
    }
}

async fn extract_links(page: &Page) -> Vec<String> {
    match page.evaluate(crate::dom::js_scripts::LINKS_SCRIPT).await {
        Ok(result) => result.into_value::<Vec<String>>().unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "link extraction failed");
            Vec::new()
        }
    }
}

/// The main-frame response status: the last Document response whose URL
/// matches the final URL (ignoring a trailing slash), or the last Document
/// response seen when none matches.
async fn document_status(
    statuses: &tokio::sync::Mutex<Vec<(String, i64)>>,
    final_url: &str,
) -> Option<i64> {
    let statuses = statuses.lock().await;
    let target = final_url.trim_end_matches('/');
    statuses
        .iter()
        .rev()
        .find(|(url, _)| url.trim_end_matches('/') == target)
        .or_else(|| statuses.last())
        .map(|(_, status)| *status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn document_status_prefers_final_url_match() {
        let statuses = tokio::sync::Mutex::new(vec![
            ("https://h.example/old".to_string(), 301),
            ("https://h.example/new/".to_string(), 200),
        ]);
        assert_eq!(
            document_status(&statuses, "https://h.example/new").await,
            Some(200)
        );
    }

    #[tokio::test]
    async fn document_status_falls_back_to_last_seen() {
        let statuses = tokio::sync::Mutex::new(vec![
            ("https://h.example/a".to_string(), 200),
            ("https://h.example/b".to_string(), 404),
        ]);
        assert_eq!(
            document_status(&statuses, "https://h.example/other").await,
            Some(404)
        );
    }

    #[tokio::test]
    async fn document_status_empty_is_none() {
        let statuses = tokio::sync::Mutex::new(Vec::new());
        assert_eq!(document_status(&statuses, "https://h.example/").await, None);
    }
}
