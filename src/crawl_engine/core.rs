//! Bounded breadth-first crawl over one hotel site.
//!
//! Workers share a queue and a lock-free visited set; total concurrency is
//! bounded by a semaphore. All scraping for a hotel completes before any
//! extraction runs, so the engine only persists artifacts and reports the
//! set of URLs it saved.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use dashmap::DashSet;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, info, warn};
use url::Url;

use super::crawl_types::{CrawlItem, FailureKind, ScrapeSummary};
use super::page_processor::{PageOutcome, process_page};
use super::url_filter::accept_link;
use crate::config::AppConfig;
use crate::store::PageStore;

pub async fn crawl_pages(
    browser: Arc<Browser>,
    config: &AppConfig,
    store: &PageStore,
    hotel_id: &str,
    seed_url: &str,
) -> Result<ScrapeSummary> {
    let origin = Url::parse(seed_url).context("seed URL must be absolute")?;

    let queue = Arc::new(tokio::sync::Mutex::new(VecDeque::from([CrawlItem::seed(
        seed_url.to_string(),
    )])));
    // Holds both requested and post-redirect URLs.
    let visited: Arc<DashSet<String>> = Arc::new(DashSet::new());
    let mut scraped_urls: Vec<String> = Vec::new();
    let error_count = Arc::new(AtomicUsize::new(0));

    let concurrency = config.max_concurrency();
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
    let mut active_tasks = FuturesUnordered::new();

    loop {
        // Fill up to the concurrency limit.
        while active_tasks.len() < concurrency {
            let item = { queue.lock().await.pop_front() };
            let Some(item) = item else { break };

            if let Some(max) = config.max_depth()
                && item.depth > max
            {
                continue;
            }
            // Retries already hold their visited slot.
            if item.retry_count == 0 && !visited.insert(item.url.clone()) {
                continue;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("crawl semaphore closed")?;

            let browser = Arc::clone(&browser);
            let store = store.clone();
            let hotel_id = hotel_id.to_string();
            let visited_for_task = Arc::clone(&visited);
            let request_timeout = config.request_timeout();

            let task = tokio::spawn(async move {
                let _permit = permit;
                let outcome = process_page(
                    browser,
                    &item,
                    &store,
                    &hotel_id,
                    request_timeout,
                    move |url| visited_for_task.contains(url),
                )
                .await;
                (item, outcome)
            });
            active_tasks.push(task);
        }

        match active_tasks.next().await {
            Some(Ok((item, Ok(Some(outcome))))) => {
                handle_success(
                    &outcome,
                    &item,
                    &origin,
                    config,
                    &visited,
                    &queue,
                    &mut scraped_urls,
                )
                .await;
            }
            Some(Ok((item, Ok(None)))) => {
                debug!(url = %item.url, "skipped (redirect target already processed)");
            }
            Some(Ok((item, Err(e)))) => {
                let kind = FailureKind::classify(&e);
                if kind.is_retryable() && item.retry_count < config.max_retries() {
                    debug!(url = %item.url, retry = item.retry_count + 1, error = %e, "requeueing");
                    queue.lock().await.push_back(CrawlItem {
                        retry_count: item.retry_count + 1,
                        ..item
                    });
                } else {
                    warn!(url = %item.url, kind = ?kind, error = %e, "page failed");
                    error_count.fetch_add(1, Ordering::Relaxed);
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "crawl task panicked");
                error_count.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                if queue.lock().await.is_empty() {
                    break;
                }
            }
        }

        if active_tasks.is_empty() && queue.lock().await.is_empty() {
            break;
        }
    }

    info!(
        hotel_id,
        scraped = scraped_urls.len(),
        errors = error_count.load(Ordering::Relaxed),
        "crawl finished"
    );

    Ok(ScrapeSummary {
        scraped_urls,
        error_count: error_count.load(Ordering::Relaxed),
        deactivated: 0,
    })
}

async fn handle_success(
    outcome: &PageOutcome,
    item: &CrawlItem,
    origin: &Url,
    config: &AppConfig,
    visited: &DashSet<String>,
    queue: &tokio::sync::Mutex<VecDeque<CrawlItem>>,
    scraped_urls: &mut Vec<String>,
) {
    // The redirect target becomes the canonical key for this page. Two
    // requested URLs can still race onto one final URL; the saved set
    // stays duplicate-free.
    visited.insert(outcome.final_url.clone());
    if !scraped_urls.contains(&outcome.final_url) {
        scraped_urls.push(outcome.final_url.clone());
    }

    let next_depth = item.depth + 1;
    if let Some(max) = config.max_depth()
        && next_depth > max
    {
        return;
    }

    let mut q = queue.lock().await;
    for raw in &outcome.links {
        let Some(url) = accept_link(raw, origin) else {
            continue;
        };
        if visited.contains(&url) {
            continue;
        }
        if q.iter().any(|queued| queued.url == url) {
            continue;
        }
        q.push_back(CrawlItem {
            url,
            depth: next_depth,
            retry_count: 0,
        });
    }
}
