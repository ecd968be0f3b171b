//! Per-hotel aggregation: extract, bucket, refine, adjudicate, write.
//!
//! Drives one hotel through the whole change-driven pipeline. Page-level
//! failures are logged and skipped; only storage loss of the record write
//! itself surfaces to the caller.

use std::collections::BTreeMap;

use futures::future::join_all;
use sqlx::MySqlPool;
use tracing::{debug, info, warn};

use crate::categories::CATEGORIES;
use crate::config::AppConfig;
use crate::error::{Result, ScrapeError};
use crate::llm::LlmClient;
use crate::pipeline::{field_refiner, merge, page_extractor, record_writer};
use crate::store::{MarketStore, PageStore};

/// What one aggregation run did.
#[derive(Debug, Default)]
pub struct AggregateSummary {
    pub dirty_pages: usize,
    pub extracted_pages: usize,
    pub extraction_failures: usize,
    pub fields_written: usize,
}

/// Aggregate one hotel: consume its dirty pages and fold the result into
/// the market-data record.
pub async fn aggregate(
    pool: &MySqlPool,
    config: &AppConfig,
    llm: &LlmClient,
    hotel_id: &str,
    hotel_name: &str,
) -> Result<AggregateSummary> {
    if hotel_id.trim().is_empty() {
        return Err(ScrapeError::InvalidInput("blank hotel id".into()));
    }

    let pages = PageStore::new(pool.clone(), config.page_table());
    let market = MarketStore::new(pool.clone(), config.market_table());

    let dirty = pages.dirty_pages(hotel_id).await?;
    let mut summary = AggregateSummary {
        dirty_pages: dirty.len(),
        ..AggregateSummary::default()
    };
    if dirty.is_empty() {
        info!(hotel_id, "no changed pages, nothing to aggregate");
        return Ok(summary);
    }
    info!(hotel_id, pages = dirty.len(), "aggregation starting");

    // One extractor call per changed page, concurrent up to the client's
    // in-flight bound. Results are folded back in page order so snippet
    // order (and the refiner's tie-breaking) stays deterministic.
    let extractions = join_all(
        dirty
            .iter()
            .map(|page| page_extractor::extract_page(llm, hotel_name, page)),
    )
    .await;

    let mut buckets: BTreeMap<&'static str, Vec<(String, String)>> = CATEGORIES
        .iter()
        .map(|category| (category.name, Vec::new()))
        .collect();

    for (page, extraction) in dirty.iter().zip(extractions) {
        let map = match extraction {
            Ok(map) => map,
            Err(e) => {
                warn!(hotel_id, url = %page.page_url, error = %e, "page extraction failed, skipping page");
                summary.extraction_failures += 1;
                continue;
            }
        };

        let serialized = serde_json::to_string(&map)
            .map_err(|e| ScrapeError::Parse(format!("category map serialization: {e}")))?;
        if let Err(e) = pages
            .mark_extracted(hotel_id, &page.page_url, &page.checksum, &serialized)
            .await
        {
            warn!(hotel_id, url = %page.page_url, error = %e, "failed to record extraction state");
        }

        for category in CATEGORIES {
            if let Some(value) = map.get(category.name)
                && !value.trim().is_empty()
                && let Some(bucket) = buckets.get_mut(category.name)
            {
                bucket.push((page.page_url.clone(), value.clone()));
            }
        }
        summary.extracted_pages += 1;
    }

    // Refinement: one consolidation per category; empty buckets resolve
    // without model calls. A failed refinement skips that field only.
    let refined_values = join_all(CATEGORIES.iter().map(|category| async {
        let bucket = buckets.get(category.name).map_or(&[][..], Vec::as_slice);
        match field_refiner::refine_field(llm, hotel_name, category, bucket).await {
            Ok(value) => (category.name, value),
            Err(e) => {
                warn!(hotel_id, field = category.name, error = %e, "refinement failed, skipping field");
                (category.name, String::new())
            }
        }
    }))
    .await;
    let refined: BTreeMap<String, String> = refined_values
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

    let existing = market.get(hotel_id).await?;

    let update = if let Some(existing) = &existing {
        // Refinement for every field is complete before any adjudication
        // runs; the decisions themselves are per-field independent.
        let decisions = join_all(CATEGORIES.iter().map(|category| async {
            let current = existing
                .get(category.name)
                .map(String::as_str)
                .unwrap_or_default();
            let candidate = refined
                .get(category.name)
                .map(String::as_str)
                .unwrap_or_default();
            let decision = merge::adjudicate(llm, category.name, current, candidate).await;
            (category.name.to_string(), decision)
        }))
        .await
        .into_iter()
        .collect::<BTreeMap<_, _>>();

        debug!(
            hotel_id,
            updates = decisions.values().filter(|d| d.is_update).count(),
            "adjudication complete"
        );
        record_writer::build_update_set(true, &refined, &decisions)
    } else {
        record_writer::build_update_set(false, &refined, &BTreeMap::new())
    };

    summary.fields_written = record_writer::write_record(&market, llm, hotel_id, update).await?;

    info!(
        hotel_id,
        extracted = summary.extracted_pages,
        failures = summary.extraction_failures,
        fields = summary.fields_written,
        "aggregation complete"
    );
    Ok(summary)
}
