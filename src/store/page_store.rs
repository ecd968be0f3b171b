//! Persistence for per-URL page artifacts.
//!
//! One row per `(hotel_id, page_url)`. Re-scrapes roll the previous
//! markdown/html into `*_prev` columns and flag `is_checksum_updated` when
//! the content hash moved. Rows are deactivated, never deleted, when a
//! crawl completes without visiting them.

use sqlx::{MySqlPool, Row};
use tracing::debug;

use crate::error::Result;

/// What the crawler persists for one scraped URL.
#[derive(Debug, Clone)]
pub struct PageArtifact {
    pub hotel_id: String,
    pub page_url: String,
    pub raw_html: String,
    pub canonical_html: String,
    pub markdown: String,
    pub checksum: String,
    pub depth: u32,
}

/// A page whose current checksum differs from the one last fed to the
/// extractor.
#[derive(Debug, Clone)]
pub struct DirtyPage {
    pub page_url: String,
    pub markdown: String,
    pub checksum: String,
}

#[derive(Clone)]
pub struct PageStore {
    pool: MySqlPool,
    table: String,
}

impl PageStore {
    /// `table` must already be validated as a plain identifier (the config
    /// layer enforces this); it is interpolated, not bound.
    pub fn new(pool: MySqlPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    pub(crate) fn upsert_sql(table: &str) -> String {
        format!(
            "INSERT INTO {table} \
             (hotel_id, page_url, raw_html, canonical_html, markdown, checksum, depth, active, is_checksum_updated) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, 0) \
             ON DUPLICATE KEY UPDATE \
             is_checksum_updated = NOT (checksum <=> VALUES(checksum)), \
             markdown_prev = markdown, \
             html_prev = canonical_html, \
             raw_html = VALUES(raw_html), \
             canonical_html = VALUES(canonical_html), \
             markdown = VALUES(markdown), \
             checksum = VALUES(checksum), \
             active = 1, \
             updated_at = CURRENT_TIMESTAMP"
        )
    }

    pub(crate) fn dirty_sql(table: &str) -> String {
        // NULL-safe comparison: a page never extracted has a NULL
        // llm_input_checksum and must count as dirty.
        format!(
            "SELECT page_url, markdown, checksum FROM {table} \
             WHERE hotel_id = ? AND active = 1 AND markdown <> '' \
             AND NOT (llm_input_checksum <=> checksum)"
        )
    }

    /// Insert or update one page artifact. The stored `depth` keeps the
    /// value from the first materialization.
    pub async fn upsert(&self, artifact: &PageArtifact) -> Result<()> {
        sqlx::query(&Self::upsert_sql(&self.table))
            .bind(&artifact.hotel_id)
            .bind(&artifact.page_url)
            .bind(&artifact.raw_html)
            .bind(&artifact.canonical_html)
            .bind(&artifact.markdown)
            .bind(&artifact.checksum)
            .bind(artifact.depth)
            .execute(&self.pool)
            .await?;
        debug!(url = %artifact.page_url, checksum = %artifact.checksum, "page artifact saved");
        Ok(())
    }

    /// Deactivate every page of `hotel_id` that is not in `visited`.
    /// Returns the number of rows deactivated.
    pub async fn deactivate_missing(&self, hotel_id: &str, visited: &[String]) -> Result<u64> {
        let affected = if visited.is_empty() {
            sqlx::query(&format!(
                "UPDATE {} SET active = 0, updated_at = CURRENT_TIMESTAMP WHERE hotel_id = ? AND active = 1",
                self.table
            ))
            .bind(hotel_id)
            .execute(&self.pool)
            .await?
            .rows_affected()
        } else {
            let placeholders = vec!["?"; visited.len()].join(", ");
            let sql = format!(
                "UPDATE {} SET active = 0, updated_at = CURRENT_TIMESTAMP \
                 WHERE hotel_id = ? AND active = 1 AND page_url NOT IN ({placeholders})",
                self.table
            );
            let mut query = sqlx::query(&sql).bind(hotel_id);
            for url in visited {
                query = query.bind(url);
            }
            query.execute(&self.pool).await?.rows_affected()
        };
        Ok(affected)
    }

    /// Pages eligible for extraction: active, non-empty markdown, and a
    /// checksum the extractor has not consumed yet.
    pub async fn dirty_pages(&self, hotel_id: &str) -> Result<Vec<DirtyPage>> {
        let rows = sqlx::query(&Self::dirty_sql(&self.table))
            .bind(hotel_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| DirtyPage {
                page_url: r.get("page_url"),
                markdown: r.get("markdown"),
                checksum: r.get("checksum"),
            })
            .collect())
    }

    /// Record a successful extraction: the checksum the extractor consumed
    /// and the serialized category map it produced. `checksum` is the value
    /// captured when the page was read, so a concurrent re-scrape can not
    /// be marked as consumed by accident.
    pub async fn mark_extracted(
        &self,
        hotel_id: &str,
        page_url: &str,
        checksum: &str,
        llm_output: &str,
    ) -> Result<()> {
        sqlx::query(&format!(
            "UPDATE {} SET llm_input_checksum = ?, llm_output = ?, llm_updated = CURRENT_TIMESTAMP \
             WHERE hotel_id = ? AND page_url = ?",
            self.table
        ))
        .bind(checksum)
        .bind(llm_output)
        .bind(hotel_id)
        .bind(page_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// URLs of all active pages for a hotel, most recently updated first.
    pub async fn active_urls(&self, hotel_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(&format!(
            "SELECT page_url FROM {} WHERE hotel_id = ? AND active = 1 ORDER BY updated_at DESC",
            self.table
        ))
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("page_url")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_rolls_previous_values_before_overwriting() {
        let sql = PageStore::upsert_sql("hotel_page_data");
        let roll = sql.find("markdown_prev = markdown").expect("rolls markdown");
        let overwrite = sql.find("markdown = VALUES(markdown)").expect("overwrites markdown");
        // MySQL applies ON DUPLICATE KEY UPDATE assignments left to right,
        // so the roll has to come before the overwrite.
        assert!(roll < overwrite);

        let flag = sql
            .find("is_checksum_updated = NOT (checksum <=> VALUES(checksum))")
            .expect("sets change flag");
        let checksum_overwrite = sql.find("checksum = VALUES(checksum)").expect("overwrites checksum");
        assert!(flag < checksum_overwrite);
    }

    #[test]
    fn dirty_query_uses_null_safe_equality() {
        let sql = PageStore::dirty_sql("hotel_page_data");
        assert!(sql.contains("NOT (llm_input_checksum <=> checksum)"));
        assert!(sql.contains("active = 1"));
        assert!(sql.contains("markdown <> ''"));
    }

    #[test]
    fn upsert_does_not_touch_depth_on_conflict() {
        let sql = PageStore::upsert_sql("hotel_page_data");
        let (_, update_clause) = sql
            .split_once("ON DUPLICATE KEY UPDATE")
            .expect("has update clause");
        assert!(!update_clause.contains("depth"));
    }
}
