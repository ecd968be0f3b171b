//! Relational persistence: page artifacts, market-data records, hotels.

pub mod hotel_store;
pub mod market_store;
pub mod page_store;

pub use hotel_store::{Hotel, HotelService};
pub use market_store::MarketStore;
pub use page_store::{DirtyPage, PageArtifact, PageStore};

use sqlx::MySqlPool;

use crate::categories;
use crate::config::AppConfig;
use crate::error::Result;

/// Create both tables if they do not exist. Table names come from the
/// validated configuration; the market-data columns come from the closed
/// category schema.
pub async fn ensure_schema(pool: &MySqlPool, config: &AppConfig) -> Result<()> {
    let page_ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         hotel_id VARCHAR(64) NOT NULL, \
         page_url VARCHAR(700) NOT NULL, \
         raw_html LONGTEXT NULL, \
         canonical_html LONGTEXT NULL, \
         html_prev LONGTEXT NULL, \
         markdown LONGTEXT NULL, \
         markdown_prev LONGTEXT NULL, \
         checksum CHAR(64) NULL, \
         llm_input_checksum CHAR(64) NULL, \
         llm_output LONGTEXT NULL, \
         depth INT UNSIGNED NOT NULL DEFAULT 0, \
         active TINYINT(1) NOT NULL DEFAULT 1, \
         is_checksum_updated TINYINT(1) NOT NULL DEFAULT 0, \
         created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP, \
         updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP, \
         llm_updated DATETIME NULL, \
         PRIMARY KEY (hotel_id, page_url)\
         )",
        config.page_table()
    );
    sqlx::query(&page_ddl).execute(pool).await?;

    let category_columns: String = categories::CATEGORIES
        .iter()
        .map(|c| format!("{} LONGTEXT NULL, ", c.name))
        .collect();
    let market_ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         hotel_id VARCHAR(64) NOT NULL, \
         {category_columns}\
         {} LONGTEXT NULL, \
         created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP, \
         updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP, \
         PRIMARY KEY (hotel_id)\
         )",
        config.market_table(),
        categories::OTHER_STRUCTURED
    );
    sqlx::query(&market_ddl).execute(pool).await?;

    Ok(())
}
