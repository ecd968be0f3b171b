//! Hotel selection for the driver loop.

use sqlx::{MySqlPool, Row};

use crate::error::Result;

/// One hotel eligible for a scrape + aggregate run.
#[derive(Debug, Clone)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub url: String,
}

pub struct HotelService {
    pool: MySqlPool,
}

impl HotelService {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Active hotels in processing order.
    pub async fn list_active(&self) -> Result<Vec<Hotel>> {
        let rows = sqlx::query(
            "SELECT id, name, url FROM hotels WHERE active = 1 ORDER BY updated_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Hotel {
                id: r.get("id"),
                name: r.get("name"),
                url: r.get("url"),
            })
            .collect())
    }
}
