//! Driver binary: selects active hotels and runs scrape + aggregate for
//! each, with graceful shutdown between hotels.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hotelscrape::{AppConfig, HotelService, LlmClient, aggregate, scrape, store};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "fatal");
        std::process::exit(1);
    }
}

fn init_tracing(config: &AppConfig) {
    let default_filter = if config.debug_logging() {
        "hotelscrape=debug,info"
    } else {
        "hotelscrape=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing(&config);

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .context("database pool initialization failed")?;
    store::ensure_schema(&pool, &config).await?;

    let llm = LlmClient::new(
        config.llm_base_url(),
        config.llm_api_key(),
        config.request_timeout(),
        config.max_retries(),
    )?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            shutdown_signal().await;
            warn!("shutdown requested, finishing the current hotel");
            shutdown.store(true, Ordering::SeqCst);
        });
    }

    run_driver(&pool, &config, &llm, &shutdown).await?;

    pool.close().await;
    Ok(())
}

async fn run_driver(
    pool: &MySqlPool,
    config: &AppConfig,
    llm: &LlmClient,
    shutdown: &AtomicBool,
) -> anyhow::Result<()> {
    let hotels = HotelService::new(pool.clone()).list_active().await?;
    info!(count = hotels.len(), "active hotels selected");

    // Single-phase mode runs one phase for the first hotel and exits.
    if let Some(phase) = config.unit_test_module() {
        let Some(hotel) = hotels.first() else {
            warn!("no active hotels for single-phase run");
            return Ok(());
        };
        match phase {
            "scrape" => {
                scrape(pool, config, &hotel.url, &hotel.id, &hotel.name).await?;
            }
            "aggregate" => {
                aggregate(pool, config, llm, &hotel.id, &hotel.name).await?;
            }
            other => anyhow::bail!("unknown UNIT_TEST_MODULE {other:?}"),
        }
        return Ok(());
    }

    for hotel in hotels {
        if shutdown.load(Ordering::SeqCst) {
            info!("stopping before next hotel");
            break;
        }

        info!(hotel_id = %hotel.id, name = %hotel.name, "processing hotel");
        match scrape(pool, config, &hotel.url, &hotel.id, &hotel.name).await {
            Ok(summary) => info!(
                hotel_id = %hotel.id,
                scraped = summary.scraped_urls.len(),
                errors = summary.error_count,
                "scrape done"
            ),
            Err(e) => {
                error!(hotel_id = %hotel.id, error = %e, "scrape failed, skipping hotel");
                continue;
            }
        }

        match aggregate(pool, config, llm, &hotel.id, &hotel.name).await {
            Ok(summary) => info!(
                hotel_id = %hotel.id,
                fields = summary.fields_written,
                "aggregate done"
            ),
            Err(e) => error!(hotel_id = %hotel.id, error = %e, "aggregate failed"),
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
