//! Browser discovery and launch.
//!
//! Finds a system Chrome/Chromium (honoring `CHROMIUM_PATH`), falling back
//! to a managed download, and launches it headless with settings that make
//! hotel sites render as they would for a real visitor.

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{error, info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Find a Chrome/Chromium executable. `CHROMIUM_PATH` overrides everything.
pub async fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!(path = %path.display(), "using browser from CHROMIUM_PATH");
            return Ok(path);
        }
        warn!(path = %path.display(), "CHROMIUM_PATH points to a non-existent file");
    }

    let candidates = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for candidate in candidates {
        let path = PathBuf::from(candidate);
        if path.exists() {
            info!(path = %path.display(), "found browser");
            return Ok(path);
        }
    }

    for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
        if let Ok(output) = Command::new("which").arg(cmd).output()
            && output.status.success()
        {
            let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path_str.is_empty() {
                let path = PathBuf::from(path_str);
                info!(path = %path.display(), "found browser via 'which'");
                return Ok(path);
            }
        }
    }

    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Download a managed Chromium into the cache directory and return the
/// executable path.
pub async fn download_managed_browser() -> Result<PathBuf> {
    info!("downloading managed Chromium");

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hotelscrape")
        .join("chromium");
    std::fs::create_dir_all(&cache_dir).context("failed to create browser cache directory")?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("failed to build fetcher options")?,
    );
    let revision = fetcher.fetch().await.context("failed to fetch browser")?;

    info!(path = %revision.folder_path.display(), "downloaded Chromium");
    Ok(revision.executable_path)
}

/// Launch a headless browser and spawn its CDP handler task.
///
/// Each launch uses a unique user-data directory (returned to the caller
/// for cleanup) so concurrent hotel runs never contend on a profile lock.
pub async fn launch_browser(
    request_timeout: Duration,
) -> Result<(Browser, JoinHandle<()>, PathBuf)> {
    let chrome_path = match find_browser_executable().await {
        Ok(path) => path,
        Err(_) => download_managed_browser().await?,
    };

    let user_data_dir = std::env::temp_dir().join(format!(
        "hotelscrape_chrome_{}_{}",
        std::process::id(),
        chrono::Utc::now().timestamp_millis()
    ));
    std::fs::create_dir_all(&user_data_dir).context("failed to create user data directory")?;

    let browser_config = BrowserConfigBuilder::default()
        .request_timeout(request_timeout)
        .window_size(1920, 1080)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path)
        .headless_mode(HeadlessMode::default())
        .arg(format!("--user-agent={USER_AGENT}"))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-notifications")
        .arg("--disable-extensions")
        .arg("--disable-popup-blocking")
        .arg("--disable-background-networking")
        .arg("--disable-background-timer-throttling")
        .arg("--disable-hang-monitor")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--no-sandbox")
        .arg("--ignore-certificate-errors")
        .arg("--hide-scrollbars")
        .arg("--mute-audio")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(h) = handler.next().await {
            if let Err(e) = h {
                let msg = e.to_string();
                // Chrome emits CDP events chromiumoxide does not model;
                // those deserialization misses are not failures.
                let benign = msg.contains("data did not match any variant of untagged enum Message")
                    || msg.contains("Failed to deserialize WS response");
                if !benign {
                    error!(error = ?e, "browser handler error");
                }
            }
        }
    });

    Ok((browser, handler_task, user_data_dir))
}

/// Close the browser, stop its handler task, and remove the profile dir.
pub async fn shutdown_browser(
    mut browser: Browser,
    handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
) {
    if let Err(e) = browser.close().await {
        warn!(error = %e, "browser close failed");
    }
    let _ = browser.wait().await;
    handler_task.abort();
    if let Err(e) = std::fs::remove_dir_all(&user_data_dir) {
        warn!(path = %user_data_dir.display(), error = %e, "profile cleanup failed");
    }
}
