//! Chat-completions client for the extraction pipeline.
//!
//! Targets an OpenAI-compatible endpoint (Perplexity in production). The
//! client is process-wide and stateless; an internal semaphore bounds
//! concurrent requests since the refiner and adjudicator stages fan out
//! per category.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{Result, ScrapeError};

/// Model served by the completions endpoint.
pub const MODEL: &str = "sonar-pro";

/// Token budget for the per-page extractor stage.
pub const EXTRACT_MAX_TOKENS: u32 = 6144;
/// Token budget for the per-field refiner stage.
pub const REFINE_MAX_TOKENS: u32 = 10_240;
/// Token budget for merge adjudication and `other` structuring.
pub const MERGE_MAX_TOKENS: u32 = 40_960;

/// Upper bound on in-flight completions across all pipeline stages.
const MAX_IN_FLIGHT: usize = 8;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    permits: Arc<Semaphore>,
}

impl LlmClient {
    /// Build a client. `base_url` carries no trailing slash
    /// (`https://api.perplexity.ai`); tests point it at a local mock server.
    pub fn new(
        base_url: &str,
        api_key: &str,
        request_timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_retries,
            permits: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
        })
    }

    /// Issue one completion and return the assistant message text.
    ///
    /// Transport faults and HTTP 429/5xx retry with exponential backoff up
    /// to `max_retries`; other HTTP errors surface immediately. Temperature
    /// is left to the provider default.
    pub async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScrapeError::Fatal("llm semaphore closed".into()))?;

        let body = json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "max_tokens": max_tokens,
        });
        let url = format!("{}/chat/completions", self.base_url);

        let mut attempt = 0u32;
        loop {
            let outcome = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match outcome {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: ChatResponse = resp.json().await?;
                    let content = parsed
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content)
                        .unwrap_or_default();
                    debug!(chars = content.len(), "llm completion received");
                    return Ok(content);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if !retryable {
                        return match resp.error_for_status() {
                            Err(e) => Err(e.into()),
                            Ok(_) => Err(ScrapeError::Transient(format!(
                                "unexpected llm status {status}"
                            ))),
                        };
                    }
                    if attempt >= self.max_retries {
                        return Err(ScrapeError::Transient(format!(
                            "llm endpoint returned {status} after {attempt} retries"
                        )));
                    }
                    warn!(%status, attempt, "llm request failed, retrying");
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    if attempt >= self.max_retries {
                        return Err(ScrapeError::Transient(format!(
                            "llm transport failure after {attempt} retries: {e}"
                        )));
                    }
                    warn!(error = %e, attempt, "llm transport failure, retrying");
                }
                Err(e) => return Err(e.into()),
            }

            attempt += 1;
            tokio::time::sleep(Duration::from_millis(500 * (1u64 << attempt.min(6)))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> LlmClient {
        LlmClient::new(&server.url(), "test-key", Duration::from_secs(5), 1)
            .expect("client builds")
    }

    #[tokio::test]
    async fn returns_message_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let out = client.complete("sys", "user", 64).await.expect("ok");
        assert_eq!(out, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"recovered"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let out = client.complete("sys", "user", 64).await.expect("ok");
        assert_eq!(out, "recovered");
        failing.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn exhausted_retries_surface_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .expect_at_least(2)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.complete("sys", "user", 64).await.expect_err("fails");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn client_errors_do_not_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.complete("sys", "user", 64).await.expect_err("fails");
        assert!(!err.is_transient());
        mock.assert_async().await;
    }
}
