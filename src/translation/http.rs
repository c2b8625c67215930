//! Blocking JSON-over-HTTP helper for the cloud backends
//!
//! The frame loop is synchronous, so each cloud backend owns a small
//! current-thread tokio runtime and blocks on reqwest calls with a bounded
//! timeout.

use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

use super::error::{TranslateError, TranslateResult};

/// HTTP client with its own runtime
pub struct HttpClient {
    runtime: Runtime,
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { runtime, client })
    }

    /// GET `url` with query parameters and decode the JSON body
    pub fn get_json(&self, url: &str, query: &[(&str, &str)]) -> TranslateResult<Value> {
        self.runtime.block_on(async {
            let response = self.client.get(url).query(query).send().await?;

            let status = response.status();
            if !status.is_success() {
                debug!("GET {} returned {}", url, status);
                return Err(TranslateError::Status(status));
            }

            Ok(response.json::<Value>().await?)
        })
    }
}
