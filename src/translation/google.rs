//! Google translate web endpoint ("gtx" client)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::thread;
use std::time::Duration;
use tracing::warn;

use super::error::{TranslateError, TranslateResult};
use super::http::HttpClient;
use super::TranslatorBackend;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Google backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Endpoint URL
    pub endpoint: String,
    /// Pause between requests of a batch in milliseconds
    pub batch_delay_ms: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            batch_delay_ms: 100,
        }
    }
}

pub struct GoogleTranslator {
    http: HttpClient,
    endpoint: String,
    batch_delay: Duration,
}

impl GoogleTranslator {
    pub fn new(settings: &GoogleSettings, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(timeout, USER_AGENT)?,
            endpoint: settings.endpoint.clone(),
            batch_delay: Duration::from_millis(settings.batch_delay_ms),
        })
    }

    fn request(&self, text: &str, target_lang: &str) -> TranslateResult<String> {
        let query = [
            ("client", "gtx"),
            ("sl", "auto"),
            ("tl", target_lang),
            ("dt", "t"),
            ("q", text),
        ];

        let body = self.http.get_json(&self.endpoint, &query)?;
        parse_envelope(&body)
    }
}

impl TranslatorBackend for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    fn translate(&self, text: &str, target_lang: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        match self.request(text, target_lang) {
            Ok(translated) => Some(translated),
            Err(e) => {
                warn!("Google translation failed: {}", e);
                None
            }
        }
    }

    fn translate_batch(&self, texts: &[String], target_lang: &str) -> Vec<Option<String>> {
        let mut results = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            if i > 0 {
                thread::sleep(self.batch_delay);
            }
            results.push(self.translate(text, target_lang));
        }
        results
    }
}

/// Join the translated segments of a gtx response.
///
/// The body is `[[["<translated>", "<original>", ...], ...], ...]`.
fn parse_envelope(body: &Value) -> TranslateResult<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Envelope("missing segment list".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(TranslateError::Envelope("no translated segments".to_string()));
    }
    Ok(translated)
}
