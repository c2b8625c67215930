//! Baidu translate API backend
//!
//! Requests are signed with `md5(appid + q + salt + secret)`.

use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::thread;
use std::time::Duration;
use tracing::warn;

use super::error::{TranslateError, TranslateResult};
use super::http::HttpClient;
use super::TranslatorBackend;

const ENDPOINT: &str = "https://fanyi-api.baidu.com/api/trans/vip/translate";
const BATCH_DELAY: Duration = Duration::from_millis(100);

/// Baidu API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaiduSettings {
    pub app_id: String,
    pub secret_key: String,
}

pub struct BaiduTranslator {
    http: HttpClient,
    app_id: String,
    secret_key: String,
    endpoint: String,
}

impl BaiduTranslator {
    pub fn new(app_id: &str, secret_key: &str, timeout: Duration) -> Result<Self> {
        if app_id.trim().is_empty() || secret_key.trim().is_empty() {
            anyhow::bail!("Baidu app id and secret key must not be empty");
        }

        Ok(Self {
            http: HttpClient::new(timeout, concat!("screen-translator/", env!("CARGO_PKG_VERSION")))?,
            app_id: app_id.to_string(),
            secret_key: secret_key.to_string(),
            endpoint: ENDPOINT.to_string(),
        })
    }

    fn sign(&self, query: &str, salt: &str) -> String {
        sign(&self.app_id, query, salt, &self.secret_key)
    }

    fn request(&self, text: &str, target_lang: &str) -> TranslateResult<String> {
        let salt = rand::thread_rng().gen_range(32768..=65536).to_string();
        let sign = self.sign(text, &salt);
        let to = language_code(target_lang);

        let query = [
            ("q", text),
            ("from", "auto"),
            ("to", to),
            ("appid", self.app_id.as_str()),
            ("salt", salt.as_str()),
            ("sign", sign.as_str()),
        ];

        let body = self.http.get_json(&self.endpoint, &query)?;
        parse_envelope(&body)
    }
}

impl TranslatorBackend for BaiduTranslator {
    fn name(&self) -> &str {
        "baidu"
    }

    fn translate(&self, text: &str, target_lang: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        match self.request(text, target_lang) {
            Ok(translated) => Some(translated),
            Err(e) => {
                warn!("Baidu translation failed: {}", e);
                None
            }
        }
    }

    fn translate_batch(&self, texts: &[String], target_lang: &str) -> Vec<Option<String>> {
        let mut results = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            if i > 0 {
                thread::sleep(BATCH_DELAY);
            }
            results.push(self.translate(text, target_lang));
        }
        results
    }
}

fn sign(app_id: &str, query: &str, salt: &str, secret_key: &str) -> String {
    let digest = md5::compute(format!("{app_id}{query}{salt}{secret_key}"));
    format!("{:x}", digest)
}

/// Baidu uses its own codes for a few languages
fn language_code(lang: &str) -> &str {
    match lang {
        "ja" => "jp",
        "ko" => "kor",
        "fr" => "fra",
        "es" => "spa",
        "vi" => "vie",
        "ch" => "zh",
        other => other,
    }
}

/// Extract `trans_result[0].dst`, mapping `error_code` to a provider error
fn parse_envelope(body: &Value) -> TranslateResult<String> {
    if let Some(code) = body.get("error_code") {
        let code = match code {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let message = body
            .get("error_msg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(TranslateError::Provider { code, message });
    }

    body.get("trans_result")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("dst"))
        .and_then(Value::as_str)
        .filter(|dst| !dst.is_empty())
        .map(str::to_string)
        .ok_or_else(|| TranslateError::Envelope(format!("no trans_result in {}", body)))
}
