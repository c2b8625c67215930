//! Translation Layer
//!
//! A [`TranslatorManager`] routes texts through an ordered chain of
//! [`TranslatorBackend`]s with caching and rotation. Backends:
//! - identity pass-through (no real backend configured, and tests)
//! - Google "gtx" web endpoint
//! - Baidu translate API (signed requests)
//! - local Marian model via ONNX Runtime

pub mod baidu;
pub mod error;
pub mod google;
pub mod http;
pub mod identity;
pub mod local;
pub mod manager;
pub mod marian;
pub mod models;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::TranslationSettings;

pub use baidu::BaiduTranslator;
pub use google::GoogleTranslator;
pub use identity::IdentityTranslator;
pub use local::LocalTranslator;
pub use manager::TranslatorManager;

/// A translation capability.
///
/// `translate` must not panic or block indefinitely for ordinary input; a
/// blank text or any transient failure is reported as `None`.
pub trait TranslatorBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Translate one text into `target_lang`
    fn translate(&self, text: &str, target_lang: &str) -> Option<String>;

    /// Translate several texts; the output has the same length and order
    fn translate_batch(&self, texts: &[String], target_lang: &str) -> Vec<Option<String>> {
        texts
            .iter()
            .map(|text| self.translate(text, target_lang))
            .collect()
    }
}

/// Backend selection in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Marks text as translated without changing it
    Identity,
    /// Google translate web endpoint
    Google,
    /// Baidu translate API
    Baidu,
    /// Local Marian model
    Local,
}

/// Construct one backend from the settings
pub fn build_backend(kind: BackendKind, settings: &TranslationSettings) -> Result<Box<dyn TranslatorBackend>> {
    let timeout = Duration::from_secs(settings.request_timeout_secs);

    Ok(match kind {
        BackendKind::Identity => Box::new(IdentityTranslator),
        BackendKind::Google => Box::new(GoogleTranslator::new(&settings.google, timeout)?),
        BackendKind::Baidu => {
            let baidu = settings
                .baidu
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("[translation.baidu] credentials are not configured"))?;
            Box::new(BaiduTranslator::new(&baidu.app_id, &baidu.secret_key, timeout)?)
        }
        BackendKind::Local => Box::new(LocalTranslator::load(&settings.local)?),
    })
}

/// Build the manager for the configured backend chain.
///
/// Backends that fail to start are logged and left out. When none is left
/// the identity backend is used so the pipeline keeps running.
pub fn build_manager(settings: &TranslationSettings) -> TranslatorManager {
    let mut manager = TranslatorManager::new();
    manager.set_cache_enabled(settings.cache_enabled);

    for &kind in &settings.backends {
        match build_backend(kind, settings) {
            Ok(backend) => manager.add_backend(backend),
            Err(e) => warn!("Translation backend {:?} unavailable: {:#}", kind, e),
        }
    }

    if manager.backend_count() == 0 {
        warn!("No translation backend available, falling back to identity");
        manager.add_backend(Box::new(IdentityTranslator));
    }

    info!(
        "Translator chain: {:?} (cache {})",
        manager.backend_names(),
        if manager.is_cache_enabled() { "enabled" } else { "disabled" }
    );
    manager
}
