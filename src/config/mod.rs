//! Application Configuration
//!
//! User settings stored in TOML format. Every section and field has a
//! default, so a partial file (or none at all) is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::capture::{CaptureConfig, CaptureRegion};
use crate::overlay::OverlayConfig;
use crate::pipeline::ProcessorSettings;
use crate::translation::baidu::BaiduSettings;
use crate::translation::google::GoogleSettings;
use crate::translation::local::LocalModelSettings;
use crate::translation::BackendKind;
use crate::vision::{RecognitionThresholds, SourceLanguage};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureSettings,
    pub ocr: OcrSettings,
    pub translation: TranslationSettings,
    pub display: OverlayConfig,
}

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Minimum seconds between two captures
    pub interval_secs: f64,
    /// Monitor index, primary monitor when unset
    pub monitor: Option<usize>,
    /// Only this part of the screen is captured
    pub region: Option<CaptureRegion>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interval_secs: 2.0,
            monitor: None,
            region: None,
        }
    }
}

/// OCR-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Regions below this confidence are dropped
    pub min_confidence: f32,
    /// Regions narrower or shorter than this many pixels are dropped
    pub min_text_size: i32,
    /// BCP-47 tag of the recognizer language
    pub language: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            min_text_size: 10,
            language: "en-US".to_string(),
        }
    }
}

/// Translation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    /// Scripts a region must contain to be translated
    pub source_languages: Vec<SourceLanguage>,
    pub target_language: String,
    /// Shorter trimmed texts are not translated
    pub min_text_length: usize,
    pub cache_enabled: bool,
    /// Backends in fallback order
    pub backends: Vec<BackendKind>,
    /// Timeout of one cloud request
    pub request_timeout_secs: u64,
    pub google: GoogleSettings,
    pub baidu: Option<BaiduSettings>,
    pub local: LocalModelSettings,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            source_languages: vec![SourceLanguage::English],
            target_language: "zh".to_string(),
            min_text_length: 2,
            cache_enabled: true,
            backends: vec![BackendKind::Identity],
            request_timeout_secs: 10,
            google: GoogleSettings::default(),
            baidu: None,
            local: LocalModelSettings::default(),
        }
    }
}

impl AppConfig {
    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.capture_interval()?.is_zero() {
            anyhow::bail!("capture.interval_secs must be positive, got {}", self.capture.interval_secs);
        }
        if let Some(region) = &self.capture.region {
            if region.width == 0 || region.height == 0 {
                anyhow::bail!("capture.region must have a non-zero size");
            }
        }
        if !(0.0..=1.0).contains(&self.ocr.min_confidence) {
            anyhow::bail!("ocr.min_confidence must be within [0, 1], got {}", self.ocr.min_confidence);
        }
        if self.ocr.min_text_size < 0 {
            anyhow::bail!("ocr.min_text_size must not be negative");
        }
        if self.translation.target_language.trim().is_empty() {
            anyhow::bail!("translation.target_language must not be empty");
        }
        if self.translation.request_timeout_secs == 0 {
            anyhow::bail!("translation.request_timeout_secs must be positive");
        }
        Ok(())
    }

    fn capture_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.capture.interval_secs).with_context(|| {
            format!("capture.interval_secs out of range: {}", self.capture.interval_secs)
        })
    }

    pub fn capture_config(&self) -> Result<CaptureConfig> {
        Ok(CaptureConfig {
            interval: self.capture_interval()?,
            region: self.capture.region,
        })
    }

    pub fn recognition_thresholds(&self) -> RecognitionThresholds {
        RecognitionThresholds {
            min_confidence: self.ocr.min_confidence,
            min_text_size: self.ocr.min_text_size,
        }
    }

    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            source_languages: self.translation.source_languages.clone(),
            target_language: self.translation.target_language.clone(),
            min_text_length: self.translation.min_text_length,
        }
    }
}

/// `config.toml` in the platform config directory
pub fn default_config_path() -> Result<PathBuf> {
    Ok(crate::storage::get_config_dir()?.join("config.toml"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig =
        toml::from_str(&content).with_context(|| format!("Invalid config {:?}", path))?;
    Ok(config)
}

/// Load configuration, using defaults when the file does not exist
pub fn load_or_default(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        info!("No config at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }
    load_config(path)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write config {:?}", path))?;
    Ok(())
}
