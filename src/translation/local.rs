//! Local sequence-to-sequence translation

use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use super::error::TranslateResult;
use super::marian::MarianOnnx;
use super::models::ModelManager;
use super::TranslatorBackend;

/// Local model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalModelSettings {
    /// Hugging Face repository with an ONNX export of a Marian model
    pub repository: String,
    /// Directory holding the model files instead of the data dir
    pub model_dir: Option<PathBuf>,
    /// Maximum number of generated tokens
    pub max_length: usize,
}

impl Default for LocalModelSettings {
    fn default() -> Self {
        Self {
            repository: "Xenova/opus-mt-en-zh".to_string(),
            model_dir: None,
            max_length: 256,
        }
    }
}

/// A model that turns a batch of source texts into translations
pub trait Seq2SeqModel: Send {
    /// Output has one entry per input, in order
    fn generate(&mut self, texts: &[String]) -> TranslateResult<Vec<String>>;
}

/// Backend running a [`Seq2SeqModel`] in-process.
///
/// The model is fixed to one language pair, so the target language passed
/// by the caller is not forwarded.
pub struct LocalTranslator {
    model: Mutex<Box<dyn Seq2SeqModel>>,
}

impl LocalTranslator {
    pub fn new(model: Box<dyn Seq2SeqModel>) -> Self {
        Self {
            model: Mutex::new(model),
        }
    }

    /// Fetch the model files if needed and load the ONNX sessions
    pub fn load(settings: &LocalModelSettings) -> Result<Self> {
        let manager = match &settings.model_dir {
            Some(dir) => ModelManager::with_dir(&settings.repository, dir.clone())?,
            None => ModelManager::new(&settings.repository)?,
        };
        manager.ensure_all()?;

        let model = MarianOnnx::load(&manager, settings.max_length)?;
        info!("Local translation model {} loaded", settings.repository);
        Ok(Self::new(Box::new(model)))
    }
}

impl TranslatorBackend for LocalTranslator {
    fn name(&self) -> &str {
        "local"
    }

    fn translate(&self, text: &str, target_lang: &str) -> Option<String> {
        self.translate_batch(&[text.to_string()], target_lang)
            .into_iter()
            .next()
            .flatten()
    }

    fn translate_batch(&self, texts: &[String], _target_lang: &str) -> Vec<Option<String>> {
        let mut results = vec![None; texts.len()];

        let (positions, inputs): (Vec<usize>, Vec<String>) = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| (i, text.trim().to_string()))
            .unzip();

        if inputs.is_empty() {
            return results;
        }

        let outputs = match self.model.lock().generate(&inputs) {
            Ok(outputs) => outputs,
            Err(e) => {
                warn!("Local translation failed: {}", e);
                return results;
            }
        };

        if outputs.len() != inputs.len() {
            warn!(
                "Local model returned {} outputs for {} inputs",
                outputs.len(),
                inputs.len()
            );
            return results;
        }

        for (pos, output) in positions.into_iter().zip(outputs) {
            if !output.trim().is_empty() {
                results[pos] = Some(output);
            }
        }
        results
    }
}
