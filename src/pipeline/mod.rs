//! Frame processing
//!
//! One tick takes the latest frame, recognizes text, filters it, translates
//! the survivors in one batch and hands the results to the display.

pub mod filter;

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::capture::FrameSource;
use crate::shared::{FrameStats, SharedStats, WorkerToDisplay};
use crate::translation::TranslatorManager;
use crate::vision::{SourceLanguage, TextRecognizer};

use filter::filter_regions;

/// A translated region ready for display, in screen coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub original: String,
    pub translated: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// How a tick ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No frame was due or the capture failed
    NoFrame,
    /// A frame was processed but nothing was shown
    Empty,
    /// This many translations were sent to the display
    Translated(usize),
    /// The tick hit an error or a panic
    Failed,
}

impl TickOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TickOutcome::Empty | TickOutcome::Translated(_))
    }
}

/// Runtime knobs of the frame processor
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Scripts a region must contain; empty accepts all
    pub source_languages: Vec<SourceLanguage>,
    pub target_language: String,
    pub min_text_length: usize,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            source_languages: vec![SourceLanguage::English],
            target_language: "zh".to_string(),
            min_text_length: 2,
        }
    }
}

pub struct FrameProcessor {
    capture: Box<dyn FrameSource>,
    recognizer: TextRecognizer,
    translator: Arc<TranslatorManager>,
    display: Sender<WorkerToDisplay>,
    settings: ProcessorSettings,
    stats: SharedStats,
}

impl FrameProcessor {
    pub fn new(
        capture: Box<dyn FrameSource>,
        recognizer: TextRecognizer,
        translator: Arc<TranslatorManager>,
        display: Sender<WorkerToDisplay>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            capture,
            recognizer,
            translator,
            display,
            settings,
            stats: Arc::new(RwLock::new(FrameStats::default())),
        }
    }

    /// Handle to the live statistics
    pub fn stats(&self) -> SharedStats {
        self.stats.clone()
    }

    pub fn translator(&self) -> &Arc<TranslatorManager> {
        &self.translator
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    pub fn start(&mut self) {
        self.capture.start();
    }

    /// Stop capturing and release the OCR engine
    pub fn shutdown(&mut self) {
        self.capture.stop();
        self.recognizer.shutdown();
    }

    pub fn set_capture_interval(&mut self, interval: Duration) {
        self.capture.set_interval(interval);
    }

    pub fn set_min_text_length(&mut self, length: usize) {
        self.settings.min_text_length = length;
    }

    /// Run one tick. Never panics; failures are logged and reported as
    /// [`TickOutcome::Failed`].
    pub fn tick(&mut self) -> TickOutcome {
        let started = Instant::now();

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.run_tick())) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("Error processing frame: {:#}", e);
                TickOutcome::Failed
            }
            Err(payload) => {
                error!(
                    "Frame processing panicked: {}",
                    crate::shared::panic_message(payload.as_ref())
                );
                TickOutcome::Failed
            }
        };

        if outcome != TickOutcome::NoFrame {
            self.stats.write().record_process_time(started.elapsed());
        }
        outcome
    }

    fn run_tick(&mut self) -> Result<TickOutcome> {
        let Some(frame) = self.capture.latest_frame() else {
            return Ok(TickOutcome::NoFrame);
        };
        self.stats.write().total_captures += 1;

        let regions = self
            .recognizer
            .recognize_with_filter(&frame, &self.settings.source_languages);
        if regions.is_empty() {
            debug!("No text in frame");
            return Ok(TickOutcome::Empty);
        }

        let regions = filter_regions(regions, self.settings.min_text_length);
        if regions.is_empty() {
            debug!("No translatable text in frame");
            return Ok(TickOutcome::Empty);
        }
        self.stats.write().total_texts += regions.len() as u64;

        let texts: Vec<String> = regions.iter().map(|r| r.text.clone()).collect();
        let translated = self
            .translator
            .translate_batch(&texts, &self.settings.target_language);

        let results: Vec<TranslationResult> = regions
            .into_iter()
            .zip(translated)
            .filter_map(|(region, translated)| {
                let translated = translated.filter(|t| !t.is_empty() && *t != region.text)?;
                let rect = region.bounding_rect();
                Some(TranslationResult {
                    original: region.text,
                    translated,
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                })
            })
            .collect();

        if results.is_empty() {
            return Ok(TickOutcome::Empty);
        }

        let count = results.len();
        self.display
            .send(WorkerToDisplay::Show(results))
            .context("Display channel closed")?;
        self.stats.write().total_translations += count as u64;

        debug!("Sent {} translations to the display", count);
        Ok(TickOutcome::Translated(count))
    }
}
