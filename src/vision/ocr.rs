//! OCR (Optical Character Recognition) module
//!
//! Wraps a platform OCR engine and applies the confidence, size and
//! source-language filters before regions reach the pipeline.

use anyhow::Result;
use tracing::{debug, info, warn};

use super::language::{contains_any, SourceLanguage};
use super::region::TextRegion;
use crate::capture::frame::CapturedFrame;

/// A text recognition engine
pub trait OcrEngine: Send {
    /// Engine name for logging
    fn name(&self) -> &str;

    /// Recognize text in a frame. Coordinates are relative to the frame.
    fn recognize(&mut self, frame: &CapturedFrame) -> Result<Vec<TextRegion>>;

    /// Release engine resources
    fn shutdown(&mut self) {}
}

/// Thresholds applied to raw OCR output
#[derive(Debug, Clone, Copy)]
pub struct RecognitionThresholds {
    /// Minimum recognition confidence (0.0 - 1.0)
    pub min_confidence: f32,
    /// Minimum width and height of a region's bounding box in pixels
    pub min_text_size: i32,
}

impl Default for RecognitionThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            min_text_size: 10,
        }
    }
}

/// OCR front-end used by the frame processor.
///
/// Without an engine (initialization failed or the recognizer was shut down)
/// it runs in degraded mode and recognizes nothing.
pub struct TextRecognizer {
    engine: Option<Box<dyn OcrEngine>>,
    thresholds: RecognitionThresholds,
}

impl TextRecognizer {
    /// Create a recognizer around an initialized engine
    pub fn new(engine: Box<dyn OcrEngine>, thresholds: RecognitionThresholds) -> Self {
        info!("OCR engine initialized successfully: {}", engine.name());
        Self {
            engine: Some(engine),
            thresholds,
        }
    }

    /// Create a recognizer with no engine
    pub fn degraded(thresholds: RecognitionThresholds) -> Self {
        Self {
            engine: None,
            thresholds,
        }
    }

    /// Build from an engine constructor, falling back to degraded mode
    pub fn initialize<F>(init: F, thresholds: RecognitionThresholds) -> Self
    where
        F: FnOnce() -> Result<Box<dyn OcrEngine>>,
    {
        match init() {
            Ok(engine) => Self::new(engine, thresholds),
            Err(e) => {
                warn!("OCR engine initialization failed, text recognition disabled: {:#}", e);
                Self::degraded(thresholds)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    pub fn set_min_text_size(&mut self, size: i32) {
        self.thresholds.min_text_size = size;
    }

    /// Recognize text and apply confidence and size thresholds.
    ///
    /// Region coordinates are moved into screen space using the frame origin.
    /// Engine failures yield an empty list.
    pub fn recognize(&mut self, frame: &CapturedFrame) -> Vec<TextRegion> {
        let Some(engine) = self.engine.as_mut() else {
            debug!("OCR engine not initialized");
            return vec![];
        };

        if frame.is_empty() {
            return vec![];
        }

        let raw = match engine.recognize(frame) {
            Ok(regions) => regions,
            Err(e) => {
                warn!("Text recognition failed: {:#}", e);
                return vec![];
            }
        };

        let thresholds = self.thresholds;
        let (dx, dy) = frame.origin;
        raw.into_iter()
            .filter(|r| r.confidence >= thresholds.min_confidence)
            .filter(|r| {
                let rect = r.bounding_rect();
                rect.width >= thresholds.min_text_size && rect.height >= thresholds.min_text_size
            })
            .map(|mut r| {
                r.translate(dx, dy);
                r
            })
            .collect()
    }

    /// Recognize text, keeping only regions containing one of `languages`
    pub fn recognize_with_filter(
        &mut self,
        frame: &CapturedFrame,
        languages: &[SourceLanguage],
    ) -> Vec<TextRegion> {
        self.recognize(frame)
            .into_iter()
            .filter(|r| contains_any(&r.text, languages))
            .collect()
    }

    /// Release the engine; the recognizer is degraded afterwards
    pub fn shutdown(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.shutdown();
            info!("OCR engine {} released", engine.name());
        }
    }
}

/// OCR engine available on this platform
#[cfg(windows)]
pub fn platform_engine(language_tag: &str) -> Result<Box<dyn OcrEngine>> {
    Ok(Box::new(super::windows_ocr::WindowsOcr::new(language_tag)?))
}

/// OCR engine available on this platform
#[cfg(not(windows))]
pub fn platform_engine(language_tag: &str) -> Result<Box<dyn OcrEngine>> {
    anyhow::bail!(
        "no OCR engine available on this platform (requested language {})",
        language_tag
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Engine returning a fixed set of regions
    pub(crate) struct ScriptedOcr {
        pub regions: Vec<TextRegion>,
        pub fail: bool,
    }

    impl OcrEngine for ScriptedOcr {
        fn name(&self) -> &str {
            "scripted"
        }

        fn recognize(&mut self, _frame: &CapturedFrame) -> Result<Vec<TextRegion>> {
            if self.fail {
                anyhow::bail!("engine crashed");
            }
            Ok(self.regions.clone())
        }
    }

    fn frame() -> CapturedFrame {
        CapturedFrame::new(vec![0; 64 * 64 * 4], 64, 64)
    }

    fn recognizer(regions: Vec<TextRegion>) -> TextRecognizer {
        TextRecognizer::new(
            Box::new(ScriptedOcr {
                regions,
                fail: false,
            }),
            RecognitionThresholds::default(),
        )
    }

    #[test]
    fn test_confidence_threshold() {
        let mut ocr = recognizer(vec![
            TextRegion::from_rect("sure", 0, 0, 20, 20, 0.9),
            TextRegion::from_rect("unsure", 0, 0, 20, 20, 0.3),
        ]);

        let texts: Vec<_> = ocr.recognize(&frame()).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["sure"]);
    }

    #[test]
    fn test_min_text_size() {
        let mut ocr = recognizer(vec![
            TextRegion::from_rect("wide", 0, 0, 40, 12, 0.9),
            TextRegion::from_rect("thin", 0, 0, 40, 5, 0.9),
        ]);

        let texts: Vec<_> = ocr.recognize(&frame()).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["wide"]);

        ocr.set_min_text_size(4);
        assert_eq!(ocr.recognize(&frame()).len(), 2);
    }

    #[test]
    fn test_language_filter() {
        let mut ocr = recognizer(vec![
            TextRegion::from_rect("Continue", 0, 0, 40, 12, 0.9),
            TextRegion::from_rect("続ける", 0, 20, 40, 12, 0.9),
        ]);

        let english = ocr.recognize_with_filter(&frame(), &[SourceLanguage::English]);
        assert_eq!(english.len(), 1);
        assert_eq!(english[0].text, "Continue");

        let all = ocr.recognize_with_filter(&frame(), &[]);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_regions_move_to_screen_space() {
        let mut ocr = recognizer(vec![TextRegion::from_rect("Menu", 5, 5, 30, 12, 0.9)]);
        let frame = frame().with_origin(200, 100);

        let rect = ocr.recognize(&frame)[0].bounding_rect();
        assert_eq!((rect.x, rect.y), (205, 105));
    }

    #[test]
    fn test_engine_failure_is_empty() {
        let mut ocr = TextRecognizer::new(
            Box::new(ScriptedOcr {
                regions: vec![],
                fail: true,
            }),
            RecognitionThresholds::default(),
        );
        assert!(ocr.recognize(&frame()).is_empty());
    }

    #[test]
    fn test_failed_initialization_is_degraded() {
        let mut ocr = TextRecognizer::initialize(
            || anyhow::bail!("model missing"),
            RecognitionThresholds::default(),
        );
        assert!(!ocr.is_ready());
        assert!(ocr.recognize(&frame()).is_empty());
    }

    #[test]
    fn test_shutdown_releases_engine() {
        let mut ocr = recognizer(vec![TextRegion::from_rect("Menu", 0, 0, 30, 12, 0.9)]);
        ocr.shutdown();
        assert!(!ocr.is_ready());
        assert!(ocr.recognize(&frame()).is_empty());
    }
}
