//! Vision/OCR Layer
//!
//! Turns captured frames into text regions. The OCR engine itself is a
//! platform collaborator (Windows OCR on Windows); this layer owns the region
//! geometry, the recognition thresholds and the source-language filter.

pub mod language;
pub mod ocr;
pub mod region;
#[cfg(windows)]
pub mod windows_ocr;

pub use language::SourceLanguage;
pub use ocr::{platform_engine, RecognitionThresholds, TextRecognizer};
pub use region::TextRegion;
