//! Translation labels drawn by the overlay

use crate::pipeline::TranslationResult;

/// Gap between the source text box and its label, in pixels
pub const LABEL_GAP: i32 = 5;

/// A positioned label ready to be rendered
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLabel {
    /// Translated text, the visible part
    pub text: String,
    /// Secondary text shown on hover
    pub tooltip: Option<String>,
    pub x: i32,
    pub y: i32,
    /// 0.0 (invisible) to 1.0
    pub opacity: f32,
}

impl OverlayLabel {
    /// Place the label just below the source text box
    pub fn for_result(result: &TranslationResult, opacity: f32, show_original: bool) -> Self {
        Self {
            text: result.translated.clone(),
            tooltip: show_original.then(|| format!("Original: {}", result.original)),
            x: result.x,
            y: result.y + result.height + LABEL_GAP,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}
