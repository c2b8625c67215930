//! Messages sent from the translation worker to the display

use crate::pipeline::TranslationResult;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerToDisplay {
    /// Replace the shown translations
    Show(Vec<TranslationResult>),
    /// Stop the display loop
    Shutdown,
}
