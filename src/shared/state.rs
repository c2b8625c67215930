//! Runtime statistics of the frame loop

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Weight of the newest sample in the processing time average
const EWMA_WEIGHT: f64 = 0.1;

/// Counters updated by the frame processor
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Ticks that obtained a frame
    pub total_captures: u64,
    /// Regions that survived filtering
    pub total_texts: u64,
    /// Translations sent to the display
    pub total_translations: u64,
    /// Moving average of tick wall-clock time in seconds
    pub avg_process_secs: f64,
}

impl FrameStats {
    /// Fold one tick duration into the moving average
    pub fn record_process_time(&mut self, elapsed: Duration) {
        self.avg_process_secs =
            self.avg_process_secs * (1.0 - EWMA_WEIGHT) + elapsed.as_secs_f64() * EWMA_WEIGHT;
    }

    /// Multi-line summary for the shutdown log
    pub fn report(&self) -> String {
        format!(
            "=== Performance Statistics ===\n\
             Total captures: {}\n\
             Recognized texts: {}\n\
             Translated texts: {}\n\
             Average processing time: {:.3}s",
            self.total_captures, self.total_texts, self.total_translations, self.avg_process_secs
        )
    }
}

/// Stats handle shared between the worker and the controller
pub type SharedStats = Arc<RwLock<FrameStats>>;
