//! Overlay Presentation Layer
//!
//! Keeps the set of translations currently on screen. Every `show` replaces
//! what was there; each item stays fully visible for the configured duration
//! and then fades out. Drawing is delegated to an [`OverlayRenderer`].

pub mod widgets;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::pipeline::TranslationResult;
use crate::shared::WorkerToDisplay;

pub use widgets::OverlayLabel;

/// How often the display loop wakes up without messages
const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Time an item stays fully visible, in milliseconds
    pub duration_ms: u64,
    /// Fade-out time after the duration, in milliseconds
    pub fade_ms: u64,
    /// Attach the original text as a tooltip
    pub show_original: bool,
    /// Maximum number of items shown at once
    pub max_items: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            duration_ms: 5000,
            fade_ms: 1000,
            show_original: true,
            max_items: 50,
        }
    }
}

/// A translation with timing information for display
#[derive(Debug, Clone)]
struct DisplayItem {
    result: TranslationResult,
    fade_at: Instant,
    expires_at: Instant,
}

impl DisplayItem {
    fn new(result: TranslationResult, config: &OverlayConfig, now: Instant) -> Self {
        let fade_at = now + Duration::from_millis(config.duration_ms);
        Self {
            result,
            fade_at,
            expires_at: fade_at + Duration::from_millis(config.fade_ms),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Full opacity until `fade_at`, then linear down to zero
    fn opacity(&self, now: Instant) -> f32 {
        if now < self.fade_at {
            return 1.0;
        }
        let fade = self.expires_at.saturating_duration_since(self.fade_at).as_secs_f32();
        if fade <= 0.0 {
            return 0.0;
        }
        let remaining = self.expires_at.saturating_duration_since(now).as_secs_f32();
        (remaining / fade).clamp(0.0, 1.0)
    }
}

/// Draws the current labels
pub trait OverlayRenderer {
    fn render(&mut self, labels: &[OverlayLabel]);
}

/// Renderer that logs label changes, used when no window system is attached
#[derive(Debug, Default)]
pub struct LogRenderer {
    last: Vec<(String, i32, i32)>,
}

impl OverlayRenderer for LogRenderer {
    fn render(&mut self, labels: &[OverlayLabel]) {
        let current: Vec<(String, i32, i32)> =
            labels.iter().map(|l| (l.text.clone(), l.x, l.y)).collect();
        if current == self.last {
            return;
        }

        if current.is_empty() {
            debug!("Overlay cleared");
        }
        for label in labels {
            match &label.tooltip {
                Some(tooltip) => info!("[{}, {}] {} ({})", label.x, label.y, label.text, tooltip),
                None => info!("[{}, {}] {}", label.x, label.y, label.text),
            }
        }
        self.last = current;
    }
}

/// Holds the items on screen
pub struct DisplayManager {
    config: OverlayConfig,
    items: Vec<DisplayItem>,
    visible: bool,
}

impl DisplayManager {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            items: Vec::new(),
            visible: true,
        }
    }

    /// Replace the shown translations
    pub fn show(&mut self, results: Vec<TranslationResult>) {
        self.show_at(results, Instant::now());
    }

    fn show_at(&mut self, results: Vec<TranslationResult>, now: Instant) {
        let config = &self.config;
        self.items = results
            .into_iter()
            .take(config.max_items)
            .map(|r| DisplayItem::new(r, config, now))
            .collect();
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn hide_overlay(&mut self) {
        self.visible = false;
    }

    pub fn show_overlay(&mut self) {
        self.visible = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop items whose fade-out has finished
    pub fn prune_expired(&mut self, now: Instant) {
        self.items.retain(|item| !item.is_expired(now));
    }

    /// Labels to draw at `now`; nothing while hidden
    pub fn labels(&self, now: Instant) -> Vec<OverlayLabel> {
        if !self.visible {
            return Vec::new();
        }
        self.items
            .iter()
            .filter(|item| !item.is_expired(now))
            .map(|item| OverlayLabel::for_result(&item.result, item.opacity(now), self.config.show_original))
            .collect()
    }

    /// Apply a worker message; returns false on shutdown
    pub fn handle(&mut self, message: WorkerToDisplay) -> bool {
        match message {
            WorkerToDisplay::Show(results) => {
                debug!("Showing {} translations", results.len());
                self.show(results);
                true
            }
            WorkerToDisplay::Shutdown => false,
        }
    }

    /// Run the display event loop (blocking) until shutdown or until every
    /// sender is gone. Call this from the main thread.
    pub fn run(&mut self, receiver: &Receiver<WorkerToDisplay>, renderer: &mut dyn OverlayRenderer) {
        info!("Display loop started");

        loop {
            match receiver.recv_timeout(REFRESH_INTERVAL) {
                Ok(message) => {
                    if !self.handle(message) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            self.prune_expired(now);
            renderer.render(&self.labels(now));
        }

        self.clear();
        renderer.render(&[]);
        info!("Display loop ended");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Renderer recording every frame it was asked to draw
    #[derive(Default, Clone)]
    pub(crate) struct CollectingRenderer {
        pub frames: Arc<Mutex<Vec<Vec<OverlayLabel>>>>,
    }

    impl OverlayRenderer for CollectingRenderer {
        fn render(&mut self, labels: &[OverlayLabel]) {
            self.frames.lock().push(labels.to_vec());
        }
    }

    fn result(text: &str, y: i32) -> TranslationResult {
        TranslationResult {
            original: text.to_string(),
            translated: format!("[translate]{}", text),
            x: 0,
            y,
            width: 20,
            height: 20,
        }
    }

    fn config() -> OverlayConfig {
        OverlayConfig {
            duration_ms: 1000,
            fade_ms: 500,
            ..OverlayConfig::default()
        }
    }

    #[test]
    fn test_show_replaces() {
        let mut display = DisplayManager::new(config());
        display.show(vec![result("a", 0), result("b", 30)]);
        assert_eq!(display.len(), 2);

        display.show(vec![result("c", 60)]);
        let labels = display.labels(Instant::now());
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].text, "[translate]c");
        assert_eq!(labels[0].y, 85);
    }

    #[test]
    fn test_fade_and_expiry() {
        let mut display = DisplayManager::new(config());
        let now = Instant::now();
        display.show_at(vec![result("a", 0)], now);

        assert_eq!(display.labels(now)[0].opacity, 1.0);
        let halfway = display.labels(now + Duration::from_millis(1250))[0].opacity;
        assert!((halfway - 0.5).abs() < 0.01);

        let after = now + Duration::from_millis(1500);
        assert!(display.labels(after).is_empty());
        display.prune_expired(after);
        assert!(display.is_empty());
    }

    #[test]
    fn test_max_items() {
        let mut display = DisplayManager::new(OverlayConfig {
            max_items: 2,
            ..config()
        });
        display.show(vec![result("a", 0), result("b", 0), result("c", 0)]);
        assert_eq!(display.len(), 2);
    }

    #[test]
    fn test_hide_and_show() {
        let mut display = DisplayManager::new(config());
        display.show(vec![result("a", 0)]);

        display.hide_overlay();
        assert!(!display.is_visible());
        assert!(display.labels(Instant::now()).is_empty());
        assert_eq!(display.len(), 1);

        display.show_overlay();
        assert_eq!(display.labels(Instant::now()).len(), 1);
    }

    #[test]
    fn test_handle_messages() {
        let mut display = DisplayManager::new(config());
        assert!(display.handle(WorkerToDisplay::Show(vec![result("a", 0)])));
        assert_eq!(display.len(), 1);
        display.clear();
        assert!(display.is_empty());
        assert!(!display.handle(WorkerToDisplay::Shutdown));
    }

    #[test]
    fn test_run_until_shutdown() {
        let (tx, rx) = unbounded();
        tx.send(WorkerToDisplay::Show(vec![result("Hello", 10)])).unwrap();
        tx.send(WorkerToDisplay::Shutdown).unwrap();

        let mut display = DisplayManager::new(config());
        let mut renderer = CollectingRenderer::default();
        display.run(&rx, &mut renderer);

        let frames = renderer.frames.lock();
        assert_eq!(frames[0].len(), 1);
        assert_eq!(frames[0][0].tooltip.as_deref(), Some("Original: Hello"));
        assert!(frames.last().unwrap().is_empty());
        assert!(display.is_empty());
    }

    #[test]
    fn test_run_ends_when_senders_drop() {
        let (tx, rx) = unbounded::<WorkerToDisplay>();
        drop(tx);

        let mut display = DisplayManager::new(config());
        display.run(&rx, &mut LogRenderer::default());
    }
}
