//! Application Coordinator
//!
//! Runs the frame processor on a background thread and the display loop on
//! the calling thread, connected by a one-way channel.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::capture::FrameSource;
use crate::config::AppConfig;
use crate::overlay::{DisplayManager, OverlayConfig, OverlayRenderer};
use crate::pipeline::{FrameProcessor, TickOutcome};
use crate::shared::{FrameStats, SharedStats, WorkerToDisplay};
use crate::translation::{self, TranslatorManager};
use crate::vision::{platform_engine, TextRecognizer};

/// Pause after every tick
const TICK_DELAY: Duration = Duration::from_millis(50);
/// Extra pause when no frame was available
const IDLE_DELAY: Duration = Duration::from_millis(100);
/// Longest wait for the worker on shutdown
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Requests an orderly stop from any thread
#[derive(Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    display: Sender<WorkerToDisplay>,
}

impl StopHandle {
    /// Stop the worker loop and end the display loop
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
        let _ = self.display.send(WorkerToDisplay::Shutdown);
    }
}

/// Screen translator: capture, OCR, translation and display
pub struct ScreenTranslator {
    processor: Arc<Mutex<FrameProcessor>>,
    stats: SharedStats,
    translator: Arc<TranslatorManager>,
    running: Arc<AtomicBool>,
    to_display: Sender<WorkerToDisplay>,
    from_worker: Receiver<WorkerToDisplay>,
    display: DisplayManager,
    worker: Option<(JoinHandle<()>, Receiver<()>)>,
}

impl ScreenTranslator {
    /// Wire up all components from the configuration
    pub fn from_config(config: &AppConfig, capture: Box<dyn FrameSource>) -> Self {
        let language = config.ocr.language.clone();
        let recognizer = TextRecognizer::initialize(
            move || platform_engine(&language),
            config.recognition_thresholds(),
        );
        let translator = Arc::new(translation::build_manager(&config.translation));

        let (to_display, from_worker) = unbounded();
        let processor = FrameProcessor::new(
            capture,
            recognizer,
            translator,
            to_display.clone(),
            config.processor_settings(),
        );

        let translator = Self::new(processor, to_display, from_worker, config.display.clone());
        info!("Screen translator initialized");
        translator
    }

    /// Assemble from parts; `to_display` must feed `from_worker`
    pub fn new(
        processor: FrameProcessor,
        to_display: Sender<WorkerToDisplay>,
        from_worker: Receiver<WorkerToDisplay>,
        display: OverlayConfig,
    ) -> Self {
        Self {
            stats: processor.stats(),
            translator: processor.translator().clone(),
            processor: Arc::new(Mutex::new(processor)),
            running: Arc::new(AtomicBool::new(false)),
            to_display,
            from_worker,
            display: DisplayManager::new(display),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
            display: self.to_display.clone(),
        }
    }

    pub fn stats(&self) -> FrameStats {
        *self.stats.read()
    }

    pub fn display(&mut self) -> &mut DisplayManager {
        &mut self.display
    }

    pub fn set_capture_interval(&self, interval: Duration) {
        self.processor.lock().set_capture_interval(interval);
    }

    pub fn set_min_text_length(&self, length: usize) {
        self.processor.lock().set_min_text_length(length);
    }

    /// Start capturing and spawn the translation loop
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() || self.worker.is_some() {
            info!("Translator is already running");
            return Ok(());
        }

        info!("Starting real-time screen translation...");
        self.processor.lock().start();
        self.running.store(true, Ordering::Release);

        let processor = self.processor.clone();
        let running = self.running.clone();
        let (done_tx, done_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name("translation-loop".to_string())
            .spawn(move || {
                translation_loop(&processor, &running);
                let _ = done_tx.send(());
            })
            .context("Failed to spawn translation thread")?;

        self.worker = Some((handle, done_rx));
        info!("Real-time translation started");
        Ok(())
    }

    /// Run the display loop until a stop is requested
    pub fn run_display(&mut self, renderer: &mut dyn OverlayRenderer) {
        self.display.run(&self.from_worker, renderer);
    }

    /// Start the worker and block in the display loop
    pub fn run(&mut self, renderer: &mut dyn OverlayRenderer) -> Result<()> {
        self.start()?;
        info!("Press Ctrl+C to stop translation");
        self.run_display(renderer);
        Ok(())
    }

    /// Process a single frame on the calling thread and render the result
    pub fn run_once(&mut self, renderer: &mut dyn OverlayRenderer) -> TickOutcome {
        let outcome = {
            let mut processor = self.processor.lock();
            processor.start();
            let outcome = processor.tick();
            processor.shutdown();
            outcome
        };

        while let Ok(message) = self.from_worker.try_recv() {
            self.display.handle(message);
        }
        renderer.render(&self.display.labels(Instant::now()));
        outcome
    }

    /// Stop the worker, waiting at most [`JOIN_TIMEOUT`], and clear the display
    pub fn stop(&mut self) {
        let Some((handle, done)) = self.worker.take() else {
            self.running.store(false, Ordering::Release);
            return;
        };

        info!("Stopping real-time translation...");
        self.running.store(false, Ordering::Release);

        match done.recv_timeout(JOIN_TIMEOUT) {
            Ok(()) => {
                if handle.join().is_err() {
                    warn!("Translation thread panicked");
                }
            }
            Err(_) => warn!("Translation thread did not stop within {:?}", JOIN_TIMEOUT),
        }

        self.display.clear();
        info!("Real-time translation stopped");
    }

    pub fn print_stats(&self) {
        info!("\n{}", self.stats().report());
        info!("Cached translations: {}", self.translator.cache_len());
    }
}

fn translation_loop(processor: &Mutex<FrameProcessor>, running: &AtomicBool) {
    info!("Translation loop started");

    while running.load(Ordering::Acquire) {
        let outcome = processor.lock().tick();
        let delay = match outcome {
            TickOutcome::NoFrame | TickOutcome::Failed => IDLE_DELAY + TICK_DELAY,
            TickOutcome::Empty | TickOutcome::Translated(_) => TICK_DELAY,
        };
        thread::sleep(delay);
    }

    processor.lock().shutdown();
    info!("Translation loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::tests::CollectingRenderer;
    use crate::pipeline::tests::{crashing_processor_on, processor_on};
    use crate::vision::TextRegion;

    fn app(frames: usize) -> ScreenTranslator {
        let (tx, rx) = unbounded();
        let regions = vec![TextRegion::from_rect("Hello", 10, 10, 20, 20, 0.9)];
        let processor = processor_on(regions, frames, tx.clone());
        ScreenTranslator::new(processor, tx, rx, OverlayConfig::default())
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_start_and_stop() {
        let mut app = app(1);
        app.start().unwrap();
        assert!(app.is_running());

        assert!(wait_for(|| app.stats().total_translations == 1));
        app.stop();
        assert!(!app.is_running());

        match app.from_worker.try_recv().unwrap() {
            WorkerToDisplay::Show(results) => assert_eq!(results[0].translated, "[translate]Hello"),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_loop_keeps_ticking_after_failures() {
        let (tx, rx) = unbounded();
        let processor = crashing_processor_on(3, tx.clone());
        let mut app = ScreenTranslator::new(processor, tx, rx, OverlayConfig::default());

        app.start().unwrap();
        assert!(wait_for(|| app.stats().total_captures == 3));
        assert!(app.is_running());
        app.stop();

        assert_eq!(app.stats().total_translations, 0);
        assert!(app.from_worker.try_recv().is_err());
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut app = app(0);
        app.start().unwrap();
        app.start().unwrap();
        app.stop();
        app.stop();
    }

    #[test]
    fn test_stop_handle_ends_display_loop() {
        let mut app = app(1);
        let handle = app.stop_handle();
        let mut renderer = CollectingRenderer::default();

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            handle.request_stop();
        });

        app.run(&mut renderer).unwrap();
        stopper.join().unwrap();
        assert!(!app.is_running());
        app.stop();

        assert_eq!(app.stats().total_captures, 1);
        assert!(app.display().is_empty());
    }

    #[test]
    fn test_run_once_renders() {
        let mut app = app(1);
        let mut renderer = CollectingRenderer::default();

        assert_eq!(app.run_once(&mut renderer), TickOutcome::Translated(1));

        let frames = renderer.frames.lock();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0].text, "[translate]Hello");
        assert_eq!((frames[0][0].x, frames[0][0].y), (10, 35));
    }

    #[test]
    fn test_setters_reach_processor() {
        let app = app(0);
        app.set_min_text_length(9);
        app.set_capture_interval(Duration::from_millis(10));
        assert_eq!(app.processor.lock().settings().min_text_length, 9);
    }
}
