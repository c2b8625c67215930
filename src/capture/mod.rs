//! Screen Capture Layer
//!
//! Produces raster frames for the translation pipeline. The actual pixel
//! grabbing is delegated to a [`ScreenGrabber`]; [`ContinuousCapture`] adds
//! the start/stop state, the capture interval and the optional capture region.

pub mod frame;
pub mod screen;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub use frame::CapturedFrame;
pub use screen::{ImageFileGrabber, XcapGrabber};

/// Something that can take a screenshot on demand
pub trait ScreenGrabber: Send {
    /// Grab the current screen contents
    fn grab(&mut self) -> Result<CapturedFrame>;
}

/// Source of frames polled by the frame processor
pub trait FrameSource: Send {
    /// Begin producing frames
    fn start(&mut self);

    /// Stop producing frames
    fn stop(&mut self);

    /// Latest frame, or `None` when stopped, when the capture interval has
    /// not elapsed yet, or when grabbing failed. Never blocks on the interval.
    fn latest_frame(&mut self) -> Option<CapturedFrame>;

    /// Change the minimum time between two frames
    fn set_interval(&mut self, interval: Duration);
}

/// Screen rectangle restricting what gets captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Screen capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Minimum time between two captured frames
    pub interval: Duration,
    /// Optional region of the screen to capture
    pub region: Option<CaptureRegion>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            region: None,
        }
    }
}

/// Rate-limited capture driver
pub struct ContinuousCapture {
    grabber: Box<dyn ScreenGrabber>,
    config: CaptureConfig,
    is_running: bool,
    last_capture: Option<Instant>,
}

impl ContinuousCapture {
    /// Create a new capture driver around a grabber
    pub fn new(grabber: Box<dyn ScreenGrabber>, config: CaptureConfig) -> Self {
        Self {
            grabber,
            config,
            is_running: false,
            last_capture: None,
        }
    }

    /// Whether the capture driver is started
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Current capture interval
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Restrict capture to a screen region
    pub fn set_region(&mut self, region: Option<CaptureRegion>) {
        self.config.region = region;
    }

    /// Returns true and arms the timer if the interval has elapsed
    fn should_capture(&mut self) -> bool {
        let now = Instant::now();
        let due = self
            .last_capture
            .map(|last| now.duration_since(last) >= self.config.interval)
            .unwrap_or(true);

        if due {
            self.last_capture = Some(now);
        }
        due
    }
}

impl FrameSource for ContinuousCapture {
    fn start(&mut self) {
        self.is_running = true;
    }

    fn stop(&mut self) {
        self.is_running = false;
    }

    fn latest_frame(&mut self) -> Option<CapturedFrame> {
        if !self.is_running || !self.should_capture() {
            return None;
        }

        let frame = match self.grabber.grab() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Screenshot failed: {:#}", e);
                return None;
            }
        };

        let frame = match self.config.region {
            Some(region) => frame.crop(region.x, region.y, region.width, region.height)?,
            None => frame,
        };

        debug!("Captured {}x{} frame", frame.width, frame.height);
        Some(frame)
    }

    fn set_interval(&mut self, interval: Duration) {
        self.config.interval = interval;
    }
}
