//! Screenshot grabbers
//!
//! [`XcapGrabber`] reads a monitor through the `xcap` crate, [`ImageFileGrabber`]
//! replays a still image from disk (useful for trying the pipeline offline).

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use xcap::Monitor;

use super::frame::CapturedFrame;
use super::ScreenGrabber;

/// Live monitor capture via xcap
pub struct XcapGrabber {
    /// Index into `Monitor::all()`, `None` for the primary monitor
    monitor_index: Option<usize>,
}

impl XcapGrabber {
    pub fn new(monitor_index: Option<usize>) -> Self {
        Self { monitor_index }
    }

    fn select_monitor(&self) -> Result<Monitor> {
        let monitors = Monitor::all().context("Failed to enumerate monitors")?;
        if monitors.is_empty() {
            anyhow::bail!("No monitors detected");
        }

        let index = match self.monitor_index {
            Some(index) => index,
            None => monitors
                .iter()
                .position(|m| m.is_primary().unwrap_or(false))
                .unwrap_or(0),
        };

        let count = monitors.len();
        monitors
            .into_iter()
            .nth(index)
            .ok_or_else(|| anyhow::anyhow!("Monitor {} not found ({} available)", index, count))
    }
}

impl ScreenGrabber for XcapGrabber {
    fn grab(&mut self) -> Result<CapturedFrame> {
        let monitor = self.select_monitor()?;
        let x = monitor.x().context("Failed to read monitor position")?;
        let y = monitor.y().context("Failed to read monitor position")?;
        let image = monitor.capture_image().context("Monitor capture failed")?;

        Ok(CapturedFrame::from_image(image).with_origin(x, y))
    }
}

/// Replays the same image file as every frame
pub struct ImageFileGrabber {
    path: PathBuf,
    frame: Option<CapturedFrame>,
}

impl ImageFileGrabber {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: None,
        }
    }
}

impl ScreenGrabber for ImageFileGrabber {
    fn grab(&mut self) -> Result<CapturedFrame> {
        let mut frame = match &self.frame {
            Some(frame) => frame.clone(),
            None => {
                let image = image::open(&self.path)
                    .with_context(|| format!("Failed to open image {:?}", self.path))?
                    .to_rgba8();
                info!(
                    "Loaded replay image {:?} ({}x{})",
                    self.path,
                    image.width(),
                    image.height()
                );
                let frame = CapturedFrame::from_image(image);
                self.frame = Some(frame.clone());
                frame
            }
        };

        frame.timestamp = std::time::Instant::now();
        Ok(frame)
    }
}
