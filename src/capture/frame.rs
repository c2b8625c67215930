//! Frame data structures for captured screen content

use std::time::Instant;

/// A captured frame from the screen
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Screen position of the top-left pixel
    pub origin: (i32, i32),
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl CapturedFrame {
    /// Create a new captured frame located at the screen origin
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            origin: (0, 0),
            timestamp: Instant::now(),
        }
    }

    /// Create a frame from a decoded RGBA image
    pub fn from_image(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    /// Place the frame at a screen position
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin = (x, y);
        self
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Cut a sub-rectangle out of the frame.
    ///
    /// The rectangle is clamped to the frame bounds. The returned frame keeps
    /// screen-absolute coordinates through its `origin`. Returns `None` when
    /// the clamped rectangle is empty.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Option<CapturedFrame> {
        let x = x.min(self.width);
        let y = y.min(self.height);
        let width = width.min(self.width - x);
        let height = height.min(self.height - y);

        if width == 0 || height == 0 {
            return None;
        }

        let mut region = Vec::with_capacity((width * height * 4) as usize);
        for row in y..(y + height) {
            let start = ((row * self.width + x) * 4) as usize;
            let end = start + (width * 4) as usize;
            if end <= self.data.len() {
                region.extend_from_slice(&self.data[start..end]);
            }
        }

        Some(CapturedFrame {
            data: region,
            width,
            height,
            origin: (self.origin.0 + x as i32, self.origin.1 + y as i32),
            timestamp: self.timestamp,
        })
    }
}
