//! Text regions returned by OCR and their geometry

/// Axis-aligned rectangle in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Detected text area
#[derive(Debug, Clone, PartialEq)]
pub struct TextRegion {
    /// Recognized text
    pub text: String,
    /// Bounding polygon points, in order
    pub polygon: Vec<(i32, i32)>,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl TextRegion {
    /// Create a region; confidence is clamped into [0, 1]
    pub fn new(text: impl Into<String>, polygon: Vec<(i32, i32)>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            text: text.into(),
            polygon,
            confidence,
        }
    }

    /// Create a region whose polygon is the four corners of a rectangle
    pub fn from_rect(
        text: impl Into<String>,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        confidence: f32,
    ) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let polygon = vec![
            (x, y),
            (x + width, y),
            (x + width, y + height),
            (x, y + height),
        ];
        Self::new(text, polygon, confidence)
    }

    /// Bounding rectangle over all polygon points.
    ///
    /// An empty polygon yields a zero rectangle.
    pub fn bounding_rect(&self) -> Rect {
        let mut points = self.polygon.iter();
        let Some(&(first_x, first_y)) = points.next() else {
            return Rect::default();
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first_x, first_y, first_x, first_y);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    /// Mean of the polygon points
    pub fn center(&self) -> (i32, i32) {
        if self.polygon.is_empty() {
            return (0, 0);
        }

        let count = self.polygon.len() as i64;
        let sum_x: i64 = self.polygon.iter().map(|p| p.0 as i64).sum();
        let sum_y: i64 = self.polygon.iter().map(|p| p.1 as i64).sum();
        ((sum_x / count) as i32, (sum_y / count) as i32)
    }

    pub fn width(&self) -> i32 {
        self.bounding_rect().width
    }

    pub fn height(&self) -> i32 {
        self.bounding_rect().height
    }

    /// Shift every point by the given offset
    pub fn translate(&mut self, dx: i32, dy: i32) {
        for point in &mut self.polygon {
            point.0 += dx;
            point.1 += dy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_rect_of_skewed_polygon() {
        let region = TextRegion::new("Hi", vec![(12, 10), (40, 8), (42, 30), (10, 33)], 0.8);
        assert_eq!(
            region.bounding_rect(),
            Rect {
                x: 10,
                y: 8,
                width: 32,
                height: 25
            }
        );
        assert_eq!(region.width(), 32);
        assert_eq!(region.height(), 25);
    }

    #[test]
    fn test_center() {
        let region = TextRegion::from_rect("Hi", 10, 10, 20, 20, 0.9);
        assert_eq!(region.center(), (20, 20));
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(TextRegion::from_rect("a", 0, 0, 1, 1, 1.7).confidence, 1.0);
        assert_eq!(TextRegion::from_rect("a", 0, 0, 1, 1, -0.2).confidence, 0.0);
        assert_eq!(TextRegion::from_rect("a", 0, 0, 1, 1, f32::NAN).confidence, 0.0);
    }

    #[test]
    fn test_empty_polygon_has_zero_size() {
        let region = TextRegion::new("x", vec![], 0.5);
        assert_eq!(region.bounding_rect(), Rect::default());
        assert_eq!(region.center(), (0, 0));
    }

    #[test]
    fn test_translate_moves_rect() {
        let mut region = TextRegion::from_rect("Hi", 10, 10, 20, 20, 0.9);
        region.translate(100, -5);
        let rect = region.bounding_rect();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (110, 5, 20, 20));
    }
}
