//! Viewport (virtual camera) types.
//!
//! The viewport has a fixed pixel size for the whole run. Its top-left corner
//! is real-valued; renderers snap it to whole pixels with [`ViewportRect::pixel_rect`].

use serde::{Deserialize, Serialize};

use crate::geometry::{FrameSize, Point2D, Rect};

/// Fixed viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether a viewport of this size can be placed inside the frame at all.
    pub fn fits(&self, frame: FrameSize) -> bool {
        self.width <= frame.width && self.height <= frame.height
    }
}

impl std::fmt::Display for ViewportSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A placed viewport: real-valued top-left corner plus fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportRect {
    pub left: f64,
    pub top: f64,
    pub width: u32,
    pub height: u32,
}

impl ViewportRect {
    pub fn new(left: f64, top: f64, size: ViewportSize) -> Self {
        Self {
            left,
            top,
            width: size.width,
            height: size.height,
        }
    }

    pub fn size(&self) -> ViewportSize {
        ViewportSize::new(self.width, self.height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width as f64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height as f64
    }

    /// The center point of this viewport.
    pub fn center(&self) -> Point2D {
        Point2D::new(
            self.left + self.width as f64 / 2.0,
            self.top + self.height as f64 / 2.0,
        )
    }

    /// Check if a point is within this viewport.
    pub fn contains(&self, point: &Point2D) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// Whether the viewport lies fully inside the frame.
    pub fn is_within(&self, frame: FrameSize) -> bool {
        self.left >= 0.0
            && self.top >= 0.0
            && self.right() <= frame.width as f64
            && self.bottom() <= frame.height as f64
    }

    /// Whole-pixel rectangle for cropping and drawing.
    ///
    /// The corner is rounded and then pulled back so the rectangle never
    /// leaves the frame, even when rounding pushes it one pixel over.
    pub fn pixel_rect(&self, frame: FrameSize) -> Rect {
        let max_left = frame.width.saturating_sub(self.width) as f64;
        let max_top = frame.height.saturating_sub(self.height) as f64;
        let x = self.left.round().clamp(0.0, max_left) as u32;
        let y = self.top.round().clamp(0.0, max_top) as u32;
        Rect::new(
            x,
            y,
            self.width.min(frame.width),
            self.height.min(frame.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_viewport_size_fits() {
        let frame = FrameSize::new(640, 480);
        assert!(ViewportSize::new(640, 480).fits(frame));
        assert!(!ViewportSize::new(720, 480).fits(frame));
        assert!(!ViewportSize::new(100, 481).fits(frame));
    }

    #[test]
    fn test_center_and_edges() {
        let vp = ViewportRect::new(10.0, 20.0, ViewportSize::new(100, 50));
        assert_eq!(vp.center(), Point2D::new(60.0, 45.0));
        assert!((vp.right() - 110.0).abs() < 1e-9);
        assert!((vp.bottom() - 70.0).abs() < 1e-9);
        assert!(vp.contains(&Point2D::new(60.0, 45.0)));
        assert!(!vp.contains(&Point2D::new(5.0, 45.0)));
    }

    #[test]
    fn test_is_within() {
        let frame = FrameSize::new(640, 480);
        assert!(ViewportRect::new(540.0, 380.0, ViewportSize::new(100, 100)).is_within(frame));
        assert!(!ViewportRect::new(540.5, 380.0, ViewportSize::new(100, 100)).is_within(frame));
        assert!(!ViewportRect::new(-0.5, 0.0, ViewportSize::new(100, 100)).is_within(frame));
    }

    #[test]
    fn test_pixel_rect_rounds_and_stays_inside() {
        let frame = FrameSize::new(640, 480);
        let vp = ViewportRect::new(539.6, 12.4, ViewportSize::new(100, 100));
        assert_eq!(vp.pixel_rect(frame), Rect::new(540, 12, 100, 100));

        let vp = ViewportRect::new(0.2, 379.9, ViewportSize::new(100, 100));
        assert_eq!(vp.pixel_rect(frame), Rect::new(0, 380, 100, 100));
        assert!(vp.pixel_rect(frame).fits_within(frame));
    }

    proptest! {
        #[test]
        fn prop_pixel_rect_always_fits(
            left in -100.0f64..800.0,
            top in -100.0f64..600.0,
            w in 1u32..=640,
            h in 1u32..=480,
        ) {
            let frame = FrameSize::new(640, 480);
            let vp = ViewportRect::new(left, top, ViewportSize::new(w, h));
            let rect = vp.pixel_rect(frame);
            prop_assert!(rect.fits_within(frame));
            prop_assert_eq!((rect.width, rect.height), (w, h));
        }
    }
}
