//! Viewport clipping: continuous center to a frame-bounded rectangle.

use followcam_common::{FollowcamError, FollowcamResult};
use followcam_model::{FrameSize, Point2D, ViewportRect, ViewportSize};

/// Places a fixed-size viewport around a center, clamped inside the frame.
#[derive(Debug, Clone, Copy)]
pub struct ViewportClipper {
    viewport: ViewportSize,
    frame: FrameSize,
}

impl ViewportClipper {
    /// Requires positive sizes and a viewport no larger than the frame.
    pub fn new(viewport: ViewportSize, frame: FrameSize) -> FollowcamResult<Self> {
        if viewport.width == 0 || viewport.height == 0 {
            return Err(FollowcamError::config(format!(
                "viewport size must be positive, got {viewport}"
            )));
        }
        if frame.width == 0 || frame.height == 0 {
            return Err(FollowcamError::config(format!(
                "frame size must be positive, got {frame}"
            )));
        }
        if !viewport.fits(frame) {
            return Err(FollowcamError::config(format!(
                "viewport {viewport} does not fit in frame {frame}"
            )));
        }
        Ok(Self { viewport, frame })
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    /// Center the viewport on `center`, then clamp it into the frame.
    pub fn clip(&self, center: Point2D) -> ViewportRect {
        let w = self.viewport.width as f64;
        let h = self.viewport.height as f64;
        let max_left = (self.frame.width - self.viewport.width) as f64;
        let max_top = (self.frame.height - self.viewport.height) as f64;

        // NaN collapses to the top-left corner instead of escaping the frame.
        let left = (center.x - w / 2.0).clamp(0.0, max_left);
        let top = (center.y - h / 2.0).clamp(0.0, max_top);
        ViewportRect::new(
            if left.is_nan() { 0.0 } else { left },
            if top.is_nan() { 0.0 } else { top },
            self.viewport,
        )
    }
}
