//! Motion extraction: a pair of consecutive frames to candidate rectangles.
//!
//! [`FrameDiffExtractor`] runs grayscale, Gaussian blur, absolute difference,
//! binary threshold, dilation and 8-connected labelling, then keeps the
//! bounding box of every component with enough pixels.

use followcam_common::{FollowcamError, FollowcamResult, MotionDefaults};
use followcam_model::{Frame, Rect};
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::{connected_components, Connectivity};
use serde::{Deserialize, Serialize};

/// Produces motion rectangles for an ordered pair of same-sized frames.
pub trait MotionExtractor {
    fn extract(&self, previous: &Frame, current: &Frame) -> FollowcamResult<Vec<Rect>>;
}

/// Frame-difference parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// A pixel is moving when its blurred difference exceeds this value.
    pub threshold: u8,
    /// Minimum component size in pixels.
    pub min_area: u32,
    pub blur_sigma: f32,
    /// 3x3 dilation passes.
    pub dilate_iterations: u8,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            threshold: 25,
            min_area: 100,
            blur_sigma: 1.1,
            dilate_iterations: 2,
        }
    }
}

impl From<&MotionDefaults> for MotionConfig {
    fn from(defaults: &MotionDefaults) -> Self {
        Self {
            threshold: defaults.threshold,
            min_area: defaults.min_area,
            blur_sigma: defaults.blur_sigma,
            dilate_iterations: defaults.dilate_iterations,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> FollowcamResult<()> {
        if !self.blur_sigma.is_finite() || self.blur_sigma <= 0.0 {
            return Err(FollowcamError::config(format!(
                "blur_sigma must be finite and > 0, got {}",
                self.blur_sigma
            )));
        }
        Ok(())
    }
}

/// Image-differencing motion extractor.
#[derive(Debug, Clone)]
pub struct FrameDiffExtractor {
    config: MotionConfig,
}

impl FrameDiffExtractor {
    pub fn new(config: MotionConfig) -> FollowcamResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Grayscale and blur one frame.
    pub fn prepare(&self, frame: &Frame) -> GrayImage {
        imageproc::filter::gaussian_blur_f32(&frame.to_gray(), self.config.blur_sigma)
    }

    /// Thresholded, dilated difference of two prepared images.
    pub fn motion_mask(
        &self,
        previous: &GrayImage,
        current: &GrayImage,
    ) -> FollowcamResult<GrayImage> {
        if previous.dimensions() != current.dimensions() {
            return Err(FollowcamError::motion(format!(
                "frame sizes differ: {:?} vs {:?}",
                previous.dimensions(),
                current.dimensions()
            )));
        }

        let (width, height) = current.dimensions();
        let threshold = self.config.threshold;
        let mask = GrayImage::from_fn(width, height, |x, y| {
            let a = previous.get_pixel(x, y).0[0];
            let b = current.get_pixel(x, y).0[0];
            if a.abs_diff(b) > threshold {
                Luma([255])
            } else {
                Luma([0])
            }
        });

        if self.config.dilate_iterations == 0 {
            return Ok(mask);
        }
        // k passes of a 3x3 kernel equal one pass with L-infinity radius k.
        Ok(imageproc::morphology::dilate(
            &mask,
            Norm::LInf,
            self.config.dilate_iterations,
        ))
    }

    /// Bounding boxes of the mask's sufficiently large components.
    pub fn blobs(&self, mask: &GrayImage) -> Vec<Rect> {
        let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

        let mut components: Vec<Option<Component>> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label.0[0] as usize;
            if label == 0 {
                continue;
            }
            if components.len() < label {
                components.resize(label, None);
            }
            match &mut components[label - 1] {
                Some(component) => component.add(x, y),
                slot @ None => *slot = Some(Component::new(x, y)),
            }
        }

        components
            .into_iter()
            .flatten()
            .filter(|c| c.pixels >= self.config.min_area as u64)
            .map(|c| Rect::from_inclusive_bounds(c.min_x, c.min_y, c.max_x, c.max_y))
            .collect()
    }
}

impl MotionExtractor for FrameDiffExtractor {
    fn extract(&self, previous: &Frame, current: &Frame) -> FollowcamResult<Vec<Rect>> {
        if previous.size() != current.size() {
            return Err(FollowcamError::motion(format!(
                "frame {} is {} but frame {} is {}",
                previous.index(),
                previous.size(),
                current.index(),
                current.size()
            )));
        }
        let mask = self.motion_mask(&self.prepare(previous), &self.prepare(current))?;
        let rects = self.blobs(&mask);
        tracing::trace!(frame = current.index(), blobs = rects.len(), "Extracted motion");
        Ok(rects)
    }
}

#[derive(Debug, Clone, Copy)]
struct Component {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    pixels: u64,
}

impl Component {
    fn new(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            pixels: 1,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.pixels += 1;
    }
}
