//! Decoded video frames.

use image::{GrayImage, RgbImage};

use crate::geometry::FrameSize;

/// One sampled frame: its position in the sampled sequence plus RGB pixels.
///
/// Frames are immutable once produced; consumers borrow the pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    index: u64,
    image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    /// Build a frame from a packed `rgb24` buffer.
    ///
    /// Returns `None` when the buffer length does not match `size`.
    pub fn from_rgb24(index: u64, size: FrameSize, bytes: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(size.width, size.height, bytes).map(|image| Self { index, image })
    }

    /// Sequence position among sampled frames (0-based).
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.image.width(), self.image.height())
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Luma conversion used by motion extraction.
    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
