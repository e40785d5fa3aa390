//! Frame sampling utilities.
//!
//! A run never processes every decoded frame. The source stream is decimated
//! to roughly the target rate by keeping every `interval`-th frame, where
//! `interval = max(1, floor(source_fps / target_fps))`.

use crate::error::{FollowcamError, FollowcamResult};

/// Decimation plan from a source frame rate to a target sampling rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSampler {
    source_fps: f64,
    interval: u64,
}

impl FrameSampler {
    /// Build a sampler for the given source and target rates.
    pub fn new(source_fps: f64, target_fps: f64) -> FollowcamResult<Self> {
        if !source_fps.is_finite() || source_fps <= 0.0 {
            return Err(FollowcamError::config(format!(
                "source fps must be positive, got {source_fps}"
            )));
        }
        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(FollowcamError::config(format!(
                "target fps must be positive, got {target_fps}"
            )));
        }

        let interval = ((source_fps / target_fps).floor() as u64).max(1);
        Ok(Self {
            source_fps,
            interval,
        })
    }

    /// Keep every `interval`-th source frame.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Whether the source frame with this zero-based number is sampled.
    pub fn keeps(&self, source_frame: u64) -> bool {
        source_frame % self.interval == 0
    }

    /// Effective rate of the sampled sequence.
    pub fn sampled_fps(&self) -> f64 {
        self.source_fps / self.interval as f64
    }

    /// Number of sampled frames produced from `source_frames` decoded frames.
    pub fn sampled_count(&self, source_frames: u64) -> u64 {
        source_frames.div_ceil(self.interval)
    }

    /// Source frame number of the n-th sampled frame.
    pub fn source_frame_of(&self, sampled_index: u64) -> u64 {
        sampled_index * self.interval
    }
}
