//! Trajectory statistics over a run's records.

use followcam_model::{RunSummary, TrackRecord};

/// Motion characteristics of the filtered center path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrajectoryStats {
    pub frames: u64,
    pub measured_frames: u64,
    pub coasted_frames: u64,
    /// Largest per-frame displacement of the center.
    pub max_step: f64,
    /// Largest norm of the center's second difference.
    pub max_acceleration: f64,
    /// Mean per-frame displacement.
    pub mean_speed: f64,
}

impl TrajectoryStats {
    pub fn from_records(records: &[TrackRecord]) -> Self {
        let measured = records.iter().filter(|r| !r.is_coasting()).count() as u64;
        let frames = records.len() as u64;

        let steps: Vec<_> = records
            .windows(2)
            .map(|w| w[1].center.delta_from(&w[0].center))
            .collect();
        let max_step = steps.iter().map(|s| s.norm()).fold(0.0, f64::max);
        let mean_speed = if steps.is_empty() {
            0.0
        } else {
            steps.iter().map(|s| s.norm()).sum::<f64>() / steps.len() as f64
        };
        let max_acceleration = steps
            .windows(2)
            .map(|w| w[1].delta_from(&w[0]).norm())
            .fold(0.0, f64::max);

        Self {
            frames,
            measured_frames: measured,
            coasted_frames: frames - measured,
            max_step,
            max_acceleration,
            mean_speed,
        }
    }

    pub fn to_summary(&self) -> RunSummary {
        RunSummary {
            frames: self.frames,
            measured_frames: self.measured_frames,
            coasted_frames: self.coasted_frames,
            max_step: self.max_step,
            max_acceleration: self.max_acceleration,
            mean_speed: self.mean_speed,
        }
    }
}
