//! Exponential moving average center smoother.
//!
//! A lighter alternative to the Kalman filter with no velocity model: each
//! measurement pulls the center by `factor`, and frames without a measurement
//! hold the previous center. The reported velocity is the last displacement.

use followcam_common::{FollowcamError, FollowcamResult};
use followcam_model::Point2D;
use nalgebra::Matrix4;

use crate::kalman::{Measurement, TrackerState};

/// Default blend factor (weight of the new measurement).
pub const DEFAULT_EMA_FACTOR: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaSmoother {
    factor: f64,
}

impl EmaSmoother {
    /// `factor` must lie in `(0, 1]`; smaller is smoother.
    pub fn new(factor: f64) -> FollowcamResult<Self> {
        if !factor.is_finite() || factor <= 0.0 || factor > 1.0 {
            return Err(FollowcamError::config(format!(
                "EMA factor must be in (0, 1], got {factor}"
            )));
        }
        Ok(Self { factor })
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn initialize(&self, point: Point2D) -> TrackerState {
        TrackerState::new(point, Point2D::ORIGIN, Matrix4::zeros())
    }

    pub fn step(&self, state: TrackerState, measurement: Measurement) -> TrackerState {
        let previous = state.center();
        let center = match measurement {
            Measurement::Present(target) => Point2D::lerp(&previous, &target, self.factor),
            Measurement::Absent => previous,
        };
        TrackerState::new(center, center.delta_from(&previous), *state.covariance())
    }
}

impl Default for EmaSmoother {
    fn default() -> Self {
        Self {
            factor: DEFAULT_EMA_FACTOR,
        }
    }
}
