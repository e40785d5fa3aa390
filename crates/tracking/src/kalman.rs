//! Constant-velocity Kalman filter for the viewport center.
//!
//! State vector: `[x, y, dx, dy]ᵀ` with Δt = 1 sampled frame. Only position is
//! observed. The filter itself is stateless: every operation takes a
//! [`TrackerState`] by value and returns the next one, so the pipeline owns
//! the single copy.
//!
//! ```text
//!     | 1 0 1 0 |        | 1 0 0 0 |
//! F = | 0 1 0 1 |    H = | 0 1 0 0 |
//!     | 0 0 1 0 |
//!     | 0 0 0 1 |
//! ```

use followcam_common::{FollowcamError, FollowcamResult, TrackingDefaults};
use followcam_model::Point2D;
use nalgebra::{Matrix2, Matrix2x4, Matrix4, Matrix4x2, Vector2, Vector4};
use serde::{Deserialize, Serialize};

/// Noise and initial-uncertainty tuning.
///
/// Every field is a diagonal entry of the corresponding matrix and must be
/// finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    /// Initial variance of x and y.
    pub initial_position_variance: f64,
    /// Initial variance of dx and dy.
    pub initial_velocity_variance: f64,
    /// Q entries for x and y.
    pub process_noise_position: f64,
    /// Q entries for dx and dy.
    pub process_noise_velocity: f64,
    /// R entries for the observed x and y.
    pub measurement_noise: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            initial_position_variance: 100.0,
            initial_velocity_variance: 10.0,
            process_noise_position: 0.01,
            process_noise_velocity: 0.05,
            measurement_noise: 500.0,
        }
    }
}

impl From<&TrackingDefaults> for KalmanConfig {
    fn from(defaults: &TrackingDefaults) -> Self {
        Self {
            initial_position_variance: defaults.initial_position_variance,
            initial_velocity_variance: defaults.initial_velocity_variance,
            process_noise_position: defaults.process_noise_position,
            process_noise_velocity: defaults.process_noise_velocity,
            measurement_noise: defaults.measurement_noise,
        }
    }
}

impl KalmanConfig {
    /// Check that every entry is finite and strictly positive.
    pub fn validate(&self) -> FollowcamResult<()> {
        let fields = [
            ("initial_position_variance", self.initial_position_variance),
            ("initial_velocity_variance", self.initial_velocity_variance),
            ("process_noise_position", self.process_noise_position),
            ("process_noise_velocity", self.process_noise_velocity),
            ("measurement_noise", self.measurement_noise),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(FollowcamError::config(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// One frame's measurement input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Present(Point2D),
    Absent,
}

impl From<Option<Point2D>> for Measurement {
    fn from(point: Option<Point2D>) -> Self {
        match point {
            Some(p) => Measurement::Present(p),
            None => Measurement::Absent,
        }
    }
}

/// Filter state: estimate plus covariance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerState {
    estimate: Vector4<f64>,
    covariance: Matrix4<f64>,
}

impl TrackerState {
    /// Build a state from explicit parts.
    pub fn new(center: Point2D, velocity: Point2D, covariance: Matrix4<f64>) -> Self {
        Self {
            estimate: Vector4::new(center.x, center.y, velocity.x, velocity.y),
            covariance,
        }
    }

    /// Current position estimate.
    pub fn center(&self) -> Point2D {
        Point2D::new(self.estimate[0], self.estimate[1])
    }

    /// Current velocity estimate (pixels per sampled frame).
    pub fn velocity(&self) -> Point2D {
        Point2D::new(self.estimate[2], self.estimate[3])
    }

    pub fn covariance(&self) -> &Matrix4<f64> {
        &self.covariance
    }

    fn is_finite(&self) -> bool {
        self.estimate.iter().all(|v| v.is_finite())
            && self.covariance.iter().all(|v| v.is_finite())
    }
}

/// The filter model: fixed matrices built from a validated config.
#[derive(Debug, Clone)]
pub struct KalmanTracker {
    config: KalmanConfig,
    transition: Matrix4<f64>,
    observation: Matrix2x4<f64>,
    process_noise: Matrix4<f64>,
    measurement_noise: Matrix2<f64>,
}

impl KalmanTracker {
    /// Build the model. Fails with a configuration error on invalid tuning.
    pub fn new(config: KalmanConfig) -> FollowcamResult<Self> {
        config.validate()?;

        #[rustfmt::skip]
        let transition = Matrix4::new(
            1.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        #[rustfmt::skip]
        let observation = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        );
        let process_noise = Matrix4::from_diagonal(&Vector4::new(
            config.process_noise_position,
            config.process_noise_position,
            config.process_noise_velocity,
            config.process_noise_velocity,
        ));
        let measurement_noise = Matrix2::identity() * config.measurement_noise;

        Ok(Self {
            config,
            transition,
            observation,
            process_noise,
            measurement_noise,
        })
    }

    pub fn config(&self) -> &KalmanConfig {
        &self.config
    }

    fn initial_covariance(&self) -> Matrix4<f64> {
        Matrix4::from_diagonal(&Vector4::new(
            self.config.initial_position_variance,
            self.config.initial_position_variance,
            self.config.initial_velocity_variance,
            self.config.initial_velocity_variance,
        ))
    }

    /// Start tracking at `point` with zero velocity.
    pub fn initialize(&self, point: Point2D) -> TrackerState {
        self.initialize_with_velocity(point, Point2D::ORIGIN)
    }

    /// Start tracking at `point` with a known velocity.
    pub fn initialize_with_velocity(&self, point: Point2D, velocity: Point2D) -> TrackerState {
        TrackerState::new(point, velocity, self.initial_covariance())
    }

    /// Time update: `s = F s`, `P = F P Fᵀ + Q`.
    pub fn predict(&self, state: TrackerState) -> TrackerState {
        let f = self.transition;
        TrackerState {
            estimate: f * state.estimate,
            covariance: f * state.covariance * f.transpose() + self.process_noise,
        }
    }

    /// Measurement update against observed position `z`.
    pub fn correct(&self, state: TrackerState, z: Point2D) -> FollowcamResult<TrackerState> {
        let h = self.observation;
        let p = state.covariance;

        let innovation = Vector2::new(z.x, z.y) - h * state.estimate;
        let s = h * p * h.transpose() + self.measurement_noise;
        if !s.iter().all(|v| v.is_finite()) {
            return Err(FollowcamError::numerical(
                "innovation covariance is not finite",
            ));
        }
        let s_inv = s.try_inverse().ok_or_else(|| {
            FollowcamError::numerical(format!(
                "innovation covariance is singular (det = {})",
                s.determinant()
            ))
        })?;

        let gain: Matrix4x2<f64> = p * h.transpose() * s_inv;
        let next = TrackerState {
            estimate: state.estimate + gain * innovation,
            covariance: (Matrix4::identity() - gain * h) * p,
        };
        if !next.is_finite() {
            return Err(FollowcamError::numerical(format!(
                "state became non-finite after correcting toward ({}, {})",
                z.x, z.y
            )));
        }
        Ok(next)
    }

    /// One frame: predict, then correct when a measurement exists.
    pub fn step(
        &self,
        state: TrackerState,
        measurement: Measurement,
    ) -> FollowcamResult<TrackerState> {
        let predicted = self.predict(state);
        match measurement {
            Measurement::Present(z) => self.correct(predicted, z),
            Measurement::Absent => {
                if !predicted.is_finite() {
                    return Err(FollowcamError::numerical(
                        "state became non-finite while coasting",
                    ));
                }
                Ok(predicted)
            }
        }
    }
}
