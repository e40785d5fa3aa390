//! FollowCam Tracking
//!
//! The tracking core. Given frames (or precomputed rectangles) it decides
//! where the virtual camera looks:
//!
//! 1. **Motion**: frame pair to motion rectangles
//! 2. **ROI**: rectangles to one area-weighted centroid, or no measurement
//! 3. **Kalman**: constant-velocity filter over the centroid
//! 4. **Clipper**: filtered center to a frame-bounded viewport
//!
//! The pipeline driver runs these strictly in order per sampled frame. This
//! crate performs no process or file I/O.

pub mod clipper;
pub mod ema;
pub mod filter;
pub mod kalman;
pub mod motion;
pub mod pipeline;
pub mod roi;
pub mod stats;

pub use clipper::ViewportClipper;
pub use ema::EmaSmoother;
pub use filter::{CenterFilter, FilterKind};
pub use kalman::{KalmanConfig, KalmanTracker, Measurement, TrackerState};
pub use motion::{FrameDiffExtractor, MotionConfig, MotionExtractor};
pub use pipeline::{track_rectangles, PipelineRun, TrackingPipeline, ViewportTracker};
pub use roi::{estimate_roi, RoiEstimate};
pub use stats::TrajectoryStats;
