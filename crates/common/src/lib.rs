//! FollowCam Common Utilities
//!
//! Shared infrastructure for all FollowCam crates:
//! - Error types and result aliases
//! - Frame sampling (source fps to target fps decimation)
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod sampling;

pub use config::*;
pub use error::*;
pub use sampling::*;
