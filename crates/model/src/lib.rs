//! FollowCam Model
//!
//! Defines the data contracts shared by the tracking core and the I/O layer:
//! - **Geometry:** pixel rectangles, real-valued points, frame sizes
//! - **Frames:** immutable RGB frames with their sequence index
//! - **Viewport:** the fixed-size virtual camera rectangle
//! - **Track:** per-frame tracking records and their JSONL encoding
//! - **Run:** the `run.json` manifest tying a run's outputs together
//!
//! All coordinates are frame pixels of the resized (processing) resolution.

pub mod frame;
pub mod geometry;
pub mod run;
pub mod track;
pub mod viewport;

pub use frame::*;
pub use geometry::*;
pub use run::*;
pub use track::*;
pub use viewport::*;
