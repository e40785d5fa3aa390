//! FollowCam Render
//!
//! Everything around the tracking core that touches pixels or processes:
//! - `ffprobe` probing and `ffmpeg` frame decoding
//! - Overlay drawing (motion boxes, viewport outline) and viewport cropping
//! - `ffmpeg` video encoding and JPEG stills

pub mod decode;
pub mod export;
pub mod overlay;
pub mod probe;

pub use decode::{FrameReader, RawFrameStream};
pub use export::{ExportOptions, FrameSink, RunExporter, StillWriter, VideoEncoder};
pub use overlay::{annotate, crop_viewport};
pub use probe::{command_exists, probe_video, VideoInfo};
