//! Per-frame tracking records and their JSONL encoding.
//!
//! A run writes one [`TrackRecord`] per sampled frame to `track.jsonl`. The
//! first line is a `# `-prefixed [`TrackHeader`] so the file stays
//! self-describing; parsers skip blank and `#` lines.

use serde::{Deserialize, Serialize};

use crate::geometry::{FrameSize, Point2D, Rect};
use crate::viewport::{ViewportRect, ViewportSize};

/// Current schema version of `track.jsonl`.
pub const TRACK_SCHEMA_VERSION: &str = "1.0";

/// The ROI measurement that fed the tracker on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Area-weighted centroid X.
    pub x: f64,
    /// Area-weighted centroid Y.
    pub y: f64,
    /// Total contributing area (always > 0).
    pub weight: f64,
}

impl MeasurementRecord {
    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Everything the core decided for one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Sampled frame index.
    #[serde(rename = "frame")]
    pub frame_index: u64,

    /// Motion rectangles found between this frame and the previous one.
    #[serde(default)]
    pub boxes: Vec<Rect>,

    /// ROI measurement, absent when the tracker coasted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement: Option<MeasurementRecord>,

    /// Filtered viewport center.
    pub center: Point2D,

    /// Filtered velocity (pixels per sampled frame).
    pub velocity: Point2D,

    /// Clipped viewport for this frame.
    pub viewport: ViewportRect,
}

impl TrackRecord {
    /// True when no measurement was available and the filter extrapolated.
    pub fn is_coasting(&self) -> bool {
        self.measurement.is_none()
    }
}

/// Header line of `track.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Processing resolution.
    pub frame_width: u32,
    pub frame_height: u32,

    /// Viewport size used for the run.
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Rate of the sampled frame sequence.
    pub sampled_fps: f64,

    /// Source video path, if the run came from a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl TrackHeader {
    pub fn new(frame: FrameSize, viewport: ViewportSize, sampled_fps: f64) -> Self {
        Self {
            schema_version: TRACK_SCHEMA_VERSION.to_string(),
            frame_width: frame.width,
            frame_height: frame.height,
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            sampled_fps,
            source: None,
        }
    }

    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.frame_width, self.frame_height)
    }

    pub fn viewport_size(&self) -> ViewportSize {
        ViewportSize::new(self.viewport_width, self.viewport_height)
    }
}

/// Parse records from JSONL content (one JSON object per line).
pub fn parse_track(jsonl: &str) -> Result<Vec<TrackRecord>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Extract the `# {...}` header line, if present.
pub fn parse_track_header(jsonl: &str) -> Option<Result<TrackHeader, serde_json::Error>> {
    jsonl
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.strip_prefix('#'))
        .map(|header| serde_json::from_str(header.trim()))
}

/// Serialize a header and records to JSONL format.
pub fn serialize_track(
    header: &TrackHeader,
    records: &[TrackRecord],
) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    output.push_str("# ");
    output.push_str(&serde_json::to_string(header)?);
    output.push('\n');
    for record in records {
        output.push_str(&serde_json::to_string(record)?);
        output.push('\n');
    }
    Ok(output)
}
