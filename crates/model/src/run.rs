//! Run manifest and run directory handling.
//!
//! A run directory holds everything one `followcam track` invocation produced:
//!
//! ```text
//! <out>/run.json                 manifest
//! <out>/track.jsonl              per-frame records
//! <out>/motion_detection.mp4     annotated full frames
//! <out>/viewport_tracking.mp4    cropped viewport
//! <out>/frames/frame_###.jpg
//! <out>/viewport/viewport_###.jpg
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::geometry::FrameSize;
use crate::track::{parse_track, parse_track_header, serialize_track, TrackHeader, TrackRecord};
use crate::viewport::ViewportSize;

/// Current schema version of `run.json`.
pub const RUN_SCHEMA_VERSION: &str = "1.0";

pub const MANIFEST_FILE: &str = "run.json";
pub const TRACK_FILE: &str = "track.jsonl";

/// Top-level run file (`run.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version.
    pub version: String,

    /// Human-readable run name (defaults to the source file stem).
    pub name: String,

    /// Run identifier derived from the creation time.
    pub id: String,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// The decoded source.
    pub source: SourceInfo,

    /// How the source was sampled and resized.
    pub sampling: SamplingInfo,

    /// Virtual camera size.
    pub viewport: ViewportSize,

    /// Filter used and its parameters.
    pub tracking: TrackingInfo,

    /// Output files, relative to the run directory.
    #[serde(default)]
    pub outputs: RunOutputs,

    /// Statistics over the produced trajectory.
    #[serde(default)]
    pub summary: RunSummary,
}

/// Source video metadata as probed before decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Decoded frame count when the container reports it.
    #[serde(default)]
    pub frame_count: Option<u64>,
}

/// Sampling and resize parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingInfo {
    pub target_fps: f64,
    /// Every `interval`-th source frame is kept.
    pub interval: u64,
    pub sampled_fps: f64,
    /// Processing resolution after resize.
    pub frame_width: u32,
    pub frame_height: u32,
}

impl SamplingInfo {
    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.frame_width, self.frame_height)
    }
}

/// Filter identity and numeric parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingInfo {
    /// `kalman` or `ema`.
    pub filter: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
}

/// Output paths relative to the run directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutputs {
    #[serde(default)]
    pub annotated_video: Option<String>,
    #[serde(default)]
    pub viewport_video: Option<String>,
    #[serde(default)]
    pub frames_dir: Option<String>,
    #[serde(default)]
    pub viewport_dir: Option<String>,
    #[serde(default)]
    pub track: Option<String>,
}

impl RunOutputs {
    fn entries(&self) -> [(&'static str, &Option<String>); 5] {
        [
            ("Annotated video", &self.annotated_video),
            ("Viewport video", &self.viewport_video),
            ("Frames directory", &self.frames_dir),
            ("Viewport directory", &self.viewport_dir),
            ("Track file", &self.track),
        ]
    }
}

/// Trajectory statistics stored with the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub frames: u64,
    pub measured_frames: u64,
    pub coasted_frames: u64,
    /// Largest per-frame center displacement (pixels).
    pub max_step: f64,
    /// Largest second difference of the center (pixels / frame^2).
    pub max_acceleration: f64,
    /// Mean center displacement per frame (pixels).
    pub mean_speed: f64,
}

impl RunManifest {
    /// Create a manifest stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        source: SourceInfo,
        sampling: SamplingInfo,
        viewport: ViewportSize,
        tracking: TrackingInfo,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            version: RUN_SCHEMA_VERSION.to_string(),
            name: name.into(),
            id: format!("run-{}", now.format("%Y%m%dT%H%M%S%3f")),
            created_at: now.to_rfc3339(),
            source,
            sampling,
            viewport,
            tracking,
            outputs: RunOutputs::default(),
            summary: RunSummary::default(),
        }
    }

    /// Header for the run's `track.jsonl`.
    pub fn track_header(&self) -> TrackHeader {
        let mut header = TrackHeader::new(
            self.sampling.frame_size(),
            self.viewport,
            self.sampling.sampled_fps,
        );
        header.source = Some(self.source.path.clone());
        header
    }
}

/// The complete in-memory representation of a run directory.
#[derive(Debug, Clone)]
pub struct LoadedRun {
    /// Filesystem path to the run directory.
    pub root: PathBuf,

    /// Run metadata.
    pub manifest: RunManifest,

    /// Per-frame records.
    pub records: Vec<TrackRecord>,
}

impl LoadedRun {
    pub fn new(root: impl AsRef<Path>, manifest: RunManifest, records: Vec<TrackRecord>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            manifest,
            records,
        }
    }

    /// Load a run from a directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, RunError> {
        let root = root.as_ref().to_path_buf();
        let manifest_path = root.join(MANIFEST_FILE);

        let manifest_json =
            std::fs::read_to_string(&manifest_path).map_err(|e| RunError::IoError {
                path: manifest_path.clone(),
                source: e,
            })?;
        let manifest: RunManifest =
            serde_json::from_str(&manifest_json).map_err(|e| RunError::ParseError {
                path: manifest_path,
                source: e,
            })?;

        let track_path = root.join(
            manifest
                .outputs
                .track
                .clone()
                .unwrap_or_else(|| TRACK_FILE.to_string()),
        );
        let records = if track_path.exists() {
            let content = std::fs::read_to_string(&track_path).map_err(|e| RunError::IoError {
                path: track_path.clone(),
                source: e,
            })?;
            if let Some(header) = parse_track_header(&content) {
                let header = header.map_err(|e| RunError::ParseError {
                    path: track_path.clone(),
                    source: e,
                })?;
                if header.frame_size() != manifest.sampling.frame_size() {
                    return Err(RunError::ValidationError {
                        message: format!(
                            "track header frame size {} does not match manifest {}",
                            header.frame_size(),
                            manifest.sampling.frame_size()
                        ),
                    });
                }
            }
            parse_track(&content).map_err(|e| RunError::ParseError {
                path: track_path,
                source: e,
            })?
        } else {
            Vec::new()
        };

        Ok(Self {
            root,
            manifest,
            records,
        })
    }

    /// Write `run.json` and `track.jsonl`.
    pub fn save(&mut self) -> Result<(), RunError> {
        std::fs::create_dir_all(&self.root).map_err(|e| RunError::IoError {
            path: self.root.clone(),
            source: e,
        })?;

        self.save_track()?;

        let manifest_path = self.root.join(MANIFEST_FILE);
        let manifest_json =
            serde_json::to_string_pretty(&self.manifest).map_err(|e| RunError::ParseError {
                path: manifest_path.clone(),
                source: e,
            })?;
        std::fs::write(&manifest_path, manifest_json).map_err(|e| RunError::IoError {
            path: manifest_path,
            source: e,
        })?;

        Ok(())
    }

    /// Write only `track.jsonl` and record it in the manifest outputs.
    pub fn save_track(&mut self) -> Result<PathBuf, RunError> {
        let track_path = self.root.join(TRACK_FILE);
        let jsonl = serialize_track(&self.manifest.track_header(), &self.records).map_err(|e| {
            RunError::ParseError {
                path: track_path.clone(),
                source: e,
            }
        })?;
        std::fs::write(&track_path, jsonl).map_err(|e| RunError::IoError {
            path: track_path.clone(),
            source: e,
        })?;
        self.manifest.outputs.track = Some(TRACK_FILE.to_string());
        Ok(track_path)
    }

    /// Validate that all referenced outputs exist and the record count matches.
    pub fn validate_outputs(&self) -> Vec<String> {
        let mut errors = vec![];

        for (label, entry) in self.manifest.outputs.entries() {
            if let Some(relative) = entry {
                if !self.root.join(relative).exists() {
                    errors.push(format!("{label} missing: {relative}"));
                }
            }
        }

        if self.records.len() as u64 != self.manifest.summary.frames {
            errors.push(format!(
                "Track has {} record(s) but summary reports {} frame(s)",
                self.records.len(),
                self.manifest.summary.frames
            ));
        }

        errors
    }
}

/// Errors that can occur when working with run directories.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid run: {message}")]
    ValidationError { message: String },
}
