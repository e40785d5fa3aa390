//! Source video probing through `ffprobe`.

use std::path::Path;
use std::process::Command;

use followcam_common::{FollowcamError, FollowcamResult};
use serde::Serialize;

/// Stream metadata needed to plan a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Average frame rate of the first video stream.
    pub fps: f64,
    /// Container-reported frame count, when known.
    pub frame_count: Option<u64>,
    pub duration_secs: Option<f64>,
}

/// Probe the first video stream of `path`.
pub fn probe_video(path: &Path) -> FollowcamResult<VideoInfo> {
    if !path.exists() {
        return Err(FollowcamError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames,duration",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .output()
        .map_err(|e| FollowcamError::decode(format!("Failed to start ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(FollowcamError::decode(format!(
            "ffprobe failed on {} (status {}): {}",
            path.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&raw).ok_or_else(|| {
        FollowcamError::decode(format!("No usable video stream in {}", path.display()))
    })?;
    tracing::debug!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        fps = info.fps,
        frames = ?info.frame_count,
        "Probed video"
    );
    Ok(info)
}

/// Parse `key=value` lines from `ffprobe -of default=noprint_wrappers=1`.
pub fn parse_probe_output(raw: &str) -> Option<VideoInfo> {
    let mut state = ProbeState::default();
    for line in raw.lines() {
        if let Some((key, value)) = line.trim().split_once('=') {
            state.update(key, value);
        }
    }

    let width = state.width.filter(|w| *w > 0)?;
    let height = state.height.filter(|h| *h > 0)?;
    let fps = state.avg_frame_rate.or(state.r_frame_rate)?;
    Some(VideoInfo {
        width,
        height,
        fps,
        frame_count: state.nb_frames,
        duration_secs: state.duration,
    })
}

/// Parse an ffprobe rational such as `30000/1001` or a plain number.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[derive(Debug, Default)]
struct ProbeState {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<f64>,
    r_frame_rate: Option<f64>,
    nb_frames: Option<u64>,
    duration: Option<f64>,
}

impl ProbeState {
    fn update(&mut self, key: &str, value: &str) {
        // Later streams never override the first one.
        match key {
            "width" if self.width.is_none() => self.width = value.parse().ok(),
            "height" if self.height.is_none() => self.height = value.parse().ok(),
            "avg_frame_rate" if self.avg_frame_rate.is_none() => {
                self.avg_frame_rate = parse_frame_rate(value)
            }
            "r_frame_rate" if self.r_frame_rate.is_none() => {
                self.r_frame_rate = parse_frame_rate(value)
            }
            "nb_frames" if self.nb_frames.is_none() => self.nb_frames = value.parse().ok(),
            "duration" if self.duration.is_none() => {
                self.duration = value.parse().ok().filter(|d: &f64| d.is_finite())
            }
            _ => {}
        }
    }
}

/// Whether `binary` is on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let raw = "width=1920\nheight=1080\nr_frame_rate=30/1\n\
                   avg_frame_rate=30000/1001\nduration=10.010000\nnb_frames=300\n";
        let info = parse_probe_output(raw).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.frame_count, Some(300));
        assert!((info.duration_secs.unwrap() - 10.01).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_output_with_unknown_fields() {
        let raw = "width=640\nheight=480\navg_frame_rate=0/0\n\
                   r_frame_rate=25/1\nnb_frames=N/A\nduration=N/A\n";
        let info = parse_probe_output(raw).unwrap();
        assert_eq!(info.fps, 25.0);
        assert_eq!(info.frame_count, None);
        assert_eq!(info.duration_secs, None);
    }

    #[test]
    fn test_parse_probe_output_requires_dimensions() {
        assert!(parse_probe_output("r_frame_rate=25/1\n").is_none());
        assert!(parse_probe_output("width=0\nheight=480\nr_frame_rate=25/1\n").is_none());
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_probe_missing_file() {
        let result = probe_video(Path::new("/nonexistent/followcam/input.mp4"));
        assert!(matches!(result, Err(FollowcamError::FileNotFound { .. })));
    }
}
