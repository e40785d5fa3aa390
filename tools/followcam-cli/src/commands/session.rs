//! Shared run setup and execution for `track` and `analyze`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, ValueEnum};
use followcam_common::{AppConfig, FollowcamError, FollowcamResult, FrameSampler};
use followcam_model::{FrameSize, LoadedRun, RunManifest, SamplingInfo, SourceInfo, ViewportSize};
use followcam_render::{ExportOptions, FrameReader, RunExporter, VideoInfo};
use followcam_tracking::{
    FilterKind, FrameDiffExtractor, KalmanConfig, MotionConfig, TrackingPipeline,
    TrajectoryStats, ViewportTracker,
};

/// Run options shared by `track` and `analyze`. Unset values come from the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct TrackOptions {
    /// Output directory (default: <config output_dir>/<video name>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target sampling rate in frames per second
    #[arg(long)]
    pub fps: Option<f64>,

    /// Processing width frames are resized to
    #[arg(long)]
    pub width: Option<u32>,

    /// Processing height frames are resized to
    #[arg(long)]
    pub height: Option<u32>,

    /// Viewport width in pixels
    #[arg(long)]
    pub viewport_width: Option<u32>,

    /// Viewport height in pixels
    #[arg(long)]
    pub viewport_height: Option<u32>,

    /// Per-pixel difference threshold (0-255)
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Minimum motion blob area in pixels
    #[arg(long)]
    pub min_area: Option<u32>,

    /// Center filter
    #[arg(long, value_enum, default_value_t = FilterArg::Kalman)]
    pub filter: FilterArg,

    /// EMA blend factor in (0, 1] (with --filter ema)
    #[arg(long)]
    pub ema_factor: Option<f64>,

    /// Kalman measurement noise (larger = smoother, slower)
    #[arg(long)]
    pub measurement_noise: Option<f64>,

    /// Kalman process noise for both position and velocity
    #[arg(long)]
    pub process_noise: Option<f64>,

    /// Skip writing per-frame JPEG stills
    #[arg(long)]
    pub no_stills: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterArg {
    #[default]
    Kalman,
    Ema,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub output_dir: PathBuf,
    pub target_fps: f64,
    pub frame_size: FrameSize,
    pub viewport: ViewportSize,
    pub motion: MotionConfig,
    pub filter: FilterKind,
    pub stills: bool,
}

impl RunSettings {
    /// Merge CLI options over config defaults.
    pub fn resolve(video: &Path, options: &TrackOptions, config: &AppConfig) -> Self {
        let output_dir = options
            .output
            .clone()
            .unwrap_or_else(|| config.output_dir.join(run_name(video)));

        let mut motion = MotionConfig::from(&config.motion);
        if let Some(threshold) = options.threshold {
            motion.threshold = threshold;
        }
        if let Some(min_area) = options.min_area {
            motion.min_area = min_area;
        }

        let filter = match options.filter {
            FilterArg::Kalman => {
                let mut kalman = KalmanConfig::from(&config.tracking);
                if let Some(r) = options.measurement_noise {
                    kalman.measurement_noise = r;
                }
                if let Some(q) = options.process_noise {
                    kalman.process_noise_position = q;
                    kalman.process_noise_velocity = q;
                }
                FilterKind::Kalman(kalman)
            }
            FilterArg::Ema => match options.ema_factor {
                Some(factor) => FilterKind::Ema { factor },
                None => FilterKind::default_ema(),
            },
        };

        Self {
            output_dir,
            target_fps: options.fps.unwrap_or(config.sampling.target_fps),
            frame_size: FrameSize::new(
                options.width.unwrap_or(config.sampling.resize_width),
                options.height.unwrap_or(config.sampling.resize_height),
            ),
            viewport: ViewportSize::new(
                options.viewport_width.unwrap_or(config.viewport.width),
                options.viewport_height.unwrap_or(config.viewport.height),
            ),
            motion,
            filter,
            stills: !options.no_stills,
        }
    }
}

/// Run name derived from the video file stem.
pub fn run_name(video: &Path) -> String {
    video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "run".to_string())
}

/// What a finished (or cancelled) run produced.
#[derive(Debug)]
pub struct SessionOutcome {
    pub output_dir: PathBuf,
    pub stats: TrajectoryStats,
    pub cancelled: bool,
}

/// Set `cancel` on Ctrl-C.
pub fn spawn_cancel_listener() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current frame");
            flag.store(true, Ordering::Relaxed);
        }
    });
    cancel
}

/// Probe, decode, track, optionally render, and save the run directory.
///
/// Blocking; call from `spawn_blocking`.
pub fn execute(
    video: PathBuf,
    settings: RunSettings,
    info: VideoInfo,
    render: bool,
    cancel: Arc<AtomicBool>,
) -> anyhow::Result<SessionOutcome> {
    let sampler = FrameSampler::new(info.fps, settings.target_fps)?;

    // Validate everything before the decoder starts.
    let tracker = ViewportTracker::new(settings.filter, settings.viewport, settings.frame_size)?;
    let extractor = FrameDiffExtractor::new(settings.motion)?;

    let mut manifest = RunManifest::new(
        run_name(&video),
        SourceInfo {
            path: video.display().to_string(),
            width: info.width,
            height: info.height,
            fps: info.fps,
            frame_count: info.frame_count,
        },
        SamplingInfo {
            target_fps: settings.target_fps,
            interval: sampler.interval(),
            sampled_fps: sampler.sampled_fps(),
            frame_width: settings.frame_size.width,
            frame_height: settings.frame_size.height,
        },
        settings.viewport,
        settings.filter.tracking_info(),
    );

    tracing::info!(
        video = %video.display(),
        source = %format!("{}x{}@{:.2}", info.width, info.height, info.fps),
        interval = sampler.interval(),
        frame = %settings.frame_size,
        viewport = %settings.viewport,
        filter = settings.filter.name(),
        expected_frames = ?info.frame_count.map(|n| sampler.sampled_count(n)),
        "Starting run"
    );

    let mut exporter = if render {
        Some(RunExporter::create(&ExportOptions {
            output_dir: settings.output_dir.clone(),
            frame_size: settings.frame_size,
            viewport: settings.viewport,
            fps: sampler.sampled_fps(),
            videos: true,
            stills: settings.stills,
        })?)
    } else {
        std::fs::create_dir_all(&settings.output_dir)?;
        None
    };

    let reader = FrameReader::spawn(&video, sampler.interval(), settings.frame_size)?;
    let mut pipeline = TrackingPipeline::new(extractor, tracker);
    let run = pipeline.drive(reader, &cancel, |frame, record| {
        if record.frame_index % 50 == 0 {
            tracing::info!(
                frame = record.frame_index,
                source_frame = sampler.source_frame_of(record.frame_index),
                "Processing"
            );
        }
        match exporter.as_mut() {
            Some(exporter) => exporter.write(frame, record),
            None => Ok(()),
        }
    })?;

    if let Some(exporter) = exporter {
        match exporter.finish() {
            Ok(outputs) => manifest.outputs = outputs,
            Err(e) if run.cancelled => {
                tracing::warn!(error = %e, "Encoders did not finish cleanly after cancellation");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let stats = TrajectoryStats::from_records(&run.records);
    manifest.summary = stats.to_summary();

    let mut saved = LoadedRun::new(&settings.output_dir, manifest, run.records);
    save_run(&mut saved)?;

    tracing::info!(
        frames = stats.frames,
        cancelled = run.cancelled,
        output = %settings.output_dir.display(),
        "Run finished"
    );

    Ok(SessionOutcome {
        output_dir: settings.output_dir,
        stats,
        cancelled: run.cancelled,
    })
}

pub fn save_run(run: &mut LoadedRun) -> FollowcamResult<()> {
    run.save()
        .map_err(|e| FollowcamError::run(format!("Failed to save run: {e}")))
}

pub fn load_run(path: &Path) -> FollowcamResult<LoadedRun> {
    LoadedRun::load(path).map_err(|e| FollowcamError::run(format!("Failed to load run: {e}")))
}

pub fn print_stats(stats: &TrajectoryStats) {
    println!("  Frames: {}", stats.frames);
    println!(
        "  Measured: {} / Coasted: {}",
        stats.measured_frames, stats.coasted_frames
    );
    println!("  Max step: {:.1}px", stats.max_step);
    println!("  Max acceleration: {:.1}px/frame²", stats.max_acceleration);
    println!("  Mean speed: {:.1}px/frame", stats.mean_speed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_config_defaults() {
        let config = AppConfig::default();
        let settings = RunSettings::resolve(
            Path::new("/videos/match.mp4"),
            &TrackOptions::default(),
            &config,
        );
        assert_eq!(settings.output_dir, PathBuf::from("output/match"));
        assert_eq!(settings.frame_size, FrameSize::new(1280, 720));
        assert_eq!(settings.viewport, ViewportSize::new(640, 360));
        assert_eq!(settings.filter, FilterKind::default());
        assert!(settings.stills);
    }

    #[test]
    fn test_resolve_flags_override() {
        let options = TrackOptions {
            output: Some(PathBuf::from("/tmp/out")),
            fps: Some(10.0),
            viewport_width: Some(320),
            threshold: Some(40),
            measurement_noise: Some(50.0),
            process_noise: Some(0.2),
            no_stills: true,
            ..TrackOptions::default()
        };
        let settings =
            RunSettings::resolve(Path::new("clip.mp4"), &options, &AppConfig::default());
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.target_fps, 10.0);
        assert_eq!(settings.viewport, ViewportSize::new(320, 360));
        assert_eq!(settings.motion.threshold, 40);
        assert!(!settings.stills);
        match settings.filter {
            FilterKind::Kalman(k) => {
                assert_eq!(k.measurement_noise, 50.0);
                assert_eq!(k.process_noise_position, 0.2);
                assert_eq!(k.process_noise_velocity, 0.2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_run_is_run_error() {
        let dir = std::env::temp_dir().join("followcam_cli_missing_run");
        let _ = std::fs::remove_dir_all(&dir);
        assert!(matches!(load_run(&dir), Err(FollowcamError::Run { .. })));
    }

    #[test]
    fn test_save_over_a_file_is_run_error() {
        let path = std::env::temp_dir().join("followcam_cli_save_target");
        let _ = std::fs::remove_dir_all(&path);
        std::fs::write(&path, b"not a directory").unwrap();

        let manifest = RunManifest::new(
            "clip",
            SourceInfo {
                path: "clip.mp4".to_string(),
                width: 640,
                height: 480,
                fps: 30.0,
                frame_count: None,
            },
            SamplingInfo {
                target_fps: 5.0,
                interval: 6,
                sampled_fps: 5.0,
                frame_width: 640,
                frame_height: 480,
            },
            ViewportSize::new(320, 240),
            FilterKind::default().tracking_info(),
        );
        let mut run = LoadedRun::new(&path, manifest, Vec::new());
        let err = save_run(&mut run).unwrap_err();
        assert!(err.to_string().starts_with("Run error: Failed to save run"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_resolve_ema() {
        let options = TrackOptions {
            filter: FilterArg::Ema,
            ema_factor: Some(0.5),
            ..TrackOptions::default()
        };
        let settings =
            RunSettings::resolve(Path::new("clip.mp4"), &options, &AppConfig::default());
        assert_eq!(settings.filter, FilterKind::Ema { factor: 0.5 });
    }
}
