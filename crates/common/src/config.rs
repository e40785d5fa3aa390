//! Application configuration.
//!
//! Values here are run defaults. The tracking crate owns the typed,
//! validated configs; the CLI maps these defaults (and its own flags) onto
//! them before any frame is processed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where run outputs are written when `--output` is not given.
    pub output_dir: PathBuf,

    /// Frame sampling defaults.
    pub sampling: SamplingDefaults,

    /// Virtual camera defaults.
    pub viewport: ViewportDefaults,

    /// Motion extraction defaults.
    pub motion: MotionDefaults,

    /// Kalman noise defaults.
    pub tracking: TrackingDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default frame sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingDefaults {
    /// Target sampling rate in frames per second.
    pub target_fps: f64,

    /// Width frames are resized to before processing.
    pub resize_width: u32,

    /// Height frames are resized to before processing.
    pub resize_height: u32,
}

/// Default viewport (virtual camera) size in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportDefaults {
    pub width: u32,
    pub height: u32,
}

/// Default motion extraction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionDefaults {
    /// Per-pixel difference threshold (0-255).
    pub threshold: u8,

    /// Minimum blob area in pixels.
    pub min_area: u32,

    /// Gaussian blur sigma applied before differencing.
    pub blur_sigma: f32,

    /// Number of 3x3 dilation passes on the motion mask.
    pub dilate_iterations: u8,
}

/// Default Kalman filter tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingDefaults {
    pub initial_position_variance: f64,
    pub initial_velocity_variance: f64,
    pub process_noise_position: f64,
    pub process_noise_velocity: f64,
    pub measurement_noise: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "followcam_tracking=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            sampling: SamplingDefaults::default(),
            viewport: ViewportDefaults::default(),
            motion: MotionDefaults::default(),
            tracking: TrackingDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SamplingDefaults {
    fn default() -> Self {
        Self {
            target_fps: 5.0,
            resize_width: 1280,
            resize_height: 720,
        }
    }
}

impl Default for ViewportDefaults {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
        }
    }
}

impl Default for MotionDefaults {
    fn default() -> Self {
        Self {
            threshold: 25,
            min_area: 100,
            blur_sigma: 1.1,
            dilate_iterations: 2,
        }
    }
}

impl Default for TrackingDefaults {
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

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("followcam").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{ "viewport": { "width": 800 }, "motion": { "threshold": 40 } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.viewport.width, 800);
        assert_eq!(config.viewport.height, 360);
        assert_eq!(config.motion.threshold, 40);
        assert_eq!(config.motion.min_area, 100);
        assert_eq!(config.sampling.resize_width, 1280);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir()
            .join("followcam_test_config")
            .join("config.json");
        let _ = std::fs::remove_file(&path);

        let mut config = AppConfig::default();
        config.sampling.target_fps = 10.0;
        config.tracking.measurement_noise = 42.0;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert!((loaded.sampling.target_fps - 10.0).abs() < 1e-9);
        assert!((loaded.tracking.measurement_noise - 42.0).abs() < 1e-9);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unparseable_config_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("followcam_test_bad_config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.viewport.width, 640);

        std::fs::remove_file(&path).ok();
    }
}
