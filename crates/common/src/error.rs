//! Error types shared across FollowCam crates.

use std::path::PathBuf;

/// Top-level error type for FollowCam operations.
///
/// `Config` and `NumericalDegeneracy` abort a run. A frame without motion is
/// not an error and never shows up here.
#[derive(Debug, thiserror::Error)]
pub enum FollowcamError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Numerical degeneracy: {message}")]
    NumericalDegeneracy { message: String },

    #[error("Motion extraction error: {message}")]
    Motion { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Run error: {message}")]
    Run { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using FollowcamError.
pub type FollowcamResult<T> = Result<T, FollowcamError>;

impl FollowcamError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::NumericalDegeneracy {
            message: msg.into(),
        }
    }

    pub fn motion(msg: impl Into<String>) -> Self {
        Self::Motion {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn run(msg: impl Into<String>) -> Self {
        Self::Run {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = FollowcamError::config("viewport 720x480 exceeds frame 640x480");
        assert_eq!(
            err.to_string(),
            "Configuration error: viewport 720x480 exceeds frame 640x480"
        );
    }

    #[test]
    fn test_run_error_message() {
        let err = FollowcamError::run("Failed to save run: disk full");
        assert_eq!(err.to_string(), "Run error: Failed to save run: disk full");
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> FollowcamResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(FollowcamError::Io(_))));
    }
}
