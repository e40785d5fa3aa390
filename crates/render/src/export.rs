//! Video and still-image export.
//!
//! ```text
//! <out>/motion_detection.mp4      annotated frames
//! <out>/viewport_tracking.mp4     viewport crops
//! <out>/frames/frame_###.jpg
//! <out>/viewport/viewport_###.jpg
//! ```

use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use followcam_common::{FollowcamError, FollowcamResult};
use followcam_model::{Frame, FrameSize, RunOutputs, TrackRecord, ViewportSize};
use image::RgbImage;

use crate::overlay::{annotate, crop_viewport};

pub const ANNOTATED_VIDEO: &str = "motion_detection.mp4";
pub const VIEWPORT_VIDEO: &str = "viewport_tracking.mp4";
pub const FRAMES_DIR: &str = "frames";
pub const VIEWPORT_DIR: &str = "viewport";

/// Consumer of rendered images, one per sampled frame.
pub trait FrameSink {
    fn write(&mut self, index: u64, image: &RgbImage) -> FollowcamResult<()>;

    /// Flush and close. Further writes are an error.
    fn finish(&mut self) -> FollowcamResult<()>;
}

/// Build ffmpeg arguments for encoding `rgb24` frames from stdin.
pub fn encode_args(output: &Path, size: FrameSize, fps: f64) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-s".to_string(),
        size.to_string(),
        "-r".to_string(),
        format!("{fps}"),
        "-i".to_string(),
        "pipe:0".to_string(),
        // yuv420p needs even dimensions.
        "-vf".to_string(),
        "pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        output.display().to_string(),
    ]
}

/// Encodes frames into an H.264 file through an ffmpeg subprocess.
pub struct VideoEncoder {
    path: PathBuf,
    size: FrameSize,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    frames: u64,
}

impl VideoEncoder {
    pub fn spawn(path: impl AsRef<Path>, size: FrameSize, fps: f64) -> FollowcamResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FollowcamError::render(format!("invalid output fps {fps}")));
        }

        let args = encode_args(&path, size, fps);
        tracing::debug!(args = ?args, "Starting ffmpeg encoder");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FollowcamError::render(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FollowcamError::render("Failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FollowcamError::render("Failed to capture ffmpeg stderr"))?;
        let stderr_task = std::thread::spawn(move || -> String {
            let mut output = String::new();
            match BufReader::new(stderr).read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(
            pid = child.id(),
            path = %path.display(),
            size = %size,
            "ffmpeg encoder started"
        );

        Ok(Self {
            path,
            size,
            child,
            stdin: Some(stdin),
            stderr_task: Some(stderr_task),
            frames: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn join_stderr(&mut self) -> String {
        self.stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default()
    }
}

impl FrameSink for VideoEncoder {
    fn write(&mut self, index: u64, image: &RgbImage) -> FollowcamResult<()> {
        if image.dimensions() != (self.size.width, self.size.height) {
            return Err(FollowcamError::render(format!(
                "frame {index} is {}x{} but {} expects {}",
                image.width(),
                image.height(),
                self.path.display(),
                self.size
            )));
        }
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            FollowcamError::render(format!("{} is already finished", self.path.display()))
        })?;
        if let Err(e) = stdin.write_all(image.as_raw()) {
            // ffmpeg died; its stderr explains why.
            self.stdin = None;
            let _ = self.child.wait();
            let stderr_output = self.join_stderr();
            return Err(FollowcamError::render(format!(
                "Failed writing frame {index} to ffmpeg: {e}: {}",
                stderr_output.trim()
            )));
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> FollowcamResult<()> {
        let Some(stdin) = self.stdin.take() else {
            return Ok(());
        };
        drop(stdin);

        let status = self
            .child
            .wait()
            .map_err(|e| FollowcamError::render(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = self.join_stderr();
        if !status.success() {
            return Err(FollowcamError::render(format!(
                "ffmpeg encode of {} failed (status {status}): {}",
                self.path.display(),
                stderr_output.trim()
            )));
        }
        tracing::info!(path = %self.path.display(), frames = self.frames, "Video written");
        Ok(())
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Writes one JPEG per frame as `<dir>/<prefix>_###.jpg`.
#[derive(Debug)]
pub struct StillWriter {
    dir: PathBuf,
    prefix: String,
    written: u64,
}

impl StillWriter {
    pub fn create(dir: impl AsRef<Path>, prefix: impl Into<String>) -> FollowcamResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            written: 0,
        })
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{}_{index:03}.jpg", self.prefix))
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for StillWriter {
    fn write(&mut self, index: u64, image: &RgbImage) -> FollowcamResult<()> {
        let path = self.path_for(index);
        image.save(&path).map_err(|e| {
            FollowcamError::render(format!("Failed to write {}: {e}", path.display()))
        })?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> FollowcamResult<()> {
        tracing::info!(dir = %self.dir.display(), stills = self.written, "Stills written");
        Ok(())
    }
}

/// What a run exports.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub frame_size: FrameSize,
    pub viewport: ViewportSize,
    /// Output video rate (the sampled rate).
    pub fps: f64,
    pub videos: bool,
    pub stills: bool,
}

/// Routes each frame's annotated image and viewport crop to the enabled sinks.
pub struct RunExporter {
    output_dir: PathBuf,
    annotated: Vec<(String, Box<dyn FrameSink>)>,
    cropped: Vec<(String, Box<dyn FrameSink>)>,
}

impl RunExporter {
    pub fn create(options: &ExportOptions) -> FollowcamResult<Self> {
        std::fs::create_dir_all(&options.output_dir)?;
        let dir = &options.output_dir;

        let mut annotated: Vec<(String, Box<dyn FrameSink>)> = Vec::new();
        let mut cropped: Vec<(String, Box<dyn FrameSink>)> = Vec::new();

        if options.videos {
            annotated.push((
                ANNOTATED_VIDEO.to_string(),
                Box::new(VideoEncoder::spawn(
                    dir.join(ANNOTATED_VIDEO),
                    options.frame_size,
                    options.fps,
                )?),
            ));
            let viewport_frame = FrameSize::new(options.viewport.width, options.viewport.height);
            cropped.push((
                VIEWPORT_VIDEO.to_string(),
                Box::new(VideoEncoder::spawn(
                    dir.join(VIEWPORT_VIDEO),
                    viewport_frame,
                    options.fps,
                )?),
            ));
        }
        if options.stills {
            annotated.push((
                FRAMES_DIR.to_string(),
                Box::new(StillWriter::create(dir.join(FRAMES_DIR), "frame")?),
            ));
            cropped.push((
                VIEWPORT_DIR.to_string(),
                Box::new(StillWriter::create(dir.join(VIEWPORT_DIR), "viewport")?),
            ));
        }

        Ok(Self {
            output_dir: dir.clone(),
            annotated,
            cropped,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render and write one frame.
    pub fn write(&mut self, frame: &Frame, record: &TrackRecord) -> FollowcamResult<()> {
        if !self.annotated.is_empty() {
            let image = annotate(frame, record);
            for (_, sink) in &mut self.annotated {
                sink.write(record.frame_index, &image)?;
            }
        }
        if !self.cropped.is_empty() {
            let image = crop_viewport(frame, &record.viewport);
            for (_, sink) in &mut self.cropped {
                sink.write(record.frame_index, &image)?;
            }
        }
        Ok(())
    }

    /// Close every sink and report what was produced.
    pub fn finish(mut self) -> FollowcamResult<RunOutputs> {
        let mut outputs = RunOutputs::default();
        for (name, sink) in self.annotated.iter_mut().chain(self.cropped.iter_mut()) {
            sink.finish()?;
            match name.as_str() {
                ANNOTATED_VIDEO => outputs.annotated_video = Some(name.clone()),
                VIEWPORT_VIDEO => outputs.viewport_video = Some(name.clone()),
                FRAMES_DIR => outputs.frames_dir = Some(name.clone()),
                VIEWPORT_DIR => outputs.viewport_dir = Some(name.clone()),
                _ => {}
            }
        }
        Ok(outputs)
    }
}
