//! Frame decoding through an `ffmpeg` subprocess.
//!
//! ffmpeg keeps every k-th source frame, scales it to the processing
//! resolution and writes packed `rgb24` to stdout. [`RawFrameStream`] cuts
//! that byte stream into [`Frame`]s.

use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use followcam_common::{FollowcamError, FollowcamResult};
use followcam_model::{Frame, FrameSize};

/// Build ffmpeg arguments for sampled, resized `rgb24` output on stdout.
pub fn decode_args(input: &Path, interval: u64, size: FrameSize) -> Vec<String> {
    let scale = format!("scale={}:{}", size.width, size.height);
    let filter = if interval > 1 {
        format!("select=not(mod(n\\,{interval})),{scale}")
    } else {
        scale
    };
    vec![
        "-nostdin".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-vf".to_string(),
        filter,
        "-vsync".to_string(),
        "0".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "pipe:1".to_string(),
    ]
}

/// Splits a packed `rgb24` byte stream into frames of a fixed size.
pub struct RawFrameStream<R: Read> {
    reader: R,
    size: FrameSize,
    next_index: u64,
    done: bool,
}

impl<R: Read> RawFrameStream<R> {
    pub fn new(reader: R, size: FrameSize) -> Self {
        Self {
            reader,
            size,
            next_index: 0,
            done: false,
        }
    }

    fn frame_len(&self) -> usize {
        self.size.pixel_count() as usize * 3
    }

    /// Read the next frame. `Ok(None)` on a clean end of stream.
    pub fn read_frame(&mut self) -> FollowcamResult<Option<Frame>> {
        let mut buf = vec![0u8; self.frame_len()];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < buf.len() {
            return Err(FollowcamError::decode(format!(
                "truncated frame {}: got {filled} of {} bytes",
                self.next_index,
                buf.len()
            )));
        }

        let index = self.next_index;
        let frame = Frame::from_rgb24(index, self.size, buf)
            .ok_or_else(|| FollowcamError::decode(format!("bad buffer for frame {index}")))?;
        self.next_index += 1;
        Ok(Some(frame))
    }
}

impl<R: Read> Iterator for RawFrameStream<R> {
    type Item = FollowcamResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Decodes a video file into sampled, resized frames.
pub struct FrameReader {
    child: Child,
    stream: RawFrameStream<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<String>>,
    finished: bool,
}

impl FrameReader {
    /// Spawn ffmpeg for `input`, keeping every `interval`-th frame at `size`.
    pub fn spawn(input: &Path, interval: u64, size: FrameSize) -> FollowcamResult<Self> {
        if !input.exists() {
            return Err(FollowcamError::FileNotFound {
                path: input.to_path_buf(),
            });
        }

        let args = decode_args(input, interval.max(1), size);
        tracing::debug!(args = ?args, "Starting ffmpeg decoder");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FollowcamError::decode(format!("Failed to start ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FollowcamError::decode("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FollowcamError::decode("Failed to capture ffmpeg stderr"))?;

        let stderr_task = std::thread::spawn(move || -> String {
            let mut output = String::new();
            match BufReader::new(stderr).read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(pid = child.id(), interval, size = %size, "ffmpeg decoder started");

        Ok(Self {
            child,
            stream: RawFrameStream::new(BufReader::new(stdout), size),
            stderr_task: Some(stderr_task),
            finished: false,
        })
    }

    /// Wait for ffmpeg and surface a non-zero exit as a decode error.
    fn finish(&mut self) -> FollowcamResult<()> {
        self.finished = true;
        let status = self
            .child
            .wait()
            .map_err(|e| FollowcamError::decode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = self
            .stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();

        if !status.success() {
            return Err(FollowcamError::decode(format!(
                "ffmpeg decode failed (status {status}): {}",
                stderr_output.trim()
            )));
        }
        Ok(())
    }
}

impl Iterator for FrameReader {
    type Item = FollowcamResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.stream.next() {
            Some(Ok(frame)) => Some(Ok(frame)),
            Some(Err(e)) => {
                // Reap the child; its stderr is usually more useful than ours.
                Some(Err(self.finish().err().unwrap_or(e)))
            }
            None => self.finish().err().map(Err),
        }
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
