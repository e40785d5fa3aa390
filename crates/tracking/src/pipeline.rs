//! Sequential pipeline driver.
//!
//! Per sampled frame: rectangles, then ROI estimate, then filter step, then
//! clipped viewport. Frames are processed strictly in order and the single
//! [`TrackerState`] is threaded from one frame to the next.

use std::sync::atomic::{AtomicBool, Ordering};

use followcam_common::{FollowcamError, FollowcamResult};
use followcam_model::{Frame, FrameSize, MeasurementRecord, Rect, TrackRecord, ViewportSize};

use crate::clipper::ViewportClipper;
use crate::filter::{CenterFilter, FilterKind};
use crate::kalman::{Measurement, TrackerState};
use crate::motion::MotionExtractor;
use crate::roi::estimate_roi;

/// Filter plus clipper for one run's fixed frame and viewport sizes.
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    filter: CenterFilter,
    clipper: ViewportClipper,
}

impl ViewportTracker {
    /// Validates the filter tuning and the viewport/frame sizes.
    pub fn new(
        filter: FilterKind,
        viewport: ViewportSize,
        frame: FrameSize,
    ) -> FollowcamResult<Self> {
        Ok(Self {
            filter: CenterFilter::new(filter)?,
            clipper: ViewportClipper::new(viewport, frame)?,
        })
    }

    pub fn frame_size(&self) -> FrameSize {
        self.clipper.frame()
    }

    pub fn viewport_size(&self) -> ViewportSize {
        self.clipper.viewport()
    }

    /// Process one frame's rectangles.
    ///
    /// `state` is `None` only for the first frame of a run; the filter is then
    /// initialized at the ROI centroid, or at the frame center when the frame
    /// has no measurement. Every frame, the first included, then runs the
    /// same predict-then-correct step.
    pub fn advance(
        &self,
        state: Option<TrackerState>,
        frame_index: u64,
        boxes: Vec<Rect>,
    ) -> FollowcamResult<(TrackerState, TrackRecord)> {
        let roi = estimate_roi(&boxes);

        let state = match state {
            Some(state) => state,
            None => {
                let start = roi.map_or_else(|| self.frame_size().center(), |r| r.centroid);
                tracing::debug!(
                    frame = frame_index,
                    x = start.x,
                    y = start.y,
                    measured = roi.is_some(),
                    "Initialized tracker"
                );
                self.filter.initialize(start)
            }
        };

        let next = self
            .filter
            .step(state, Measurement::from(roi.map(|r| r.centroid)))?;
        let center = next.center();
        let viewport = self.clipper.clip(center);

        tracing::trace!(
            frame = frame_index,
            boxes = boxes.len(),
            measured = roi.is_some(),
            cx = center.x,
            cy = center.y,
            "Advanced tracker"
        );

        let record = TrackRecord {
            frame_index,
            boxes,
            measurement: roi.map(|r| MeasurementRecord {
                x: r.centroid.x,
                y: r.centroid.y,
                weight: r.weight,
            }),
            center,
            velocity: next.velocity(),
            viewport,
        };
        Ok((next, record))
    }
}

/// Outcome of [`TrackingPipeline::drive`].
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    pub records: Vec<TrackRecord>,
    /// True when the cancel flag stopped the run early.
    pub cancelled: bool,
}

/// Owns the extractor, the tracker and the per-run state.
pub struct TrackingPipeline<E: MotionExtractor> {
    extractor: E,
    tracker: ViewportTracker,
    previous: Option<Frame>,
    state: Option<TrackerState>,
    processed: u64,
}

impl<E: MotionExtractor> TrackingPipeline<E> {
    pub fn new(extractor: E, tracker: ViewportTracker) -> Self {
        Self {
            extractor,
            tracker,
            previous: None,
            state: None,
            processed: 0,
        }
    }

    pub fn tracker(&self) -> &ViewportTracker {
        &self.tracker
    }

    /// Current filter state, `None` before the first frame.
    pub fn state(&self) -> Option<&TrackerState> {
        self.state.as_ref()
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Process the next frame in sequence.
    ///
    /// The first frame has no predecessor and therefore no motion.
    pub fn process(&mut self, frame: &Frame) -> FollowcamResult<TrackRecord> {
        let expected = self.tracker.frame_size();
        if frame.size() != expected {
            return Err(FollowcamError::motion(format!(
                "frame {} is {} but the run is {}",
                frame.index(),
                frame.size(),
                expected
            )));
        }

        let boxes = match &self.previous {
            Some(previous) => self.extractor.extract(previous, frame)?,
            None => Vec::new(),
        };

        let (state, record) = self.tracker.advance(self.state, frame.index(), boxes)?;
        self.state = Some(state);
        self.previous = Some(frame.clone());
        self.processed += 1;
        Ok(record)
    }

    /// Process every frame from `frames`, handing each to `sink`.
    ///
    /// `cancel` is checked between frames; once set, the run stops and the
    /// records so far are returned with `cancelled = true`. A decode or sink
    /// error seen after cancellation ends the run the same way.
    pub fn drive<I, F>(
        &mut self,
        frames: I,
        cancel: &AtomicBool,
        mut sink: F,
    ) -> FollowcamResult<PipelineRun>
    where
        I: IntoIterator<Item = FollowcamResult<Frame>>,
        F: FnMut(&Frame, &TrackRecord) -> FollowcamResult<()>,
    {
        let mut run = PipelineRun::default();
        for frame in frames {
            if cancel.load(Ordering::Relaxed) {
                tracing::warn!(frames = self.processed, "Run cancelled");
                run.cancelled = true;
                break;
            }
            // An interrupt also reaches the decoder and encoders, which then fail.
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => return self.stop_on_cancel(run, cancel, e),
            };
            let record = self.process(&frame)?;
            let written = sink(&frame, &record);
            run.records.push(record);
            if let Err(e) = written {
                return self.stop_on_cancel(run, cancel, e);
            }
        }
        Ok(run)
    }

    fn stop_on_cancel(
        &self,
        mut run: PipelineRun,
        cancel: &AtomicBool,
        error: FollowcamError,
    ) -> FollowcamResult<PipelineRun> {
        if !cancel.load(Ordering::Relaxed) {
            return Err(error);
        }
        tracing::warn!(error = %error, frames = self.processed, "Run cancelled");
        run.cancelled = true;
        Ok(run)
    }
}

/// Run the core over precomputed rectangle sets, one per frame.
pub fn track_rectangles<I>(
    filter: FilterKind,
    viewport: ViewportSize,
    frame: FrameSize,
    rect_sets: I,
) -> FollowcamResult<Vec<TrackRecord>>
where
    I: IntoIterator<Item = Vec<Rect>>,
{
    let tracker = ViewportTracker::new(filter, viewport, frame)?;
    let mut state = None;
    let mut records = Vec::new();
    for (index, boxes) in rect_sets.into_iter().enumerate() {
        let (next, record) = tracker.advance(state, index as u64, boxes)?;
        state = Some(next);
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use followcam_model::Point2D;
    use image::RgbImage;

    fn tracker() -> ViewportTracker {
        ViewportTracker::new(
            FilterKind::default(),
            ViewportSize::new(100, 100),
            FrameSize::new(640, 480),
        )
        .unwrap()
    }

    /// Returns fixed rectangles keyed by the current frame index.
    struct Scripted(Vec<Vec<Rect>>);

    impl MotionExtractor for Scripted {
        fn extract(&self, _previous: &Frame, current: &Frame) -> FollowcamResult<Vec<Rect>> {
            Ok(self
                .0
                .get(current.index() as usize)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn blank(index: u64) -> Frame {
        Frame::new(index, RgbImage::new(640, 480))
    }

    #[test]
    fn test_first_frame_without_motion_starts_at_frame_center() {
        let (state, record) = tracker().advance(None, 0, vec![]).unwrap();
        assert_eq!(state.center(), Point2D::new(320.0, 240.0));
        assert!(record.is_coasting());
        assert_eq!((record.viewport.left, record.viewport.top), (270.0, 190.0));
    }

    #[test]
    fn test_first_frame_with_motion_starts_at_roi() {
        let (state, record) = tracker()
            .advance(None, 0, vec![Rect::new(50, 50, 20, 20)])
            .unwrap();
        assert_eq!(state.center(), Point2D::new(60.0, 60.0));
        assert_eq!(record.measurement.unwrap().weight, 400.0);
        assert_eq!((record.viewport.left, record.viewport.top), (10.0, 10.0));
    }

    #[test]
    fn test_pipeline_first_frame_has_no_boxes() {
        let mut pipeline = TrackingPipeline::new(
            Scripted(vec![vec![Rect::new(0, 0, 10, 10)]; 3]),
            tracker(),
        );
        let first = pipeline.process(&blank(0)).unwrap();
        assert!(first.boxes.is_empty());
        let second = pipeline.process(&blank(1)).unwrap();
        assert_eq!(second.boxes.len(), 1);
        assert_eq!(pipeline.processed(), 2);
    }

    #[test]
    fn test_pipeline_rejects_wrong_frame_size() {
        let mut pipeline = TrackingPipeline::new(Scripted(vec![]), tracker());
        let frame = Frame::new(0, RgbImage::new(320, 240));
        assert!(matches!(pipeline.process(&frame), Err(FollowcamError::Motion { .. })));
    }

    #[test]
    fn test_drive_stops_when_cancelled() {
        let mut pipeline = TrackingPipeline::new(Scripted(vec![]), tracker());
        let cancel = AtomicBool::new(false);
        let mut seen = 0;
        let frames = (0..10).map(|i| Ok(blank(i)));
        let run = pipeline
            .drive(frames, &cancel, |_, _| {
                seen += 1;
                if seen == 4 {
                    cancel.store(true, Ordering::Relaxed);
                }
                Ok(())
            })
            .unwrap();
        assert!(run.cancelled);
        assert_eq!(run.records.len(), 4);
    }

    #[test]
    fn test_drive_sink_error_after_cancel_keeps_records() {
        let mut pipeline = TrackingPipeline::new(Scripted(vec![]), tracker());
        let cancel = AtomicBool::new(false);
        let frames = (0..10).map(|i| Ok(blank(i)));
        let run = pipeline
            .drive(frames, &cancel, |_, record| {
                if record.frame_index == 3 {
                    cancel.store(true, Ordering::Relaxed);
                    return Err(FollowcamError::render("Failed writing frame 3: Broken pipe"));
                }
                Ok(())
            })
            .unwrap();
        assert!(run.cancelled);
        assert_eq!(run.records.len(), 4);
    }

    #[test]
    fn test_drive_sink_error_without_cancel_fails() {
        let mut pipeline = TrackingPipeline::new(Scripted(vec![]), tracker());
        let frames = (0..3).map(|i| Ok(blank(i)));
        let result = pipeline.drive(frames, &AtomicBool::new(false), |_, _| {
            Err(FollowcamError::render("encoder exited"))
        });
        assert!(matches!(result, Err(FollowcamError::Render { .. })));
    }

    #[test]
    fn test_drive_decode_error_after_cancel_keeps_records() {
        let mut pipeline = TrackingPipeline::new(Scripted(vec![]), tracker());
        let cancel = AtomicBool::new(false);
        let frames = (0..5).map(|i| {
            if i == 2 {
                cancel.store(true, Ordering::Relaxed);
                Err(FollowcamError::decode("ffmpeg exited"))
            } else {
                Ok(blank(i))
            }
        });
        let run = pipeline.drive(frames, &cancel, |_, _| Ok(())).unwrap();
        assert!(run.cancelled);
        assert_eq!(run.records.len(), 2);
    }

    #[test]
    fn test_drive_propagates_decode_errors() {
        let mut pipeline = TrackingPipeline::new(Scripted(vec![]), tracker());
        let frames = vec![Ok(blank(0)), Err(FollowcamError::decode("truncated"))];
        let result = pipeline.drive(frames, &AtomicBool::new(false), |_, _| Ok(()));
        assert!(matches!(result, Err(FollowcamError::Decode { .. })));
    }

    #[test]
    fn test_track_rectangles_viewports_stay_inside() {
        let frame = FrameSize::new(640, 480);
        let sets = vec![
            vec![Rect::new(0, 0, 10, 10)],
            vec![],
            vec![Rect::new(620, 460, 20, 20)],
            vec![Rect::new(620, 460, 20, 20)],
        ];
        let records =
            track_rectangles(FilterKind::default(), ViewportSize::new(100, 100), frame, sets)
                .unwrap();
        assert_eq!(records.len(), 4);
        for record in &records {
            assert!(record.viewport.is_within(frame));
        }
        assert_eq!(records[1].frame_index, 1);
        assert!(records[1].is_coasting());
    }

    #[test]
    fn test_track_rectangles_rejects_oversized_viewport() {
        let result = track_rectangles(
            FilterKind::default(),
            ViewportSize::new(720, 480),
            FrameSize::new(640, 480),
            Vec::<Vec<Rect>>::new(),
        );
        assert!(matches!(result, Err(FollowcamError::Config { .. })));
    }
}
