//! End-to-end tracking scenarios.

use std::sync::atomic::AtomicBool;

use followcam_model::{Frame, FrameSize, Rect, TrackRecord, ViewportSize};
use followcam_tracking::{
    track_rectangles, FilterKind, FrameDiffExtractor, MotionConfig, TrackingPipeline,
    TrajectoryStats, ViewportTracker,
};
use image::{Rgb, RgbImage};

const FRAME: FrameSize = FrameSize::new(640, 480);
const VIEWPORT: ViewportSize = ViewportSize::new(100, 100);

/// Activity at (60,60) for three frames, a three-frame gap, then activity
/// at (210,60) for four frames.
fn hand_over_sets() -> Vec<Vec<Rect>> {
    let left = Rect::new(50, 50, 20, 20);
    let right = Rect::new(200, 50, 20, 20);
    let mut sets = vec![vec![left]; 3];
    sets.extend(vec![vec![]; 3]);
    sets.extend(vec![vec![right]; 4]);
    sets
}

fn xs(records: &[TrackRecord]) -> Vec<f64> {
    records.iter().map(|r| r.center.x).collect()
}

#[test]
fn hand_over_moves_smoothly_between_regions() {
    let records =
        track_rectangles(FilterKind::default(), VIEWPORT, FRAME, hand_over_sets()).unwrap();
    assert_eq!(records.len(), 10);
    let x = xs(&records);

    // Settled on the first region, including the coasting frames.
    for (i, value) in x.iter().take(6).enumerate() {
        assert!((value - 60.0).abs() < 1.0, "frame {} x = {value}", i + 1);
    }

    // No instantaneous jump across the 150 px gap.
    for w in x.windows(2) {
        assert!((w[1] - w[0]).abs() < 75.0, "step {} -> {}", w[0], w[1]);
    }

    // Heading toward the second region without overshooting back.
    for w in x[6..].windows(2) {
        assert!(w[1] >= w[0]);
    }
    let last = x[9];
    assert!((last - 210.0).abs() < 15.0, "final x = {last}");

    for record in &records {
        assert!((record.center.y - 60.0).abs() < 1e-6);
        assert!(record.viewport.is_within(FRAME));
    }

    let stats = TrajectoryStats::from_records(&records);
    assert!(stats.max_acceleration < 75.0);
    assert_eq!(stats.measured_frames, 7);
    assert_eq!(stats.coasted_frames, 3);
}

#[test]
fn ema_hand_over_lags_behind_kalman() {
    let kalman =
        track_rectangles(FilterKind::default(), VIEWPORT, FRAME, hand_over_sets()).unwrap();
    let ema =
        track_rectangles(FilterKind::default_ema(), VIEWPORT, FRAME, hand_over_sets()).unwrap();

    // EMA holds during the gap, then closes 30% of the distance per frame.
    for record in &ema[..6] {
        assert!((record.center.x - 60.0).abs() < 1e-9);
    }
    assert!((ema[6].center.x - 105.0).abs() < 1e-9);
    assert!(ema[9].center.x < kalman[9].center.x);
}

fn frame_with_square(index: u64, x0: u32, y0: u32) -> Frame {
    let mut image = RgbImage::from_pixel(FRAME.width, FRAME.height, Rgb([30, 90, 30]));
    for y in y0..y0 + 24 {
        for x in x0..x0 + 24 {
            image.put_pixel(x, y, Rgb([250, 250, 250]));
        }
    }
    Frame::new(index, image)
}

#[test]
fn pipeline_follows_a_moving_square() {
    let extractor = FrameDiffExtractor::new(MotionConfig::default()).unwrap();
    let tracker = ViewportTracker::new(FilterKind::default(), VIEWPORT, FRAME).unwrap();
    let mut pipeline = TrackingPipeline::new(extractor, tracker);

    let frames = (0..12u64).map(|i| Ok(frame_with_square(i, 100 + 30 * i as u32, 200)));
    let run = pipeline
        .drive(frames, &AtomicBool::new(false), |_, _| Ok(()))
        .unwrap();

    assert!(!run.cancelled);
    assert_eq!(run.records.len(), 12);
    assert!(run.records[0].boxes.is_empty());
    for record in &run.records[1..] {
        assert!(!record.boxes.is_empty(), "frame {}", record.frame_index);
        assert!(record.measurement.is_some());
    }

    // The camera moves right with the square and stays vertically on it.
    let x = xs(&run.records);
    assert!(x[11] > x[1]);
    assert!((run.records[11].center.y - 212.0).abs() < 20.0);
    for record in &run.records {
        assert!(record.viewport.is_within(FRAME));
    }
}
