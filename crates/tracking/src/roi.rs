//! Region-of-interest estimation.
//!
//! Reduces a frame's motion rectangles to one area-weighted centroid. Larger
//! blobs pull harder; zero-area rectangles contribute nothing.

use followcam_model::{Point2D, Rect};

/// A frame's dominant activity point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiEstimate {
    /// Area-weighted mean of the rectangle centers.
    pub centroid: Point2D,
    /// Sum of the contributing areas. Always > 0.
    pub weight: f64,
}

/// Estimate the ROI for one frame.
///
/// Returns `None` ("no measurement") when `rects` is empty or every rectangle
/// has zero area.
pub fn estimate_roi(rects: &[Rect]) -> Option<RoiEstimate> {
    let mut weight = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;

    for rect in rects.iter().filter(|r| r.area() > 0) {
        let area = rect.area() as f64;
        let center = rect.center();
        weight += area;
        sum_x += area * center.x;
        sum_y += area * center.y;
    }

    if weight <= 0.0 {
        return None;
    }

    Some(RoiEstimate {
        centroid: Point2D::new(sum_x / weight, sum_y / weight),
        weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_rect() {
        let roi = estimate_roi(&[Rect::new(50, 50, 20, 20)]).unwrap();
        assert_eq!(roi.centroid, Point2D::new(60.0, 60.0));
        assert_eq!(roi.weight, 400.0);
    }

    #[test]
    fn test_larger_rect_dominates() {
        // 10x10 at center (5,5), 30x30 at center (115,15)
        let roi = estimate_roi(&[Rect::new(0, 0, 10, 10), Rect::new(100, 0, 30, 30)]).unwrap();
        assert!((roi.centroid.x - (100.0 * 5.0 + 900.0 * 115.0) / 1000.0).abs() < 1e-9);
        assert!((roi.centroid.y - (100.0 * 5.0 + 900.0 * 15.0) / 1000.0).abs() < 1e-9);
        assert_eq!(roi.weight, 1000.0);
    }

    #[test]
    fn test_empty_is_no_measurement() {
        assert!(estimate_roi(&[]).is_none());
    }

    #[test]
    fn test_zero_area_rects_are_ignored() {
        assert!(estimate_roi(&[Rect::new(10, 10, 0, 5), Rect::new(3, 3, 7, 0)]).is_none());

        let roi = estimate_roi(&[Rect::new(500, 500, 0, 9), Rect::new(0, 0, 4, 4)]).unwrap();
        assert_eq!(roi.centroid, Point2D::new(2.0, 2.0));
    }

    fn bounds(values: &[f64]) -> (f64, f64) {
        values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    fn rect_strategy() -> impl Strategy<Value = Rect> {
        (0u32..2000, 0u32..2000, 0u32..300, 0u32..300)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn prop_centroid_within_center_hull(
            rects in prop::collection::vec(rect_strategy(), 0..12)
        ) {
            let positive: Vec<_> = rects.iter().filter(|r| r.area() > 0).collect();
            match estimate_roi(&rects) {
                None => prop_assert!(positive.is_empty()),
                Some(roi) => {
                    prop_assert!(roi.weight > 0.0);
                    let xs: Vec<f64> = positive.iter().map(|r| r.center().x).collect();
                    let ys: Vec<f64> = positive.iter().map(|r| r.center().y).collect();
                    let (min_x, max_x) = bounds(&xs);
                    let (min_y, max_y) = bounds(&ys);
                    prop_assert!(roi.centroid.x >= min_x - 1e-6 && roi.centroid.x <= max_x + 1e-6);
                    prop_assert!(roi.centroid.y >= min_y - 1e-6 && roi.centroid.y <= max_y + 1e-6);
                }
            }
        }

        #[test]
        fn prop_order_independent(rects in prop::collection::vec(rect_strategy(), 1..12)) {
            let mut reversed = rects.clone();
            reversed.reverse();
            let mut rotated = rects.clone();
            rotated.rotate_left(rects.len() / 2);

            let a = estimate_roi(&rects);
            for other in [estimate_roi(&reversed), estimate_roi(&rotated)] {
                match (a, other) {
                    (None, None) => {}
                    (Some(a), Some(b)) => {
                        prop_assert!((a.centroid.x - b.centroid.x).abs() < 1e-6);
                        prop_assert!((a.centroid.y - b.centroid.y).abs() < 1e-6);
                        prop_assert!((a.weight - b.weight).abs() < 1e-6);
                    }
                    _ => prop_assert!(false, "presence differs with order"),
                }
            }
        }
    }
}
