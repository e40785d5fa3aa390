//! Overlay drawing and viewport cropping.

use ab_glyph::{FontRef, PxScale};
use followcam_model::{Frame, Rect, TrackRecord, ViewportRect};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};

/// Motion boxes are drawn in green.
pub const MOTION_BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// The viewport outline is drawn in blue.
pub const VIEWPORT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// The frame label is drawn in yellow.
pub const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Outline thickness in pixels.
pub const LINE_THICKNESS: u32 = 2;

const LABEL_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
const LABEL_SCALE: f32 = 28.0;
const LABEL_ORIGIN: (i32, i32) = (10, 8);

fn label_font() -> Option<FontRef<'static>> {
    match FontRef::try_from_slice(LABEL_FONT) {
        Ok(font) => Some(font),
        Err(e) => {
            tracing::debug!(error = %e, "Label font unavailable, drawing without labels");
            None
        }
    }
}

/// Copy of the frame with motion boxes and the viewport outlined, labelled
/// with its one-based frame number.
pub fn annotate(frame: &Frame, record: &TrackRecord) -> RgbImage {
    let mut canvas = frame.image().clone();
    for rect in &record.boxes {
        draw_outline(&mut canvas, *rect, MOTION_BOX_COLOR);
    }
    let viewport = record.viewport.pixel_rect(frame.size());
    draw_outline(&mut canvas, viewport, VIEWPORT_COLOR);
    draw_label(&mut canvas, &format!("Frame {}", record.frame_index + 1));
    canvas
}

/// Draw `text` in the top-left corner.
pub fn draw_label(canvas: &mut RgbImage, text: &str) {
    if let Some(font) = label_font() {
        let (x, y) = LABEL_ORIGIN;
        draw_text_mut(canvas, LABEL_COLOR, x, y, PxScale::from(LABEL_SCALE), &font, text);
    }
}

/// The viewport's pixels as a new image.
pub fn crop_viewport(frame: &Frame, viewport: &ViewportRect) -> RgbImage {
    let rect = viewport.pixel_rect(frame.size());
    image::imageops::crop_imm(frame.image(), rect.x, rect.y, rect.width, rect.height).to_image()
}

/// Outline `rect` inward with [`LINE_THICKNESS`] nested rectangles.
pub fn draw_outline(canvas: &mut RgbImage, rect: Rect, color: Rgb<u8>) {
    for inset in 0..LINE_THICKNESS {
        let width = rect.width.saturating_sub(2 * inset);
        let height = rect.height.saturating_sub(2 * inset);
        if width == 0 || height == 0 {
            break;
        }
        let shape = imageproc::rect::Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32)
            .of_size(width, height);
        draw_hollow_rect_mut(canvas, shape, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use followcam_model::{Point2D, ViewportSize};

    fn record(boxes: Vec<Rect>, left: f64, top: f64) -> TrackRecord {
        TrackRecord {
            frame_index: 0,
            boxes,
            measurement: None,
            center: Point2D::ORIGIN,
            velocity: Point2D::ORIGIN,
            viewport: ViewportRect::new(left, top, ViewportSize::new(20, 10)),
        }
    }

    #[test]
    fn test_annotate_draws_boxes_and_viewport() {
        let frame = Frame::new(0, RgbImage::new(200, 120));
        let out = annotate(&frame, &record(vec![Rect::new(140, 70, 10, 10)], 150.0, 100.0));

        assert_eq!(*out.get_pixel(140, 70), MOTION_BOX_COLOR);
        assert_eq!(*out.get_pixel(141, 71), MOTION_BOX_COLOR);
        assert_eq!(*out.get_pixel(145, 75), Rgb([0, 0, 0]));

        assert_eq!(*out.get_pixel(150, 100), VIEWPORT_COLOR);
        assert_eq!(*out.get_pixel(169, 109), VIEWPORT_COLOR);
        assert_eq!(*out.get_pixel(160, 105), Rgb([0, 0, 0]));

        // The source frame is untouched.
        assert_eq!(*frame.image().get_pixel(140, 70), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_degenerate_boxes_are_skipped() {
        let mut canvas = RgbImage::new(16, 16);
        draw_outline(&mut canvas, Rect::new(4, 4, 0, 3), MOTION_BOX_COLOR);
        assert!(canvas.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_annotate_labels_frame_number() {
        let frame = Frame::new(0, RgbImage::new(200, 60));
        let out = annotate(&frame, &record(vec![], 150.0, 40.0));
        let label = image::imageops::crop_imm(&out, 0, 0, 140, 40).to_image();
        assert!(label.pixels().any(|p| p.0[0] > 0 && p.0[1] > 0 && p.0[2] == 0));
        assert!(label_font().is_some());
    }

    #[test]
    fn test_label_stays_in_the_top_left_corner() {
        let mut canvas = RgbImage::new(400, 200);
        draw_label(&mut canvas, "Frame 12");
        let below = image::imageops::crop_imm(&canvas, 0, 80, 400, 120).to_image();
        assert!(below.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_crop_viewport() {
        let image = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8, y as u8, 0]));
        let frame = Frame::new(0, image);
        let crop = crop_viewport(&frame, &ViewportRect::new(10.4, 5.6, ViewportSize::new(20, 10)));
        assert_eq!(crop.dimensions(), (20, 10));
        assert_eq!(crop.get_pixel(0, 0).0, [10, 6, 0]);
        assert_eq!(crop.get_pixel(19, 9).0, [29, 15, 0]);
    }
}
