// src/annotate.rs
//
// Draws raw detector boxes on the untouched frame and encodes the result.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use opencv::{
    core::{self, Mat},
    imgproc,
};
use std::io::Cursor;
use tracing::debug;

use crate::config::RenderConfig;
use crate::detection::ClassNames;
use crate::mat::{mat_to_rgb, rgb_to_mat};
use crate::types::Detection;

/// Red in RGB channel order.
fn box_color() -> core::Scalar {
    core::Scalar::new(255.0, 0.0, 0.0, 0.0)
}

/// Label baseline sits this far above the box.
const LABEL_OFFSET: f32 = 10.0;

/// Encoded annotated image.
#[derive(Debug, Clone)]
pub struct AnnotatedArtifact {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl AnnotatedArtifact {
    pub fn to_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(&self.jpeg))
    }
}

pub struct Annotator {
    font_scale: f64,
    line_thickness: i32,
    jpeg_quality: u8,
}

impl Annotator {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            font_scale: config.font_scale,
            line_thickness: config.line_thickness.max(1),
            jpeg_quality: config.jpeg_quality.clamp(1, 100),
        }
    }

    /// Draw every detection in place: red box, then `<Class> <conf>` above it.
    pub fn draw_detections(
        &self,
        frame: &mut RgbImage,
        detections: &[Detection],
        names: &ClassNames,
    ) -> Result<()> {
        let (w, h) = frame.dimensions();
        if w == 0 || h == 0 || detections.is_empty() {
            return Ok(());
        }

        let mut mat = rgb_to_mat(frame)?;
        let mut drawn = 0;
        for det in detections {
            if self.draw_one(&mut mat, det, names, w, h)? {
                drawn += 1;
            }
        }

        if drawn > 0 {
            *frame = mat_to_rgb(&mat)?;
        }
        Ok(())
    }

    /// Returns false for boxes that collapse once clipped to the frame.
    fn draw_one(&self, mat: &mut Mat, det: &Detection, names: &ClassNames, w: u32, h: u32) -> Result<bool> {
        let clip = |v: f32, limit: u32| (v as i32).clamp(0, limit as i32 - 1);
        let (x1, y1) = (clip(det.bbox.x1, w), clip(det.bbox.y1, h));
        let (x2, y2) = (clip(det.bbox.x2, w), clip(det.bbox.y2, h));
        if x2 <= x1 || y2 <= y1 {
            return Ok(false);
        }

        imgproc::rectangle_points(
            mat,
            core::Point::new(x1, y1),
            core::Point::new(x2, y2),
            box_color(),
            self.line_thickness,
            imgproc::LINE_8,
            0,
        )?;

        let label = format!("{} {:.2}", names.display(det.class_id), det.confidence);
        let baseline_y = (det.bbox.y1 - LABEL_OFFSET).max(0.0) as i32;
        imgproc::put_text(
            mat,
            &label,
            core::Point::new(x1, baseline_y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            self.font_scale,
            box_color(),
            self.line_thickness,
            imgproc::LINE_8,
            false,
        )?;

        Ok(true)
    }

    /// Copy `original`, draw on the copy and JPEG-encode it.
    pub fn render(
        &self,
        original: &RgbImage,
        detections: &[Detection],
        names: &ClassNames,
    ) -> Result<AnnotatedArtifact> {
        let mut canvas = original.clone();
        self.draw_detections(&mut canvas, detections, names)
            .context("Failed to draw detections")?;

        let mut buf = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality);
        canvas
            .write_with_encoder(encoder)
            .context("Failed to encode annotated JPEG")?;

        let jpeg = buf.into_inner();
        debug!("Annotated image encoded ({} bytes)", jpeg.len());
        Ok(AnnotatedArtifact {
            jpeg,
            width: canvas.width(),
            height: canvas.height(),
        })
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;
    use image::Rgb;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(BoundingBox::new(x1, y1, x2, y2), 0.87, 1)
    }

    #[test]
    fn test_box_outline_is_red_and_interior_untouched() {
        let mut frame = RgbImage::from_pixel(50, 50, Rgb([0, 80, 0]));
        Annotator::default()
            .draw_detections(&mut frame, &[det(10.0, 10.0, 40.0, 40.0)], &ClassNames::default())
            .unwrap();

        assert_eq!(frame.get_pixel(10, 25), &RED);
        assert_eq!(frame.get_pixel(25, 40), &RED);
        assert_eq!(frame.get_pixel(25, 25), &Rgb([0, 80, 0]));
        assert_eq!(frame.get_pixel(5, 45), &Rgb([0, 80, 0]));
    }

    #[test]
    fn test_label_is_drawn_above_box() {
        // Box top at y=50, so the label baseline sits at y=40 starting at x=20.
        let background = Rgb([30, 30, 30]);
        let mut frame = RgbImage::from_pixel(200, 100, background);
        Annotator::default()
            .draw_detections(&mut frame, &[det(20.0, 50.0, 120.0, 90.0)], &ClassNames::default())
            .unwrap();

        let mut label_pixels = 0;
        for y in 0..48 {
            for x in 0..200 {
                if frame.get_pixel(x, y) == &RED {
                    assert!(x >= 18, "label pixel left of x1 at ({}, {})", x, y);
                    assert!(y >= 20, "label pixel far above baseline at ({}, {})", x, y);
                    label_pixels += 1;
                }
            }
        }
        assert!(label_pixels > 30, "only {} label pixels", label_pixels);
    }

    #[test]
    fn test_render_leaves_original_untouched() {
        let original = RgbImage::from_pixel(32, 24, Rgb([200, 200, 200]));
        let artifact = Annotator::default()
            .render(&original, &[det(2.0, 2.0, 20.0, 20.0)], &ClassNames::default())
            .unwrap();

        assert_eq!(original.get_pixel(2, 10), &Rgb([200, 200, 200]));
        assert_eq!((artifact.width, artifact.height), (32, 24));
        assert!(artifact.to_data_url().starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn test_degenerate_and_offscreen_boxes_are_skipped() {
        let mut frame = RgbImage::new(10, 10);
        Annotator::default()
            .draw_detections(
                &mut frame,
                &[det(5.0, 5.0, 5.0, 9.0), det(-50.0, -50.0, -10.0, -10.0)],
                &ClassNames::default(),
            )
            .unwrap();
        assert!(frame.as_raw().iter().all(|&b| b == 0));
    }
}
