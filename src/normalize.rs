// src/normalize.rs
//
// Pixel space -> logical report canvas.

use crate::types::BoundingBox;

/// Logical canvas the image report is expressed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(1000, 1000)
    }
}

/// Integer canvas box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasBox {
    pub ymin: u32,
    pub xmin: u32,
    pub ymax: u32,
    pub xmax: u32,
}

impl CanvasBox {
    pub fn area(&self) -> u64 {
        (self.xmax - self.xmin) as u64 * (self.ymax - self.ymin) as u64
    }

    /// Fraction of the canvas covered.
    pub fn area_ratio(&self, canvas: Canvas) -> f32 {
        let total = canvas.area();
        if total == 0 {
            return 0.0;
        }
        (self.area() as f64 / total as f64) as f32
    }

    /// `[ymin, xmin, ymax, xmax]`, the order reports use.
    pub fn to_array(self) -> [u32; 4] {
        [self.ymin, self.xmin, self.ymax, self.xmax]
    }
}

/// Rescale a pixel box onto `canvas`.
///
/// Coordinates are truncated toward zero, then clamped to the canvas.
/// Returns `None` for a box that collapses on either axis.
pub fn to_canvas(bbox: &BoundingBox, src_width: u32, src_height: u32, canvas: Canvas) -> Option<CanvasBox> {
    if src_width == 0 || src_height == 0 {
        return None;
    }

    let scale = |v: f32, src: u32, target: u32| -> u32 {
        let scaled = (v as f64 / src as f64) * target as f64;
        if scaled.is_nan() {
            return 0;
        }
        (scaled.trunc().max(0.0) as u64).min(target as u64) as u32
    };

    let out = CanvasBox {
        ymin: scale(bbox.y1, src_height, canvas.height),
        xmin: scale(bbox.x1, src_width, canvas.width),
        ymax: scale(bbox.y2, src_height, canvas.height),
        xmax: scale(bbox.x2, src_width, canvas.width),
    };

    if out.ymin >= out.ymax || out.xmin >= out.xmax {
        return None;
    }
    Some(out)
}
