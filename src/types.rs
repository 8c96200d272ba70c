// src/types.rs

use serde::{Deserialize, Serialize};

use crate::routing::Department;

// ============================================================================
// GEOMETRY
// ============================================================================

/// Axis-aligned box in pixel space, corner format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Strict rectangle intersection. Touching edges do not count.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x1.max(other.x1) < self.x2.min(other.x2)
            && self.y1.max(other.y1) < self.y2.min(other.y2)
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Grow by `padding` on every side, clamped to `[0, width] x [0, height]`.
    pub fn expand_clamped(&self, padding: f32, width: f32, height: f32) -> BoundingBox {
        BoundingBox {
            x1: (self.x1 - padding).max(0.0),
            y1: (self.y1 - padding).max(0.0),
            x2: (self.x2 + padding).min(width),
            y2: (self.y2 + padding).min(height),
        }
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

// ============================================================================
// DETECTOR OUTPUT AND MERGED REGIONS
// ============================================================================

/// One raw detector output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, class_id: usize) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }
}

/// A cluster of same-class detections collapsed to one box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedRegion {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: usize,
}

// ============================================================================
// IMAGE REPORT
// ============================================================================

/// Region on the logical report canvas. `box_2d` is `[ymin, xmin, ymax, xmax]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub box_2d: [u32; 4],
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub detected: bool,
    pub damage_types: Vec<String>,
    pub severity: u8,
    pub description: String,
    pub bounding_boxes: Vec<NormalizedBox>,
    pub image_dimensions: Option<ImageDimensions>,
    pub processed_media_url: Option<String>,
    pub location: Option<Location>,
    pub department: Department,
}

impl AnalysisResult {
    /// A "nothing found" result with the full shape filled in.
    pub fn not_detected(description: impl Into<String>) -> Self {
        Self {
            detected: false,
            damage_types: Vec::new(),
            severity: 0,
            description: description.into(),
            bounding_boxes: Vec::new(),
            image_dimensions: None,
            processed_media_url: None,
            location: None,
            department: Department::Roads,
        }
    }
}

// ============================================================================
// VIDEO REPORT
// ============================================================================

/// Pixel-space box on one frame. `bbox` is `[ymin, xmin, ymax, xmax]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameBox {
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDetectionRecord {
    pub timestamp: f64,
    pub boxes: Vec<FrameBox>,
}

/// How the output stream was encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDescriptor {
    pub codec: String,
    pub container: String,
    pub fallback_used: bool,
    pub rejected_codecs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalysisResult {
    pub detected: bool,
    pub damage_types: Vec<String>,
    pub severity: u8,
    pub description: String,
    pub video_detections: Vec<FrameDetectionRecord>,
    pub department: Department,
    pub frames_total: u64,
    pub frames_sampled: u64,
    pub output: Option<OutputDescriptor>,
}

/// Python-style capitalize: first character upper case, the rest lower case.
pub fn capitalize(label: &str) -> String {
    let lower = label.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
