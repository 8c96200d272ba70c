// src/detection/yolo.rs
//
// YOLO-family ONNX damage detector (ultralytics export layout).

use anyhow::{anyhow, Context, Result};
use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, info};

use super::backend::DamageDetector;
use crate::config::ModelConfig;
use crate::types::{BoundingBox, Detection};

/// Letterbox fill value used by ultralytics.
const PAD_VALUE: u8 = 114;

pub struct YoloDetector {
    session: Session,
    input_name: String,
    input_size: usize,
    nms_iou_threshold: f32,
}

/// Letterbox geometry needed to map boxes back to source pixels.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl YoloDetector {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        info!("Loading damage model: {}", config.path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.num_threads)?
            .commit_from_file(&config.path)
            .with_context(|| format!("Failed to load model {}", config.path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| anyhow!("model declares no inputs"))?;

        info!("✓ Damage model initialized (input '{}')", input_name);
        Ok(Self {
            session,
            input_name,
            input_size: config.input_size,
            nms_iou_threshold: config.nms_iou_threshold,
        })
    }

    fn preprocess(&self, frame: &RgbImage) -> (Vec<f32>, Letterbox) {
        let target = self.input_size;
        let (src_w, src_h) = frame.dimensions();

        // Fit inside target x target, keep aspect ratio, center on gray.
        let scale = (target as f32 / src_w as f32).min(target as f32 / src_h as f32);
        let scaled_w = ((src_w as f32 * scale) as u32).max(1);
        let scaled_h = ((src_h as f32 * scale) as u32).max(1);
        let pad_x = (target as u32 - scaled_w) as f32 / 2.0;
        let pad_y = (target as u32 - scaled_h) as f32 / 2.0;

        let resized = imageops::resize(frame, scaled_w, scaled_h, FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(target as u32, target as u32, Rgb([PAD_VALUE; 3]));
        imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

        // HWC [0, 255] -> CHW [0, 1]
        let plane = target * target;
        let mut input = vec![0.0f32; 3 * plane];
        for (i, px) in canvas.pixels().enumerate() {
            for c in 0..3 {
                input[c * plane + i] = px[c] as f32 / 255.0;
            }
        }

        (input, Letterbox { scale, pad_x, pad_y })
    }

    fn infer(&mut self, input: Vec<f32>) -> Result<(Vec<usize>, Vec<f32>)> {
        let shape = [1usize, 3, self.input_size, self.input_size];
        let tensor = ort::value::Tensor::from_array((shape, input))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .context("Inference failed")?;
        let (out_shape, data) = outputs[0].try_extract_tensor::<f32>()?;

        let dims = out_shape.iter().map(|&d| d.max(0) as usize).collect();
        Ok((dims, data.to_vec()))
    }

    /// Decode `[1, 4 + classes, anchors]` into source-pixel detections.
    fn postprocess(
        &self,
        shape: &[usize],
        output: &[f32],
        letterbox: Letterbox,
        src_w: f32,
        src_h: f32,
        conf_thresh: f32,
    ) -> Result<Vec<Detection>> {
        if shape.len() != 3 || shape[1] <= 4 {
            return Err(anyhow!("unexpected model output shape {:?}", shape));
        }
        let channels = shape[1];
        let anchors = shape[2];
        let num_classes = channels - 4;
        if output.len() < channels * anchors {
            return Err(anyhow!(
                "model output has {} values, expected {}",
                output.len(),
                channels * anchors
            ));
        }

        let mut detections = Vec::new();
        for i in 0..anchors {
            let cx = output[i];
            let cy = output[anchors + i];
            let w = output[anchors * 2 + i];
            let h = output[anchors * 3 + i];

            let mut best_conf = 0.0f32;
            let mut best_class = 0;
            for c in 0..num_classes {
                let conf = output[anchors * (4 + c) + i];
                if conf > best_conf {
                    best_conf = conf;
                    best_class = c;
                }
            }
            if best_conf < conf_thresh {
                continue;
            }

            // Center -> corners, then undo the letterbox.
            let unbox = |v: f32, pad: f32, limit: f32| ((v - pad) / letterbox.scale).clamp(0.0, limit);
            let bbox = BoundingBox::new(
                unbox(cx - w / 2.0, letterbox.pad_x, src_w),
                unbox(cy - h / 2.0, letterbox.pad_y, src_h),
                unbox(cx + w / 2.0, letterbox.pad_x, src_w),
                unbox(cy + h / 2.0, letterbox.pad_y, src_h),
            );

            detections.push(Detection::new(bbox, best_conf, best_class));
        }

        Ok(nms_per_class(detections, self.nms_iou_threshold))
    }
}

impl DamageDetector for YoloDetector {
    fn name(&self) -> &'static str {
        "onnx-yolo"
    }

    fn detect(&mut self, frame: &RgbImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let (input, letterbox) = self.preprocess(frame);
        let (shape, output) = self.infer(input)?;
        let detections = self.postprocess(
            &shape,
            &output,
            letterbox,
            width as f32,
            height as f32,
            confidence_threshold,
        )?;

        debug!("Detected {} damage boxes", detections.len());
        Ok(detections)
    }
}

/// Greedy NMS, applied independently per class.
fn nms_per_class(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();
    for det in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == det.class_id && k.bbox.iou(&det.bbox) >= iou_threshold);
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, conf: f32, class_id: usize) -> Detection {
        Detection::new(BoundingBox::new(x1, 0.0, x1 + 100.0, 100.0), conf, class_id)
    }

    #[test]
    fn test_nms_suppresses_within_class_only() {
        let kept = nms_per_class(
            vec![det(0.0, 0.6, 0), det(5.0, 0.9, 0), det(5.0, 0.8, 1), det(500.0, 0.3, 0)],
            0.45,
        );
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].confidence, 0.9);
        assert!(kept.iter().any(|d| d.class_id == 1));
        assert!(kept.iter().all(|d| d.confidence != 0.6));
    }
}
