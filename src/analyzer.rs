// src/analyzer.rs
//
// Single-image analysis: decode, enhance, detect, merge, normalize, score,
// route and render.

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::annotate::Annotator;
use crate::config::Config;
use crate::detection::{ClassNames, Detector};
use crate::error::AnalysisError;
use crate::gps::{self, GpsLookup};
use crate::media;
use crate::merge::merge_overlapping;
use crate::normalize::{to_canvas, Canvas};
use crate::preprocessing::ContrastEnhancer;
use crate::routing::route;
use crate::severity;
use crate::types::{capitalize, AnalysisResult, ImageDimensions, Location, NormalizedBox};

pub const MODEL_NOT_LOADED: &str = "Model not loaded";

pub struct ImageAnalyzer {
    enhancer: Option<ContrastEnhancer>,
    annotator: Annotator,
    class_names: ClassNames,
    canvas: Canvas,
    confidence_threshold: f32,
    padding: f32,
}

impl ImageAnalyzer {
    pub fn new(config: &Config) -> Self {
        Self {
            enhancer: config
                .enhancement
                .enabled
                .then(|| ContrastEnhancer::from_config(&config.enhancement)),
            annotator: Annotator::from_config(&config.render),
            class_names: ClassNames::new(config.model.class_names.iter().cloned()),
            canvas: Canvas::new(config.report.canvas_width, config.report.canvas_height),
            confidence_threshold: config.detection.confidence_threshold,
            padding: config.merge.padding,
        }
    }

    /// Analyze a base64 payload (optionally a data URL).
    pub fn analyze_payload(
        &self,
        detector: &mut Detector,
        payload: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let bytes = media::decode_payload(payload)?;
        self.analyze_bytes(detector, &bytes)
    }

    /// Analyze encoded image bytes. Only undecodable input is an error.
    pub fn analyze_bytes(
        &self,
        detector: &mut Detector,
        bytes: &[u8],
    ) -> Result<AnalysisResult, AnalysisError> {
        let image = media::decode_image(bytes)?;

        let location = match gps::extract_location(bytes) {
            GpsLookup::Found(loc) => {
                debug!("EXIF location: {:.6}, {:.6}", loc.lat, loc.lng);
                Some(loc)
            }
            GpsLookup::Absent => {
                debug!("No EXIF location");
                None
            }
            GpsLookup::Malformed(reason) => {
                warn!("Ignoring malformed EXIF GPS data: {}", reason);
                None
            }
        };

        Ok(self.analyze_image(detector, &image, location))
    }

    /// Analyze a decoded frame. Never fails; problems show up in the result.
    pub fn analyze_image(
        &self,
        detector: &mut Detector,
        image: &RgbImage,
        location: Option<Location>,
    ) -> AnalysisResult {
        let backend = match detector {
            Detector::Ready(backend) => backend,
            Detector::Unavailable { reason } => {
                debug!("Skipping analysis, detector unavailable: {}", reason);
                return AnalysisResult::not_detected(MODEL_NOT_LOADED);
            }
        };

        let (width, height) = image.dimensions();

        // The detector sees the enhanced copy; the original is kept for rendering.
        let enhanced;
        let detector_input = match &self.enhancer {
            Some(enhancer) => {
                enhanced = enhancer.enhance_rgb(image).log_fallback("Contrast enhancement");
                &enhanced
            }
            None => image,
        };

        let detections = match backend.detect(detector_input, self.confidence_threshold) {
            Ok(dets) => dets,
            Err(e) => {
                warn!("Detector failed: {:#}", e);
                return AnalysisResult::not_detected(format!("Analysis error: {}", e));
            }
        };

        if detections.is_empty() {
            debug!("No boxes found");
            let mut result = AnalysisResult::not_detected(severity::describe(0));
            result.image_dimensions = Some(ImageDimensions { width, height });
            result.location = location;
            return result;
        }

        let merged = merge_overlapping(&detections, width, height, self.padding);
        debug!(
            "Merged {} detections into {} regions",
            detections.len(),
            merged.len()
        );

        let mut damage_types: Vec<String> = Vec::new();
        let mut bounding_boxes = Vec::new();
        let mut max_severity = 0u8;

        for region in &merged {
            let Some(canvas_box) = to_canvas(&region.bbox, width, height, self.canvas) else {
                debug!("Dropping degenerate region {:?}", region.bbox);
                continue;
            };

            let label = self.class_names.label(region.class_id);
            let level = severity::score(region.confidence, canvas_box.area_ratio(self.canvas));
            max_severity = max_severity.max(level);

            bounding_boxes.push(NormalizedBox {
                box_2d: canvas_box.to_array(),
                label: capitalize(&label),
            });
            if !damage_types.contains(&label) {
                damage_types.push(label);
            }
        }

        let mut description = severity::describe(max_severity).to_string();
        if !damage_types.is_empty() {
            description = format!("Detected {}: {}", damage_types.join(", "), description);
        }

        let processed_media_url = match self.annotator.render(image, &detections, &self.class_names) {
            Ok(artifact) => Some(artifact.to_data_url()),
            Err(e) => {
                warn!("Annotated image unavailable: {:#}", e);
                None
            }
        };

        let department = route(&damage_types);
        info!(
            "Image analyzed: {} regions, severity {}, routed to {}",
            bounding_boxes.len(),
            max_severity,
            department
        );

        AnalysisResult {
            detected: !bounding_boxes.is_empty(),
            damage_types,
            severity: max_severity,
            description,
            bounding_boxes,
            image_dimensions: Some(ImageDimensions { width, height }),
            processed_media_url,
            location,
            department,
        }
    }
}

impl Default for ImageAnalyzer {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
