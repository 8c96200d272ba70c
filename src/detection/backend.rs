// src/detection/backend.rs

use anyhow::Result;
use image::RgbImage;
use serde::Serialize;
#[cfg(feature = "backend-ort")]
use tracing::info;
use tracing::warn;

use crate::config::ModelConfig;
use crate::types::Detection;

/// An object detector producing damage boxes in source-pixel coordinates.
///
/// Implementations must return an empty list, not an error, for blank input.
pub trait DamageDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    fn detect(&mut self, frame: &RgbImage, confidence_threshold: f32) -> Result<Vec<Detection>>;
}

/// The detection capability handed to the pipelines.
///
/// `Unavailable` is a normal state (no model file, backend not compiled in);
/// every analysis then reports "not detected" instead of failing.
pub enum Detector {
    Ready(Box<dyn DamageDetector>),
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorStatus {
    pub model_loaded: bool,
    pub backend: Option<String>,
    pub reason: Option<String>,
}

impl Detector {
    pub fn ready<D: DamageDetector + 'static>(detector: D) -> Self {
        Detector::Ready(Box::new(detector))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Detector::Unavailable {
            reason: reason.into(),
        }
    }

    /// Build the configured backend. Load failures become `Unavailable`.
    pub fn from_config(config: &ModelConfig) -> Self {
        #[cfg(feature = "backend-ort")]
        {
            match super::yolo::YoloDetector::new(config) {
                Ok(detector) => {
                    info!("✓ Damage detector ready ({})", config.path);
                    Detector::ready(detector)
                }
                Err(e) => {
                    warn!("Model unavailable, analysis disabled: {:#}", e);
                    Detector::unavailable(format!("{:#}", e))
                }
            }
        }
        #[cfg(not(feature = "backend-ort"))]
        {
            warn!(
                "Built without an inference backend; {} not loaded, analysis disabled",
                config.path
            );
            Detector::unavailable("built without the backend-ort feature")
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Detector::Ready(_))
    }

    pub fn status(&self) -> DetectorStatus {
        match self {
            Detector::Ready(d) => DetectorStatus {
                model_loaded: true,
                backend: Some(d.name().to_string()),
                reason: None,
            },
            Detector::Unavailable { reason } => DetectorStatus {
                model_loaded: false,
                backend: None,
                reason: Some(reason.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::StubDetector;

    #[test]
    fn test_status_reports_variant() {
        let ready = Detector::ready(StubDetector::empty());
        assert!(ready.is_available());
        assert_eq!(ready.status().backend.as_deref(), Some("stub"));

        let missing = Detector::unavailable("no model file");
        assert!(!missing.is_available());
        let status = missing.status();
        assert!(!status.model_loaded);
        assert_eq!(status.reason.as_deref(), Some("no model file"));
    }

    #[cfg(not(feature = "backend-ort"))]
    #[test]
    fn test_from_config_without_backend_is_unavailable() {
        let detector = Detector::from_config(&ModelConfig::default());
        assert!(!detector.is_available());
    }
}
