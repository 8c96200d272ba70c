// src/detection/mod.rs

mod backend;
mod labels;
mod stub;

#[cfg(feature = "backend-ort")]
pub mod yolo;

pub use backend::{DamageDetector, Detector, DetectorStatus};
pub use labels::ClassNames;
pub use stub::StubDetector;

#[cfg(feature = "backend-ort")]
pub use yolo::YoloDetector;
