// src/lib.rs
//
// Road damage detection-to-report pipeline.

pub mod analyzer;
pub mod annotate;
pub mod batch;
pub mod config;
pub mod detection;
pub mod error;
pub mod gps;
mod mat;
pub mod media;
pub mod merge;
pub mod normalize;
pub mod preprocessing;
pub mod routing;
pub mod severity;
pub mod stage;
pub mod types;
pub mod video;

pub use analyzer::ImageAnalyzer;
pub use config::Config;
pub use detection::{DamageDetector, Detector, DetectorStatus};
pub use error::AnalysisError;
pub use routing::Department;
pub use types::{AnalysisResult, VideoAnalysisResult};
pub use video::VideoAnalyzer;
