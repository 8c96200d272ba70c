// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub detection: DetectionConfig,
    pub enhancement: EnhancementConfig,
    pub merge: MergeConfig,
    pub report: ReportConfig,
    pub render: RenderConfig,
    pub batch: BatchConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
    pub input_size: usize,
    pub class_names: Vec<String>,
    pub nms_iou_threshold: f32,
    pub num_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/best.onnx".to_string(),
            input_size: 640,
            class_names: vec!["crack".to_string(), "pothole".to_string()],
            nms_iou_threshold: 0.45,
            num_threads: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub confidence_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    pub enabled: bool,
    pub clip_limit: f32,
    pub tile_grid: usize,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clip_limit: 3.0,
            tile_grid: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub padding: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { padding: 30.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1000,
            canvas_height: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Hershey font scale for box labels.
    pub font_scale: f64,
    pub line_thickness: i32,
    pub jpeg_quality: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_scale: 0.5,
            line_thickness: 2,
            jpeg_quality: 90,
        }
    }
}

/// Where the batch runner looks for media and writes reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub input_dir: String,
    pub output_dir: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: "input".to_string(),
            output_dir: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecChoice {
    pub fourcc: String,
    pub extension: String,
}

impl CodecChoice {
    fn new(fourcc: &str, extension: &str) -> Self {
        Self {
            fourcc: fourcc.to_string(),
            extension: extension.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Analyze every Nth frame.
    pub frame_stride: u64,
    /// Used when the container reports no usable frame rate.
    pub fallback_fps: f64,
    /// Tried in order when opening the output writer.
    pub codecs: Vec<CodecChoice>,
    /// Score severity on merged regions instead of raw detections.
    pub merge_before_scoring: bool,
    pub progress_log_interval: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frame_stride: 5,
            fallback_fps: 30.0,
            codecs: vec![
                CodecChoice::new("mp4v", "mp4"),
                CodecChoice::new("avc1", "mp4"),
                CodecChoice::new("h264", "mp4"),
                CodecChoice::new("XVID", "avi"),
            ],
            merge_before_scoring: false,
            progress_log_interval: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file is `None` rather than an error.
    pub fn load_if_present(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }
}
