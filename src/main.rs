// src/main.rs

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use roadguard::batch::{self, MediaKind};
use roadguard::{Config, Detector, ImageAnalyzer, VideoAnalyzer};

#[derive(Default)]
struct RunStats {
    images: usize,
    videos: usize,
    with_damage: usize,
    failed: usize,
}

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let loaded = Config::load_if_present(&config_path)?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("roadguard={},ort=warn", config.logging.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🛣️  Road damage analysis starting");
    if found {
        info!("✓ Configuration loaded from {}", config_path);
    } else {
        warn!("Config {} not found, using defaults", config_path);
    }

    let mut detector = Detector::from_config(&config.model);
    let status = detector.status();
    info!("Detector status: {}", serde_json::to_string(&status)?);

    let media = batch::find_media(&config.batch.input_dir);
    if media.is_empty() {
        error!("No images or videos found in {}", config.batch.input_dir);
        return Ok(());
    }

    let image_analyzer = ImageAnalyzer::new(&config);
    let video_analyzer = VideoAnalyzer::new(&config);
    let mut stats = RunStats::default();

    for (idx, (path, kind)) in media.iter().enumerate() {
        info!("Processing {}/{}: {}", idx + 1, media.len(), path.display());

        let outcome = match kind {
            MediaKind::Image => {
                stats.images += 1;
                process_image(path, &image_analyzer, &mut detector, &config)
            }
            MediaKind::Video => {
                stats.videos += 1;
                process_video(path, &video_analyzer, &mut detector, &config)
            }
        };

        match outcome {
            Ok(true) => stats.with_damage += 1,
            Ok(false) => {}
            Err(e) => {
                error!("Failed to process {}: {:#}", path.display(), e);
                stats.failed += 1;
            }
        }
    }

    info!("========================================");
    info!("✓ Run complete");
    info!("  Images: {}", stats.images);
    info!("  Videos: {}", stats.videos);
    info!("  With damage: {}", stats.with_damage);
    if stats.failed > 0 {
        warn!("  Failed: {}", stats.failed);
    }
    info!("  Reports in {}", config.batch.output_dir);

    Ok(())
}

/// Writes the report and returns whether damage was found.
fn process_image(
    path: &Path,
    analyzer: &ImageAnalyzer,
    detector: &mut Detector,
    config: &Config,
) -> Result<bool> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let result = analyzer.analyze_bytes(detector, &bytes)?;

    let report = batch::report_path(&config.batch.output_dir, path);
    batch::write_report(&report, &result)?;
    info!(
        "  {} (severity {}, {}) -> {}",
        result.description,
        result.severity,
        result.department,
        report.display()
    );
    Ok(result.detected)
}

fn process_video(
    path: &Path,
    analyzer: &VideoAnalyzer,
    detector: &mut Detector,
    config: &Config,
) -> Result<bool> {
    use roadguard::video::{FrameSource, OpenCvFrameSink, OpenCvFrameSource};

    let mut source = OpenCvFrameSource::open(path)?;
    let fps = source.fps();
    let mut sink = OpenCvFrameSink::create(
        Path::new(&config.batch.output_dir),
        &format!("{}_processed", batch::file_stem(path)),
        source.width,
        source.height,
        if fps.is_finite() && fps > 0.0 { fps } else { config.video.fallback_fps },
        &config.video.codecs,
    )?;

    let result = analyzer.run(detector, &mut source, &mut sink)?;
    info!("  Annotated video -> {}", sink.path().display());

    let report = batch::report_path(&config.batch.output_dir, path);
    batch::write_report(&report, &result)?;
    info!(
        "  {} (severity {}, {} timeline entries) -> {}",
        result.description,
        result.severity,
        result.video_detections.len(),
        report.display()
    );
    Ok(result.detected)
}
