// src/video/processor.rs
//
// Streaming video analysis. Every frame goes to the sink; every Nth frame is
// enhanced, run through the detector and annotated before it does.

use tracing::{debug, info, warn};

use super::aggregator::{SampleScoring, VideoAggregate};
use super::frames::{FrameSink, FrameSource};
use crate::analyzer::MODEL_NOT_LOADED;
use crate::annotate::Annotator;
use crate::config::Config;
use crate::detection::{ClassNames, Detector};
use crate::error::AnalysisError;
use crate::preprocessing::ContrastEnhancer;
use crate::types::{Detection, VideoAnalysisResult};

pub struct VideoAnalyzer {
    enhancer: Option<ContrastEnhancer>,
    annotator: Annotator,
    class_names: ClassNames,
    confidence_threshold: f32,
    frame_stride: u64,
    fallback_fps: f64,
    merge_padding: Option<f32>,
    progress_log_interval: u64,
}

impl VideoAnalyzer {
    pub fn new(config: &Config) -> Self {
        Self {
            enhancer: config
                .enhancement
                .enabled
                .then(|| ContrastEnhancer::from_config(&config.enhancement)),
            annotator: Annotator::from_config(&config.render),
            class_names: ClassNames::new(config.model.class_names.iter().cloned()),
            confidence_threshold: config.detection.confidence_threshold,
            frame_stride: config.video.frame_stride.max(1),
            fallback_fps: config.video.fallback_fps,
            merge_padding: config
                .video
                .merge_before_scoring
                .then_some(config.merge.padding),
            progress_log_interval: config.video.progress_log_interval,
        }
    }

    /// Stream `source` into `sink`, folding sampled frames into a report.
    ///
    /// A read error on the source ends the stream early; whatever was
    /// processed so far is still reported. A write error on the sink aborts.
    pub fn run<S, K>(
        &self,
        detector: &mut Detector,
        source: &mut S,
        sink: &mut K,
    ) -> Result<VideoAnalysisResult, AnalysisError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let fps = self.effective_fps(source.fps());
        if !detector.is_available() {
            warn!("Detector unavailable, frames are copied without analysis");
        }

        let mut aggregate = VideoAggregate::new();
        let mut index: u64 = 0;

        loop {
            let mut frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!("Frame {} unreadable, ending stream: {:#}", index, e);
                    break;
                }
            };
            aggregate.observe_frame();

            if index % self.frame_stride == 0 {
                if let Detector::Ready(backend) = detector {
                    let detections = self.detect_frame(backend.as_mut(), &frame, index);

                    if let Err(e) = self
                        .annotator
                        .draw_detections(&mut frame, &detections, &self.class_names)
                    {
                        warn!("Frame {}: annotation failed, writing it undrawn: {:#}", index, e);
                    }

                    let scoring = SampleScoring {
                        names: &self.class_names,
                        frame_width: frame.width(),
                        frame_height: frame.height(),
                        merge_padding: self.merge_padding,
                    };
                    aggregate.absorb(index as f64 / fps, &detections, &scoring);
                }
            }

            sink.write_frame(&frame)
                .map_err(|e| AnalysisError::Stream(format!("frame {}: {:#}", index, e)))?;

            index += 1;
            if self.progress_log_interval > 0 && index % self.progress_log_interval == 0 {
                debug!(
                    "Processed {} frames ({} sampled, severity so far {})",
                    index,
                    aggregate.frames_sampled(),
                    aggregate.max_severity()
                );
            }
        }

        let output = sink
            .finish()
            .map_err(|e| AnalysisError::Stream(format!("closing output: {:#}", e)))?;

        let mut result = aggregate.finalize(output);
        if !detector.is_available() {
            result.description = MODEL_NOT_LOADED.to_string();
        }

        info!(
            "Video analyzed: {} frames ({} sampled), {} with damage, severity {}",
            result.frames_total,
            result.frames_sampled,
            result.video_detections.len(),
            result.severity
        );
        Ok(result)
    }

    fn effective_fps(&self, reported: f64) -> f64 {
        if reported.is_finite() && reported > 0.0 {
            reported
        } else {
            warn!(
                "Source reports fps {}, using {} for timestamps",
                reported, self.fallback_fps
            );
            self.fallback_fps
        }
    }

    fn detect_frame(
        &self,
        backend: &mut dyn crate::detection::DamageDetector,
        frame: &image::RgbImage,
        index: u64,
    ) -> Vec<Detection> {
        let result = match &self.enhancer {
            Some(enhancer) => {
                let enhanced = enhancer.enhance_rgb(frame).log_fallback("Contrast enhancement");
                backend.detect(&enhanced, self.confidence_threshold)
            }
            None => backend.detect(frame, self.confidence_threshold),
        };

        result.unwrap_or_else(|e| {
            warn!("Detection failed on frame {}, treating as empty: {:#}", index, e);
            Vec::new()
        })
    }
}

impl Default for VideoAnalyzer {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::StubDetector;
    use crate::routing::Department;
    use crate::types::{BoundingBox, OutputDescriptor};
    use crate::video::{FrameCollector, MemoryFrameSource};
    use anyhow::anyhow;
    use image::{Rgb, RgbImage};

    fn blank_frames(n: usize) -> Vec<RgbImage> {
        (0..n).map(|_| RgbImage::new(64, 48)).collect()
    }

    fn textured_frames(n: usize) -> Vec<RgbImage> {
        (0..n)
            .map(|_| RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 3) as u8, (y * 4) as u8, 70])))
            .collect()
    }

    fn pothole() -> Detection {
        Detection::new(BoundingBox::new(10.0, 10.0, 30.0, 30.0), 0.8, 1)
    }

    #[test]
    fn test_blank_video_reports_nothing() {
        let mut detector = Detector::ready(StubDetector::repeating(vec![pothole()]));
        let mut source = MemoryFrameSource::new(blank_frames(12), 24.0);
        let mut sink = FrameCollector::new();

        let result = VideoAnalyzer::default()
            .run(&mut detector, &mut source, &mut sink)
            .unwrap();

        assert!(!result.detected);
        assert!(result.video_detections.is_empty());
        assert_eq!(result.severity, 0);
        assert_eq!(result.description, "No significant damage detected.");
        assert_eq!(sink.frames().len(), 12);
        assert!(sink.is_finished());
        assert_eq!(result.frames_total, 12);
        // Frames 0, 5, 10.
        assert_eq!(result.frames_sampled, 3);
    }

    #[test]
    fn test_sampled_frames_are_annotated_and_timed() {
        let mut detector = Detector::ready(StubDetector::repeating(vec![pothole()]));
        let frames = textured_frames(7);
        let untouched = frames[1].clone();
        let mut source = MemoryFrameSource::new(frames, 10.0);
        let mut sink = FrameCollector::new();

        let result = VideoAnalyzer::default()
            .run(&mut detector, &mut source, &mut sink)
            .unwrap();

        assert!(result.detected);
        assert_eq!(result.damage_types, vec!["Pothole".to_string()]);
        let stamps: Vec<f64> = result.video_detections.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![0.0, 0.5]);
        assert_eq!(result.video_detections[0].boxes[0].bbox, [10.0, 10.0, 30.0, 30.0]);

        // 20x20 on 64x48 is 13% of the frame at 0.8 confidence.
        assert_eq!(result.severity, 3);
        assert_eq!(result.department, Department::Roads);

        assert_eq!(sink.frames()[0].get_pixel(10, 20), &Rgb([255, 0, 0]));
        assert_eq!(sink.frames()[1], untouched);
        assert_eq!(sink.frames().len(), 7);
    }

    #[test]
    fn test_detector_failure_is_an_empty_frame() {
        let stub = StubDetector::repeating(vec![pothole()]).then_fail("device lost");
        let mut detector = Detector::ready(stub);
        let mut source = MemoryFrameSource::new(textured_frames(6), 30.0);
        let mut sink = FrameCollector::new();

        let result = VideoAnalyzer::default()
            .run(&mut detector, &mut source, &mut sink)
            .unwrap();

        assert_eq!(result.video_detections.len(), 1);
        assert!((result.video_detections[0].timestamp - 5.0 / 30.0).abs() < 1e-9);
        assert_eq!(sink.frames().len(), 6);
    }

    #[test]
    fn test_zero_fps_falls_back() {
        let mut detector = Detector::ready(StubDetector::repeating(vec![pothole()]));
        let mut source = MemoryFrameSource::new(textured_frames(6), 0.0);
        let mut sink = FrameCollector::new();

        let result = VideoAnalyzer::default()
            .run(&mut detector, &mut source, &mut sink)
            .unwrap();

        let last = result.video_detections.last().unwrap();
        assert!((last.timestamp - 5.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_unavailable_model_passes_frames_through() {
        let mut detector = Detector::unavailable("no model");
        let frames = textured_frames(4);
        let first = frames[0].clone();
        let mut source = MemoryFrameSource::new(frames, 25.0);
        let mut sink = FrameCollector::new();

        let result = VideoAnalyzer::default()
            .run(&mut detector, &mut source, &mut sink)
            .unwrap();

        assert!(!result.detected);
        assert_eq!(result.description, MODEL_NOT_LOADED);
        assert_eq!(sink.frames().len(), 4);
        assert_eq!(sink.frames()[0], first);
        assert_eq!(result.frames_sampled, 0);
    }

    struct FailingSink;

    impl FrameSink for FailingSink {
        fn write_frame(&mut self, _frame: &RgbImage) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }

        fn finish(&mut self) -> anyhow::Result<Option<OutputDescriptor>> {
            Ok(None)
        }
    }

    #[test]
    fn test_sink_failure_aborts() {
        let mut detector = Detector::ready(StubDetector::empty());
        let mut source = MemoryFrameSource::new(textured_frames(3), 25.0);

        let err = VideoAnalyzer::default()
            .run(&mut detector, &mut source, &mut FailingSink)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Stream(ref msg) if msg.contains("disk full")));
    }
}
