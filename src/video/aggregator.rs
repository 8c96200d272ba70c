// src/video/aggregator.rs
//
// Running summary of a video analysis, threaded through the frame loop as a
// plain value.

use std::collections::BTreeSet;

use crate::detection::ClassNames;
use crate::merge::merge_overlapping;
use crate::routing::route;
use crate::severity;
use crate::types::{
    capitalize, Detection, FrameBox, FrameDetectionRecord, OutputDescriptor, VideoAnalysisResult,
};

/// How a sampled frame's detections are turned into severity.
#[derive(Debug, Clone, Copy)]
pub struct SampleScoring<'a> {
    pub names: &'a ClassNames,
    pub frame_width: u32,
    pub frame_height: u32,
    /// `Some(padding)` scores merged regions instead of raw detections.
    pub merge_padding: Option<f32>,
}

impl SampleScoring<'_> {
    fn frame_area(&self) -> f32 {
        self.frame_width as f32 * self.frame_height as f32
    }

    fn area_ratio(&self, area: f32) -> f32 {
        let total = self.frame_area();
        if total > 0.0 {
            area / total
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoAggregate {
    /// Lower-cased labels seen so far.
    labels: BTreeSet<String>,
    max_severity: u8,
    timeline: Vec<FrameDetectionRecord>,
    frames_total: u64,
    frames_sampled: u64,
}

impl VideoAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame read from the source, sampled or not.
    pub fn observe_frame(&mut self) {
        self.frames_total += 1;
    }

    /// Fold in the detections of one sampled frame.
    pub fn absorb(&mut self, timestamp: f64, detections: &[Detection], scoring: &SampleScoring<'_>) {
        self.frames_sampled += 1;
        if detections.is_empty() {
            return;
        }

        let mut boxes = Vec::with_capacity(detections.len());
        for det in detections {
            let label = scoring.names.label(det.class_id);
            self.labels.insert(label.to_lowercase());

            boxes.push(FrameBox {
                bbox: [det.bbox.y1, det.bbox.x1, det.bbox.y2, det.bbox.x2],
                label: capitalize(&label),
                confidence: det.confidence,
            });
        }

        let frame_severity = match scoring.merge_padding {
            Some(padding) => merge_overlapping(
                detections,
                scoring.frame_width,
                scoring.frame_height,
                padding,
            )
            .iter()
            .map(|r| severity::score(r.confidence, scoring.area_ratio(r.bbox.area())))
            .max(),
            None => detections
                .iter()
                .map(|d| severity::score(d.confidence, scoring.area_ratio(d.bbox.area())))
                .max(),
        };
        self.max_severity = self.max_severity.max(frame_severity.unwrap_or(0));

        self.timeline.push(FrameDetectionRecord { timestamp, boxes });
    }

    /// Combine with the aggregate of a later, disjoint frame range.
    pub fn merge(mut self, later: VideoAggregate) -> VideoAggregate {
        self.labels.extend(later.labels);
        self.max_severity = self.max_severity.max(later.max_severity);
        self.timeline.extend(later.timeline);
        self.timeline
            .sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        self.frames_total += later.frames_total;
        self.frames_sampled += later.frames_sampled;
        self
    }

    pub fn max_severity(&self) -> u8 {
        self.max_severity
    }

    pub fn frames_total(&self) -> u64 {
        self.frames_total
    }

    pub fn frames_sampled(&self) -> u64 {
        self.frames_sampled
    }

    pub fn timeline(&self) -> &[FrameDetectionRecord] {
        &self.timeline
    }

    pub fn finalize(self, output: Option<OutputDescriptor>) -> VideoAnalysisResult {
        let damage_types: Vec<String> = self.labels.iter().map(|l| capitalize(l)).collect();
        let description = if damage_types.is_empty() {
            "No significant damage detected.".to_string()
        } else {
            format!("Analysis Complete. Found: {}", damage_types.join(", "))
        };

        VideoAnalysisResult {
            detected: !self.labels.is_empty(),
            department: route(&self.labels),
            damage_types,
            severity: self.max_severity,
            description,
            video_detections: self.timeline,
            frames_total: self.frames_total,
            frames_sampled: self.frames_sampled,
            output,
        }
    }
}
