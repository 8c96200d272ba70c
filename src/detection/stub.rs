// src/detection/stub.rs

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::collections::VecDeque;

use super::backend::DamageDetector;
use crate::types::Detection;

/// Scripted detector for tests and dry runs.
///
/// Each call pops the next scripted response; once the script is used up
/// the fallback response repeats. Blank (single-color) frames always yield
/// nothing, as a real model would.
pub struct StubDetector {
    script: VecDeque<Result<Vec<Detection>, String>>,
    fallback: Vec<Detection>,
    calls: usize,
}

impl StubDetector {
    pub fn empty() -> Self {
        Self::repeating(Vec::new())
    }

    /// Always return `detections` (filtered by threshold).
    pub fn repeating(detections: Vec<Detection>) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: detections,
            calls: 0,
        }
    }

    /// Queue a response for the next call.
    pub fn then_return(mut self, detections: Vec<Detection>) -> Self {
        self.script.push_back(Ok(detections));
        self
    }

    /// Queue a failure for the next call.
    pub fn then_fail(mut self, message: &str) -> Self {
        self.script.push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl DamageDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &RgbImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        self.calls += 1;

        let response = match self.script.pop_front() {
            Some(Ok(dets)) => dets,
            Some(Err(msg)) => return Err(anyhow!(msg)),
            None => self.fallback.clone(),
        };

        if is_blank(frame) {
            return Ok(Vec::new());
        }

        Ok(response
            .into_iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .collect())
    }
}

fn is_blank(frame: &RgbImage) -> bool {
    let mut pixels = frame.pixels();
    match pixels.next() {
        Some(first) => pixels.all(|p| p == first),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;
    use image::Rgb;

    fn det(conf: f32) -> Detection {
        Detection::new(BoundingBox::new(0.0, 0.0, 4.0, 4.0), conf, 0)
    }

    #[test]
    fn test_script_then_fallback() {
        let frame = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 20) as u8, (y * 20) as u8, 50]));
        let mut stub = StubDetector::repeating(vec![det(0.9)])
            .then_fail("boom")
            .then_return(vec![det(0.05), det(0.3)]);

        assert!(stub.detect(&frame, 0.1).is_err());
        assert_eq!(stub.detect(&frame, 0.1).unwrap().len(), 1);
        assert_eq!(stub.detect(&frame, 0.1).unwrap().len(), 1);
        assert_eq!(stub.calls(), 3);
    }

    #[test]
    fn test_blank_frame_yields_nothing() {
        let mut stub = StubDetector::repeating(vec![det(0.9)]);
        assert!(stub.detect(&RgbImage::new(8, 8), 0.1).unwrap().is_empty());
        let gray = RgbImage::from_pixel(8, 8, Rgb([90, 90, 90]));
        assert!(stub.detect(&gray, 0.1).unwrap().is_empty());
    }
}
