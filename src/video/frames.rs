// src/video/frames.rs
//
// Frame transport in and out of the video analyzer.

use anyhow::Result;
use image::RgbImage;
use std::collections::VecDeque;

use crate::types::OutputDescriptor;

/// Decoded RGB frames in presentation order.
pub trait FrameSource {
    /// Frame rate as reported by the container. May be 0 or NaN.
    fn fps(&self) -> f64;

    /// `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Receives every frame, annotated or not, in order.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush and close. Returns how the output was encoded, if it was.
    fn finish(&mut self) -> Result<Option<OutputDescriptor>>;
}

pub struct MemoryFrameSource {
    frames: VecDeque<RgbImage>,
    fps: f64,
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Self {
        Self {
            frames: frames.into(),
            fps,
        }
    }
}

impl FrameSource for MemoryFrameSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }
}

/// Keeps written frames in memory.
#[derive(Default)]
pub struct FrameCollector {
    frames: Vec<RgbImage>,
    finished: bool,
}

impl FrameCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for FrameCollector {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<Option<OutputDescriptor>> {
        self.finished = true;
        Ok(None)
    }
}
