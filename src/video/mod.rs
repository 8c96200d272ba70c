// src/video/mod.rs

mod aggregator;
mod frames;
mod processor;
pub mod opencv_io;

pub use aggregator::{SampleScoring, VideoAggregate};
pub use frames::{FrameCollector, FrameSink, FrameSource, MemoryFrameSource};
pub use processor::VideoAnalyzer;
pub use opencv_io::{OpenCvFrameSink, OpenCvFrameSource};
