// src/video/opencv_io.rs
//
// OpenCV-backed container I/O: BGR frames in and out, RGB in between.

use anyhow::{anyhow, Result};
use image::RgbImage;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst, VideoWriter, VideoWriterTrait},
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::frames::{FrameSink, FrameSource};
use crate::config::CodecChoice;
use crate::error::AnalysisError;
use crate::types::OutputDescriptor;

pub struct OpenCvFrameSource {
    cap: VideoCapture,
    fps: f64,
    pub width: i32,
    pub height: i32,
    pub total_frames: i64,
}

impl OpenCvFrameSource {
    pub fn open(path: &Path) -> Result<Self, AnalysisError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| AnalysisError::VideoOpen(format!("non UTF-8 path {}", path.display())))?;
        let open_err = |e: opencv::Error| AnalysisError::VideoOpen(format!("{}: {}", path.display(), e));

        let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY).map_err(open_err)?;
        if !cap.is_opened().map_err(open_err)? {
            return Err(AnalysisError::VideoOpen(format!(
                "{}: container could not be opened",
                path.display()
            )));
        }

        let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS).map_err(open_err)?;
        let total_frames =
            VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT).map_err(open_err)? as i64;
        let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH).map_err(open_err)? as i32;
        let height =
            VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT).map_err(open_err)? as i32;

        info!(
            "Video properties: {}x{} @ {:.1} FPS, {} frames",
            width, height, fps, total_frames
        );

        Ok(Self {
            cap,
            fps,
            width,
            height,
            total_frames,
        })
    }
}

impl FrameSource for OpenCvFrameSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let mut mat = Mat::default();
        if !VideoCaptureTrait::read(&mut self.cap, &mut mat)? || mat.empty() {
            return Ok(None);
        }

        let mut rgb_mat = Mat::default();
        imgproc::cvt_color(&mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB, 0)?;

        let (w, h) = (rgb_mat.cols() as u32, rgb_mat.rows() as u32);
        let data = rgb_mat.data_bytes()?.to_vec();
        let frame = RgbImage::from_raw(w, h, data)
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", w, h))?;
        Ok(Some(frame))
    }
}

pub struct OpenCvFrameSink {
    writer: VideoWriter,
    descriptor: OutputDescriptor,
    path: PathBuf,
}

impl OpenCvFrameSink {
    /// Open `<output_dir>/<stem>.<ext>` with the first codec that works.
    pub fn create(
        output_dir: &Path,
        stem: &str,
        width: i32,
        height: i32,
        fps: f64,
        codecs: &[CodecChoice],
    ) -> Result<Self, AnalysisError> {
        std::fs::create_dir_all(output_dir)
            .map_err(|e| AnalysisError::Stream(format!("{}: {}", output_dir.display(), e)))?;

        let mut rejected = Vec::new();
        for (attempt, choice) in codecs.iter().enumerate() {
            let path = output_dir.join(format!("{}.{}", stem, choice.extension));
            match try_open_writer(&path, choice, width, height, fps) {
                Ok(writer) => {
                    info!(
                        "Output video: {} (codec {})",
                        path.display(),
                        choice.fourcc
                    );
                    return Ok(Self {
                        writer,
                        descriptor: OutputDescriptor {
                            codec: choice.fourcc.clone(),
                            container: choice.extension.clone(),
                            fallback_used: attempt > 0,
                            rejected_codecs: rejected,
                        },
                        path,
                    });
                }
                Err(e) => {
                    warn!("Codec {} rejected: {:#}", choice.fourcc, e);
                    rejected.push(choice.fourcc.clone());
                }
            }
        }

        Err(AnalysisError::CodecNegotiation { tried: rejected })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn try_open_writer(path: &Path, choice: &CodecChoice, width: i32, height: i32, fps: f64) -> Result<VideoWriter> {
    let code: Vec<char> = choice.fourcc.chars().collect();
    if code.len() != 4 {
        return Err(anyhow!("fourcc must be 4 characters"));
    }
    let fourcc = VideoWriter::fourcc(code[0], code[1], code[2], code[3])?;

    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow!("non UTF-8 path {}", path.display()))?;
    let writer = VideoWriter::new(path_str, fourcc, fps, core::Size::new(width, height), true)?;
    if !writer.is_opened()? {
        return Err(anyhow!("writer did not open"));
    }
    Ok(writer)
}

impl FrameSink for OpenCvFrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let mat = Mat::from_slice(frame.as_raw())?;
        let mat = mat.reshape(3, frame.height() as i32)?;

        let mut bgr_mat = Mat::default();
        imgproc::cvt_color(&mat, &mut bgr_mat, imgproc::COLOR_RGB2BGR, 0)?;
        self.writer.write(&bgr_mat)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<Option<OutputDescriptor>> {
        self.writer.release()?;
        Ok(Some(self.descriptor.clone()))
    }
}
