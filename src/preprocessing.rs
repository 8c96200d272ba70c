// src/preprocessing.rs
//
// Contrast enhancement ahead of detection.
//
// Shadows and flat lighting hide cracks. The detector therefore sees a copy
// whose lightness channel (CIE L*a*b*) has been equalized with CLAHE, while
// chroma is left alone so colors do not shift. The original frame is never
// modified; rendering always happens on it.

use image::{DynamicImage, RgbImage};
use opencv::{
    core::{self, Mat, Size, Vector},
    imgproc,
    prelude::*,
};

use crate::config::EnhancementConfig;
use crate::mat::{mat_to_rgb, rgb_to_mat};
use crate::stage::StageOutcome;

pub struct ContrastEnhancer {
    clip_limit: f32,
    tile_grid: usize,
}

impl ContrastEnhancer {
    pub fn new(clip_limit: f32, tile_grid: usize) -> Self {
        Self {
            clip_limit,
            tile_grid,
        }
    }

    pub fn from_config(config: &EnhancementConfig) -> Self {
        Self::new(config.clip_limit, config.tile_grid)
    }

    /// Enhance any decoded image. Only 8-bit RGB is processed; every other
    /// layout comes back unchanged.
    pub fn enhance(&self, image: &DynamicImage) -> StageOutcome<DynamicImage> {
        match image.as_rgb8() {
            Some(rgb) => match self.enhance_rgb(rgb) {
                StageOutcome::Applied(out) => StageOutcome::Applied(DynamicImage::ImageRgb8(out)),
                StageOutcome::Fallback { reason, .. } => {
                    StageOutcome::fallback(image.clone(), reason)
                }
            },
            None => StageOutcome::fallback(image.clone(), "not a 3-channel RGB buffer"),
        }
    }

    pub fn enhance_rgb(&self, image: &RgbImage) -> StageOutcome<RgbImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return StageOutcome::fallback(image.clone(), "empty buffer");
        }
        if self.tile_grid == 0 || !self.clip_limit.is_finite() {
            return StageOutcome::fallback(image.clone(), "invalid CLAHE parameters");
        }

        match self.clahe_on_lightness(image) {
            Ok(out) => StageOutcome::Applied(out),
            Err(e) => StageOutcome::fallback(image.clone(), format!("{:#}", e)),
        }
    }

    /// RGB -> Lab, CLAHE on L, Lab -> RGB.
    fn clahe_on_lightness(&self, image: &RgbImage) -> anyhow::Result<RgbImage> {
        let rgb = rgb_to_mat(image)?;

        let mut lab = Mat::default();
        imgproc::cvt_color(&rgb, &mut lab, imgproc::COLOR_RGB2Lab, 0)?;

        let mut channels = Vector::<Mat>::new();
        core::split(&lab, &mut channels)?;

        let grid = self.tile_grid as i32;
        let mut clahe = imgproc::create_clahe(self.clip_limit as f64, Size::new(grid, grid))?;
        let mut lightness = Mat::default();
        clahe.apply(&channels.get(0)?, &mut lightness)?;
        channels.set(0, lightness)?;

        let mut merged = Mat::default();
        core::merge(&channels, &mut merged)?;

        let mut out = Mat::default();
        imgproc::cvt_color(&merged, &mut out, imgproc::COLOR_Lab2RGB, 0)?;
        mat_to_rgb(&out)
    }
}

impl Default for ContrastEnhancer {
    fn default() -> Self {
        Self::from_config(&EnhancementConfig::default())
    }
}
