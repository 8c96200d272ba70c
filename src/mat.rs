// src/mat.rs
//
// RgbImage <-> OpenCV Mat. Mats built here keep RGB channel order.

use anyhow::{anyhow, Result};
use image::RgbImage;
use opencv::{core::Mat, prelude::*};

/// Owned 3-channel Mat holding a copy of `image`.
pub fn rgb_to_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let flat = Mat::from_slice(image.as_raw())?;
    let shaped = flat.reshape(3, image.height() as i32)?;
    shaped.try_clone()
}

pub fn mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    let (w, h) = (mat.cols() as u32, mat.rows() as u32);
    let data = if mat.is_continuous() {
        mat.data_bytes()?.to_vec()
    } else {
        mat.try_clone()?.data_bytes()?.to_vec()
    };
    RgbImage::from_raw(w, h, data).ok_or_else(|| anyhow!("Mat buffer does not match {}x{} RGB", w, h))
}
