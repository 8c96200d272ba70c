// src/media.rs
//
// Inbound media decoding: base64 payloads and encoded image bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbImage;

use crate::error::AnalysisError;

/// Decode a base64 payload, with or without a `data:<mime>;base64,` header.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, AnalysisError> {
    let body = match payload.find(',') {
        Some(idx) => &payload[idx + 1..],
        None => payload,
    };
    let body = body.trim();
    if body.is_empty() {
        return Err(AnalysisError::EmptyPayload);
    }

    let bytes = STANDARD.decode(body)?;
    if bytes.is_empty() {
        return Err(AnalysisError::EmptyPayload);
    }
    Ok(bytes)
}

/// Decode any format the `image` crate understands into 8-bit RGB.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, AnalysisError> {
    if bytes.is_empty() {
        return Err(AnalysisError::EmptyPayload);
    }
    let image = image::load_from_memory(bytes)?;
    Ok(image.to_rgb8())
}
