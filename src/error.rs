// src/error.rs

use thiserror::Error;

/// Request-level failures. Anything not listed here degrades instead of failing.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("empty media payload")]
    EmptyPayload,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("unsupported or corrupt image: {0}")]
    Decode(String),

    #[error("could not open video: {0}")]
    VideoOpen(String),

    #[error("no codec could open the output writer (tried {})", tried.join(", "))]
    CodecNegotiation { tried: Vec<String> },

    #[error("video stream failed: {0}")]
    Stream(String),
}

impl From<image::ImageError> for AnalysisError {
    fn from(err: image::ImageError) -> Self {
        AnalysisError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_lists_attempts() {
        let err = AnalysisError::CodecNegotiation {
            tried: vec!["mp4v".into(), "XVID".into()],
        };
        assert_eq!(
            err.to_string(),
            "no codec could open the output writer (tried mp4v, XVID)"
        );
    }
}
