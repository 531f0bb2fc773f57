//! Face detection and expression classification.
//!
//! The model itself is external. This module wraps it behind
//! [`DetectorAdapter`], which loads model assets once and turns raw
//! per-face scores into a single [`DetectionResult`].

mod adapter;
mod http;
mod types;

pub use adapter::{select_expression, DetectorAdapter, FaceDetector};
pub use http::{HttpFaceDetector, DEFAULT_DETECTOR_URL, DEFAULT_MODELS};
pub use types::{
    DetectionError, DetectionResult, Emotion, ExpressionScore, FaceDetection, ModelLoadError,
};
