//! Detector adapter: stable interface over the external face detector.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::OnceCell;

use super::types::{
    DetectionError, DetectionResult, Emotion, FaceDetection, ModelLoadError,
};
use crate::camera::Frame;

/// External face localisation + expression classification.
pub trait FaceDetector: Send + Sync {
    /// Fetch and initialise whatever assets the detector needs.
    fn load_models(&self) -> BoxFuture<'_, Result<(), ModelLoadError>>;

    /// Run detection on a frame. Faces are returned in the detector's
    /// native order.
    fn detect<'a>(
        &'a self,
        frame: &'a Frame,
    ) -> BoxFuture<'a, Result<Vec<FaceDetection>, DetectionError>>;
}

/// Wraps a [`FaceDetector`] with once-only model loading and result
/// selection.
///
/// Clones share the same model cache. Construct one adapter at startup and
/// hand clones to every session.
#[derive(Clone)]
pub struct DetectorAdapter {
    detector: Arc<dyn FaceDetector>,
    models: Arc<OnceCell<Result<(), ModelLoadError>>>,
}

impl DetectorAdapter {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            detector,
            models: Arc::new(OnceCell::new()),
        }
    }

    /// Load detector assets at most once.
    ///
    /// Concurrent callers wait on the same in-flight load. A failed load is
    /// remembered and returned to every later caller without reloading.
    pub async fn ensure_models_loaded(&self) -> Result<(), ModelLoadError> {
        self.models
            .get_or_init(|| async {
                log::info!("Loading detection models");
                let result = self.detector.load_models().await;
                match &result {
                    Ok(()) => log::info!("Detection models loaded"),
                    Err(e) => log::error!("{}", e),
                }
                result
            })
            .await
            .clone()
    }

    /// `Some(true)` once models are loaded, `Some(false)` after a failed
    /// load, `None` before any load finished.
    pub fn models_loaded(&self) -> Option<bool> {
        self.models.get().map(|r| r.is_ok())
    }

    /// Classify the most relevant face in `frame`.
    ///
    /// Returns `Ok(None)` when no face is found. With several faces the
    /// first one in detector order is used.
    pub async fn detect(&self, frame: &Frame) -> Result<Option<DetectionResult>, DetectionError> {
        self.ensure_models_loaded().await?;

        let faces = self.detector.detect(frame).await?;
        if faces.len() > 1 {
            log::debug!("{} faces detected, using the first", faces.len());
        }
        match faces.first() {
            None => Ok(None),
            Some(face) => select_expression(face).map(Some),
        }
    }
}

/// Pick the highest scoring known expression of a face.
///
/// Equal scores resolve to the later candidate. Unknown labels and
/// non-finite scores are ignored.
pub fn select_expression(face: &FaceDetection) -> Result<DetectionResult, DetectionError> {
    let mut best: Option<DetectionResult> = None;

    for candidate in &face.expressions {
        let label = match candidate.label.parse::<Emotion>() {
            Ok(label) => label,
            Err(_) => {
                log::warn!("Ignoring unknown expression label '{}'", candidate.label);
                continue;
            }
        };
        if !candidate.score.is_finite() {
            log::warn!("Ignoring non-finite score for '{}'", candidate.label);
            continue;
        }
        let score = candidate.score.clamp(0.0, 1.0);
        if best.map_or(true, |b| score >= b.score) {
            best = Some(DetectionResult { label, score });
        }
    }

    best.ok_or(DetectionError::NoUsableExpression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ExpressionScore;

    fn face(scores: &[(&str, f32)]) -> FaceDetection {
        FaceDetection {
            expressions: scores
                .iter()
                .map(|(label, score)| ExpressionScore::new(*label, *score))
                .collect(),
        }
    }

    #[test]
    fn test_select_picks_arg_max() {
        let result =
            select_expression(&face(&[("happy", 0.8), ("neutral", 0.1), ("sad", 0.1)])).unwrap();
        assert_eq!(result.label, Emotion::Happy);
        assert!((result.score - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_select_tie_goes_to_later_candidate() {
        let result = select_expression(&face(&[("sad", 0.5), ("angry", 0.5)])).unwrap();
        assert_eq!(result.label, Emotion::Angry);
    }

    #[test]
    fn test_select_skips_unknown_and_nan() {
        let result =
            select_expression(&face(&[("bored", 0.9), ("happy", f32::NAN), ("neutral", 0.2)]))
                .unwrap();
        assert_eq!(result.label, Emotion::Neutral);
    }

    #[test]
    fn test_select_clamps_score() {
        let result = select_expression(&face(&[("surprised", 1.7)])).unwrap();
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_select_empty_face_is_error() {
        assert_eq!(
            select_expression(&FaceDetection::default()),
            Err(DetectionError::NoUsableExpression)
        );
    }
}
