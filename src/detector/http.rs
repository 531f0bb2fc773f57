//! HttpFaceDetector - runs detection on a remote inference service.

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Deserialize;

use super::adapter::FaceDetector;
use super::types::{DetectionError, FaceDetection, ModelLoadError};
use crate::camera::Frame;

/// Default base URL of the inference service.
pub const DEFAULT_DETECTOR_URL: &str = "http://localhost:8000";

/// Models fetched before the first detection.
pub const DEFAULT_MODELS: &[&str] = &["tiny_face_detector", "face_expression_net"];

/// Default timeout for HTTP requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response body of the detect endpoint.
#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<FaceDetection>,
}

/// Client for a face detection service reachable over HTTP.
pub struct HttpFaceDetector {
    base_url: String,
    models: Vec<String>,
    http_client: reqwest::Client,
}

impl HttpFaceDetector {
    /// Create a detector for the given service URL using the default models.
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_models(
            base_url,
            DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        )
    }

    /// Create a detector with an explicit model list.
    pub fn with_models(
        base_url: impl Into<String>,
        models: Vec<String>,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            models,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    async fn fetch_model(&self, name: &str) -> Result<(), ModelLoadError> {
        let url = format!("{}/models/{}", self.base_url, name);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ModelLoadError::new(format!("{}: {}", name, e)))?;

        if !response.status().is_success() {
            return Err(ModelLoadError::new(format!(
                "{}: server returned {}",
                name,
                response.status()
            )));
        }
        log::debug!("Model '{}' available", name);
        Ok(())
    }

    async fn run_detection(&self, frame: &Frame) -> Result<Vec<FaceDetection>, DetectionError> {
        let url = format!("{}/detect", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", frame.mime_type.as_str())
            .body(frame.data.clone())
            .send()
            .await
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DetectionError::Inference(format!(
                "status {}: {}",
                status, error_text
            )));
        }

        let body: DetectResponse = response
            .json()
            .await
            .map_err(|e| DetectionError::Inference(format!("invalid response: {}", e)))?;
        Ok(body.detections)
    }
}

impl FaceDetector for HttpFaceDetector {
    fn load_models(&self) -> BoxFuture<'_, Result<(), ModelLoadError>> {
        Box::pin(async move {
            for name in &self.models {
                self.fetch_model(name).await?;
            }
            Ok(())
        })
    }

    fn detect<'a>(
        &'a self,
        frame: &'a Frame,
    ) -> BoxFuture<'a, Result<Vec<FaceDetection>, DetectionError>> {
        Box::pin(self.run_detection(frame))
    }
}
