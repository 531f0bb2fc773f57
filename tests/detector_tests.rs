//! Detector tests against a mock inference service.
//!
//! These tests cover:
//! - Model asset loading (once, shared, failures cached)
//! - Detect request/response handling
//! - Expression selection through the adapter

use std::sync::Arc;

use emotion_journal::camera::Frame;
use emotion_journal::detector::{
    DetectionError, DetectorAdapter, Emotion, HttpFaceDetector, DEFAULT_MODELS,
};
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_models(server: &MockServer, times: u64) {
    for name in DEFAULT_MODELS {
        Mock::given(method("GET"))
            .and(path(format!("/models/{}", name)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 16]))
            .expect(times)
            .mount(server)
            .await;
    }
}

fn adapter(server: &MockServer) -> DetectorAdapter {
    DetectorAdapter::new(Arc::new(HttpFaceDetector::new(server.uri()).unwrap()))
}

fn frame() -> Frame {
    Frame::new(b"jpeg-bytes".to_vec(), "image/jpeg")
}

// === Model loading ===

#[tokio::test]
async fn test_models_loaded_once_for_concurrent_callers() {
    let server = MockServer::start().await;
    mount_models(&server, 1).await;

    let adapter = adapter(&server);
    assert_eq!(adapter.models_loaded(), None);

    let a = adapter.clone();
    let b = adapter.clone();
    let (first, second) = tokio::join!(a.ensure_models_loaded(), b.ensure_models_loaded());
    assert!(first.is_ok());
    assert!(second.is_ok());

    adapter.ensure_models_loaded().await.unwrap();
    assert_eq!(adapter.models_loaded(), Some(true));
}

#[tokio::test]
async fn test_model_load_failure_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/tiny_face_detector"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    let err = adapter.ensure_models_loaded().await.unwrap_err();
    assert!(err.to_string().contains("tiny_face_detector"));

    let again = adapter.ensure_models_loaded().await.unwrap_err();
    assert_eq!(err, again);
    assert_eq!(adapter.models_loaded(), Some(false));

    let detect = adapter.detect(&frame()).await.unwrap_err();
    assert!(matches!(detect, DetectionError::ModelLoad(_)));
    assert_eq!(detect.user_message(), "Error loading AI models.");
}

// === Detection ===

#[tokio::test]
async fn test_detect_posts_frame_and_selects_expression() {
    let server = MockServer::start().await;
    mount_models(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .and(header("Content-Type", "image/jpeg"))
        .and(body_bytes(b"jpeg-bytes".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "detections": [
                {"expressions": [
                    {"label": "happy", "score": 0.8},
                    {"label": "neutral", "score": 0.1},
                    {"label": "sad", "score": 0.1}
                ]},
                {"expressions": [{"label": "angry", "score": 0.99}]}
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    let result = adapter.detect(&frame()).await.unwrap().unwrap();
    assert_eq!(result.label, Emotion::Happy);
    assert!((result.score - 0.8).abs() < f32::EPSILON);

    // Models are not fetched again for a second frame
    adapter.detect(&frame()).await.unwrap();
}

#[tokio::test]
async fn test_detect_no_faces_is_none() {
    let server = MockServer::start().await;
    mount_models(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"detections": []})),
        )
        .mount(&server)
        .await;

    assert_eq!(adapter(&server).detect(&frame()).await.unwrap(), None);
}

#[tokio::test]
async fn test_detect_server_error_is_inference_error() {
    let server = MockServer::start().await;
    mount_models(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(500).set_body_string("gpu on fire"))
        .mount(&server)
        .await;

    let err = adapter(&server).detect(&frame()).await.unwrap_err();
    match err {
        DetectionError::Inference(message) => assert!(message.contains("gpu on fire")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_detect_face_without_known_labels() {
    let server = MockServer::start().await;
    mount_models(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "detections": [{"expressions": [{"label": "contempt", "score": 0.9}]}]
        })))
        .mount(&server)
        .await;

    let err = adapter(&server).detect(&frame()).await.unwrap_err();
    assert_eq!(err, DetectionError::NoUsableExpression);
}
