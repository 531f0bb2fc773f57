//! Mock HTTP tests for JournalClient.
//!
//! These tests cover:
//! - History fetch and response parsing
//! - Append and enrollment request formatting
//! - Bearer token forwarding
//! - Retry behaviour (reads only)

use std::time::Duration;

use emotion_journal::detector::Emotion;
use emotion_journal::store::{
    EnrollmentSample, HistoryStore, JournalClient, NewEmotion, RetryPolicy, StoreError,
    DEFAULT_API_URL,
};
use wiremock::matchers::{body_bytes, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        backoff_base: Duration::from_millis(1),
        backoff_max: Duration::from_millis(5),
    }
}

fn client(server: &MockServer) -> JournalClient {
    JournalClient::with_token(server.uri(), None)
        .unwrap()
        .with_retry_policy(fast_retry())
}

// === Construction ===

#[test]
fn test_default_url_constant() {
    assert_eq!(DEFAULT_API_URL, "http://localhost:8000");
}

#[test]
fn test_with_token_reports_token() {
    let client = JournalClient::with_token("http://api.test", Some("secret".into())).unwrap();
    assert!(client.has_token());
    assert_eq!(client.base_url(), "http://api.test");

    let anonymous = JournalClient::with_token("http://api.test", None).unwrap();
    assert!(!anonymous.has_token());
}

// === History ===

#[tokio::test]
async fn test_fetch_history_parses_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/emotion/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "emotion": [
                {"emotion": "happy", "timestamp": "2024-05-01T12:00:00", "userId": 42},
                {"emotion": "sad", "timestamp": "2024-05-02 08:30:15.250"},
                {"emotion": "angry", "timestamp": "2024-05-03T09:00:00Z"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server).fetch_history(42).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].emotion, "happy");
    assert_eq!(records[0].user_id, Some(42));
    assert_eq!(records[1].user_id, None);
    assert_eq!(
        records[1].timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        "2024-05-02 08:30:15"
    );
    assert_eq!(records[2].emotion, "angry");
}

#[tokio::test]
async fn test_fetch_history_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/emotion/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let records = client(&server).fetch(7).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_fetch_history_retries_gateway_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/emotion/1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/emotion/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "emotion": [{"emotion": "neutral", "timestamp": "2024-01-01T00:00:00"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server).fetch_history(1).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_fetch_history_gives_up_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/emotion/1"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server).fetch_history(1).await.unwrap_err();
    assert!(matches!(err, StoreError::Network { attempts: 3, .. }));
}

#[tokio::test]
async fn test_fetch_history_does_not_retry_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/emotion/1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such user"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).fetch_history(1).await.unwrap_err();
    match err {
        StoreError::Api { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such user");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

// === Append ===

#[tokio::test]
async fn test_append_posts_user_and_label() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emotion"))
        .and(body_json(serde_json::json!({"userId": 42, "emotion": "happy"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .append(NewEmotion {
            user_id: 42,
            emotion: Emotion::Happy,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_append_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emotion"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .append_emotion(NewEmotion {
            user_id: 1,
            emotion: Emotion::Sad,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Api { status: 503, .. }));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emotion"))
        .and(header("Authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = JournalClient::with_token(server.uri(), Some("secret-token".into())).unwrap();
    client
        .append_emotion(NewEmotion {
            user_id: 3,
            emotion: Emotion::Surprised,
        })
        .await
        .unwrap();
}

// === Enrollment ===

#[tokio::test]
async fn test_enrollment_uploads_raw_sample() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/9/face"))
        .and(header("Content-Type", "image/png"))
        .and(body_bytes(b"png-bytes".to_vec()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .submit_enrollment(EnrollmentSample {
            user_id: 9,
            data: b"png-bytes".to_vec(),
            mime_type: "image/png".to_string(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_enrollment_failure_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/9/face"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .submit_enrollment(EnrollmentSample {
            user_id: 9,
            data: vec![1, 2, 3],
            mime_type: "image/jpeg".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Api { status: 500, .. }));
}
