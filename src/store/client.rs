//! JournalClient - talks to the emotion journal backend.

use std::time::Duration;

use serde::Deserialize;

use super::retry::{is_transient_network_error, is_transient_status, RetryPolicy};
use super::types::{
    EmotionRecord, EnrollmentSample, EnrollmentStore, HistoryStore, NewEmotion, StoreError,
    StoreFuture, UserId,
};

/// The environment variable holding an optional bearer token.
pub const API_TOKEN_ENV: &str = "EMOTION_JOURNAL_TOKEN";

/// Default base URL of the journal backend.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default timeout for HTTP requests (15 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default connection timeout (5 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Response body of the history endpoint.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    emotion: Vec<EmotionRecord>,
}

/// HTTP client for the history and enrollment endpoints.
pub struct JournalClient {
    base_url: String,
    token: Option<String>,
    retry: RetryPolicy,
    http_client: reqwest::Client,
}

impl JournalClient {
    /// Create a client for `base_url`, reading the bearer token from
    /// `EMOTION_JOURNAL_TOKEN` when set.
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let token = std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.is_empty());
        Self::with_token(base_url, token)
    }

    /// Create a client with an explicit (optional) bearer token.
    pub fn with_token(
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            retry: RetryPolicy::default(),
            http_client,
        })
    }

    /// Replace the retry policy used for history fetches.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StoreError::Api { status, body })
    }

    async fn fetch_once(&self, user_id: UserId) -> Result<Vec<EmotionRecord>, StoreError> {
        let url = format!("{}/emotion/{}", self.base_url, user_id);
        let response = self.authorize(self.http_client.get(&url)).send().await?;
        let response = Self::check_status(response).await?;
        let body: HistoryResponse = response.json().await?;
        Ok(body.emotion)
    }

    /// Fetch a user's history, retrying transient failures.
    pub async fn fetch_history(&self, user_id: UserId) -> Result<Vec<EmotionRecord>, StoreError> {
        let mut last_error = String::new();
        let mut attempts = 0u32;

        for attempt in 0..=self.retry.max_retries {
            attempts = attempt + 1;

            let transient = match self.fetch_once(user_id).await {
                Ok(records) => {
                    log::debug!("Fetched {} history records for user {}", records.len(), user_id);
                    return Ok(records);
                }
                Err(StoreError::Http(ref e)) if is_transient_network_error(e) => e.to_string(),
                Err(StoreError::Api { status, ref body })
                    if reqwest::StatusCode::from_u16(status).is_ok_and(is_transient_status) =>
                {
                    format!("status {}: {}", status, body)
                }
                Err(e) => return Err(e),
            };
            last_error = transient;

            if attempt >= self.retry.max_retries {
                log::error!(
                    "History fetch failed after {} attempts: {}",
                    attempts,
                    last_error
                );
                break;
            }

            let delay = self.retry.delay_for(attempt);
            log::warn!(
                "History fetch failed (attempt {}/{}): {}. Retrying in {:?}...",
                attempts,
                self.retry.max_retries + 1,
                last_error,
                delay
            );
            tokio::time::sleep(delay).await;
        }

        Err(StoreError::Network {
            message: if last_error.is_empty() {
                "Connection failed".to_string()
            } else {
                last_error
            },
            attempts,
        })
    }

    /// Append one confirmed emotion. Not retried.
    pub async fn append_emotion(&self, entry: NewEmotion) -> Result<(), StoreError> {
        let url = format!("{}/emotion", self.base_url);
        let response = self
            .authorize(self.http_client.post(&url))
            .json(&entry)
            .send()
            .await?;
        Self::check_status(response).await?;
        log::info!("Saved emotion '{}' for user {}", entry.emotion, entry.user_id);
        Ok(())
    }

    /// Upload an enrollment face sample. Not retried.
    pub async fn submit_enrollment(&self, sample: EnrollmentSample) -> Result<(), StoreError> {
        let url = format!("{}/user/{}/face", self.base_url, sample.user_id);
        let size = sample.data.len();
        let response = self
            .authorize(self.http_client.post(&url))
            .header("Content-Type", sample.mime_type)
            .body(sample.data)
            .send()
            .await?;
        Self::check_status(response).await?;
        log::info!("Enrollment sample submitted for user {} ({} bytes)", sample.user_id, size);
        Ok(())
    }
}

impl HistoryStore for JournalClient {
    fn fetch(&self, user_id: UserId) -> StoreFuture<'_, Vec<EmotionRecord>> {
        Box::pin(self.fetch_history(user_id))
    }

    fn append(&self, entry: NewEmotion) -> StoreFuture<'_, ()> {
        Box::pin(self.append_emotion(entry))
    }
}

impl EnrollmentStore for JournalClient {
    fn submit(&self, sample: EnrollmentSample) -> StoreFuture<'_, ()> {
        Box::pin(self.submit_enrollment(sample))
    }
}
