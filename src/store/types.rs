//! Journal data model and collaborator interfaces.

use chrono::{DateTime, NaiveDateTime};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Deserializer, Serialize};

use crate::detector::Emotion;

/// Backend user identifier.
pub type UserId = u64;

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self { id, email: None }
    }
}

/// Source of the current user identity.
pub trait AuthContext: Send + Sync {
    fn current_user(&self) -> Option<User>;
}

/// Auth context with a fixed user, taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    user: Option<User>,
}

impl StaticAuth {
    pub fn new(user: Option<User>) -> Self {
        Self { user }
    }

    pub fn signed_in(id: UserId) -> Self {
        Self::new(Some(User::new(id)))
    }
}

impl AuthContext for StaticAuth {
    fn current_user(&self) -> Option<User> {
        self.user.clone()
    }
}

/// A persisted journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    #[serde(default, alias = "userId")]
    pub user_id: Option<UserId>,
    /// Label as stored by the backend; kept verbatim.
    pub emotion: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: NaiveDateTime,
}

/// Accepts RFC 3339 timestamps as well as the zone-less form the backend
/// emits for SQL `TIMESTAMP` columns.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid timestamp '{}'", raw))
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Request body for appending a confirmed emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewEmotion {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub emotion: Emotion,
}

/// A face sample captured during enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentSample {
    pub user_id: UserId,
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Errors from the journal backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {message} (after {attempts} attempts)")]
    Network { message: String, attempts: u32 },
}

pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, StoreError>>;

/// Remote, append-only emotion history.
pub trait HistoryStore: Send + Sync {
    /// Records for a user, in backend order.
    fn fetch(&self, user_id: UserId) -> StoreFuture<'_, Vec<EmotionRecord>>;

    fn append(&self, entry: NewEmotion) -> StoreFuture<'_, ()>;
}

/// Remote sink for enrollment samples.
pub trait EnrollmentStore: Send + Sync {
    fn submit(&self, sample: EnrollmentSample) -> StoreFuture<'_, ()>;
}
