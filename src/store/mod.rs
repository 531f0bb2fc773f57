//! Collaborators of the capture workflow: identity, history and enrollment.
//!
//! [`JournalClient`] implements both stores against the journal backend's
//! HTTP API.

mod client;
mod retry;
mod types;

pub use client::{JournalClient, API_TOKEN_ENV, DEFAULT_API_URL};
pub use retry::{calculate_backoff, is_transient_network_error, is_transient_status, RetryPolicy};
pub use types::{
    AuthContext, EmotionRecord, EnrollmentSample, EnrollmentStore, HistoryStore, NewEmotion,
    StaticAuth, StoreError, StoreFuture, User, UserId,
};
