//! emotion-journal library crate.
//!
//! Camera-driven capture-and-confirm workflow for an emotion journal:
//! acquire a stream, classify a snapshot, confirm it and append it to the
//! user's history.

pub mod camera;
pub mod config;
pub mod detector;
pub mod logging;
pub mod session;
pub mod store;
