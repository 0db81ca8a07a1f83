//! HTTP client construction and retry policy shared by manifest and archive downloads.

use crate::constants::{BACKOFF_BASE_MS, BACKOFF_FACTOR, HTTP_RETRIES, MAX_BACKOFF_DELAY_MS};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("typo3-updater/", env!("CARGO_PKG_VERSION"));

/// Builds a client with the given per-request timeout.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Backoff delays between attempts: 250ms, 2.5s, 4s.
pub fn retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(BACKOFF_BASE_MS)
        .factor(BACKOFF_FACTOR)
        .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
        .take(HTTP_RETRIES)
}

/// Whether a failed request is worth retrying.
///
/// Timeouts, connection failures, and 5xx responses are transient; 4xx
/// responses and decoding problems are not.
pub fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout()
        || error.is_connect()
        || error.status().is_some_and(|status| status.is_server_error())
}

/// Whether `location` should be fetched over HTTP rather than read from disk.
#[must_use]
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
