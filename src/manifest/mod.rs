//! The release manifest published at `get.typo3.org/json`.
//!
//! The manifest is a JSON document naming the newest release of each release
//! channel:
//!
//! ```json
//! {
//!   "latest_stable": "10.4.1",
//!   "latest_old_stable": "9.5.20",
//!   "latest_lts": "9.5.20",
//!   "latest_deprecated": "8.7.32",
//!   "10": { "...": "per-branch release details, ignored" }
//! }
//! ```
//!
//! Only the four `latest_*` fields are read. They become a [`ChannelTable`]
//! in the fixed order stable, old-stable, lts, deprecated, so channel
//! matching never depends on the document's key order.
//!
//! The manifest location may be an `http(s)://` URL, a `file://` URL, or a
//! plain path; the latter two let operators run against a saved copy.

use crate::core::UpdaterError;
use crate::utils::http;
use crate::version::{ChannelTable, VersionTuple};
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Channel names paired with the manifest field holding their version, in
/// the order channels are consulted.
pub const CHANNEL_FIELDS: [(&str, &str); 4] = [
    ("stable", "latest_stable"),
    ("old-stable", "latest_old_stable"),
    ("lts", "latest_lts"),
    ("deprecated", "latest_deprecated"),
];

/// The `latest_*` fields of the release manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReleaseManifest {
    /// Newest release of the current stable branch
    #[serde(default)]
    pub latest_stable: Option<String>,
    /// Newest release of the previous stable branch
    #[serde(default)]
    pub latest_old_stable: Option<String>,
    /// Newest long-term-support release
    #[serde(default)]
    pub latest_lts: Option<String>,
    /// Newest release of the oldest branch still published
    #[serde(default)]
    pub latest_deprecated: Option<String>,
}

impl ReleaseManifest {
    /// Fetches and parses the manifest from `location`.
    ///
    /// HTTP requests time out after `timeout` and transient failures are
    /// retried with exponential backoff.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::ManifestUnavailable`] if the document cannot be retrieved
    /// - [`UpdaterError::ManifestInvalid`] if it is not a JSON object
    pub async fn fetch(location: &str, timeout: Duration) -> Result<Self> {
        info!("Fetching release manifest from {}", location);

        let body = if http::is_remote(location) {
            fetch_remote(location, timeout).await?
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            tokio::fs::read_to_string(path).await.map_err(|e| {
                UpdaterError::ManifestUnavailable {
                    source_url: location.to_string(),
                    reason: e.to_string(),
                }
            })?
        };

        Ok(Self::parse(&body, location)?)
    }

    /// Parses a manifest document; `location` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::ManifestInvalid`] if `body` is not a JSON object
    /// or a `latest_*` field is not a string.
    pub fn parse(body: &str, location: &str) -> Result<Self, UpdaterError> {
        serde_json::from_str(body).map_err(|e| UpdaterError::ManifestInvalid {
            source_url: location.to_string(),
            reason: e.to_string(),
        })
    }

    /// Builds the ordered channel table.
    ///
    /// Channels missing from the manifest are skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::ParseError`] if a field is not `major.minor.patch`
    /// - [`UpdaterError::ManifestInvalid`] if no channel field is present at all
    pub fn channels(&self, location: &str) -> Result<ChannelTable, UpdaterError> {
        let mut table = ChannelTable::new();

        for (name, field) in CHANNEL_FIELDS {
            match self.field(field) {
                Some(text) => {
                    let version = VersionTuple::parse(text, &format!("manifest field {field}"))?;
                    debug!("Channel {} is at {}", name, version);
                    table.push(name, version);
                }
                None => warn!("Release manifest has no {} field; channel {} skipped", field, name),
            }
        }

        if table.is_empty() {
            return Err(UpdaterError::ManifestInvalid {
                source_url: location.to_string(),
                reason: "no latest_* channel fields present".to_string(),
            });
        }

        Ok(table)
    }

    fn field(&self, field: &str) -> Option<&str> {
        let value = match field {
            "latest_stable" => &self.latest_stable,
            "latest_old_stable" => &self.latest_old_stable,
            "latest_lts" => &self.latest_lts,
            "latest_deprecated" => &self.latest_deprecated,
            _ => return None,
        };
        value.as_deref()
    }
}

async fn fetch_remote(url: &str, timeout: Duration) -> Result<String> {
    let client = http::client(timeout)?;

    let body = tokio_retry::RetryIf::start(
        http::retry_strategy(),
        || get_text(&client, url),
        |e: &reqwest::Error| {
            let transient = http::is_transient(e);
            if transient {
                warn!("Manifest request failed, retrying: {}", e);
            }
            transient
        },
    )
    .await
    .map_err(|e| UpdaterError::ManifestUnavailable {
        source_url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(body)
}

async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
    client.get(url).send().await?.error_for_status()?.text().await
}
