//! Configuration for an update run.
//!
//! Configuration comes from two layers:
//!
//! 1. **Settings file** ([`Settings`]): optional TOML file with endpoint and
//!    layout settings that rarely change between runs.
//! 2. **Command line**: the per-run options, combined with the settings into a
//!    [`RunConfig`].
//!
//! A [`RunConfig`] is built once, never mutated, and passed by reference to
//! every stage of the run.
//!
//! # Settings File Location
//!
//! Looked up in this order:
//!
//! 1. `--config <FILE>` (or the `TYPO3_UPDATER_CONFIG` environment variable);
//!    the file must exist
//! 2. `<config dir>/typo3-updater/config.toml` (`~/.config` on Linux), if present
//! 3. Built-in defaults
//!
//! # File Format
//!
//! ```toml
//! # Mirror of get.typo3.org inside the data centre
//! manifest_url = "https://mirror.example.org/typo3/json"
//! download_url = "https://mirror.example.org/typo3"
//!
//! # Seconds
//! http_timeout_secs = 120
//! command_timeout_secs = 900
//! ```

use crate::constants::{
    COMMAND_TIMEOUT, DEFAULT_DOWNLOAD_URL, DEFAULT_MANIFEST_URL, DEFAULT_SOURCE_PREFIX,
    HTTP_TIMEOUT, MARKER_DIR,
};
use crate::core::UpdaterError;
use crate::provision::WorkMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Settings loaded from the optional TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Release manifest: an `http(s)://` URL, a `file://` URL, or a local path.
    pub manifest_url: String,

    /// Base URL for release archives; `/<version>` is appended.
    pub download_url: String,

    /// Prefix of the top-level directory in an extracted release archive.
    pub source_prefix: String,

    /// Directory name marking an installation root.
    pub marker_dir: String,

    /// Timeout for each HTTP request, in seconds.
    pub http_timeout_secs: u64,

    /// Timeout for each provisioning command, in seconds.
    pub command_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            source_prefix: DEFAULT_SOURCE_PREFIX.to_string(),
            marker_dir: MARKER_DIR.to_string(),
            http_timeout_secs: HTTP_TIMEOUT.as_secs(),
            command_timeout_secs: COMMAND_TIMEOUT.as_secs(),
        }
    }
}

impl Settings {
    /// Loads settings from `explicit` if given, otherwise from the default
    /// location if a file exists there, otherwise returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file does not exist, or if a
    /// file cannot be read or parsed.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(UpdaterError::ConfigError {
                    message: format!("settings file {} does not exist", path.display()),
                }
                .into());
            }
            return Self::load_from(path).await;
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path).await,
            _ => Ok(Self::default()),
        }
    }

    /// Loads settings from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid settings TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Self = toml::from_str(&content)
            .map_err(UpdaterError::from)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Default settings file location, if the platform has a config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("typo3-updater").join("config.toml"))
    }

    /// HTTP request timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Provisioning command timeout.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Immutable configuration of one update run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root of the version cache (canonical)
    pub template_path: PathBuf,
    /// `user:group` applied to the version cache
    pub template_owner: String,
    /// Directory below which installations are searched (canonical)
    pub search_root: PathBuf,
    /// Number of directory levels between the search root and an installation
    pub depth: usize,
    /// How new core files are placed into installations
    pub work_mode: WorkMode,
    /// Print commands instead of running them
    pub dry_run: bool,
    /// Re-provision installations already on their channel's version
    pub force_update: bool,
    /// Owner applied to every installation instead of its current owner
    pub owner_override: Option<String>,
    /// Do not warn about installations on unmaintained branches
    pub suppress_outdated: bool,
    /// Show spinners and download bars
    pub show_progress: bool,
    /// Settings file values
    pub settings: Settings,
}

/// Expands `~` and canonicalizes a directory given on the command line.
///
/// # Errors
///
/// Returns [`UpdaterError::ConfigError`] if the path does not exist or is not
/// a directory.
pub fn resolve_dir(raw: &str, option: &str) -> Result<PathBuf> {
    let expanded = shellexpand::tilde(raw);
    let path = Path::new(expanded.as_ref());

    let canonical = std::fs::canonicalize(path).map_err(|e| UpdaterError::ConfigError {
        message: format!("{option} '{raw}' cannot be resolved: {e}"),
    })?;

    if !canonical.is_dir() {
        return Err(UpdaterError::ConfigError {
            message: format!("{option} '{raw}' is not a directory"),
        }
        .into());
    }

    Ok(canonical)
}

/// Checks an ownership string as accepted by `chown` (`user`, `user:group`, `:group`).
///
/// # Errors
///
/// Returns [`UpdaterError::ConfigError`] for empty strings, whitespace, or
/// more than one colon.
pub fn validate_owner(owner: &str, option: &str) -> Result<()> {
    let invalid = owner.is_empty()
        || owner == ":"
        || owner.chars().any(char::is_whitespace)
        || owner.matches(':').count() > 1;

    if invalid {
        return Err(UpdaterError::ConfigError {
            message: format!("{option} '{owner}' is not of the form user[:group]"),
        }
        .into());
    }
    Ok(())
}
