//! Error handling for the updater
//!
//! This module provides the error types and user-facing error reporting used by
//! every stage of an update run. The error system follows two principles:
//! 1. **Strongly-typed errors** so callers can tell fatal failures from ones
//!    that only affect a single installation
//! 2. **User-friendly messages** with actionable suggestions for operators
//!
//! # Architecture
//!
//! - [`UpdaterError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds details and a suggestion for display
//!
//! # Fatal vs. per-installation errors
//!
//! Manifest, discovery, cache, and configuration errors abort the run.
//! [`UpdaterError::VersionNotFound`], [`UpdaterError::ParseError`] raised for an
//! installation, and [`UpdaterError::CommandFailed`] are recorded against the
//! installation that caused them and the run continues with the next one; see
//! [`UpdaterError::is_per_installation`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use typo3_updater::core::{UpdaterError, user_friendly_error};
//!
//! let error = UpdaterError::NoInstancesFound {
//!     pattern: "/var/www/*/*/typo3conf".to_string(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display(); // Coloured error, details and suggestion on stderr
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for updater operations.
///
/// Each variant carries the context an operator needs to locate the problem:
/// the manifest location, the installation root, or the exact command line.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// The release manifest could not be fetched or read.
    #[error("Could not get version manifest from {source_url}: {reason}")]
    ManifestUnavailable {
        /// URL or path of the manifest
        source_url: String,
        /// Underlying network or I/O failure
        reason: String,
    },

    /// The manifest was fetched but its content is unusable.
    #[error("Invalid version manifest from {source_url}: {reason}")]
    ManifestInvalid {
        /// URL or path of the manifest
        source_url: String,
        /// What is wrong with the content
        reason: String,
    },

    /// Neither version file nor version pattern matched inside an installation.
    #[error("Version not found for {path}")]
    VersionNotFound {
        /// Installation root
        path: String,
    },

    /// Discovery found no installation below the search root.
    #[error("No instances found matching {pattern}")]
    NoInstancesFound {
        /// Glob pattern that was searched
        pattern: String,
    },

    /// A version string is not of the form `major.minor.patch`.
    #[error("Invalid version '{version}' at {location}")]
    ParseError {
        /// The offending text
        version: String,
        /// Where the text came from (installation root or manifest field)
        location: String,
    },

    /// A provisioning command exited unsuccessfully.
    #[error("Command failed ({status}): {command}")]
    CommandFailed {
        /// Full command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// A provisioning command could not be located on `PATH`.
    #[error("Required command '{program}' not found in PATH")]
    CommandNotFound {
        /// Program name
        program: String,
    },

    /// A release archive could not be downloaded.
    #[error("Failed to download TYPO3 {version} from {url}: {reason}")]
    DownloadFailed {
        /// Requested version
        version: String,
        /// Archive URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// A release archive could not be unpacked.
    #[error("Failed to extract archive {path}: {reason}")]
    ArchiveError {
        /// Archive file
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// A cached version directory has no extracted source tree.
    #[error("No '{prefix}*' source tree in {path}")]
    SourceTreeMissing {
        /// Cached version directory
        path: String,
        /// Expected directory name prefix
        prefix: String,
    },

    /// Invalid command-line or settings-file configuration.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// Some installations could not be processed.
    #[error("{failed} of {total} installations could not be processed")]
    RunIncomplete {
        /// Number of failed installations
        failed: usize,
        /// Number of discovered installations
        total: usize,
    },

    /// IO error from [`std::io::Error`]
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file syntax error from [`toml::de::Error`]
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl UpdaterError {
    /// Whether this error is confined to one installation.
    ///
    /// Such errors are recorded in the run report and processing continues
    /// with the next installation.
    #[must_use]
    pub const fn is_per_installation(&self) -> bool {
        matches!(
            self,
            Self::VersionNotFound { .. } | Self::ParseError { .. } | Self::CommandFailed { .. }
        )
    }
}

/// Error context wrapper with details and a suggestion for CLI display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The primary message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context from any displayable error.
    #[must_use]
    pub fn new(error: impl fmt::Display) -> Self {
        Self {
            message: error.to_string(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details, and suggestion to stderr with terminal colors.
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with an actionable suggestion.
///
/// Recognizes [`UpdaterError`] anywhere in the error chain (so errors wrapped
/// with `anyhow::Context` keep their suggestions) and common I/O failures.
/// Anything else is shown with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    if let Some(updater_error) = error.chain().find_map(|e| e.downcast_ref::<UpdaterError>()) {
        return attach_hints(ErrorContext::new(message), updater_error);
    }

    if let Some(io_error) = error.chain().find_map(|e| e.downcast_ref::<std::io::Error>()) {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(message)
                    .with_suggestion("Run as root, or pass --dry-run to preview the changes")
                    .with_details("The updater could not read or write a file it needs");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(message)
                    .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    ErrorContext::new(message)
}

fn attach_hints(context: ErrorContext, error: &UpdaterError) -> ErrorContext {
    match error {
        UpdaterError::ManifestUnavailable { .. } => context
            .with_suggestion("Check network access, or pass --manifest-url with a local copy of the manifest")
            .with_details("The release manifest lists the newest version of every release channel"),
        UpdaterError::ManifestInvalid { .. } => context.with_details(
            "Expected a JSON object with latest_stable, latest_old_stable, latest_lts and latest_deprecated",
        ),
        UpdaterError::VersionNotFound { .. } => context.with_details(
            "Neither t3lib/config_default.php nor SystemEnvironmentBuilder.php contained a version",
        ),
        UpdaterError::NoInstancesFound { .. } => context
            .with_suggestion("Check --path and --path-level; every installation needs a typo3conf directory at that depth"),
        UpdaterError::ParseError { .. } => {
            context.with_details("Versions must have the form major.minor.patch")
        }
        UpdaterError::CommandFailed { stderr, .. } if !stderr.trim().is_empty() => {
            context.with_details(stderr.trim().to_string())
        }
        UpdaterError::CommandNotFound { .. } => {
            context.with_suggestion("Install coreutils or add it to PATH")
        }
        UpdaterError::DownloadFailed { .. } => context
            .with_suggestion("Check network access; a partially downloaded version is never left in the cache"),
        UpdaterError::SourceTreeMissing { path, .. } => context
            .with_suggestion(format!("Remove {path} so the release is downloaded again")),
        UpdaterError::ConfigError { .. } | UpdaterError::Toml(_) => {
            context.with_suggestion("Run with --help to see the required options")
        }
        UpdaterError::RunIncomplete { .. } => {
            context.with_suggestion("See the messages above for each failed installation")
        }
        _ => context,
    }
}
