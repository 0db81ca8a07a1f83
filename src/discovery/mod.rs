//! Finding installations and reading their version.
//!
//! An installation is any directory exactly `depth` levels below the search
//! root that contains the marker directory (`typo3conf`):
//!
//! ```text
//! /var/www/                     search root, depth 1
//! ├── shop/typo3conf/           -> /var/www/shop
//! ├── blog/typo3conf/           -> /var/www/blog
//! └── static/                   (no marker, ignored)
//! ```
//!
//! The installed version is read from the core source itself, because
//! TYPO3 records it nowhere else:
//!
//! | File                                                          | Releases |
//! |---------------------------------------------------------------|----------|
//! | `t3lib/config_default.php` (`$TYPO_VERSION = '4.5.40';`)      | < 6.0    |
//! | `typo3/sysext/core/Classes/Core/SystemEnvironmentBuilder.php` | >= 6.0   |
//!
//! The first file that exists is searched for `$TYPO_VERSION = '…';` and
//! then for `define('TYPO3_version', …)`.

use crate::constants::VERSION_FILES;
use crate::core::UpdaterError;
use crate::utils::platform;
use crate::version::VersionTuple;
use anyhow::Result;
use glob::Pattern;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Builds the glob pattern matching marker directories `depth` levels below `root`.
#[must_use]
pub fn search_pattern(root: &Path, depth: usize, marker: &str) -> String {
    let root = Pattern::escape(&root.to_string_lossy());
    let root = root.trim_end_matches('/');
    format!("{}/{}{}", root, "*/".repeat(depth), Pattern::escape(marker))
}

/// Returns the sorted installation roots below `root`.
///
/// Unreadable directories are skipped.
///
/// # Errors
///
/// Returns [`UpdaterError::NoInstancesFound`] when nothing matches.
pub fn discover(root: &Path, depth: usize, marker: &str) -> Result<Vec<PathBuf>, UpdaterError> {
    let pattern = search_pattern(root, depth, marker);
    debug!("Searching installations with {}", pattern);

    // Hidden directories (`.trash`, `.snapshots`) never hold live installations.
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };
    let entries = glob::glob_with(&pattern, options).map_err(|e| UpdaterError::ConfigError {
        message: format!("invalid search pattern {pattern}: {e}"),
    })?;

    let mut roots: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path {}: {}", e.path().display(), e.error());
                None
            }
        })
        .filter(|marker_dir| marker_dir.is_dir())
        .filter_map(|marker_dir| marker_dir.parent().map(Path::to_path_buf))
        .collect();

    roots.sort();
    roots.dedup();

    if roots.is_empty() {
        return Err(UpdaterError::NoInstancesFound {
            pattern,
        });
    }

    debug!("Found {} installation(s)", roots.len());
    Ok(roots)
}

/// Extracts the installed version from an installation's core files.
#[derive(Debug, Clone)]
pub struct VersionDetector {
    patterns: Vec<Regex>,
}

impl VersionDetector {
    /// # Errors
    ///
    /// Returns an error if a version pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: vec![
                Regex::new(r"TYPO_VERSION\s*=\s*'(.*)';")?,
                Regex::new(r"define\('TYPO3_version', (.*)\)")?,
            ],
        })
    }

    /// Returns the raw version text found in `content`, trimmed and without quotes.
    #[must_use]
    pub fn extract(&self, content: &str) -> Option<String> {
        self.patterns
            .iter()
            .find_map(|pattern| pattern.captures(content))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim().replace('\'', "").trim().to_string())
    }

    /// Detects the version installed at `root`.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::VersionNotFound`] if no version file exists or none
    ///   of the patterns matches
    /// - [`UpdaterError::ParseError`] if the text found is not `major.minor.patch`
    pub fn detect(&self, root: &Path) -> Result<VersionTuple, UpdaterError> {
        let not_found = || UpdaterError::VersionNotFound {
            path: root.display().to_string(),
        };

        let file = VERSION_FILES
            .iter()
            .map(|relative| root.join(relative))
            .find(|path| path.is_file())
            .ok_or_else(not_found)?;

        let bytes = std::fs::read(&file).map_err(|e| {
            debug!("Cannot read {}: {}", file.display(), e);
            not_found()
        })?;
        let content = String::from_utf8_lossy(&bytes);

        let text = self.extract(&content).ok_or_else(not_found)?;
        debug!("{} reports version {}", file.display(), text);

        VersionTuple::parse(&text, &root.display().to_string())
    }
}

/// Owner applied to an installation's new files: the override if one is
/// given, otherwise the current owner of the installation root.
///
/// # Errors
///
/// Returns an error if the root's metadata cannot be read.
pub fn owner(root: &Path, owner_override: Option<&str>) -> Result<String> {
    match owner_override {
        Some(owner) => Ok(owner.to_string()),
        None => platform::owner_of(root),
    }
}
