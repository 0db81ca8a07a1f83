//! The on-disk version cache.
//!
//! Every release referenced by the manifest is kept extracted below the cache
//! root so installations can be provisioned from it:
//!
//! ```text
//! <cache root>/
//! ├── .typo3-updater.lock
//! ├── 9/
//! │   └── 5-20/
//! │       └── typo3_src-9.5.20/
//! │           ├── index.php
//! │           └── typo3/
//! └── 10/
//!     └── 4-1/
//!         └── typo3_src-10.4.1/
//! ```
//!
//! # Population
//!
//! A missing release is downloaded from `<download url>/<version>` into a
//! temporary file inside the major directory, unpacked into a temporary
//! directory next to it, and renamed to `<minor>-<patch>` once the archive
//! has been fully extracted. An interrupted run therefore never leaves a
//! half-extracted version directory behind. A version directory without a
//! source tree (left by older tools) is removed and fetched again.
//!
//! The download location may also be a local directory or `file://` URL
//! holding archives named after their version, for hosts without internet
//! access.

pub mod lock;

pub use lock::CacheLock;

use crate::core::UpdaterError;
use crate::utils::http;
use crate::utils::progress::ProgressBar;
use crate::version::VersionTuple;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Where release archives are fetched from.
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    /// Base URL or directory; the version is appended as a path segment
    pub base: String,
    /// Per-request HTTP timeout
    pub timeout: Duration,
    /// Show a download bar while fetching
    pub show_progress: bool,
}

impl ArchiveSource {
    /// Location of the archive for `version`.
    #[must_use]
    pub fn location(&self, version: VersionTuple) -> String {
        format!("{}/{}", self.base.trim_end_matches('/'), version)
    }
}

/// A cached release ready for provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Cached release
    pub version: VersionTuple,
    /// Extracted source tree (`<version dir>/typo3_src-<version>`)
    pub source: PathBuf,
    /// Whether the release was fetched during this run
    pub fetched: bool,
}

/// The version cache below a root directory.
#[derive(Debug, Clone)]
pub struct TemplateCache {
    root: PathBuf,
    source_prefix: String,
}

impl TemplateCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, source_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            source_prefix: source_prefix.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<major>/<minor>-<patch>`
    #[must_use]
    pub fn version_dir(&self, version: VersionTuple) -> PathBuf {
        self.root
            .join(version.major.to_string())
            .join(format!("{}-{}", version.minor, version.patch))
    }

    /// Locates the extracted source tree of a cached release.
    ///
    /// The first directory entry (in name order) starting with the source
    /// prefix wins.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::SourceTreeMissing`] if the version directory
    /// does not exist or holds no matching entry.
    pub fn source_dir(&self, version: VersionTuple) -> Result<PathBuf, UpdaterError> {
        find_source_tree(&self.version_dir(version), &self.source_prefix)
    }

    /// Makes sure `version` is cached, fetching it if necessary.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::DownloadFailed`] if the archive cannot be retrieved
    /// - [`UpdaterError::ArchiveError`] if it is not a readable gzip tarball
    /// - [`UpdaterError::SourceTreeMissing`] if it lacks the expected source tree
    pub async fn ensure(&self, version: VersionTuple, source: &ArchiveSource) -> Result<CacheEntry> {
        let version_dir = self.version_dir(version);

        if version_dir.exists() {
            match self.source_dir(version) {
                Ok(tree) => {
                    debug!("TYPO3 {} already cached at {}", version, tree.display());
                    return Ok(CacheEntry {
                        version,
                        source: tree,
                        fetched: false,
                    });
                }
                Err(_) => {
                    warn!(
                        "Cached directory {} has no source tree; fetching TYPO3 {} again",
                        version_dir.display(),
                        version
                    );
                    tokio::fs::remove_dir_all(&version_dir).await.with_context(|| {
                        format!("Failed to remove stale cache entry {}", version_dir.display())
                    })?;
                }
            }
        }

        let major_dir = self.major_dir(version).await?;
        let archive = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".tar.gz")
            .tempfile_in(&major_dir)
            .with_context(|| format!("Failed to create download file in {}", major_dir.display()))?;

        info!("Fetching TYPO3 {} from {}", version, source.location(version));
        download(version, source, archive.path()).await?;

        let spinner = ProgressBar::new_spinner(source.show_progress);
        spinner.set_message(format!("Extracting TYPO3 {version}"));
        let tree = match self.install_archive(archive.path(), version).await {
            Ok(tree) => tree,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e);
            }
        };
        spinner.finish_with_message(format!("Cached TYPO3 {version}"));
        info!("Cached TYPO3 {} at {}", version, tree.display());

        Ok(CacheEntry {
            version,
            source: tree,
            fetched: true,
        })
    }

    /// Extracts a gzip tarball as the cache entry for `version`.
    ///
    /// Existing entries are left alone; the extracted tree is only moved into
    /// place once the archive unpacked completely and contains a source tree.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::ArchiveError`] or [`UpdaterError::SourceTreeMissing`]
    /// for unusable archives, or an I/O error if the cache is not writable.
    pub async fn install_archive(&self, archive: &Path, version: VersionTuple) -> Result<PathBuf> {
        let major_dir = self.major_dir(version).await?;
        let staging = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(&major_dir)
            .with_context(|| format!("Failed to create extraction directory in {}", major_dir.display()))?;

        let archive_path = archive.to_path_buf();
        let staging_path = staging.path().to_path_buf();
        tokio::task::spawn_blocking(move || extract_tar_gz(&archive_path, &staging_path))
            .await
            .context("Failed to spawn blocking task for archive extraction")??;

        // Validate before the rename so a bad archive never becomes a cache entry.
        find_source_tree(staging.path(), &self.source_prefix)?;

        let version_dir = self.version_dir(version);
        tokio::fs::rename(staging.path(), &version_dir).await.with_context(|| {
            format!("Failed to move extracted archive to {}", version_dir.display())
        })?;

        Ok(self.source_dir(version)?)
    }

    async fn major_dir(&self, version: VersionTuple) -> Result<PathBuf> {
        let dir = self.root.join(version.major.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Ok(dir)
    }
}

fn find_source_tree(dir: &Path, prefix: &str) -> Result<PathBuf, UpdaterError> {
    let missing = || UpdaterError::SourceTreeMissing {
        path: dir.display().to_string(),
        prefix: prefix.to_string(),
    };

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|_| missing())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();

    candidates.sort();
    candidates.into_iter().next().ok_or_else(missing)
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<(), UpdaterError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let archive_error = |reason: String| UpdaterError::ArchiveError {
        path: archive.display().to_string(),
        reason,
    };

    let file = File::open(archive).map_err(|e| archive_error(e.to_string()))?;
    let mut tarball = Archive::new(GzDecoder::new(file));
    tarball.set_preserve_permissions(true);
    tarball.unpack(dest).map_err(|e| archive_error(e.to_string()))
}

async fn download(version: VersionTuple, source: &ArchiveSource, dest: &Path) -> Result<()> {
    let location = source.location(version);
    let failed = |reason: String| UpdaterError::DownloadFailed {
        version: version.to_string(),
        url: location.clone(),
        reason,
    };

    if !http::is_remote(&location) {
        let path = location.strip_prefix("file://").unwrap_or(&location);
        tokio::fs::copy(path, dest).await.map_err(|e| failed(e.to_string()))?;
        return Ok(());
    }

    let client = http::client(source.timeout)?;
    let mut response = tokio_retry::RetryIf::start(
        http::retry_strategy(),
        || async { client.get(&location).send().await?.error_for_status() },
        |e: &reqwest::Error| {
            let transient = http::is_transient(e);
            if transient {
                warn!("Download of TYPO3 {} failed, retrying: {}", version, e);
            }
            transient
        },
    )
    .await
    .map_err(|e| failed(e.to_string()))?;

    let bar = ProgressBar::new_download(source.show_progress, response.content_length());
    bar.set_prefix(version.to_string());

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to open {}", dest.display()))?;

    while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
        file.write_all(&chunk).await?;
        bar.inc(chunk.len() as u64);
    }
    file.flush().await?;
    bar.finish_and_clear();

    debug!("Downloaded {} bytes for TYPO3 {}", bar.position(), version);
    Ok(())
}
