//! Process-wide lock on the version cache.
//!
//! Two updater runs sharing a cache would otherwise race to download and
//! extract the same release. The lock is held for the whole run and released
//! when the [`CacheLock`] is dropped.

use crate::constants::CACHE_LOCK_FILE;
use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// An exclusive advisory lock on `<cache root>/.typo3-updater.lock`.
#[derive(Debug)]
pub struct CacheLock {
    _file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Acquires the lock, waiting for any other holder to release it.
    ///
    /// The blocking wait runs on tokio's blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked, for
    /// example because the cache root is read-only.
    pub async fn acquire(cache_root: &Path) -> Result<Self> {
        let lock_path = cache_root.join(CACHE_LOCK_FILE);
        let lock_path_clone = lock_path.clone();

        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&lock_path_clone)
                .with_context(|| {
                    format!("Failed to open lock file: {}", lock_path_clone.display())
                })?;

            file.lock_exclusive().with_context(|| {
                format!("Failed to lock version cache: {}", lock_path_clone.display())
            })?;

            Ok(file)
        })
        .await
        .context("Failed to spawn blocking task for lock acquisition")??;

        debug!("Acquired cache lock {}", lock_path.display());

        Ok(Self {
            _file: file,
            path: lock_path,
        })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
