//! Global constants used throughout the updater.
//!
//! This module contains file names, default endpoints, and timeout values that
//! are shared by several modules. Defining them centrally keeps the on-disk
//! layout of an installation in one place.

use std::time::Duration;

/// Directory whose presence marks a TYPO3 installation root.
pub const MARKER_DIR: &str = "typo3conf";

/// Default location of the release manifest.
pub const DEFAULT_MANIFEST_URL: &str = "https://get.typo3.org/json";

/// Default base URL for release archives; the version is appended as a path segment.
pub const DEFAULT_DOWNLOAD_URL: &str = "https://get.typo3.org";

/// Prefix of the top-level directory inside an extracted release archive.
pub const DEFAULT_SOURCE_PREFIX: &str = "typo3_src-";

/// Name of the intermediate source link (or local copy) inside an installation.
pub const SOURCE_LINK: &str = "typo3src";

/// Entry point of an installation; its link status drives strategy detection.
pub const ENTRY_POINT: &str = "index.php";

/// Core entries replaced during provisioning, in copy order.
pub const CORE_ENTRIES: [&str; 3] = ["typo3", "t3lib", ENTRY_POINT];

/// Files that may carry the version string, checked in order.
pub const VERSION_FILES: [&str; 2] =
    ["t3lib/config_default.php", "typo3/sysext/core/Classes/Core/SystemEnvironmentBuilder.php"];

/// Staging directory created inside an installation while provisioning.
pub const STAGING_DIR: &str = ".typo3-updater-staging";

/// Advisory lock file created in the template cache root.
pub const CACHE_LOCK_FILE: &str = ".typo3-updater.lock";

/// Timeout for manifest and archive HTTP requests (60 seconds).
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for a single provisioning command (10 minutes).
///
/// Recursive copies of a full source tree onto slow storage can take a while.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Number of retries for transient HTTP failures.
pub const HTTP_RETRIES: usize = 3;

/// Base of the exponential backoff between HTTP retries, in milliseconds.
///
/// Combined with [`BACKOFF_FACTOR`] the delays are 250ms, 2.5s, then capped.
pub const BACKOFF_BASE_MS: u64 = 10;

/// Multiplier applied to every backoff step.
pub const BACKOFF_FACTOR: u64 = 25;

/// Maximum backoff delay between HTTP retries (4 seconds).
pub const MAX_BACKOFF_DELAY_MS: u64 = 4_000;
