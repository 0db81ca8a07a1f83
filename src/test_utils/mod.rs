//! Test utilities for the updater.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suites under `tests/`.

pub mod fixtures;

pub use fixtures::{
    InstallationLayout, manifest_json, populate_cache, write_installation, write_manifest,
    write_release_archive, write_source_tree,
};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initializes logging for tests, at most once per process.
///
/// `level` wins over `RUST_LOG`; with neither, logging stays off.
///
/// ```rust,no_run
/// typo3_updater::test_utils::init_test_logging(Some(tracing::Level::DEBUG));
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
