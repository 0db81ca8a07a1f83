//! End-to-end tests of the `typo3-updater` binary.
//!
//! Every test builds its own directory tree with a local manifest file and a
//! pre-warmed (or locally mirrored) version cache, so no network access is
//! needed. `update` runs always pass `--dry-run`.
//!
//! ```bash
//! cargo test --test integration
//! ```

mod common;

mod check;
mod update;
