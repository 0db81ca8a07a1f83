//! typo3-updater - keep TYPO3 installations on the newest patch release
//!
//! A host-maintenance tool for servers running many TYPO3 installations. It
//! finds every installation below a directory, reads the installed version
//! from the core source, compares it with the release channels published at
//! `get.typo3.org`, and replaces the core of outdated installations with a
//! release from a local version cache.
//!
//! # Architecture Overview
//!
//! A run is a straight pipeline:
//!
//! 1. [`manifest`] fetches the release manifest and builds an ordered
//!    [`version::ChannelTable`]
//! 2. [`cache`] downloads and extracts every channel's release
//! 3. [`discovery`] finds installations and detects their versions
//! 4. [`version::resolve`] decides per installation: current, update
//!    available, or on an unmaintained branch
//! 5. [`provision`] plans and runs the `cp`/`ln`/`mv`/`chown` commands, or
//!    only prints them in a dry run
//!
//! [`updater`] strings the steps together and [`cli`] exposes them as the
//! `update` and `check` commands.
//!
//! # Core Modules
//!
//! - [`version`] - version triples, channel tables, and the update decision
//! - [`manifest`] - the release manifest
//! - [`cache`] - the on-disk version cache and its lock
//! - [`discovery`] - installation discovery and version detection
//! - [`installation`] - the per-installation record
//! - [`provision`] - provisioning strategies, command plans, and the runner
//! - [`updater`] - the run orchestration and report
//!
//! # Supporting Modules
//!
//! - [`cli`] - command-line interface
//! - [`config`] - settings file and per-run configuration
//! - [`constants`] - file names, default endpoints, and timeouts
//! - [`core`] - error types and user-facing error formatting
//! - [`utils`] - HTTP, platform, and progress helpers
//!
//! # Example
//!
//! ```rust
//! use typo3_updater::version::{ChannelTable, Decision, VersionTuple, resolve};
//!
//! let channels: ChannelTable = [
//!     ("stable", VersionTuple::new(10, 4, 1)),
//!     ("lts", VersionTuple::new(9, 5, 20)),
//! ]
//! .into_iter()
//! .collect();
//!
//! assert_eq!(resolve(VersionTuple::new(10, 4, 1), &channels, false), Decision::Current);
//! assert_eq!(resolve(VersionTuple::new(7, 6, 32), &channels, false), Decision::Unmatched);
//! ```

// Decision core
pub mod installation;
pub mod version;

// Run stages
pub mod cache;
pub mod discovery;
pub mod manifest;
pub mod provision;
pub mod updater;

// Supporting modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
