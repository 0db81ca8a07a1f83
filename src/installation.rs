//! The per-run record of a discovered installation.

use crate::version::{ChannelTable, Decision, VersionTuple, resolve};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// An installation found during discovery, with its update decision.
///
/// Records are built once per run and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installation {
    /// Directory containing `typo3conf`
    pub root: PathBuf,
    /// Version read from the core files
    pub version: VersionTuple,
    /// `user:group` applied to replaced files
    pub owner: String,
    /// Outcome of matching `version` against the channel table
    #[serde(flatten)]
    pub decision: Decision,
}

impl Installation {
    /// Resolves `version` against `channels` and records the result.
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        version: VersionTuple,
        owner: impl Into<String>,
        channels: &ChannelTable,
        force_update: bool,
    ) -> Self {
        Self {
            root: root.into(),
            version,
            owner: owner.into(),
            decision: resolve(version, channels, force_update),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn is_outdated(&self) -> bool {
        self.decision.is_outdated()
    }

    /// Version this installation would be provisioned with.
    #[must_use]
    pub const fn target(&self) -> Option<VersionTuple> {
        self.decision.target()
    }
}
