//! Update decisions against release channels.
//!
//! A [`ChannelTable`] is an explicitly ordered list of release channels, each
//! naming the newest version of one release branch. [`resolve`] matches an
//! installed version against the table by release branch and decides whether
//! the installation is current, can be updated, or belongs to a branch no
//! channel maintains any more.
//!
//! Matching walks the table in insertion order and stops at the first channel
//! on the installed branch, so the outcome never depends on how the table is
//! stored.
//!
//! # Examples
//!
//! ```rust
//! use typo3_updater::version::{ChannelTable, Decision, VersionTuple, resolve};
//!
//! let mut channels = ChannelTable::new();
//! channels.push("stable", VersionTuple::new(9, 5, 20));
//! channels.push("lts", VersionTuple::new(8, 7, 30));
//!
//! let decision = resolve(VersionTuple::new(9, 5, 18), &channels, false);
//! assert_eq!(
//!     decision,
//!     Decision::UpdateAvailable {
//!         target: VersionTuple::new(9, 5, 20)
//!     }
//! );
//! ```

use super::VersionTuple;
use serde::Serialize;

/// A named release track and its newest version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    /// Channel name such as `stable` or `lts`
    pub name: String,
    /// Newest release on this channel
    pub version: VersionTuple,
}

/// Release channels in the order they are consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelTable {
    channels: Vec<Channel>,
}

impl ChannelTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a channel after all existing ones.
    pub fn push(&mut self, name: impl Into<String>, version: VersionTuple) -> &mut Self {
        self.channels.push(Channel {
            name: name.into(),
            version,
        });
        self
    }

    /// First channel, in table order, on the same release branch as `installed`.
    #[must_use]
    pub fn matching(&self, installed: &VersionTuple) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.version.same_branch(installed))
    }

    /// Looks a channel up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.name == name)
    }

    /// Distinct channel versions in table order.
    ///
    /// Two channels may point at the same release; it only needs to be cached once.
    #[must_use]
    pub fn versions(&self) -> Vec<VersionTuple> {
        let mut versions: Vec<VersionTuple> = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            if !versions.contains(&channel.version) {
                versions.push(channel.version);
            }
        }
        versions
    }

    /// Iterates channels in table order.
    pub fn iter(&self) -> std::slice::Iter<'_, Channel> {
        self.channels.iter()
    }

    /// Number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the table has no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl<'a> IntoIterator for &'a ChannelTable {
    type Item = &'a Channel;
    type IntoIter = std::slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}

impl<N: Into<String>> FromIterator<(N, VersionTuple)> for ChannelTable {
    fn from_iter<I: IntoIterator<Item = (N, VersionTuple)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, version) in iter {
            table.push(name, version);
        }
        table
    }
}

/// Outcome of matching an installed version against the channel table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Decision {
    /// The installation runs the newest release of its branch.
    Current,
    /// A channel on the installation's branch offers `target`.
    UpdateAvailable {
        /// Full version of the matching channel
        target: VersionTuple,
    },
    /// No channel maintains the installation's branch.
    Unmatched,
}

impl Decision {
    /// Whether the installation should be provisioned.
    #[must_use]
    pub const fn is_outdated(&self) -> bool {
        matches!(self, Self::UpdateAvailable { .. })
    }

    /// Version to provision, if any.
    #[must_use]
    pub const fn target(&self) -> Option<VersionTuple> {
        match self {
            Self::UpdateAvailable {
                target,
            } => Some(*target),
            _ => None,
        }
    }
}

/// Decides whether `installed` needs an update.
///
/// The first channel in `channels` sharing `installed`'s `(major, minor)`
/// decides the outcome. An equal patch level is [`Decision::Current`] unless
/// `force_update` is set, in which case the channel version is re-provisioned.
#[must_use]
pub fn resolve(installed: VersionTuple, channels: &ChannelTable, force_update: bool) -> Decision {
    match channels.matching(&installed) {
        Some(channel) if channel.version == installed && !force_update => Decision::Current,
        Some(channel) => Decision::UpdateAvailable {
            target: channel.version,
        },
        None => Decision::Unmatched,
    }
}
