//! Release version handling.
//!
//! TYPO3 releases are numbered `major.minor.patch`. Two releases with the same
//! `major.minor` belong to the same release branch and are interchangeable
//! for updating purposes: moving an installation between patch levels of a
//! branch is what this tool automates.
//!
//! - [`VersionTuple`] - the parsed version triple
//! - [`resolver`] - channel tables and the update decision
//!
//! # Examples
//!
//! ```rust
//! use typo3_updater::version::VersionTuple;
//!
//! # fn example() -> anyhow::Result<()> {
//! let installed = VersionTuple::parse("9.5.18", "/var/www/site/")?;
//! let latest = VersionTuple::parse("9.5.20", "manifest field latest_stable")?;
//!
//! assert!(installed < latest);
//! assert!(installed.same_branch(&latest));
//! assert_eq!(latest.to_string(), "9.5.20");
//! # Ok(())
//! # }
//! ```

pub mod resolver;

pub use resolver::{Channel, ChannelTable, Decision, resolve};

use crate::core::UpdaterError;
use serde::{Serialize, Serializer};
use std::fmt;

/// A `major.minor.patch` release number.
///
/// Ordering is lexicographic on (major, minor, patch), which the derived
/// `Ord` provides through field declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTuple {
    /// Major release number
    pub major: u64,
    /// Minor release number
    pub minor: u64,
    /// Patch level
    pub patch: u64,
}

impl VersionTuple {
    /// Creates a version from its three components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses `"major.minor.patch"`.
    ///
    /// Surrounding whitespace is ignored. Anything else (wrong number of
    /// components, empty or non-numeric components, suffixes such as `-dev`)
    /// is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::ParseError`] naming `text` and `location`, where
    /// `location` identifies where the text came from.
    pub fn parse(text: &str, location: &str) -> Result<Self, UpdaterError> {
        let invalid = || UpdaterError::ParseError {
            version: text.to_string(),
            location: location.to_string(),
        };

        let parts: Vec<&str> = text.trim().split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(invalid());
        };

        let component = |part: &str| -> Result<u64, UpdaterError> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        Ok(Self::new(component(*major)?, component(*minor)?, component(*patch)?))
    }

    /// The `(major, minor)` pair identifying the release branch.
    #[must_use]
    pub const fn branch(&self) -> (u64, u64) {
        (self.major, self.minor)
    }

    /// Whether both versions belong to the same release branch.
    #[must_use]
    pub const fn same_branch(&self, other: &Self) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl fmt::Display for VersionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for VersionTuple {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
