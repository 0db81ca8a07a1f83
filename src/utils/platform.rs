//! Unix privilege and ownership helpers.
//!
//! Provisioning replaces files owned by arbitrary web users, so a live run
//! needs superuser rights, and the ownership of every installation root has
//! to be read before its files are replaced.

use anyhow::{Context, Result};
use nix::unistd::{Gid, Group, Uid, User};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Whether the process runs with an effective user id of 0.
#[must_use]
pub fn is_privileged() -> bool {
    Uid::effective().is_root()
}

/// Returns the owner of `path` as a `user:group` string suitable for `chown`.
///
/// Names are resolved through the system user and group databases; ids
/// without an entry are rendered numerically. Symlinks are not followed.
///
/// # Errors
///
/// Returns an error if the metadata of `path` cannot be read.
pub fn owner_of(path: &Path) -> Result<String> {
    let metadata = std::fs::symlink_metadata(path)
        .with_context(|| format!("Failed to read ownership of {}", path.display()))?;

    Ok(format_owner(metadata.uid(), metadata.gid()))
}

fn format_owner(uid: u32, gid: u32) -> String {
    let user = match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => uid.to_string(),
    };
    let group = match Group::from_gid(Gid::from_raw(gid)) {
        Ok(Some(group)) => group.name,
        _ => gid.to_string(),
    };
    format!("{user}:{group}")
}
