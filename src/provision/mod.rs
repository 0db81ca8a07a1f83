//! Placing a cached release into an installation.
//!
//! An installation's core consists of `index.php`, `typo3/` and, before
//! TYPO3 6.0, `t3lib/`. Three layouts are supported:
//!
//! - **Copy**: the core entries are plain copies of the release.
//! - **Shared symlink**: `typo3src` links to the release in the version cache
//!   and the core entries link into `typo3src`, so every installation on a
//!   branch shares one tree.
//! - **Symlink to local copy**: as above, but `typo3src` is a private copy of
//!   the release inside the installation.
//!
//! # Staging
//!
//! New entries are first created in a staging directory inside the
//! installation root, which lives on the same filesystem, and then moved over
//! the old ones with `mv`. Every individual move is an atomic rename, but the
//! sequence as a whole is not: if a command fails after the old entries have
//! been removed, the installation is left without a core and must be repaired
//! by hand (or by rerunning with `--force-update`). No rollback is attempted.

pub mod command;

pub use command::{CommandRunner, ShellCommand};

use crate::constants::{CORE_ENTRIES, ENTRY_POINT, SOURCE_LINK, STAGING_DIR};
use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Provisioning mode requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WorkMode {
    /// Copy the release into the installation
    Copy,
    /// Keep whatever layout the installation currently uses
    Current,
    /// Link to the shared release in the version cache
    Symlink,
    /// Copy the release to `typo3src` and link to it
    #[value(name = "symlink_copy")]
    SymlinkCopy,
}

impl WorkMode {
    /// Strategy to use for the installation at `root`.
    #[must_use]
    pub fn strategy_for(self, root: &Path) -> Strategy {
        match self {
            Self::Copy => Strategy::Copy,
            Self::Symlink => Strategy::SymlinkShared,
            Self::SymlinkCopy => Strategy::SymlinkToLocalCopy,
            Self::Current => detect_current(root),
        }
    }
}

/// How core entries are provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Copy,
    SymlinkShared,
    SymlinkToLocalCopy,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Copy => "Copy",
            Self::SymlinkShared => "GlobalSymlink",
            Self::SymlinkToLocalCopy => "SymlinkCopy",
        })
    }
}

/// Infers the strategy an installation was provisioned with.
///
/// A real `index.php` means a copy. A linked `index.php` with a real
/// `typo3src` means a local copy; if `typo3src` is a link too, the release is
/// shared.
#[must_use]
pub fn detect_current(root: &Path) -> Strategy {
    if !root.join(ENTRY_POINT).is_symlink() {
        Strategy::Copy
    } else if !root.join(SOURCE_LINK).is_symlink() {
        Strategy::SymlinkToLocalCopy
    } else {
        Strategy::SymlinkShared
    }
}

/// Core entries shipped by the release at `source`, in copy order.
#[must_use]
pub fn provided_entries(source: &Path) -> Vec<&'static str> {
    CORE_ENTRIES
        .into_iter()
        .filter(|entry| source.join(entry).symlink_metadata().is_ok())
        .collect()
}

/// Builds the command sequence provisioning `source` into `root`.
///
/// All paths in the returned commands are absolute if `root` and `source` are.
#[must_use]
pub fn plan(strategy: Strategy, root: &Path, source: &Path, owner: &str) -> Vec<ShellCommand> {
    let staging = root.join(STAGING_DIR);
    let entries = provided_entries(source);

    let mut commands = vec![ShellCommand::rm_rf([&staging]), ShellCommand::mkdir_p(&staging)];

    // Names moved from the staging directory into the root, in order.
    let mut staged: Vec<&str> = Vec::new();

    match strategy {
        Strategy::Copy => {
            for entry in &entries {
                commands.push(ShellCommand::cp_r(&source.join(entry), &staging.join(entry)));
            }
        }
        Strategy::SymlinkShared | Strategy::SymlinkToLocalCopy => {
            let local_source = staging.join(SOURCE_LINK);
            commands.push(if strategy == Strategy::SymlinkShared {
                ShellCommand::ln_s(source, &local_source)
            } else {
                ShellCommand::cp_r(source, &local_source)
            });
            staged.push(SOURCE_LINK);

            let linked_source = root.join(SOURCE_LINK);
            for entry in &entries {
                commands.push(ShellCommand::ln_s(&linked_source.join(entry), &staging.join(entry)));
            }
        }
    }
    staged.extend(&entries);

    let replaced: Vec<PathBuf> =
        [ENTRY_POINT, "t3lib", "typo3", SOURCE_LINK].iter().map(|name| root.join(name)).collect();
    commands.push(ShellCommand::rm_rf(&replaced));

    for name in &staged {
        commands.push(ShellCommand::mv(&staging.join(name), &root.join(name)));
    }
    commands.push(ShellCommand::rmdir(&staging));

    let mut owned: Vec<PathBuf> = Vec::new();
    if strategy != Strategy::Copy {
        owned.push(root.join(SOURCE_LINK));
    }
    owned.extend(
        ["t3lib", "typo3", ENTRY_POINT]
            .iter()
            .filter(|name| entries.contains(name))
            .map(|name| root.join(name)),
    );
    commands.push(ShellCommand::chown_r(owner, &owned));

    commands
}

/// Provisions `source` into `root` through `runner`.
///
/// # Errors
///
/// Returns the first failing command's error; the remaining commands are
/// not run.
pub async fn apply(
    runner: &mut CommandRunner,
    strategy: Strategy,
    root: &Path,
    source: &Path,
    owner: &str,
) -> Result<()> {
    let commands = plan(strategy, root, source, owner);
    tracing::debug!(
        "Provisioning {} with {} ({} commands)",
        root.display(),
        strategy,
        commands.len()
    );
    runner.run_all(&commands).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{InstallationLayout, write_installation, write_source_tree};
    use crate::version::VersionTuple;
    use tempfile::TempDir;

    fn lines(commands: &[ShellCommand]) -> Vec<String> {
        commands.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_detect_current() {
        let temp = TempDir::new().unwrap();
        let copy = temp.path().join("copy");
        let local = temp.path().join("local");
        let shared = temp.path().join("shared");
        let v = VersionTuple::new(9, 5, 18);
        write_installation(&copy, v, InstallationLayout::Copy).unwrap();
        write_installation(&local, v, InstallationLayout::SymlinkToLocalCopy).unwrap();
        write_installation(&shared, v, InstallationLayout::SymlinkShared(temp.path().join("release")))
            .unwrap();

        assert_eq!(detect_current(&copy), Strategy::Copy);
        assert_eq!(detect_current(&local), Strategy::SymlinkToLocalCopy);
        assert_eq!(detect_current(&shared), Strategy::SymlinkShared);
        assert_eq!(WorkMode::Current.strategy_for(&shared), Strategy::SymlinkShared);
        assert_eq!(WorkMode::Symlink.strategy_for(&copy), Strategy::SymlinkShared);
        assert_eq!(WorkMode::Copy.strategy_for(&local), Strategy::Copy);
    }

    #[test]
    fn test_work_mode_names() {
        assert_eq!(WorkMode::from_str("symlink_copy", false).unwrap(), WorkMode::SymlinkCopy);
        assert_eq!(WorkMode::from_str("current", false).unwrap(), WorkMode::Current);
        assert!(WorkMode::from_str("symlink-copy", false).is_err());
    }

    #[test]
    fn test_copy_plan_for_modern_release() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("cache/9/5-20/typo3_src-9.5.20");
        write_source_tree(&src, VersionTuple::new(9, 5, 20)).unwrap();
        let root = Path::new("/var/www/site");
        let s = "/var/www/site/.typo3-updater-staging";
        let src_s = src.display().to_string();

        let plan = plan(Strategy::Copy, root, &src, "web:web");
        assert_eq!(
            lines(&plan),
            vec![
                format!("rm -rf {s}"),
                format!("mkdir -p {s}"),
                format!("cp -R {src_s}/typo3 {s}/typo3"),
                format!("cp -R {src_s}/index.php {s}/index.php"),
                "rm -rf /var/www/site/index.php /var/www/site/t3lib /var/www/site/typo3 /var/www/site/typo3src"
                    .to_string(),
                format!("mv {s}/typo3 /var/www/site/typo3"),
                format!("mv {s}/index.php /var/www/site/index.php"),
                format!("rmdir {s}"),
                "chown -R web:web /var/www/site/typo3 /var/www/site/index.php".to_string(),
            ]
        );
    }

    #[test]
    fn test_symlink_plans() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("typo3_src-4.5.40");
        write_source_tree(&src, VersionTuple::new(4, 5, 40)).unwrap();
        let root = Path::new("/var/www/site");
        let s = "/var/www/site/.typo3-updater-staging";
        let src_s = src.display().to_string();

        let shared = lines(&plan(Strategy::SymlinkShared, root, &src, "web:web"));
        assert_eq!(shared[2], format!("ln -s {src_s} {s}/typo3src"));
        assert_eq!(shared[3], format!("ln -s /var/www/site/typo3src/typo3 {s}/typo3"));
        assert_eq!(shared[4], format!("ln -s /var/www/site/typo3src/t3lib {s}/t3lib"));
        assert_eq!(shared[5], format!("ln -s /var/www/site/typo3src/index.php {s}/index.php"));
        assert_eq!(shared[7], format!("mv {s}/typo3src /var/www/site/typo3src"));
        assert_eq!(
            shared.last().unwrap(),
            "chown -R web:web /var/www/site/typo3src /var/www/site/t3lib /var/www/site/typo3 /var/www/site/index.php"
        );

        let local = lines(&plan(Strategy::SymlinkToLocalCopy, root, &src, "web:web"));
        assert_eq!(local[2], format!("cp -R {src_s} {s}/typo3src"));
        assert_eq!(local[3..], shared[3..]);
    }

    #[tokio::test]
    async fn test_apply_copy_replaces_core() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("site");
        let src = temp.path().join("typo3_src-9.5.20");
        write_installation(&root, VersionTuple::new(9, 5, 18), InstallationLayout::Copy).unwrap();
        write_source_tree(&src, VersionTuple::new(9, 5, 20)).unwrap();
        let owner = crate::utils::owner_of(&root).unwrap();

        let mut runner = CommandRunner::live(std::time::Duration::from_secs(30));
        apply(&mut runner, Strategy::Copy, &root, &src, &owner).await.unwrap();

        let version = crate::discovery::VersionDetector::new().unwrap().detect(&root).unwrap();
        assert_eq!(version, VersionTuple::new(9, 5, 20));
        assert!(!root.join(STAGING_DIR).exists());
        assert!(root.join("typo3conf").is_dir());
        assert!(!root.join("index.php").is_symlink());
    }

    #[tokio::test]
    async fn test_apply_local_copy_links_into_typo3src() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("site");
        let src = temp.path().join("typo3_src-9.5.20");
        write_installation(&root, VersionTuple::new(9, 5, 18), InstallationLayout::Copy).unwrap();
        write_source_tree(&src, VersionTuple::new(9, 5, 20)).unwrap();
        let owner = crate::utils::owner_of(&root).unwrap();

        let mut runner = CommandRunner::live(std::time::Duration::from_secs(30));
        apply(&mut runner, Strategy::SymlinkToLocalCopy, &root, &src, &owner).await.unwrap();

        assert!(root.join("index.php").is_symlink());
        assert!(root.join("typo3src").is_dir());
        assert!(!root.join("typo3src").is_symlink());
        assert_eq!(detect_current(&root), Strategy::SymlinkToLocalCopy);
        assert_eq!(
            std::fs::read_link(root.join("typo3")).unwrap(),
            root.join("typo3src/typo3")
        );
    }

    #[tokio::test]
    async fn test_dry_run_apply_leaves_files_alone() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("site");
        let src = temp.path().join("typo3_src-9.5.20");
        write_installation(&root, VersionTuple::new(9, 5, 18), InstallationLayout::Copy).unwrap();
        write_source_tree(&src, VersionTuple::new(9, 5, 20)).unwrap();

        let mut runner = CommandRunner::dry_run();
        apply(&mut runner, Strategy::Copy, &root, &src, "web:web").await.unwrap();

        assert_eq!(runner.transcript(), lines(&plan(Strategy::Copy, &root, &src, "web:web")));
        let version = crate::discovery::VersionDetector::new().unwrap().detect(&root).unwrap();
        assert_eq!(version, VersionTuple::new(9, 5, 18));
        assert!(!root.join(STAGING_DIR).exists());
    }
}
