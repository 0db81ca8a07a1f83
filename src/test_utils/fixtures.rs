//! Fixture trees for installations, cached releases, and manifests.
//!
//! Releases before 6.0 are laid out with `t3lib/`; later releases without it.
//! Every fixture writes the version file the detector reads, so a fixture
//! installation reports exactly the version it was created with.

use crate::constants::{SOURCE_LINK, VERSION_FILES};
use crate::version::VersionTuple;
use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

/// How a fixture installation's core is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationLayout {
    /// Plain copies of the core entries
    Copy,
    /// Core entries link into a private `typo3src` copy
    SymlinkToLocalCopy,
    /// `typo3src` links to the given shared source tree
    SymlinkShared(PathBuf),
}

fn core_entries(version: VersionTuple) -> Vec<&'static str> {
    if version.major < 6 {
        vec!["typo3", "t3lib", "index.php"]
    } else {
        vec!["typo3", "index.php"]
    }
}

/// Writes a minimal release source tree for `version` at `dir`.
pub fn write_source_tree(dir: &Path, version: VersionTuple) -> Result<()> {
    let (relative, content) = if version.major < 6 {
        (VERSION_FILES[0], format!("<?php\n$TYPO_VERSION = '{version}';\n"))
    } else {
        (VERSION_FILES[1], format!("<?php\ndefine('TYPO3_version', '{version}');\n"))
    };

    let version_file = dir.join(relative);
    if let Some(parent) = version_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&version_file, content)?;

    fs::create_dir_all(dir.join("typo3/sysext"))?;
    fs::write(dir.join("index.php"), format!("<?php\n// TYPO3 {version}\n"))?;
    Ok(())
}

/// Writes an installation of `version` at `root`, including `typo3conf/`.
pub fn write_installation(root: &Path, version: VersionTuple, layout: InstallationLayout) -> Result<()> {
    fs::create_dir_all(root.join("typo3conf"))
        .with_context(|| format!("Failed to create installation {}", root.display()))?;
    fs::write(root.join("typo3conf/LocalConfiguration.php"), "<?php\nreturn [];\n")?;

    let linked_source = root.join(SOURCE_LINK);
    match layout {
        InstallationLayout::Copy => return write_source_tree(root, version),
        InstallationLayout::SymlinkToLocalCopy => write_source_tree(&linked_source, version)?,
        InstallationLayout::SymlinkShared(shared) => {
            if !shared.exists() {
                write_source_tree(&shared, version)?;
            }
            symlink(&shared, &linked_source)?;
        }
    }

    for entry in core_entries(version) {
        symlink(linked_source.join(entry), root.join(entry))?;
    }
    Ok(())
}

/// Places an extracted release in the version cache and returns its source tree.
pub fn populate_cache(cache_root: &Path, version: VersionTuple) -> Result<PathBuf> {
    let source = cache_root
        .join(version.major.to_string())
        .join(format!("{}-{}", version.minor, version.patch))
        .join(format!("typo3_src-{version}"));
    write_source_tree(&source, version)?;
    Ok(source)
}

/// Writes a gzip tarball of a release, as served by the download site.
pub fn write_release_archive(path: &Path, version: VersionTuple) -> Result<()> {
    let staging = tempfile::TempDir::new()?;
    let top = format!("typo3_src-{version}");
    write_source_tree(&staging.path().join(&top), version)?;

    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create archive {}", path.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::fast()));
    builder.append_dir_all(&top, staging.path().join(&top))?;
    builder.into_inner()?.finish()?;
    Ok(())
}

/// Renders a release manifest naming the given `latest_*` fields.
#[must_use]
pub fn manifest_json(fields: &[(&str, &str)]) -> String {
    let mut document = serde_json::Map::new();
    for (field, version) in fields {
        document.insert((*field).to_string(), serde_json::Value::from(*version));
    }
    // Per-branch details the updater ignores.
    document.insert("9".to_string(), serde_json::json!({ "active": true }));
    serde_json::Value::Object(document).to_string()
}

/// Writes [`manifest_json`] output to `path`.
pub fn write_manifest(path: &Path, fields: &[(&str, &str)]) -> Result<()> {
    fs::write(path, manifest_json(fields))
        .with_context(|| format!("Failed to write manifest {}", path.display()))
}
