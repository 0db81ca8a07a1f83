//! Shared fixture for the integration tests.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use typo3_updater::test_utils::{InstallationLayout, populate_cache, write_installation, write_manifest};
use typo3_updater::version::VersionTuple;

/// A server with a version cache, a sites directory, and a manifest file.
pub struct Server {
    _temp: TempDir,
    pub root: PathBuf,
    pub cache: PathBuf,
    pub sites: PathBuf,
    pub manifest: PathBuf,
}

impl Server {
    /// Manifest with `stable` at 9.5.20 and `lts` at 8.7.32; empty cache.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = std::fs::canonicalize(temp.path()).unwrap();
        let cache = root.join("cache");
        let sites = root.join("sites");
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::create_dir_all(&sites).unwrap();

        let manifest = root.join("json");
        write_manifest(&manifest, &[("latest_stable", "9.5.20"), ("latest_lts", "8.7.32")]).unwrap();

        Self {
            _temp: temp,
            root,
            cache,
            sites,
            manifest,
        }
    }

    /// Same as [`Server::new`] with both channel releases already cached.
    pub fn warm() -> Self {
        let server = Self::new();
        server.cached(VersionTuple::new(9, 5, 20));
        server.cached(VersionTuple::new(8, 7, 32));
        server
    }

    pub fn cached(&self, version: VersionTuple) -> PathBuf {
        populate_cache(&self.cache, version).unwrap()
    }

    pub fn site(&self, name: &str, version: VersionTuple, layout: InstallationLayout) -> PathBuf {
        let root = self.sites.join(name);
        write_installation(&root, version, layout).unwrap();
        root
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("typo3-updater").unwrap();
        cmd.env_remove("TYPO3_UPDATER_CONFIG")
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.root.join("config"))
            .env("NO_COLOR", "1")
            .arg("--no-progress");
        cmd
    }

    /// `update --dry-run` against this server in `work_mode`.
    pub fn update(&self, work_mode: &str) -> Command {
        let mut cmd = self.command();
        cmd.arg("update")
            .arg("--template-path")
            .arg(&self.cache)
            .arg("--template-owner")
            .arg("root:root")
            .args(self.search_args())
            .arg("--work-mode")
            .arg(work_mode)
            .arg("--dry-run")
            .arg("--path-owner")
            .arg("web:web");
        cmd
    }

    /// `check` against this server.
    pub fn check(&self) -> Command {
        let mut cmd = self.command();
        cmd.arg("check").args(self.search_args());
        cmd
    }

    fn search_args(&self) -> Vec<String> {
        vec![
            "--path".to_string(),
            self.sites.display().to_string(),
            "--path-level".to_string(),
            "1".to_string(),
            "--manifest-url".to_string(),
            self.manifest.display().to_string(),
        ]
    }

    pub fn staging(site: &Path) -> PathBuf {
        site.join(".typo3-updater-staging")
    }
}
