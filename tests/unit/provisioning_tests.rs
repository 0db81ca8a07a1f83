//! Cached releases provisioned into installations with real commands.

use tempfile::TempDir;
use typo3_updater::cache::{ArchiveSource, TemplateCache};
use typo3_updater::constants::STAGING_DIR;
use typo3_updater::discovery::{self, VersionDetector};
use typo3_updater::provision::{self, CommandRunner, Strategy, WorkMode};
use typo3_updater::test_utils::{InstallationLayout, write_installation, write_release_archive};
use typo3_updater::utils::owner_of;
use typo3_updater::version::VersionTuple;

const TARGET: VersionTuple = VersionTuple::new(8, 7, 32);

struct Host {
    _temp: TempDir,
    cache: TemplateCache,
    source: ArchiveSource,
    sites: std::path::PathBuf,
}

impl Host {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = std::fs::canonicalize(temp.path()).unwrap();
        let mirror = root.join("mirror");
        let sites = root.join("sites");
        std::fs::create_dir_all(&mirror).unwrap();
        std::fs::create_dir_all(root.join("cache")).unwrap();
        write_release_archive(&mirror.join(TARGET.to_string()), TARGET).unwrap();

        Self {
            _temp: temp,
            cache: TemplateCache::new(root.join("cache"), "typo3_src-"),
            source: ArchiveSource {
                base: mirror.display().to_string(),
                timeout: std::time::Duration::from_secs(5),
                show_progress: false,
            },
            sites,
        }
    }
}

async fn update(host: &Host, layout: InstallationLayout, mode: WorkMode) -> (std::path::PathBuf, Strategy) {
    let site = host.sites.join("site");
    write_installation(&site, VersionTuple::new(8, 7, 30), layout).unwrap();

    let entry = host.cache.ensure(TARGET, &host.source).await.unwrap();
    assert!(entry.fetched);

    let strategy = mode.strategy_for(&site);
    let owner = owner_of(&site).unwrap();
    let mut runner = CommandRunner::live(std::time::Duration::from_secs(30));
    provision::apply(&mut runner, strategy, &site, &entry.source, &owner).await.unwrap();

    (site, strategy)
}

#[tokio::test]
async fn copy_replaces_core_with_plain_files() {
    let host = Host::new();
    let (site, strategy) = update(&host, InstallationLayout::SymlinkToLocalCopy, WorkMode::Copy).await;

    assert_eq!(strategy, Strategy::Copy);
    assert_eq!(VersionDetector::new().unwrap().detect(&site).unwrap(), TARGET);
    assert!(!site.join("index.php").is_symlink());
    assert!(!site.join("typo3src").exists());
    assert!(!site.join(STAGING_DIR).exists());
    assert!(site.join("typo3conf/LocalConfiguration.php").is_file());
}

#[tokio::test]
async fn shared_symlink_points_into_the_cache() {
    let host = Host::new();
    let (site, _) = update(&host, InstallationLayout::Copy, WorkMode::Symlink).await;

    let link = std::fs::read_link(site.join("typo3src")).unwrap();
    assert_eq!(link, host.cache.source_dir(TARGET).unwrap());
    assert_eq!(provision::detect_current(&site), Strategy::SymlinkShared);
    assert_eq!(VersionDetector::new().unwrap().detect(&site).unwrap(), TARGET);
}

#[tokio::test]
async fn current_mode_keeps_local_copy_layout() {
    let host = Host::new();
    let (site, strategy) = update(&host, InstallationLayout::SymlinkToLocalCopy, WorkMode::Current).await;

    assert_eq!(strategy, Strategy::SymlinkToLocalCopy);
    assert!(site.join("typo3src").is_dir());
    assert!(!site.join("typo3src").is_symlink());
    assert!(site.join("index.php").is_symlink());
    assert_eq!(VersionDetector::new().unwrap().detect(&site).unwrap(), TARGET);

    let found = discovery::discover(&host.sites, 1, "typo3conf").unwrap();
    assert_eq!(found, vec![site]);
}
