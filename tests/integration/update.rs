use crate::common::Server;
use predicates::prelude::*;
use typo3_updater::discovery::VersionDetector;
use typo3_updater::test_utils::{InstallationLayout, write_release_archive};
use typo3_updater::version::VersionTuple;

fn installed(site: &std::path::Path) -> VersionTuple {
    VersionDetector::new().unwrap().detect(site).unwrap()
}

#[test]
fn test_dry_run_copy_prints_exact_commands() {
    let server = Server::warm();
    let site = server.site("shop", VersionTuple::new(9, 5, 18), InstallationLayout::Copy);
    let src = server.cache.join("9/5-20/typo3_src-9.5.20");
    let s = Server::staging(&site);

    let expected = [
        format!("rm -rf {}", s.display()),
        format!("mkdir -p {}", s.display()),
        format!("cp -R {}/typo3 {}/typo3", src.display(), s.display()),
        format!("cp -R {}/index.php {}/index.php", src.display(), s.display()),
        format!(
            "rm -rf {0}/index.php {0}/t3lib {0}/typo3 {0}/typo3src",
            site.display()
        ),
        format!("mv {}/typo3 {}/typo3", s.display(), site.display()),
        format!("mv {}/index.php {}/index.php", s.display(), site.display()),
        format!("rmdir {}", s.display()),
        format!("chown -R web:web {0}/typo3 {0}/index.php", site.display()),
        format!("# {} updated with Copy to 9.5.20", site.display()),
    ]
    .join("\n");

    server
        .update("copy")
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));

    assert_eq!(installed(&site), VersionTuple::new(9, 5, 18));
    assert!(!s.exists());
}

#[test]
fn test_current_mode_repeats_existing_layout() {
    let server = Server::warm();
    let local = server.site("local", VersionTuple::new(8, 7, 30), InstallationLayout::SymlinkToLocalCopy);
    let shared = server.site(
        "shared",
        VersionTuple::new(9, 5, 1),
        InstallationLayout::SymlinkShared(server.root.join("old-release")),
    );

    server
        .update("current")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "# {} updated with SymlinkCopy to 8.7.32",
            local.display()
        )))
        .stdout(predicate::str::contains(format!(
            "# {} updated with GlobalSymlink to 9.5.20",
            shared.display()
        )))
        .stdout(predicate::str::contains(format!(
            "ln -s {} {}/typo3src",
            server.cache.join("9/5-20/typo3_src-9.5.20").display(),
            Server::staging(&shared).display()
        )));
}

#[test]
fn test_current_installations_are_left_alone() {
    let server = Server::warm();
    let site = server.site("shop", VersionTuple::new(9, 5, 20), InstallationLayout::Copy);

    server
        .update("copy")
        .assert()
        .success()
        .stdout(predicate::str::contains(site.display().to_string()).not())
        .stdout(predicate::str::contains("# 0 to update, 1 current"));
}

#[test]
fn test_force_update_reprovisions_current() {
    let server = Server::warm();
    let site = server.site("shop", VersionTuple::new(9, 5, 20), InstallationLayout::Copy);

    server
        .update("copy")
        .arg("--force-update")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("# {} updated with Copy to 9.5.20", site.display())));
}

#[test]
fn test_unmaintained_branch_warning() {
    let server = Server::warm();
    let site = server.site("legacy", VersionTuple::new(4, 5, 40), InstallationLayout::Copy);

    server
        .update("copy")
        .assert()
        .success()
        .stderr(predicate::str::contains(format!(
            "Version 4.5.40 of instance {} is outdated! Please update!",
            site.display()
        )));

    server
        .update("copy")
        .arg("--suppress-outdated")
        .assert()
        .success()
        .stderr(predicate::str::contains("Please update!").not());
}

#[test]
fn test_broken_installation_does_not_stop_the_run() {
    let server = Server::warm();
    std::fs::create_dir_all(server.sites.join("a-broken/typo3conf")).unwrap();
    let site = server.site("b-shop", VersionTuple::new(9, 5, 18), InstallationLayout::Copy);

    server
        .update("copy")
        .assert()
        .failure()
        .stdout(predicate::str::contains(format!("# {} updated with Copy to 9.5.20", site.display())))
        .stderr(predicate::str::contains("Version not found for"))
        .stderr(predicate::str::contains("1 of 2 installations could not be processed"));
}

#[test]
fn test_cache_is_populated_during_dry_run() {
    let server = Server::new();
    let mirror = server.root.join("mirror");
    std::fs::create_dir_all(&mirror).unwrap();
    write_release_archive(&mirror.join("9.5.20"), VersionTuple::new(9, 5, 20)).unwrap();
    write_release_archive(&mirror.join("8.7.32"), VersionTuple::new(8, 7, 32)).unwrap();
    server.site("shop", VersionTuple::new(9, 5, 18), InstallationLayout::Copy);

    server
        .update("copy")
        .arg("--download-url")
        .arg(&mirror)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("chown -R root:root {}", server.cache.display())));

    assert!(server.cache.join("9/5-20/typo3_src-9.5.20/index.php").is_file());
    assert!(server.cache.join("8/7-32/typo3_src-8.7.32/index.php").is_file());
}

#[test]
fn test_no_installations_found() {
    let server = Server::warm();

    server
        .update("copy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No instances found matching"))
        .stderr(predicate::str::contains("--path-level"));
}

#[test]
fn test_unreachable_manifest() {
    let server = Server::warm();
    server.site("shop", VersionTuple::new(9, 5, 18), InstallationLayout::Copy);
    std::fs::remove_file(&server.manifest).unwrap();

    server
        .update("copy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not get version manifest"));
}

#[test]
fn test_invalid_work_mode() {
    let server = Server::warm();

    server
        .update("hardlink")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'hardlink'"));
}
