use crate::common::Server;
use predicates::prelude::*;
use typo3_updater::test_utils::InstallationLayout;
use typo3_updater::version::VersionTuple;

#[test]
fn test_check_table() {
    let server = Server::new();
    server.site("a-current", VersionTuple::new(9, 5, 20), InstallationLayout::Copy);
    server.site("b-old", VersionTuple::new(8, 7, 30), InstallationLayout::Copy);

    server
        .check()
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"))
        .stdout(predicate::str::contains("outdated"))
        .stdout(predicate::str::contains("8.7.32"))
        .stdout(predicate::str::contains("Total installations: 2"));

    // Nothing is cached or written by a check.
    assert_eq!(std::fs::read_dir(&server.cache).unwrap().count(), 0);
}

#[test]
fn test_check_json() {
    let server = Server::new();
    let old = server.site("old", VersionTuple::new(9, 5, 18), InstallationLayout::Copy);

    let output = server.check().args(["--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let line = &report["installations"][0];
    assert_eq!(line["root"], old.display().to_string());
    assert_eq!(line["version"], "9.5.18");
    assert_eq!(line["channel"], "stable");
    assert_eq!(line["outcome"], "outdated");
    assert_eq!(line["target"], "9.5.20");
    assert_eq!(report["channels"][1]["name"], "lts");
}

#[test]
fn test_check_strict() {
    let server = Server::new();
    server.site("current", VersionTuple::new(9, 5, 20), InstallationLayout::Copy);

    server.check().arg("--strict").assert().success();

    server.site("old", VersionTuple::new(9, 5, 18), InstallationLayout::Copy);
    server
        .check()
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 installation(s) are outdated"));
}

#[test]
fn test_check_rejects_unknown_format() {
    let server = Server::new();
    server.check().args(["--format", "yaml"]).assert().failure();
}
