//! Update decisions against channel tables built from manifests.

use typo3_updater::installation::Installation;
use typo3_updater::manifest::ReleaseManifest;
use typo3_updater::test_utils::manifest_json;
use typo3_updater::version::{ChannelTable, Decision, VersionTuple, resolve};

fn channels() -> ChannelTable {
    let body = manifest_json(&[
        ("latest_stable", "10.4.1"),
        ("latest_old_stable", "9.5.20"),
        ("latest_lts", "9.5.20"),
        ("latest_deprecated", "8.7.32"),
    ]);
    ReleaseManifest::parse(&body, "test").unwrap().channels("test").unwrap()
}

#[test]
fn older_patch_on_a_maintained_branch_is_outdated() {
    let channels = channels();
    for (installed, target) in [
        (VersionTuple::new(10, 4, 0), VersionTuple::new(10, 4, 1)),
        (VersionTuple::new(9, 5, 1), VersionTuple::new(9, 5, 20)),
        (VersionTuple::new(8, 7, 30), VersionTuple::new(8, 7, 32)),
    ] {
        assert_eq!(
            resolve(installed, &channels, false),
            Decision::UpdateAvailable {
                target
            },
            "{installed}"
        );
    }
}

#[test]
fn decision_never_leaves_the_installed_branch() {
    let channels = channels();
    for major in 4..12 {
        for minor in 0..8 {
            for patch in [0, 1, 20, 40] {
                let installed = VersionTuple::new(major, minor, patch);
                for force in [false, true] {
                    if let Some(target) = resolve(installed, &channels, force).target() {
                        assert!(target.same_branch(&installed), "{installed} -> {target}");
                    }
                }
            }
        }
    }
}

#[test]
fn force_update_turns_current_into_update() {
    let channels = channels();
    let installed = VersionTuple::new(9, 5, 20);

    assert_eq!(resolve(installed, &channels, false), Decision::Current);
    assert_eq!(
        resolve(installed, &channels, true),
        Decision::UpdateAvailable {
            target: installed
        }
    );
}

#[test]
fn unmaintained_branch_is_unmatched_even_when_forced() {
    let channels = channels();
    assert_eq!(resolve(VersionTuple::new(4, 5, 40), &channels, false), Decision::Unmatched);
    assert_eq!(resolve(VersionTuple::new(4, 5, 40), &channels, true), Decision::Unmatched);
    assert_eq!(resolve(VersionTuple::new(9, 4, 0), &channels, false), Decision::Unmatched);
}

#[test]
fn first_channel_on_a_branch_wins() {
    let mut channels = ChannelTable::new();
    channels.push("old-stable", VersionTuple::new(9, 5, 19));
    channels.push("lts", VersionTuple::new(9, 5, 20));

    let channel = channels.matching(&VersionTuple::new(9, 5, 1)).unwrap();
    assert_eq!(channel.name, "old-stable");
    assert_eq!(
        resolve(VersionTuple::new(9, 5, 1), &channels, false).target(),
        Some(VersionTuple::new(9, 5, 19))
    );
    assert_eq!(channels.versions().len(), 2);
}

#[test]
fn shared_release_is_cached_once() {
    let versions = channels().versions();
    assert_eq!(
        versions,
        vec![VersionTuple::new(10, 4, 1), VersionTuple::new(9, 5, 20), VersionTuple::new(8, 7, 32)]
    );
}

#[test]
fn installation_record_serializes_decision_inline() {
    let installation =
        Installation::new("/var/www/site", VersionTuple::new(8, 7, 30), "web:web", &channels(), false);
    let json = serde_json::to_value(&installation).unwrap();

    assert_eq!(json["root"], "/var/www/site");
    assert_eq!(json["version"], "8.7.30");
    assert_eq!(json["status"], "update_available");
    assert_eq!(json["target"], "8.7.32");
}
