//! The update run.
//!
//! A run proceeds strictly in order, one step at a time:
//!
//! 1. lock the version cache
//! 2. fetch the release manifest and build the channel table
//! 3. make sure every channel's release is cached
//! 4. discover installations and detect their versions
//! 5. provision every outdated installation, in discovery order
//!
//! Failures confined to one installation (unreadable version, failed
//! command) are recorded in the [`RunReport`] and the run moves on to the
//! next installation. Everything else aborts the run.

use crate::cache::{ArchiveSource, CacheEntry, CacheLock, TemplateCache};
use crate::config::{RunConfig, Settings};
use crate::core::UpdaterError;
use crate::discovery::{self, VersionDetector};
use crate::installation::Installation;
use crate::manifest::ReleaseManifest;
use crate::provision::{self, CommandRunner, ShellCommand, Strategy};
use crate::utils::progress::ProgressBar;
use crate::version::{Channel, ChannelTable, Decision, VersionTuple};
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What happened to one installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Already on its channel's version
    Current,
    /// No channel maintains the installed branch
    Unmatched,
    /// An update is available; reported by `check` runs
    Outdated { target: VersionTuple },
    /// Provisioned, or printed in a dry run
    Updated { strategy: Strategy, target: VersionTuple },
    /// Processing failed; later installations were still processed
    Failed { error: String },
}

/// Per-installation line of a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallationReport {
    pub root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionTuple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Channel maintaining the installed branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Result of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub channels: Vec<Channel>,
    pub installations: Vec<InstallationReport>,
}

impl RunReport {
    fn count(&self, matches: impl Fn(&Outcome) -> bool) -> usize {
        self.installations.iter().filter(|i| matches(&i.outcome)).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    #[must_use]
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Updated { .. }))
    }

    /// Installations on an older patch level of a maintained branch.
    #[must_use]
    pub fn outdated(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Outdated { .. } | Outcome::Updated { .. }))
    }

    #[must_use]
    pub fn unmatched(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Unmatched))
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Current))
    }

    /// Fails with [`UpdaterError::RunIncomplete`] if any installation failed.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn ensure_complete(&self) -> Result<(), UpdaterError> {
        match self.failed() {
            0 => Ok(()),
            failed => Err(UpdaterError::RunIncomplete {
                failed,
                total: self.installations.len(),
            }),
        }
    }
}

/// Fetches the manifest named in `settings` and returns its channel table.
///
/// # Errors
///
/// Returns [`UpdaterError::ManifestUnavailable`], [`UpdaterError::ManifestInvalid`]
/// or [`UpdaterError::ParseError`] for an unusable manifest.
pub async fn load_channels(settings: &Settings, show_progress: bool) -> Result<ChannelTable> {
    let spinner = ProgressBar::new_spinner(show_progress);
    spinner.set_message("Fetching release manifest");

    let manifest = ReleaseManifest::fetch(&settings.manifest_url, settings.http_timeout()).await;
    spinner.finish_and_clear();

    let channels = manifest?.channels(&settings.manifest_url)?;
    for channel in &channels {
        debug!("{} -> {}", channel.name, channel.version);
    }
    Ok(channels)
}

/// Where to look for installations and how to judge them.
#[derive(Debug, Clone)]
pub struct SurveyOptions<'a> {
    pub search_root: &'a Path,
    pub depth: usize,
    pub marker: &'a str,
    pub force_update: bool,
    pub owner_override: Option<&'a str>,
    pub suppress_outdated: bool,
}

/// An installation that was found, or why it could not be examined.
#[derive(Debug)]
pub enum Surveyed {
    Found(Installation),
    Failed { root: PathBuf, error: anyhow::Error },
}

/// Discovers installations and resolves each against `channels`.
///
/// # Errors
///
/// Returns [`UpdaterError::NoInstancesFound`] if discovery finds nothing, or
/// any error not confined to a single installation.
pub fn survey(options: &SurveyOptions<'_>, channels: &ChannelTable) -> Result<Vec<Surveyed>> {
    let roots = discovery::discover(options.search_root, options.depth, options.marker)?;
    let detector = VersionDetector::new()?;

    let mut surveyed = Vec::with_capacity(roots.len());
    for root in roots {
        let version = match detector.detect(&root) {
            Ok(version) => version,
            Err(e) if e.is_per_installation() => {
                surveyed.push(Surveyed::Failed {
                    root,
                    error: e.into(),
                });
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let owner = discovery::owner(&root, options.owner_override)?;
        let installation = Installation::new(root, version, owner, channels, options.force_update);

        if installation.decision == Decision::Unmatched && !options.suppress_outdated {
            warn_unmatched(&installation);
        }
        surveyed.push(Surveyed::Found(installation));
    }
    Ok(surveyed)
}

fn warn_unmatched(installation: &Installation) {
    eprintln!(
        "{}",
        format!(
            "Version {} of instance {} is outdated! Please update!",
            installation.version,
            installation.root.display()
        )
        .red()
    );
}

fn is_isolated(error: &anyhow::Error) -> bool {
    error
        .chain()
        .find_map(|e| e.downcast_ref::<UpdaterError>())
        .is_some_and(UpdaterError::is_per_installation)
}

fn report_failure(root: PathBuf, error: &anyhow::Error) -> InstallationReport {
    eprintln!("{} {}: {:#}", "✗".red(), root.display(), error);
    InstallationReport {
        root,
        version: None,
        owner: None,
        channel: None,
        outcome: Outcome::Failed {
            error: format!("{error:#}"),
        },
    }
}

fn report_line(installation: &Installation, channels: &ChannelTable, outcome: Outcome) -> InstallationReport {
    InstallationReport {
        root: installation.root.clone(),
        version: Some(installation.version),
        owner: Some(installation.owner.clone()),
        channel: channels.matching(&installation.version).map(|c| c.name.clone()),
        outcome,
    }
}

/// Reports every installation without changing anything.
///
/// # Errors
///
/// Fails on manifest or discovery errors; per-installation failures are
/// part of the report.
pub fn check(options: &SurveyOptions<'_>, channels: &ChannelTable) -> Result<RunReport> {
    let mut report = RunReport {
        dry_run: true,
        channels: channels.iter().cloned().collect(),
        installations: Vec::new(),
    };

    for surveyed in survey(options, channels)? {
        let line = match surveyed {
            Surveyed::Failed {
                root,
                error,
            } => report_failure(root, &error),
            Surveyed::Found(installation) => {
                let outcome = match installation.decision {
                    Decision::Current => Outcome::Current,
                    Decision::Unmatched => Outcome::Unmatched,
                    Decision::UpdateAvailable {
                        target,
                    } => Outcome::Outdated {
                        target,
                    },
                };
                report_line(&installation, channels, outcome)
            }
        };
        report.installations.push(line);
    }
    Ok(report)
}

/// Populates the cache with every channel's release.
///
/// Runs `chown -R` on the cache through `runner` if anything was fetched.
///
/// # Errors
///
/// Fails if a release cannot be downloaded or extracted.
pub async fn populate_cache(
    config: &RunConfig,
    cache: &TemplateCache,
    channels: &ChannelTable,
    runner: &mut CommandRunner,
) -> Result<Vec<CacheEntry>> {
    let source = ArchiveSource {
        base: config.settings.download_url.clone(),
        timeout: config.settings.http_timeout(),
        show_progress: config.show_progress,
    };

    let mut entries = Vec::new();
    for version in channels.versions() {
        entries.push(cache.ensure(version, &source).await?);
    }

    if entries.iter().any(|e| e.fetched) {
        runner.run(&ShellCommand::chown_r(&config.template_owner, [cache.root()])).await?;
    }
    Ok(entries)
}

/// Runs a full update with `config`.
///
/// # Errors
///
/// Fails on errors affecting the whole run. Per-installation failures are
/// recorded in the report; use [`RunReport::ensure_complete`] to turn them
/// into an error.
pub async fn run(config: &RunConfig, runner: &mut CommandRunner) -> Result<RunReport> {
    let lock = CacheLock::acquire(&config.template_path).await?;
    debug!("Holding {} for the run", lock.path().display());

    let channels = load_channels(&config.settings, config.show_progress).await?;
    let cache = TemplateCache::new(&config.template_path, &config.settings.source_prefix);
    let cached = populate_cache(config, &cache, &channels, runner).await?;

    let options = SurveyOptions {
        search_root: &config.search_root,
        depth: config.depth,
        marker: &config.settings.marker_dir,
        force_update: config.force_update,
        owner_override: config.owner_override.as_deref(),
        suppress_outdated: config.suppress_outdated,
    };

    let mut report = RunReport {
        dry_run: runner.is_dry_run(),
        channels: channels.iter().cloned().collect(),
        installations: Vec::new(),
    };

    let surveyed = survey(&options, &channels)?;
    let outdated = surveyed
        .iter()
        .filter(|s| matches!(s, Surveyed::Found(installation) if installation.is_outdated()))
        .count();
    info!("{} of {} installation(s) need an update", outdated, surveyed.len());

    for surveyed in surveyed {
        let installation = match surveyed {
            Surveyed::Found(installation) => installation,
            Surveyed::Failed {
                root,
                error,
            } => {
                report.installations.push(report_failure(root, &error));
                continue;
            }
        };

        let Some(target) = installation.target() else {
            let outcome = if installation.decision == Decision::Current {
                info!("{} is up to date ({})", installation.root.display(), installation.version);
                Outcome::Current
            } else {
                Outcome::Unmatched
            };
            report.installations.push(report_line(&installation, &channels, outcome));
            continue;
        };

        let line = match update_one(config, runner, &installation, target, &cached).await {
            Ok(strategy) => {
                println!(
                    "{}",
                    format!("# {} updated with {} to {}", installation.root.display(), strategy, target)
                        .green()
                );
                report_line(
                    &installation,
                    &channels,
                    Outcome::Updated {
                        strategy,
                        target,
                    },
                )
            }
            Err(e) if is_isolated(&e) => {
                let mut line = report_failure(installation.root.clone(), &e);
                line.version = Some(installation.version);
                line
            }
            Err(e) => return Err(e),
        };
        report.installations.push(line);
    }

    Ok(report)
}

async fn update_one(
    config: &RunConfig,
    runner: &mut CommandRunner,
    installation: &Installation,
    target: VersionTuple,
    cached: &[CacheEntry],
) -> Result<Strategy> {
    let source = cached
        .iter()
        .find(|entry| entry.version == target)
        .map(|entry| entry.source.clone())
        .ok_or_else(|| UpdaterError::Other {
            message: format!("TYPO3 {target} is not in the version cache"),
        })?;

    let strategy = config.work_mode.strategy_for(installation.root());
    info!(
        "Updating {} from {} to {} ({})",
        installation.root().display(),
        installation.version,
        target,
        strategy
    );

    provision::apply(runner, strategy, installation.root(), &source, &installation.owner).await?;
    Ok(strategy)
}
