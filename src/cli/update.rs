//! The `update` command.
//!
//! Without root privileges the command cannot change file ownership, so it
//! falls back to a dry run and prints the commands it would have executed.
//! The version cache is populated either way, which lets an unprivileged
//! user warm the cache ahead of a maintenance window.

use super::CliConfig;
use super::common::SearchArgs;
use crate::config::{RunConfig, Settings, resolve_dir, validate_owner};
use crate::provision::{CommandRunner, WorkMode};
use crate::updater::{self, RunReport};
use crate::utils::is_privileged;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Root of the version cache
    #[arg(long, value_name = "DIR")]
    template_path: String,

    /// Owner (user[:group]) of the version cache
    #[arg(long, value_name = "OWNER")]
    template_owner: String,

    #[command(flatten)]
    search: SearchArgs,

    /// How new core files are placed into installations
    #[arg(long, value_enum)]
    work_mode: WorkMode,

    /// Print the commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Base URL (or directory) release archives are downloaded from
    #[arg(long, value_name = "URL")]
    download_url: Option<String>,
}

impl UpdateCommand {
    /// Runs the update and exits non-zero if any installation failed.
    ///
    /// # Errors
    ///
    /// Returns configuration, manifest, cache, and discovery errors, or
    /// [`crate::core::UpdaterError::RunIncomplete`] after all installations
    /// were attempted.
    pub async fn execute(self, settings: Settings, cli: &CliConfig) -> Result<()> {
        let config = self.build_run_config(settings, cli, is_privileged())?;

        let mut runner = if config.dry_run {
            CommandRunner::dry_run()
        } else {
            CommandRunner::live(config.settings.command_timeout())
        };

        let report = updater::run(&config, &mut runner).await?;
        print_summary(&report);
        Ok(report.ensure_complete()?)
    }

    fn build_run_config(self, settings: Settings, cli: &CliConfig, privileged: bool) -> Result<RunConfig> {
        let mut settings = self.search.apply(settings);
        if let Some(url) = &self.download_url {
            settings.download_url = url.clone();
        }

        let template_path = resolve_dir(&self.template_path, "--template-path")?;
        validate_owner(&self.template_owner, "--template-owner")?;
        let (search_root, owner_override) = self.search.resolve()?;

        let (dry_run, notice) = dry_run_mode(self.dry_run, privileged);
        if let Some(notice) = notice {
            eprintln!("{}", notice.red());
        }

        Ok(RunConfig {
            template_path,
            template_owner: self.template_owner,
            search_root,
            depth: self.search.path_level,
            work_mode: self.work_mode,
            dry_run,
            force_update: self.search.force_update,
            owner_override,
            suppress_outdated: self.search.suppress_outdated,
            show_progress: cli.show_progress,
            settings,
        })
    }
}

const UNPRIVILEGED_NOTICE: &str = "Running without root access is not possible. Falling back to a dry run.";

/// Whether the run is a dry run, and the notice to print for unprivileged users.
///
/// The notice is printed whenever the user is not root, even if a dry run
/// was requested anyway.
fn dry_run_mode(requested: bool, privileged: bool) -> (bool, Option<&'static str>) {
    if privileged {
        (requested, None)
    } else {
        (true, Some(UNPRIVILEGED_NOTICE))
    }
}

fn print_summary(report: &RunReport) {
    let verb = if report.dry_run { "to update" } else { "updated" };
    let mut parts = vec![
        format!("{} {}", report.updated(), verb),
        format!("{} current", report.current()),
    ];
    if report.unmatched() > 0 {
        parts.push(format!("{} unmaintained", report.unmatched()));
    }
    if report.failed() > 0 {
        parts.push(format!("{} failed", report.failed()));
    }

    let line = format!("# {}", parts.join(", "));
    if report.failed() > 0 {
        println!("{}", line.red());
    } else {
        println!("{}", line.green());
    }
}
