//! The `check` command: report-only, touches neither cache nor installations.

use super::CliConfig;
use super::common::SearchArgs;
use crate::config::Settings;
use crate::core::UpdaterError;
use crate::updater::{self, Outcome, RunReport};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Debug, Args)]
pub struct CheckCommand {
    #[command(flatten)]
    search: SearchArgs,

    /// Output format (table or json)
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    format: String,

    /// Exit with non-zero code if an installation is outdated
    #[arg(long)]
    strict: bool,
}

impl CheckCommand {
    /// # Errors
    ///
    /// Returns manifest and discovery errors, [`UpdaterError::RunIncomplete`]
    /// if an installation could not be examined, and with `--strict` an
    /// error if any installation is outdated.
    pub async fn execute(self, settings: Settings, cli: &CliConfig) -> Result<()> {
        let settings = self.search.apply(settings);
        let (search_root, _) = self.search.resolve()?;

        let channels = updater::load_channels(&settings, cli.show_progress).await?;
        let options = self.search.survey_options(&search_root, &settings);
        let report = updater::check(&options, &channels)?;

        match self.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&report)?),
            _ => display_table(&report),
        }

        report.ensure_complete()?;
        if self.strict && report.outdated() > 0 {
            return Err(UpdaterError::Other {
                message: format!("{} installation(s) are outdated", report.outdated()),
            }
            .into());
        }
        Ok(())
    }
}

fn display_table(report: &RunReport) {
    if report.installations.is_empty() {
        return;
    }

    println!(
        "\n{:<40} {:<10} {:<12} {:<10} {:<20}",
        "Installation".bold(),
        "Version".bold(),
        "Channel".bold(),
        "Latest".bold(),
        "Status".bold()
    );
    println!("{}", "─".repeat(95));

    for line in &report.installations {
        let version = line.version.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        let channel = line.channel.clone().unwrap_or_else(|| "-".to_string());
        let latest = line
            .channel
            .as_deref()
            .and_then(|name| report.channels.iter().find(|c| c.name == name))
            .map_or_else(|| "-".to_string(), |c| c.version.to_string());

        let status = match &line.outcome {
            Outcome::Current => "up to date".green(),
            Outcome::Outdated { .. } | Outcome::Updated { .. } => "outdated".yellow(),
            Outcome::Unmatched => "unmaintained".red(),
            Outcome::Failed { error } => format!("failed: {error}").red(),
        };

        println!(
            "{:<40} {:<10} {:<12} {:<10} {}",
            line.root.display().to_string(),
            version,
            channel,
            latest,
            status
        );
    }

    println!("\n{}", "Summary:".bold());
    println!("  Total installations: {}", report.installations.len());
    if report.outdated() > 0 {
        println!("  {} outdated", report.outdated().to_string().yellow());
    }
    if report.unmatched() > 0 {
        println!("  {} on unmaintained branches", report.unmatched().to_string().red());
    }
    if report.failed() > 0 {
        println!("  {} could not be examined", report.failed().to_string().red());
    }
    println!("  {} up to date", report.current().to_string().green());
}
