//! Command-line interface.
//!
//! # Commands
//!
//! - `update` - bring outdated installations to their channel's newest release
//! - `check` - report installations and their status without changing anything
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: warnings and errors only, no progress indicators
//! - `--config` / `-c`: settings file (also `TYPO3_UPDATER_CONFIG`)
//! - `--no-progress`: no spinners or download bars
//!
//! `RUST_LOG` overrides the level chosen by `--verbose` and `--quiet`.
//!
//! # Examples
//!
//! ```bash
//! # Preview an update of every installation one level below /var/www
//! typo3-updater update --template-path /srv/typo3 --template-owner root:root \
//!     --path /var/www --path-level 1 --work-mode current --dry-run
//!
//! # Fail a monitoring check when an installation is behind
//! typo3-updater check --path /var/www --path-level 1 --strict
//! ```

mod check;
pub mod common;
mod update;

use crate::config::Settings;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Options shared by every command, derived from the global flags.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: &'static str,
    /// Show spinners and download bars
    pub show_progress: bool,
    /// Settings file named on the command line or in the environment
    pub config_path: Option<PathBuf>,
}

#[derive(Parser)]
#[command(
    name = "typo3-updater",
    about = "Keep TYPO3 installations on the newest patch release of their branch",
    version,
    long_about = "Scans a directory tree for TYPO3 installations, compares each installed version with \
                  the release channels published at get.typo3.org, and replaces the core of outdated \
                  installations by copying or linking a cached release."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Settings file (TOML)
    #[arg(short, long, global = true, env = "TYPO3_UPDATER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable progress indicators
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Update outdated installations
    Update(update::UpdateCommand),
    /// Report installation status without changing anything
    Check(check::CheckCommand),
}

impl Cli {
    /// Initializes logging, loads settings, and runs the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; the caller turns it into a message and exit status.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        common::init_logging(config.log_level);

        let settings = Settings::load(config.config_path.as_deref()).await?;
        match self.command {
            Commands::Update(cmd) => cmd.execute(settings, &config).await,
            Commands::Check(cmd) => cmd.execute(settings, &config).await,
        }
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        };

        CliConfig {
            log_level,
            show_progress: !self.no_progress && !self.quiet && std::io::stderr().is_terminal(),
            config_path: self.config.clone(),
        }
    }
}
