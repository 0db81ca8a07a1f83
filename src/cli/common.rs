//! Arguments and helpers shared by the commands.

use crate::config::{Settings, resolve_dir, validate_owner};
use crate::updater::SurveyOptions;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Where to search for installations and how to judge them.
#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    /// Directory below which installations are searched
    #[arg(long, value_name = "DIR")]
    pub path: String,

    /// Directory levels between --path and an installation root
    #[arg(long, value_name = "N")]
    pub path_level: usize,

    /// Treat installations already on their channel's version as outdated
    #[arg(long)]
    pub force_update: bool,

    /// Do not warn about installations on unmaintained branches
    #[arg(long)]
    pub suppress_outdated: bool,

    /// Owner (user[:group]) applied instead of each installation's current owner
    #[arg(long, value_name = "OWNER")]
    pub path_owner: Option<String>,

    /// Release manifest URL, file:// URL, or path
    #[arg(long, value_name = "URL")]
    pub manifest_url: Option<String>,
}

impl SearchArgs {
    /// Applies command-line overrides to the loaded settings.
    #[must_use]
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(url) = &self.manifest_url {
            settings.manifest_url = url.clone();
        }
        settings
    }

    /// Validated search root and owner override.
    ///
    /// # Errors
    ///
    /// Fails if `--path` is not a directory or `--path-owner` is malformed.
    pub fn resolve(&self) -> Result<(PathBuf, Option<String>)> {
        let search_root = resolve_dir(&self.path, "--path")?;
        if let Some(owner) = &self.path_owner {
            validate_owner(owner, "--path-owner")?;
        }
        Ok((search_root, self.path_owner.clone()))
    }

    #[must_use]
    pub fn survey_options<'a>(
        &'a self,
        search_root: &'a std::path::Path,
        settings: &'a Settings,
    ) -> SurveyOptions<'a> {
        SurveyOptions {
            search_root,
            depth: self.path_level,
            marker: &settings.marker_dir,
            force_update: self.force_update,
            owner_override: self.path_owner.as_deref(),
            suppress_outdated: self.suppress_outdated,
        }
    }
}

/// Installs the global tracing subscriber writing to stderr.
///
/// `RUST_LOG` wins over `default_level`. Calling this twice is harmless.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
