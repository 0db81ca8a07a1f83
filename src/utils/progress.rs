//! Progress indicators for long-running steps.
//!
//! Two kinds of indicator are used: a spinner while the manifest is fetched
//! or an archive is extracted, and a byte-counting bar while an archive
//! downloads. Both draw to stderr, so dry-run transcripts on stdout stay
//! clean, and both are hidden when progress is disabled (`--no-progress`,
//! `--quiet`) or stderr is not a terminal.
//!
//! # Examples
//!
//! ```rust
//! use typo3_updater::utils::progress::ProgressBar;
//!
//! let spinner = ProgressBar::new_spinner(false);
//! spinner.set_message("Fetching release manifest");
//! spinner.finish_and_clear();
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// A progress indicator that silently ignores all calls when disabled.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a spinner for work of unknown length.
    #[must_use]
    pub fn new_spinner(enabled: bool) -> Self {
        let bar = if enabled {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(ProgressStyle::spinner());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            IndicatifBar::hidden()
        };
        Self {
            inner: bar,
        }
    }

    /// Creates a byte-counting bar; `total` is the expected size if known.
    #[must_use]
    pub fn new_download(enabled: bool, total: Option<u64>) -> Self {
        let bar = if !enabled {
            IndicatifBar::hidden()
        } else if let Some(total) = total {
            let bar = IndicatifBar::new(total);
            bar.set_style(ProgressStyle::download());
            bar
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(ProgressStyle::download_unknown());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            inner: bar,
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Current position, in bytes for download bars.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

/// Styles used by [`ProgressBar`].
pub struct ProgressStyle;

impl ProgressStyle {
    /// Braille spinner followed by the message.
    #[must_use]
    pub fn spinner() -> IndicatifStyle {
        IndicatifStyle::default_spinner()
            .template("{prefix:.bold} {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| IndicatifStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"])
    }

    /// Bar with transferred and total bytes.
    #[must_use]
    pub fn download() -> IndicatifStyle {
        IndicatifStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
            .unwrap_or_else(|_| IndicatifStyle::default_bar())
            .progress_chars("━╸━")
    }

    /// Spinner with transferred bytes, for responses without a length.
    #[must_use]
    pub fn download_unknown() -> IndicatifStyle {
        IndicatifStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.cyan} {bytes} {msg}")
            .unwrap_or_else(|_| IndicatifStyle::default_spinner())
    }
}
