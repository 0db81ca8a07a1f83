//! Utilities shared by the update stages.
//!
//! # Modules
//!
//! - [`http`] - HTTP client construction and retry policy
//! - [`platform`] - privilege and file ownership queries
//! - [`progress`] - spinners and download bars
//!
//! # Example
//!
//! ```rust,no_run
//! use typo3_updater::utils::{is_privileged, owner_of};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! if is_privileged() {
//!     println!("owned by {}", owner_of(Path::new("/var/www/site"))?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod http;
pub mod platform;
pub mod progress;

pub use platform::{is_privileged, owner_of};
pub use progress::{ProgressBar, ProgressStyle};
