//! Core types shared by every stage of an update run
//!
//! The core module holds the error system:
//! - **Strongly-typed errors** ([`UpdaterError`]) for precise handling in code
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions for operators
//! - [`user_friendly_error`] to turn any `anyhow::Error` into a printable context
//!
//! Library functions return `anyhow::Result` and raise [`UpdaterError`]
//! variants where the failure kind matters to the caller; the binary converts
//! whatever reaches `main` with [`user_friendly_error`].

pub mod error;

pub use error::{ErrorContext, UpdaterError, user_friendly_error};
