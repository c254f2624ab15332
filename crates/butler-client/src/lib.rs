//! Command-line client for butler
//!
//! This crate provides the `butler` command: flag and config handling,
//! credential bootstrap and the mail and calendar reports.

pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
