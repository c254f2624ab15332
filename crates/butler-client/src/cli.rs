//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// butler - unread mail and upcoming events at a glance
#[derive(Debug, Parser)]
#[command(name = "butler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Show messages matching the selected labels
    #[arg(long, conflicts_with = "cal")]
    pub mail: bool,

    /// Show events from now until the end of tomorrow
    #[arg(long)]
    pub cal: bool,

    /// Maximum number of messages to show [default: 100]
    #[arg(short = 'n', long = "max-results", value_name = "N")]
    pub max_results: Option<u32>,

    /// Comma-separated label names [default: UNREAD]
    #[arg(short = 'l', long = "labels", value_name = "LABELS")]
    pub labels: Option<String>,

    /// Path to configuration file
    #[arg(long, short, env = "BUTLER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding credentials.json and token.json [default: ~/.butler]
    #[arg(long, env = "BUTLER_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Paste the authorization code instead of running a local listener
    #[arg(long)]
    pub manual: bool,

    /// Local port for the authorization redirect (0 picks a free port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Do not try to open a browser during authorization
    #[arg(long)]
    pub no_browser: bool,

    /// Disable bold highlighting
    #[arg(long)]
    pub no_color: bool,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Which report to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    Mail,
    Calendar,
}

impl Cli {
    /// Returns the requested report, if any.
    pub fn report(&self) -> Option<Report> {
        if self.mail {
            Some(Report::Mail)
        } else if self.cal {
            Some(Report::Calendar)
        } else {
            None
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize butler with Google and store the token
    Auth {
        /// Re-authorize even if a usable token is cached
        #[arg(long, short)]
        force: bool,
    },
}

/// Printed when neither `--mail` nor `--cal` is given.
pub const USAGE_HINT: &str = "\
butler: nothing to show.

  butler --mail [-l LABELS] [-n N]   list messages (default: 100 UNREAD)
  butler --cal                       list events until the end of tomorrow
  butler auth [--force]              authorize with Google

Run 'butler --help' for all options.";
