//! butler CLI entry point.

use std::process::ExitCode;

use butler_core::{ReportFormatter, TracingConfig, init_tracing};
use butler_providers::google::{GoogleAuth, ShutdownHandle};
use chrono::Local;
use clap::Parser;
use tracing::debug;

use butler_client::cli::{Cli, Command, Report, USAGE_HINT};
use butler_client::config::Settings;
use butler_client::error::ClientResult;
use butler_client::{commands, credentials};

/// Exit status after a SIGINT/SIGTERM.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => {
            eprintln!("Cancelled.");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    init_tracing(if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    })?;

    let settings = Settings::load(&cli)?;
    debug!("using cache directory {}", settings.cache_dir.display());

    let shutdown = ShutdownHandle::new();

    if let Some(Command::Auth { force }) = cli.command {
        let auth = google_auth(&settings, &shutdown)?;
        return commands::auth::run(&auth, force, &mut std::io::stdout()).await;
    }

    let Some(report) = cli.report() else {
        println!("{}", USAGE_HINT);
        return Ok(());
    };

    let auth = google_auth(&settings, &shutdown)?;
    let client = auth.authenticate().await?;

    let formatter = ReportFormatter::new(settings.report);
    let mut out = std::io::stdout().lock();
    match report {
        Report::Mail => {
            let gmail = client.gmail()?;
            let report = commands::mail::report(
                &gmail,
                &settings.labels,
                settings.max_results,
                &formatter,
                &mut out,
            );
            commands::interruptible(&shutdown, report).await?;
        }
        Report::Calendar => {
            let calendar = client.calendar(&settings.calendar_id)?;
            let now = Local::now();
            let report = commands::calendar::report(&calendar, &now, &formatter, &mut out);
            commands::interruptible(&shutdown, report).await?;
        }
    }
    Ok(())
}

/// Loads credentials, bootstrapping them on first run, then prepares the
/// authorizer and starts listening for SIGINT/SIGTERM for the rest of the run.
fn google_auth(settings: &Settings, shutdown: &ShutdownHandle) -> ClientResult<GoogleAuth> {
    let credentials = credentials::load(settings)?;
    let auth = GoogleAuth::new(settings.auth_config(credentials), shutdown.clone())?;
    let _listener = shutdown.spawn_signal_listener();
    Ok(auth)
}
