mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    let log_file = match cli.command {
        Command::Watch(ref args) => args.log_file.clone(),
        _ => None,
    };

    let result = match init_tracing(cli.global.verbose, log_file.as_deref()) {
        Ok(guard) => {
            let result = run(cli).await;
            // Flush buffered log lines before a possible process::exit.
            drop(guard);
            result
        }
        Err(err) => Err(err),
    };

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Install the tracing subscriber. Logs go to stderr, or to `log_file`
/// through a non-blocking writer so they never interleave with `watch`
/// output.
fn init_tracing(verbosity: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>, CliError> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
        return Ok(None);
    };

    let file_name = path.file_name().ok_or_else(|| CliError::Validation {
        field: "log-file".into(),
        reason: format!("'{}' is not a file path", path.display()),
    })?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need the backend
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "vigil", &mut std::io::stdout());
            Ok(())
        }

        // All other commands talk to the backend
        cmd => {
            let monitor_config = config::resolve_monitor_config(&cli.global)?;
            tracing::debug!(command = ?cmd, backend = %monitor_config.api_url, "dispatching command");
            commands::dispatch(cmd, monitor_config, &cli.global).await
        }
    }
}
