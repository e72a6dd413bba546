//! Command dispatch: bridges CLI args -> `LiveMonitor` -> output formatting.

pub mod config_cmd;
pub mod health;
pub mod simulate;
pub mod stats;
pub mod status;
pub mod watch;

use vigil_core::{LiveMonitor, MonitorConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: MonitorConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        // Watch tunes the config before the monitor exists.
        Command::Watch(args) => watch::handle(config, args, global).await,
        Command::Stats => stats::handle(&LiveMonitor::new(config)?, global).await,
        Command::Status => status::handle(&LiveMonitor::new(config)?, global).await,
        Command::Simulate(args) => simulate::handle(&LiveMonitor::new(config)?, &args, global).await,
        Command::Health => health::handle(&LiveMonitor::new(config)?, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command does not talk to the backend".into(),
        }),
    }
}
