//! Clap derive structures for the `vigil` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use vigil_api::AttackType;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vigil -- live telemetry from a network intrusion detection backend
#[derive(Debug, Parser)]
#[command(
    name = "vigil",
    version,
    about = "Watch NIDS threat telemetry from the command line",
    long_about = "Connects to a NIDS backend, merges its periodic statistics with the\n\
        live monitoring stream, and renders threat metrics and de-duplicated\n\
        attack alerts as they arrive.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "VIGIL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend API root, e.g. http://localhost:8000/api/v1 (overrides profile)
    #[arg(long, short = 'b', env = "VIGIL_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Live stream URL (default: derived from the backend URL)
    #[arg(long, env = "VIGIL_STREAM_URL", global = true)]
    pub stream_url: Option<String>,

    /// Bearer token for an authenticating proxy
    #[arg(long, env = "VIGIL_API_TOKEN", global = true, hide_env = true)]
    pub api_token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VIGIL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "VIGIL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "VIGIL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON (`watch` emits one compact line per update)
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow live metrics and alerts until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Fetch one statistics snapshot and show the metrics it reconciles to
    Stats,

    /// Show the backend's monitoring status
    Status,

    /// Ask the backend to simulate an attack
    Simulate(SimulateArgs),

    /// Check backend health
    Health,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Poll statistics only; never open the live stream
    #[arg(long)]
    pub no_stream: bool,

    /// Statistics poll interval (e.g. "10s", "1m")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Alert suppression window (e.g. "60s")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub dedup_window: Option<Duration>,
}

// ── Simulate ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Attack category: DoS, Probe, U2R, R2L (case-insensitive)
    #[arg(value_parser = parse_attack_type)]
    pub attack_type: AttackType,
}

fn parse_attack_type(value: &str) -> Result<AttackType, String> {
    value
        .parse()
        .map_err(|_| format!("unknown attack type '{value}' (expected DoS, Probe, U2R or R2L)"))
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display the configuration (tokens redacted)
    Show,

    /// Print the config file location
    Path,

    /// Store a bearer token in the system keyring
    SetToken {
        /// Profile to store the token for (default: active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn simulate_accepts_any_case() {
        let cli = Cli::try_parse_from(["vigil", "simulate", "u2r"]).unwrap();
        match cli.command {
            Command::Simulate(args) => assert_eq!(args.attack_type, AttackType::U2R),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn simulate_rejects_unknown_type() {
        let err = Cli::try_parse_from(["vigil", "simulate", "smurf"]).unwrap_err();
        assert!(err.to_string().contains("unknown attack type"));
    }

    #[test]
    fn watch_parses_human_durations() {
        let cli =
            Cli::try_parse_from(["vigil", "watch", "--poll-interval", "2m", "--dedup-window", "90s"])
                .unwrap();
        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.poll_interval, Some(Duration::from_secs(120)));
                assert_eq!(args.dedup_window, Some(Duration::from_secs(90)));
                assert!(!args.no_stream);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
