//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Detail views use a
//! two-column `tabled` table, structured formats use serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::{OwoColorize, Style};
use tabled::{Table, Tabled, settings::Style as TableStyle};

use vigil_core::{AlertSeverity, ThreatLevel};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Apply `style` when color is enabled.
pub fn paint(text: &str, style: Style, color: bool) -> String {
    if color {
        text.style(style).to_string()
    } else {
        text.to_owned()
    }
}

pub fn threat_style(level: ThreatLevel) -> Style {
    match level {
        ThreatLevel::Low => Style::new().green(),
        ThreatLevel::Medium => Style::new().yellow().bold(),
        ThreatLevel::High => Style::new().red().bold(),
    }
}

pub fn severity_style(severity: AlertSeverity) -> Style {
    match severity {
        AlertSeverity::Low => Style::new().cyan(),
        AlertSeverity::Medium => Style::new().yellow(),
        AlertSeverity::High => Style::new().red().bold(),
        AlertSeverity::Critical => Style::new().magenta().bold(),
    }
}

pub fn dim() -> Style {
    Style::new().dimmed()
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// `detail_fn` produces the table view; `id_fn` the one-line plain view.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
    let _ = stdout.flush();
}

// ── Detail tables ────────────────────────────────────────────────────

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Two-column field/value table for detail views.
pub fn render_fields<I, K>(fields: I) -> String
where
    I: IntoIterator<Item = (K, String)>,
    K: Into<String>,
{
    let rows: Vec<FieldRow> = fields
        .into_iter()
        .map(|(field, value)| FieldRow {
            field: field.into(),
            value,
        })
        .collect();
    Table::new(rows).with(TableStyle::rounded()).to_string()
}

/// `Some(v)` as text, `None` as a dash.
pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

// ── Format-specific renderers ────────────────────────────────────────

fn encode_err(e: impl std::fmt::Display) -> CliError {
    CliError::Internal {
        message: format!("failed to encode output: {e}"),
    }
}

/// Pretty-printed JSON.
pub(crate) fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(data).map_err(encode_err)
}

/// Compact single-line JSON.
pub(crate) fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string(data).map_err(encode_err)
}

/// YAML output.
pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(encode_err)
}
