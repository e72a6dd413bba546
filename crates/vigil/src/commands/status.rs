//! `vigil status`: the backend's monitoring status.

use vigil_api::MonitoringStatus;
use vigil_core::LiveMonitor;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, or_dash};

pub async fn handle(monitor: &LiveMonitor, global: &GlobalOpts) -> Result<(), CliError> {
    let status = monitor.monitoring_status().await?;
    let out = output::render_single(&global.output, &status, detail, |s| {
        match s.monitoring_active {
            Some(true) => "active".into(),
            Some(false) => "inactive".into(),
            None => "unknown".into(),
        }
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(status: &MonitoringStatus) -> String {
    let stats = &status.statistics;
    output::render_fields([
        ("Monitoring", or_dash(status.monitoring_active.map(|a| if a { "active" } else { "inactive" }))),
        ("Connected clients", or_dash(status.connected_clients)),
        ("System health", or_dash(status.system_health.as_deref())),
        ("Uptime", or_dash(status.uptime.as_deref())),
        ("Last update", or_dash(status.last_update.as_deref())),
        ("Connections today", or_dash(stats.total_connections_today)),
        ("Blocked today", or_dash(stats.attacks_blocked_today)),
        ("False positives", or_dash(stats.false_positives)),
        (
            "Accuracy",
            or_dash(stats.system_accuracy.map(|a| format!("{:.1}%", a * 100.0))),
        ),
    ])
}
