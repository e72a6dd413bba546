//! `vigil stats`: one snapshot poll and the metrics it reconciles to.

use std::sync::Arc;

use serde::Serialize;

use vigil_core::{LiveMetrics, LiveMonitor, Snapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct StatsReport {
    snapshot: Snapshot,
    metrics: Arc<LiveMetrics>,
}

pub async fn handle(monitor: &LiveMonitor, global: &GlobalOpts) -> Result<(), CliError> {
    let (snapshot, metrics) = monitor.fetch_once().await?;
    let report = StatsReport { snapshot, metrics };

    let out = output::render_single(&global.output, &report, detail, |r| {
        r.metrics.threat_level.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(report: &StatsReport) -> String {
    let s = &report.snapshot;
    let m = &report.metrics;
    let net = &m.network_metrics;

    let mut fields = vec![
        ("Threat level", m.threat_level.to_string()),
        ("Total connections", m.total_connections.to_string()),
        ("Suspicious", m.suspicious_activities.to_string()),
        ("Blocked attacks", m.blocked_attacks.to_string()),
        ("Bandwidth", format!("{:.1}%", net.bandwidth_usage_pct)),
        ("Packet loss", format!("{:.2}%", net.packet_loss_pct)),
        ("Latency", format!("{:.0} ms", net.latency_ms)),
        ("Entries/sec", format!("{:.2}", s.entries_per_second)),
        ("Error rate", format!("{:.2}%", s.error_rate * 100.0)),
        ("Unique sources", s.unique_sources.to_string()),
        ("Connections today", output::or_dash(s.total_connections_today)),
        ("Blocked today", output::or_dash(s.attacks_blocked_today)),
    ];
    if s.is_reset() {
        fields.push(("Note", "backend reports no traffic (counters reset)".into()));
    }
    fields.push(("Fetched", s.fetched_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()));

    output::render_fields(fields)
}
