//! `vigil watch`: follow live metrics and alerts until Ctrl-C.
//!
//! Table and plain output print one human-readable line per update; JSON
//! output prints one compact object per line, tagged by `event`.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use vigil_core::{AlertRecord, LiveMetrics, LiveMonitor, MonitorConfig, Notification};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::{self, dim, paint, severity_style, threat_style};

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent<'a> {
    Metrics {
        at: DateTime<Utc>,
        metrics: &'a LiveMetrics,
    },
    Alert {
        at: DateTime<Utc>,
        alert: &'a AlertRecord,
    },
    Connected {
        at: DateTime<Utc>,
    },
    Disconnected {
        at: DateTime<Utc>,
    },
    Reconnecting {
        at: DateTime<Utc>,
        delay_ms: u64,
    },
}

/// Apply `watch` flags on top of the resolved profile.
fn apply_args(mut config: MonitorConfig, args: &WatchArgs) -> MonitorConfig {
    if args.no_stream {
        config.stream_enabled = false;
    }
    if let Some(interval) = args.poll_interval {
        config.poll_interval = interval;
    }
    if let Some(window) = args.dedup_window {
        config.dedup_window = window;
    }
    config
}

pub async fn handle(
    config: MonitorConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let monitor = LiveMonitor::new(apply_args(config, &args))?;
    let renderer = Renderer {
        format: global.output.clone(),
        color: output::should_color(&global.color),
        quiet: global.quiet,
    };

    // Subscribe before starting so the first poll is not missed.
    let mut metrics = monitor.metrics();
    let mut notifications = monitor.notifications();
    monitor.start().await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            biased;

            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    warn!(error = %e, "cannot listen for Ctrl-C");
                }
                debug!("interrupted, shutting down");
                break Ok(());
            }

            notice = notifications.recv() => match notice {
                Ok(notice) => {
                    if let Err(e) = renderer.notification(&notice) {
                        break Err(e);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "display fell behind; notifications dropped");
                }
                Err(RecvError::Closed) => break Ok(()),
            },

            update = metrics.changed() => match update {
                Some(current) => {
                    if let Err(e) = renderer.metrics(&current) {
                        break Err(e);
                    }
                }
                None => break Ok(()),
            },
        }
    };

    monitor.shutdown().await;
    result
}

struct Renderer {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Renderer {
    fn emit(&self, event: &WatchEvent<'_>, line: impl FnOnce() -> String) -> Result<(), CliError> {
        let out = match self.format {
            OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(event)?,
            OutputFormat::Yaml => format!("---\n{}", output::render_yaml(event)?.trim_end()),
            OutputFormat::Table | OutputFormat::Plain => line(),
        };
        output::print_output(&out, self.quiet);
        Ok(())
    }

    fn metrics(&self, metrics: &LiveMetrics) -> Result<(), CliError> {
        let at = Utc::now();
        self.emit(&WatchEvent::Metrics { at, metrics }, || {
            metrics_line(at, metrics, self.use_color())
        })
    }

    fn notification(&self, notice: &Notification) -> Result<(), CliError> {
        let at = Utc::now();
        let color = self.use_color();
        match notice {
            Notification::Alert(alert) => {
                let alert: &AlertRecord = alert;
                self.emit(&WatchEvent::Alert { at, alert }, || alert_line(alert, color))
            }
            Notification::Connected => self.emit(&WatchEvent::Connected { at }, || {
                status_line(at, "live stream connected", color)
            }),
            Notification::Disconnected => self.emit(&WatchEvent::Disconnected { at }, || {
                status_line(at, "live stream disconnected", color)
            }),
            Notification::ReconnectScheduled { delay } => {
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                self.emit(&WatchEvent::Reconnecting { at, delay_ms }, || {
                    status_line(at, &format!("reconnecting in {}", human(*delay)), color)
                })
            }
        }
    }

    fn use_color(&self) -> bool {
        self.color && matches!(self.format, OutputFormat::Table)
    }
}

// ── Line renderers ───────────────────────────────────────────────────

fn clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn human(delay: Duration) -> String {
    // Whole milliseconds keep humantime from printing nanoseconds.
    let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    humantime::format_duration(Duration::from_millis(millis)).to_string()
}

fn metrics_line(at: DateTime<Utc>, m: &LiveMetrics, color: bool) -> String {
    let level = m.threat_level.to_string().to_uppercase();
    let net = &m.network_metrics;
    let mut line = format!(
        "{}  threat {}  connections {}  suspicious {}  blocked {}  bandwidth {:.1}%  loss {:.2}%  latency {:.0}ms",
        paint(&clock(at), dim(), color),
        paint(&level, threat_style(m.threat_level), color),
        m.total_connections,
        m.suspicious_activities,
        m.blocked_attacks,
        net.bandwidth_usage_pct,
        net.packet_loss_pct,
        net.latency_ms,
    );
    let active: Vec<String> = m
        .attack_breakdown
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(kind, count)| format!("{kind} {count}"))
        .collect();
    if !active.is_empty() {
        line.push_str("  [");
        line.push_str(&active.join(", "));
        line.push(']');
    }
    line
}

fn alert_line(alert: &AlertRecord, color: bool) -> String {
    let at = alert.timestamp.unwrap_or(alert.received_at);
    let target = alert
        .target_port
        .map(|port| format!(" -> :{port}"))
        .unwrap_or_default();
    format!(
        "{}  {} {:<8} {} from {}{}  {:.0}%  {}",
        paint(&clock(at), dim(), color),
        paint("ALERT", severity_style(alert.severity), color),
        alert.severity.to_string(),
        alert.attack_type,
        alert.source_ip,
        target,
        alert.confidence * 100.0,
        alert.message,
    )
}

fn status_line(at: DateTime<Utc>, text: &str, color: bool) -> String {
    format!("{}  {}", paint(&clock(at), dim(), color), paint(text, dim(), color))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use uuid::Uuid;

    use vigil_core::{AlertSeverity, NetworkMetrics, ThreatLevel};

    use super::*;

    fn sample_metrics() -> LiveMetrics {
        LiveMetrics {
            total_connections: 1000,
            suspicious_activities: 20,
            blocked_attacks: 30,
            threat_level: ThreatLevel::Medium,
            network_metrics: NetworkMetrics {
                bandwidth_usage_pct: 100.0,
                packet_loss_pct: 2.0,
                latency_ms: 20.0,
            },
            attack_breakdown: BTreeMap::from([("DoS".into(), 5), ("Probe".into(), 0)]),
        }
    }

    #[test]
    fn metrics_line_lists_nonzero_attacks() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let line = metrics_line(at, &sample_metrics(), false);
        assert!(line.contains("threat MEDIUM"));
        assert!(line.contains("suspicious 20"));
        assert!(line.contains("latency 20ms"));
        assert!(line.ends_with("[DoS 5]"));
    }

    #[test]
    fn alert_line_shows_source_and_port() {
        let now = Utc::now();
        let alert = AlertRecord {
            id: Uuid::new_v4(),
            dedup_key: "10.0.0.5_DoS".into(),
            source_ip: "10.0.0.5".into(),
            attack_type: "DoS".into(),
            severity: AlertSeverity::High,
            confidence: 0.93,
            target_port: Some(80),
            message: "SYN flood".into(),
            timestamp: None,
            received_at: now,
        };
        let line = alert_line(&alert, false);
        assert!(line.contains("ALERT High"));
        assert!(line.contains("DoS from 10.0.0.5 -> :80"));
        assert!(line.contains("93%"));
        assert!(line.ends_with("SYN flood"));
    }

    #[test]
    fn json_events_are_tagged() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let metrics = sample_metrics();
        let json = output::render_json_compact(&WatchEvent::Metrics { at, metrics: &metrics }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "metrics");
        assert_eq!(value["metrics"]["threat_level"], "Medium");
        assert_eq!(value["metrics"]["attack_breakdown"]["DoS"], 5);

        let reconnect = output::render_json_compact(&WatchEvent::Reconnecting { at, delay_ms: 3000 }).unwrap();
        assert!(reconnect.contains(r#""event":"reconnecting""#));
        assert!(reconnect.contains(r#""delay_ms":3000"#));
    }

    #[test]
    fn watch_flags_tune_the_monitor() {
        let args = WatchArgs {
            log_file: None,
            no_stream: true,
            poll_interval: Some(Duration::from_secs(2)),
            dedup_window: None,
        };
        let config = apply_args(MonitorConfig::default(), &args);
        assert!(!config.stream_enabled);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.dedup_window, Duration::from_secs(60));
    }
}
