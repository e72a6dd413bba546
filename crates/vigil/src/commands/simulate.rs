//! `vigil simulate <type>`: trigger a backend attack simulation.

use tracing::info;

use vigil_api::SimulationResponse;
use vigil_core::LiveMonitor;

use crate::cli::{GlobalOpts, SimulateArgs};
use crate::error::CliError;
use crate::output::{self, or_dash};

pub async fn handle(
    monitor: &LiveMonitor,
    args: &SimulateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let response = monitor.simulate_attack(args.attack_type).await?;
    info!(attack_type = %args.attack_type, status = %response.status, "simulation requested");

    let out = output::render_single(&global.output, &response, detail, |r| r.status.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(response: &SimulationResponse) -> String {
    let data = &response.simulation_data;
    let target = match (data.target_ip.as_deref(), data.port) {
        (Some(ip), Some(port)) => format!("{ip}:{port}"),
        (Some(ip), None) => ip.to_owned(),
        (None, Some(port)) => format!(":{port}"),
        (None, None) => "-".into(),
    };
    output::render_fields([
        ("Status", response.status.clone()),
        ("Message", or_dash(response.message.as_deref())),
        ("Attack type", or_dash(data.attack_type.as_deref())),
        ("Source", or_dash(data.source_ip.as_deref())),
        ("Target", target),
        ("Severity", or_dash(data.severity.as_deref())),
        ("Packets", data.packets.to_string()),
        ("Duration", format!("{}s", data.duration)),
    ])
}
