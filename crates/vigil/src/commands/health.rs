//! `vigil health`: backend liveness.

use vigil_api::HealthResponse;
use vigil_core::LiveMonitor;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, or_dash};

pub async fn handle(monitor: &LiveMonitor, global: &GlobalOpts) -> Result<(), CliError> {
    let health = monitor.health().await?;
    let out = output::render_single(
        &global.output,
        &health,
        |h: &HealthResponse| {
            output::render_fields([
                ("Backend", monitor.client().base_url().to_string()),
                ("Status", h.status.clone()),
                ("Version", or_dash(h.version.as_deref())),
                ("Environment", or_dash(h.environment.as_deref())),
            ])
        },
        |h| h.status.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
