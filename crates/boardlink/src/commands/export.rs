//! State export handler.

use boardlink_core::Agent;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(agent: &Agent, global: &GlobalOpts) -> Result<(), CliError> {
    agent.refresh_ports().await?;
    let exported = agent.export();

    // No sensible table for a nested snapshot; fall back to pretty JSON.
    let out = output::render_single(
        global.output,
        &exported,
        |e| output::render_json(e, false),
        |e| {
            e.agent_info
                .as_ref()
                .and_then(|i| i.version.clone())
                .unwrap_or_default()
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
