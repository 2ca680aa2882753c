//! Port listing handler.

use tabled::Tabled;

use boardlink_core::{Agent, AgentPort};

use crate::cli::{GlobalOpts, PortsArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "VID")]
    vid: String,
    #[tabled(rename = "PID")]
    pid: String,
    #[tabled(rename = "Open")]
    open: String,
    #[tabled(rename = "Network")]
    network: String,
}

fn yes_no(b: bool) -> String {
    if b { "yes".into() } else { "no".into() }
}

fn row(p: &AgentPort, color: bool) -> PortRow {
    PortRow {
        name: p.name.clone(),
        serial: p.serial_number.clone(),
        vid: p.vendor_id.clone(),
        pid: p.product_id.clone(),
        open: output::paint_status(&yes_no(p.is_open), color),
        network: yes_no(p.network_port),
    }
}

pub async fn handle(agent: &Agent, args: &PortsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut ports = agent.refresh_ports().await?;
    if args.network {
        ports.extend(agent.network_ports());
    }

    let color = output::should_color(global.color);
    let out = output::render_list(global.output, &ports, |p| row(p, color), |p| p.name.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
