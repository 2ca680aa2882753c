//! Agent info handler.

use serde::Serialize;

use boardlink_core::{Agent, AgentInfo, Protocol};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoView {
    #[serde(flatten)]
    info: AgentInfo,
    agent_url: String,
    ws_address: Option<String>,
    protocol: Protocol,
    use_v2: bool,
}

fn detail(v: &InfoView) -> String {
    let dash = |s: Option<&str>| s.unwrap_or("-").to_owned();
    [
        format!("Agent URL:   {}", v.agent_url),
        format!("Socket:      {}", dash(v.ws_address.as_deref())),
        format!("Version:     {}", dash(v.info.version.as_deref())),
        format!("OS:          {}", dash(v.info.os.as_deref())),
        format!("Protocol:    {}", v.protocol),
        format!("Tool API v2: {}", if v.use_v2 { "yes" } else { "no" }),
        format!("Update URL:  {}", dash(v.info.update_url.as_deref())),
    ]
    .join("\n")
}

pub fn handle(agent: &Agent, global: &GlobalOpts) -> Result<(), CliError> {
    let snap = agent.store().snapshot();
    let view = InfoView {
        info: agent.agent_info()?,
        agent_url: agent.agent_url()?,
        ws_address: agent.ws_address().ok(),
        protocol: snap.config.protocol,
        use_v2: snap.config.use_v2,
    };

    let out = output::render_single(global.output, &view, detail, |v| v.agent_url.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
