//! Tool download handler.

use serde::Serialize;
use tabled::Tabled;

use boardlink_core::{Agent, DownloadRequest, Ticket, TicketStatus, default_tools};

use crate::cli::{DownloadArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct DownloadResult {
    tool: String,
    version: String,
    package: String,
    status: Option<TicketStatus>,
}

#[derive(Tabled)]
struct DownloadRow {
    #[tabled(rename = "Tool")]
    tool: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn status_word(status: Option<TicketStatus>) -> &'static str {
    match status {
        Some(TicketStatus::Success) => "success",
        Some(TicketStatus::Error) => "error",
        Some(TicketStatus::Pending) => "pending",
        Some(TicketStatus::Sent) | None => "sent",
    }
}

/// Tickets settle in request order, so they pair up by position.
fn pair(requests: &[DownloadRequest], tickets: &[Ticket]) -> Vec<DownloadResult> {
    requests
        .iter()
        .zip(tickets)
        .map(|(r, t)| DownloadResult {
            tool: r.tool_name.clone(),
            version: r.tool_version.clone(),
            package: r.package_name.clone(),
            status: t.status,
        })
        .collect()
}

pub async fn handle(agent: &Agent, args: DownloadArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let requests = if args.defaults {
        let windows = agent.agent_info()?.is_windows();
        default_tools(windows)
    } else {
        match (args.tool, args.version) {
            (Some(tool), Some(version)) => vec![DownloadRequest::new(tool, version, args.package)],
            _ => {
                return Err(CliError::Validation {
                    field: "tool".into(),
                    reason: "a tool name and version are required unless --defaults is set".into(),
                });
            }
        }
    };

    let bar = output::spinner(
        format!("Downloading {} tool(s) through the agent", requests.len()),
        global.quiet,
    );
    let tickets = agent.download_tools(&requests).await;
    bar.finish_and_clear();

    if tickets.is_empty() {
        return Err(CliError::Timeout {
            operation: "Tool download".into(),
        });
    }

    let results = pair(&requests, &tickets);
    let color = output::should_color(global.color);
    let out = output::render_list(
        global.output,
        &results,
        |r| DownloadRow {
            tool: r.tool.clone(),
            version: r.version.clone(),
            package: r.package.clone(),
            status: output::paint_status(status_word(r.status), color),
        },
        |r| format!("{} {}", r.tool, status_word(r.status)),
    );
    output::print_output(&out, global.quiet);

    let failed = results
        .iter()
        .filter(|r| r.status != Some(TicketStatus::Success))
        .count();
    if failed > 0 {
        return Err(CliError::DownloadFailed {
            failed,
            total: results.len(),
        });
    }
    Ok(())
}
