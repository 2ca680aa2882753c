//! HTTP tool API handlers.

use tabled::Tabled;

use boardlink_core::{Agent, ToolPayload};

use crate::cli::{GlobalOpts, ToolsArgs, ToolsCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ToolRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Packager")]
    packager: String,
}

impl From<&ToolPayload> for ToolRow {
    fn from(t: &ToolPayload) -> Self {
        Self {
            name: t.name.clone(),
            version: t.version.clone(),
            packager: t.packager.clone(),
        }
    }
}

pub async fn handle(agent: &Agent, args: ToolsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if !agent.store().snapshot().config.use_v2 {
        return Err(CliError::ApiError {
            message: "this agent does not serve the v2 tool API; use `boardlink download`".into(),
        });
    }

    match args.command {
        ToolsCommand::List => {
            let tools = agent.installed_tools_v2().await?;
            let out = output::render_list(global.output, &tools, |t| ToolRow::from(t), |t| {
                format!("{}@{}", t.name, t.version)
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ToolsCommand::Install {
            name,
            version,
            packager,
        } => {
            let tool = ToolPayload {
                name,
                version,
                packager,
                ..ToolPayload::default()
            };
            let bar = output::spinner(format!("Installing {}@{}", tool.name, tool.version), global.quiet);
            let installed = agent.install_tool_v2(&tool).await;
            bar.finish_and_clear();
            installed?;

            if !global.quiet {
                eprintln!("✓ Installed {}@{}", tool.name, tool.version);
            }
            Ok(())
        }
    }
}
