//! Command dispatch: bridges CLI args -> agent operations -> output formatting.

pub mod config_cmd;
pub mod download;
pub mod export;
pub mod info;
pub mod monitor;
pub mod ports;
pub mod tools;
pub mod upload;
pub mod util;

use boardlink_core::Agent;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an agent-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, agent: &Agent, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Info => info::handle(agent, global),
        Command::Ports(args) => ports::handle(agent, &args, global).await,
        Command::Download(args) => download::handle(agent, args, global).await,
        Command::Tools(args) => tools::handle(agent, args, global).await,
        Command::Upload(args) => upload::handle(agent, args, global).await,
        Command::Monitor(args) => monitor::handle(agent, &args, global).await,
        Command::Send(args) => monitor::send(agent, args, global).await,
        Command::Export => export::handle(agent, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
