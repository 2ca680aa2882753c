//! CLI configuration: thin wrapper around `boardlink_config`.
//!
//! Adds flag-aware resolution so `--origin`, `--first-port`, `--last-port`,
//! `--agent-version` and `--verify-tls` win over the file and environment.

use boardlink_core::AgentConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use boardlink_config::{Config, config_path, load_config, save_config};

/// Apply global flag overrides on top of a loaded config.
pub fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    let agent = &mut cfg.agent;
    if let Some(ref origin) = global.origin {
        agent.origin.clone_from(origin);
    }
    if let Some(first) = global.first_port {
        agent.first_port = first;
    }
    if let Some(last) = global.last_port {
        agent.last_port = last;
    }
    if let Some(ref version) = global.agent_version {
        agent.target_version = Some(version.clone());
    }
    if global.verify_tls {
        agent.verify_tls = true;
    }
}

/// Load the file + environment, apply flags, validate.
pub fn resolve_agent_config(global: &GlobalOpts) -> Result<AgentConfig, CliError> {
    let mut cfg = load_config()?;
    apply_overrides(&mut cfg, global);
    Ok(cfg.to_agent_config()?)
}
