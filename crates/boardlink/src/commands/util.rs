//! Shared helpers for command handlers.

use std::path::Path;

use boardlink_core::{Agent, UploadRequest};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

/// Resolve the config, discover the agent and open its socket.
pub async fn connect(global: &GlobalOpts) -> Result<Agent, CliError> {
    let agent_config = config::resolve_agent_config(global)?;
    let origin = agent_config.origin.clone();
    let (first_port, last_port) = (agent_config.first_port, agent_config.last_port);

    let agent = Agent::new(agent_config)?;
    let bar = output::spinner(
        format!("Looking for the agent on {origin} ports {first_port}-{last_port}"),
        global.quiet,
    );
    let found = agent.connect().await;
    bar.finish_and_clear();

    if found? {
        tracing::debug!(url = ?agent.agent_url().ok(), "agent connected");
        Ok(agent)
    } else {
        Err(CliError::NoAgent {
            origin,
            first_port,
            last_port,
        })
    }
}

/// Read an upload request from a JSON or YAML file (by extension).
pub fn read_upload_request(path: &Path) -> Result<UploadRequest, CliError> {
    let contents = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        Ok(serde_yaml::from_str(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upload_request_reads_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("request.json");
        std::fs::write(
            &json,
            r#"{"fqbn":"arduino:avr:uno","port":"COM3","sketch_name":"blink",
                "compile_data":{"hex":"AAAA"},"compute":{"signature":"sig"}}"#,
        )
        .unwrap();
        let from_json = read_upload_request(&json).unwrap();
        assert_eq!(from_json.port, "COM3");
        assert_eq!(from_json.compile_data.hex.as_deref(), Some("AAAA"));

        let yaml = dir.path().join("request.YML");
        std::fs::write(
            &yaml,
            "fqbn: arduino:avr:uno\nport: COM3\nsketch_name: blink\ncompile_data:\n  hex: AAAA\ncompute:\n  signature: sig\n",
        )
        .unwrap();
        assert_eq!(read_upload_request(&yaml).unwrap(), from_json);
    }

    #[test]
    fn malformed_request_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_upload_request(&path), Err(CliError::Json(_))));
    }
}
