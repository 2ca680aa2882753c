// ── Agent descriptor ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Transport protocol negotiated with the agent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

/// Negotiated session parameters. Written only by discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolConfig {
    pub protocol: Protocol,
    /// The agent answered `HEAD /v2/pkgs/tools/installed` with 200.
    pub use_v2: bool,
}

/// A validated agent, as reported by its `/info` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    /// The URL the successful probe landed on.
    pub endpoint_url: String,
    pub status: u16,
    pub http: Option<String>,
    pub https: Option<String>,
    pub ws: Option<String>,
    pub wss: Option<String>,
    pub os: Option<String>,
    pub version: Option<String>,
    pub update_url: Option<String>,
}

impl AgentInfo {
    /// Whether the endpoint the probe hit was served over TLS.
    pub fn is_secure(&self) -> bool {
        self.endpoint_url.starts_with("https:")
    }

    /// Whether the agent runs on Windows (`os` like `windows:amd64`).
    pub fn is_windows(&self) -> bool {
        self.os
            .as_deref()
            .is_some_and(|os| os.to_ascii_lowercase().contains("windows"))
    }
}

/// Non-empty string fields only; the agent reports `""` for endpoints it
/// does not serve.
pub(crate) fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}
