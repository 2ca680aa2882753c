// ── Runtime agent configuration ──
//
// Describes *where* to look for the agent and how long each operation may
// wait. Never touches disk: the CLI (or any embedder) builds an
// `AgentConfig` and hands it to `Agent::new`.

use std::time::Duration;

use boardlink_api::TlsMode;

/// Default baud rate for `open` when the caller does not pick one.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default replacement strategy for `downloadtool`.
pub const DEFAULT_REPLACEMENT_STRATEGY: &str = "keep";

/// Package that hosts the default toolset.
pub const DEFAULT_TOOL_PACKAGE: &str = "arduino";

/// Configuration for discovering and talking to one local agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Origin probed for `/info` (scheme + host, no port).
    pub origin: String,
    /// First candidate port (inclusive).
    pub first_port: u16,
    /// Last candidate port (inclusive).
    pub last_port: u16,
    /// Substring an official agent's `update_url` must contain.
    pub update_url_substring: String,
    /// Latest published agent version; older agents are asked to update.
    pub target_version: Option<String>,
    /// TLS verification for an `https` agent.
    pub tls: TlsMode,

    /// Per-probe HTTP timeout during discovery.
    pub probe_timeout: Duration,
    /// Wait for the socket to report connected.
    pub connect_timeout: Duration,
    /// Wait for a `list` response.
    pub ports_timeout: Duration,
    /// Wait for a whole download batch to settle.
    pub download_timeout: Duration,
    /// Wait for an upload to reach a terminal status.
    pub upload_timeout: Duration,
    /// Wait for a monitor `open` to be acknowledged.
    pub monitor_open_timeout: Duration,
    /// Wait for a monitor `close` to be acknowledged.
    pub monitor_close_timeout: Duration,
    /// Pause after asking the agent to update, while it restarts.
    pub update_grace: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1".into(),
            first_port: 8990,
            last_port: 9000,
            update_url_substring: "downloads.arduino.cc".into(),
            target_version: None,
            tls: TlsMode::default(),
            probe_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            ports_timeout: Duration::from_secs(5),
            download_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(90),
            monitor_open_timeout: Duration::from_secs(1),
            monitor_close_timeout: Duration::from_secs(5),
            update_grace: Duration::from_secs(5),
        }
    }
}

impl AgentConfig {
    /// Candidate ports in probe order. Empty if the range is inverted.
    pub fn candidate_ports(&self) -> std::ops::RangeInclusive<u16> {
        self.first_port..=self.last_port
    }
}
