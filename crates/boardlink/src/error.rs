//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use boardlink_config::ConfigError;
use boardlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Agent ────────────────────────────────────────────────────────
    #[error("No agent found on {origin} ports {first_port}-{last_port}")]
    #[diagnostic(
        code(boardlink::no_agent),
        help(
            "Check that the board agent is installed and running.\n\
             Try a wider range: boardlink --first-port 8990 --last-port 9000 info"
        )
    )]
    NoAgent {
        origin: String,
        first_port: u16,
        last_port: u16,
    },

    #[error("Could not connect to agent at {url}")]
    #[diagnostic(
        code(boardlink::connection_failed),
        help("Check that the agent is running and reachable.\n{reason}")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Lost the agent: {message}")]
    #[diagnostic(code(boardlink::disconnected))]
    Disconnected { message: String },

    #[error("Agent update failed: {message}")]
    #[diagnostic(
        code(boardlink::agent_update),
        help(
            "Update the agent manually, or run without --agent-version to skip\n\
             the version check."
        )
    )]
    AgentUpdate { message: String },

    #[error("Agent API error: {message}")]
    #[diagnostic(code(boardlink::api_error))]
    ApiError { message: String },

    // ── Ports & monitors ─────────────────────────────────────────────
    #[error("No board found at {port}")]
    #[diagnostic(
        code(boardlink::port_not_found),
        help("Run: boardlink ports to see connected boards")
    )]
    PortNotFound { port: String },

    #[error("{message}")]
    #[diagnostic(code(boardlink::busy))]
    Busy { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(boardlink::monitor),
        help("Check that no other program holds the port and the baud rate is right.")
    )]
    Monitor { message: String },

    // ── Downloads & uploads ──────────────────────────────────────────
    #[error("{failed} of {total} tool downloads failed")]
    #[diagnostic(code(boardlink::download_failed), help("Run with -v to see agent messages."))]
    DownloadFailed { failed: usize, total: usize },

    #[error("Upload to {port} failed")]
    #[diagnostic(
        code(boardlink::upload_failed),
        help("The agent's upload log above shows the uploader output.")
    )]
    UploadFailed { port: String },

    #[error("{operation} did not finish in time")]
    #[diagnostic(
        code(boardlink::timeout),
        help("Raise the matching value under [timeouts] in the config file.")
    )]
    Timeout { operation: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(boardlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(boardlink::config),
        help("Inspect the file with: boardlink config show\nExpected at: {path}")
    )]
    Config { message: String, path: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(boardlink::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML payload: {0}")]
    #[diagnostic(code(boardlink::yaml), help("Check the YAML file contents and try again."))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoAgent { .. } | Self::ConnectionFailed { .. } | Self::Disconnected { .. } => {
                exit_code::CONNECTION
            }
            Self::PortNotFound { .. } => exit_code::NOT_FOUND,
            Self::Busy { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Config { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AgentNotConnected
            | CoreError::NotConnected
            | CoreError::MissingEndpoint { .. }
            | CoreError::BoardDisconnected { .. } => CliError::Disconnected {
                message: err.to_string(),
            },

            CoreError::AgentUpdateFailed { .. }
            | CoreError::ProxyError { .. }
            | CoreError::InvalidVersion { .. } => CliError::AgentUpdate {
                message: err.to_string(),
            },

            CoreError::PortNotFound { port } => CliError::PortNotFound { port },

            CoreError::UploadInProgress | CoreError::PortAlreadyOpen { .. } => CliError::Busy {
                message: err.to_string(),
            },

            CoreError::MonitorOpenFailed { .. }
            | CoreError::MonitorCloseFailed { .. }
            | CoreError::NoOpenMonitor { .. } => CliError::Monitor {
                message: err.to_string(),
            },

            CoreError::MissingSignature => CliError::Validation {
                field: "compute.signature".into(),
                reason: "the upload request carries no signature".into(),
            },

            CoreError::InvalidUploadPayload { message } => CliError::Validation {
                field: "upload request".into(),
                reason: message,
            },

            CoreError::Api { message, .. } => CliError::ApiError { message },

            CoreError::Config { message } => CliError::Config {
                message,
                path: boardlink_config::config_path().display().to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
                path: boardlink_config::config_path().display().to_string(),
            },
        }
    }
}
