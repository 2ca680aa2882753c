// ── Core error types ──
//
// Domain errors from boardlink-core. Callers never see raw reqwest or
// WebSocket failures; the `From<boardlink_api::Error>` impl translates
// transport errors into domain variants. Timeouts are not errors here:
// waits resolve to `Waited::TimedOut` with a default value instead.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connectivity ─────────────────────────────────────────────────
    #[error("Agent is not connected; run discovery first")]
    AgentNotConnected,

    #[error("No socket connection to the agent")]
    NotConnected,

    #[error("Agent did not report a {endpoint} endpoint")]
    MissingEndpoint { endpoint: &'static str },

    #[error("Cannot reach agent at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    // ── Preconditions ────────────────────────────────────────────────
    #[error("An upload is in progress")]
    UploadInProgress,

    #[error("No board found at {port}")]
    PortNotFound { port: String },

    #[error("Port {port} is already open")]
    PortAlreadyOpen { port: String },

    #[error("No opened serial monitor on port {port}")]
    NoOpenMonitor { port: String },

    #[error("Upload request is missing a signature")]
    MissingSignature,

    #[error("Invalid upload payload: {message}")]
    InvalidUploadPayload { message: String },

    // ── Protocol ─────────────────────────────────────────────────────
    #[error("Agent update failed: {message}")]
    AgentUpdateFailed { message: String },

    #[error("A proxy error occurred when trying to update the agent: {message}")]
    ProxyError { message: String },

    #[error("Invalid agent version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Could not open serial monitor on {port}")]
    MonitorOpenFailed { port: String },

    #[error("Could not close serial monitor on {port}")]
    MonitorCloseFailed { port: String },

    #[error("Board on {port} disconnected")]
    BoardDisconnected { port: String },

    #[error("Agent API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Errors raised by synchronous guards, before the agent is contacted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::UploadInProgress
                | Self::PortNotFound { .. }
                | Self::PortAlreadyOpen { .. }
                | Self::NoOpenMonitor { .. }
                | Self::MissingSignature
                | Self::InvalidUploadPayload { .. }
        )
    }

    /// Errors meaning the agent is absent or unreachable.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::AgentNotConnected
                | Self::NotConnected
                | Self::MissingEndpoint { .. }
                | Self::ConnectionFailed { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<boardlink_api::Error> for CoreError {
    fn from(err: boardlink_api::Error) -> Self {
        match err {
            boardlink_api::Error::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                CoreError::ConnectionFailed {
                    url: e
                        .url()
                        .map_or_else(|| "<unknown>".into(), ToString::to_string),
                    reason: e.to_string(),
                }
            }
            boardlink_api::Error::Transport(e) => CoreError::Api {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            boardlink_api::Error::HttpStatus { status, url } => CoreError::Api {
                message: format!("HTTP {status} from {url}"),
                status: Some(status),
            },
            boardlink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            boardlink_api::Error::Tls(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {reason}"),
            },
            boardlink_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            boardlink_api::Error::SocketClosed => CoreError::NotConnected,
            boardlink_api::Error::Protocol(message) => CoreError::Api {
                message: format!("Protocol error: {message}"),
                status: None,
            },
            boardlink_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Deserialization error: {message}"),
                status: None,
            },
        }
    }
}
