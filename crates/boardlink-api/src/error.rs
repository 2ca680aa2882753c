use thiserror::Error;

/// Top-level error type for the `boardlink-api` crate.
///
/// Covers every failure mode of the raw agent surfaces: the HTTP endpoints
/// and the Socket.IO duplex channel. `boardlink-core` maps these into
/// domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The agent answered with an unexpected HTTP status.
    #[error("Agent returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// TLS or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Socket ──────────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// The socket task is gone; commands can no longer be emitted.
    #[error("Socket closed")]
    SocketClosed,

    /// A frame did not follow the Engine.IO / Socket.IO framing.
    #[error("Protocol error: {0}")]
    Protocol(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the agent could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout(),
            Self::WebSocketConnect(_) | Self::SocketClosed => true,
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_is_reported() {
        let err = Error::HttpStatus {
            status: 404,
            url: "http://127.0.0.1:8991/upload".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_unreachable());
        assert_eq!(
            err.to_string(),
            "Agent returned HTTP 404 for http://127.0.0.1:8991/upload"
        );
    }

    #[test]
    fn socket_errors_are_unreachable() {
        assert!(Error::SocketClosed.is_unreachable());
        assert!(Error::WebSocketConnect("refused".into()).is_unreachable());
        assert!(!Error::Protocol("bad frame".into()).is_unreachable());
    }
}
