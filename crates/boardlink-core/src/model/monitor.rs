// ── Serial monitor sessions ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle of a monitor entry in the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MonitorStatus {
    Opening,
    Opened,
    Failed,
    Closing,
}

/// One port's monitor session as tracked in state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialMonitor {
    pub port: String,
    pub baud: u32,
    pub status: MonitorStatus,
}

/// `Cmd` values the agent reports for monitor lifecycle changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum MonitorCommand {
    Open,
    OpenFail,
    Close,
    CloseFail,
}

/// A chunk of serial output addressed to one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorData {
    pub port: String,
    pub data: String,
}

/// What a monitor stream yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The agent acknowledged the `open`.
    Ready,
    /// Serial output from the board.
    Data(String),
}

/// How a port's session ended, as seen from the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortClosure {
    /// Closed on request (entry was `closing`).
    Closed,
    /// Dropped without a close request, or the open failed.
    Disconnected,
}
