//! Orchestration core between `boardlink-api` and its consumers (the CLI).
//!
//! This crate owns the domain model, the reactive state and every
//! operation on the local board agent:
//!
//! - **[`Agent`]**: Composition root. [`connect()`](Agent::connect) races
//!   `/info` probes over the candidate ports, validates the agent, runs the
//!   version gate and opens the Socket.IO connection. All other operations
//!   (ports, downloads, uploads, serial monitors) are methods on it.
//!
//! - **[`StateStore`]**: Single-writer snapshot store. Every mutation
//!   broadcasts `(previous, current)`; [`StateStore::wait_for`] suspends an
//!   operation until a transition satisfies a predicate or a timeout
//!   elapses, yielding a [`Waited`] value either way.
//!
//! - **[`router`]**: Classifies untagged agent frames with an ordered
//!   chain of guards and applies the decoded [`AgentMessage`] to the store.
//!
//! - **[`AgentStreams`]**: Broadcast side channels for serial output,
//!   port closures and upload log lines.
//!
//! - **Domain model** ([`model`]): Ports, monitors, correlation tickets,
//!   upload requests and agent descriptors.

pub mod agent;
pub mod config;
pub mod error;
pub mod model;
pub mod router;
pub mod sink;
pub mod store;
pub mod stream;

mod discovery;
mod downloads;
mod monitor;
mod ports;
mod upload;

#[cfg(test)]
mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use agent::{Agent, SessionState};
pub use config::AgentConfig;
pub use error::CoreError;
pub use router::{AgentMessage, FrameKind};
pub use sink::{CommandSink, SocketRef};
pub use store::{ExportedState, OrchestrationState, StateChange, StateStore, Waited};
pub use stream::AgentStreams;

pub use model::{
    AgentInfo, AgentPort, CompileArtifacts, ComputeUploadInfo, DownloadRequest, MonitorCommand,
    MonitorData, MonitorEvent, MonitorStatus, PortClosure, Protocol, ProtocolConfig,
    SerialMonitor, SketchFile, Ticket, TicketStatus, UploadOptions, UploadRequest, UploadStatus,
    default_tools,
};

// Wire types that appear in the public API.
pub use boardlink_api::TlsMode;
pub use boardlink_api::http::ToolPayload;
