// ── Inbound message router ──
//
// Text frames from the agent socket are classified, decoded into typed
// messages, then applied to the store or forwarded to a stream.

mod classify;
mod handlers;
mod mapper;

pub use classify::{FrameKind, classify};
pub use mapper::{
    AgentMessage, DownloadState, MonitorStatusMessage, ProgrammerStatus, UploadStatusMessage,
    decode,
};

use tracing::trace;

use crate::store::StateStore;
use crate::stream::AgentStreams;

/// Route one inbound frame.
pub fn route(store: &StateStore, streams: &AgentStreams, text: &str) {
    trace!(frame = text, "agent frame");
    handlers::apply(store, streams, decode(text));
}
