// ── Command sink ──
//
// The seam between coordinators and the socket. Coordinators only ever
// emit `command` strings; the live implementation is the api crate's
// `SocketHandle`, and alternative transports plug in here.

use std::fmt;
use std::sync::Arc;

use boardlink_api::SocketHandle;

use crate::error::CoreError;

/// Fire-and-forget outbound channel to the agent.
pub trait CommandSink: Send + Sync + fmt::Debug {
    /// Queue one space-delimited command (`list`, `open COM3 9600 timed`, ...).
    fn emit(&self, command: &str) -> Result<(), CoreError>;
}

impl CommandSink for SocketHandle {
    fn emit(&self, command: &str) -> Result<(), CoreError> {
        self.emit_command(command).map_err(CoreError::from)
    }
}

/// Shared handle to the open socket, as held in state.
#[derive(Debug, Clone)]
pub struct SocketRef(Arc<dyn CommandSink>);

impl SocketRef {
    pub fn new(sink: impl CommandSink + 'static) -> Self {
        Self(Arc::new(sink))
    }

    pub fn emit(&self, command: &str) -> Result<(), CoreError> {
        self.0.emit(command)
    }
}
