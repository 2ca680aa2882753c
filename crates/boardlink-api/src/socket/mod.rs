//! Duplex Socket.IO channel to the agent.
//!
//! The agent speaks Socket.IO v2 over Engine.IO v3. Outbound traffic is a
//! single `command` event carrying a space-delimited string; inbound
//! traffic is a `message` event carrying a JSON document as text.
//!
//! # Example
//!
//! ```rust,ignore
//! use boardlink_api::socket::{SocketEvent, SocketHandle};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut conn = SocketHandle::spawn("ws://127.0.0.1:8991", CancellationToken::new())?;
//! while let Some(event) = conn.events.recv().await {
//!     if event == SocketEvent::Connected {
//!         conn.handle.emit_command("list")?;
//!     }
//! }
//! ```

pub mod connection;
pub mod packet;

pub use connection::{SOCKET_IO_PATH, SocketConnection, SocketEvent, SocketHandle, socket_io_url};
pub use packet::{EnginePacket, Handshake, SocketPacket, command_frame};
