// boardlink-api: Async Rust client for the local board agent (HTTP + Socket.IO)

pub mod error;
pub mod http;
pub mod socket;
pub mod transport;

pub use error::Error;
pub use http::{AgentHttpClient, InfoProbe, probe_info};
pub use socket::{SocketConnection, SocketEvent, SocketHandle};
pub use transport::{TlsMode, TransportConfig};
