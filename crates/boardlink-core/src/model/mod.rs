// ── Domain model ──
//
// Plain data shared by the store, the router and the coordinators. Wire
// shapes (PascalCase agent frames) live in `router::mapper`.

pub mod agent;
pub mod download;
pub mod monitor;
pub mod port;
pub mod quota;
pub mod upload;

pub use agent::{AgentInfo, Protocol, ProtocolConfig};
pub use download::{DownloadRequest, default_tools};
pub use monitor::{MonitorCommand, MonitorData, MonitorEvent, MonitorStatus, PortClosure, SerialMonitor};
pub use port::{AgentPort, same_ports};
pub use quota::{Ticket, TicketStatus, remove_ticket};
pub use upload::{
    CompileArtifacts, ComputeUploadInfo, SketchFile, UploadOptions, UploadRequest, UploadStatus,
};
