// Agent HTTP surface
//
// The agent exposes a handful of plain HTTP endpoints next to its socket:
// `/info` for discovery, `/update` for self-update, `/upload` for firmware
// uploads and `/v2/pkgs/tools/installed` for the v2 tool API.

pub mod client;
pub mod info;
pub mod models;
pub mod tools;
pub mod upload;

pub use client::AgentHttpClient;
pub use info::{InfoProbe, probe_info};
pub use models::{
    AgentInfoResponse, ExtraFile, ToolPayload, UpdateOutcome, UploadAuth, UploadExtra,
    UploadPayload,
};

/// Discovery endpoint, relative to a candidate origin.
pub const INFO_ENDPOINT: &str = "/info";
/// Self-update endpoint, relative to the agent URL.
pub const UPDATE_ENDPOINT: &str = "/update";
/// Firmware upload endpoint, relative to the agent URL.
pub const UPLOAD_ENDPOINT: &str = "/upload";
/// v2 tool API endpoint, relative to the agent URL.
pub const INSTALLED_TOOLS_ENDPOINT: &str = "/v2/pkgs/tools/installed";
