// ── Tool download requests ──

use boardlink_api::http::ToolPayload;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_REPLACEMENT_STRATEGY, DEFAULT_TOOL_PACKAGE};

/// One `downloadtool` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub tool_name: String,
    pub tool_version: String,
    pub package_name: String,
    /// `keep` when unset.
    #[serde(default)]
    pub replacement_strategy: Option<String>,
}

impl DownloadRequest {
    pub fn new(
        tool_name: impl Into<String>,
        tool_version: impl Into<String>,
        package_name: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_version: tool_version.into(),
            package_name: package_name.into(),
            replacement_strategy: None,
        }
    }

    /// A request for a compute-result tool entry, if it names a tool,
    /// a version and a packager.
    pub fn from_tool(tool: &ToolPayload) -> Option<Self> {
        if tool.name.is_empty() || tool.version.is_empty() || tool.packager.is_empty() {
            return None;
        }
        Some(Self::new(&tool.name, &tool.version, &tool.packager))
    }

    /// Socket command text: `downloadtool <name> <version> <package> <strategy>`.
    pub fn command(&self) -> String {
        format!(
            "downloadtool {} {} {} {}",
            self.tool_name,
            self.tool_version,
            self.package_name,
            self.replacement_strategy
                .as_deref()
                .unwrap_or(DEFAULT_REPLACEMENT_STRATEGY)
        )
    }
}

/// The toolset every board family needs, plus drivers on Windows.
pub fn default_tools(windows: bool) -> Vec<DownloadRequest> {
    let mut tools = Vec::with_capacity(4);
    if windows {
        tools.push(DownloadRequest::new("windows-drivers", "latest", DEFAULT_TOOL_PACKAGE));
    }
    tools.push(DownloadRequest::new("bossac", "1.7.0", DEFAULT_TOOL_PACKAGE));
    tools.push(DownloadRequest::new("fwupdater", "latest", DEFAULT_TOOL_PACKAGE));
    tools.push(DownloadRequest::new("rp2040tools", "latest", DEFAULT_TOOL_PACKAGE));
    tools
}
