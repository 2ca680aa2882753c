// v2 tool API endpoints

use super::INSTALLED_TOOLS_ENDPOINT;
use super::client::AgentHttpClient;
use super::models::ToolPayload;
use crate::error::Error;

impl AgentHttpClient {
    /// `HEAD /v2/pkgs/tools/installed`: `true` only on HTTP 200.
    pub async fn supports_v2(&self) -> Result<bool, Error> {
        let url = self.url(INSTALLED_TOOLS_ENDPOINT)?;
        Ok(self.head_status(url).await? == 200)
    }

    /// `GET /v2/pkgs/tools/installed`: tools the agent has on disk.
    pub async fn installed_tools(&self) -> Result<Vec<ToolPayload>, Error> {
        let url = self.url(INSTALLED_TOOLS_ENDPOINT)?;
        self.get_json(url).await
    }

    /// `POST /v2/pkgs/tools/installed`: ask the agent to install a tool.
    ///
    /// The agent answers once the install has been handled.
    pub async fn install_tool(&self, tool: &ToolPayload) -> Result<(), Error> {
        let url = self.url(INSTALLED_TOOLS_ENDPOINT)?;
        self.post_json(url, tool).await.map(|_| ())
    }
}
