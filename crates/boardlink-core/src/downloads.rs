// ── Tool downloads ──
//
// Socket downloads go out as one batch of `downloadtool` commands and
// settle as a barrier; the v2 HTTP tool API is a plain request/response.

use boardlink_api::http::ToolPayload;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::Agent;
use crate::error::CoreError;
use crate::model::{AgentInfo, DownloadRequest, Ticket, TicketStatus, default_tools};
use crate::store::{OrchestrationState, Waited};

impl Agent {
    /// Ask the agent to download `requests` and wait until every one has
    /// succeeded or failed.
    ///
    /// Resolves with the settled tickets, or an empty list if the socket is
    /// not connected or the batch does not settle within the download
    /// timeout. The batch's tickets never outlive the call.
    pub async fn download_tools(&self, requests: &[DownloadRequest]) -> Vec<Ticket> {
        let store = &self.inner.store;
        let snap = store.snapshot();
        let Some(socket) = snap.socket.clone().filter(|_| snap.is_socket_connected()) else {
            debug!("socket not connected, skipping tool downloads");
            return Vec::new();
        };
        drop(snap);
        if requests.is_empty() {
            return Vec::new();
        }

        let batch = Uuid::new_v4();
        let expected = requests.len();
        let settled = store.wait_for(
            move |_, next| {
                let tickets: Vec<_> = batch_tickets(next, batch).collect();
                tickets.len() == expected
                    && tickets.iter().all(|t| t.status.is_some_and(TicketStatus::is_settled))
            },
            move |s| batch_tickets(s, batch).cloned().collect(),
            Vec::new(),
            self.inner.config.download_timeout,
        );

        for request in requests {
            let ticket = Ticket::for_batch(batch);
            let id = ticket.id;
            store.update(|s| s.download_quota.push(ticket));

            debug!(
                batch = %batch,
                tool = %request.tool_name,
                version = %request.tool_version,
                "requesting tool download"
            );
            if let Err(e) = socket.emit(&request.command()) {
                warn!(tool = %request.tool_name, error = %e, "download command not sent");
                store.update(|s| {
                    if let Some(t) = s.download_quota.iter_mut().find(|t| t.id == id) {
                        t.status = Some(TicketStatus::Error);
                    }
                });
            }
        }

        let waited = settled.await;
        store.update(|s| s.download_quota.retain(|t| t.batch_id != Some(batch)));

        match waited {
            Waited::Satisfied(tickets) => {
                let failed = tickets
                    .iter()
                    .filter(|t| t.status == Some(TicketStatus::Error))
                    .count();
                info!(batch = %batch, total = tickets.len(), failed, "tool downloads settled");
                tickets
            }
            Waited::TimedOut(tickets) => {
                warn!(batch = %batch, "tool downloads timed out");
                tickets
            }
        }
    }

    /// Download the toolset every board family needs. Windows drivers are
    /// included when the agent (or, before discovery, this host) runs
    /// Windows.
    pub async fn download_default_tools(&self) -> Vec<Ticket> {
        let windows = self
            .inner
            .store
            .snapshot()
            .agent_info
            .as_ref()
            .map_or(cfg!(windows), AgentInfo::is_windows);
        self.download_tools(&default_tools(windows)).await
    }

    // ── v2 tool API ──────────────────────────────────────────────────

    pub async fn install_tool_v2(&self, tool: &ToolPayload) -> Result<(), CoreError> {
        info!(tool = %tool.name, version = %tool.version, "installing tool");
        self.http_client()?.install_tool(tool).await?;
        Ok(())
    }

    pub async fn installed_tools_v2(&self) -> Result<Vec<ToolPayload>, CoreError> {
        Ok(self.http_client()?.installed_tools().await?)
    }
}

fn batch_tickets(state: &OrchestrationState, batch: Uuid) -> impl Iterator<Item = &Ticket> {
    state
        .download_quota
        .iter()
        .filter(move |t| t.batch_id == Some(batch))
}
