// Upload and self-update endpoints

use tracing::debug;

use super::client::AgentHttpClient;
use super::models::{UpdateOutcome, UploadPayload};
use super::{UPDATE_ENDPOINT, UPLOAD_ENDPOINT};
use crate::error::Error;

impl AgentHttpClient {
    /// `POST /upload`. Success only means the agent accepted the job;
    /// progress arrives over the socket.
    pub async fn upload(&self, payload: &UploadPayload) -> Result<(), Error> {
        let url = self.url(UPLOAD_ENDPOINT)?;
        self.post_json(url, payload).await.map(|_| ())
    }

    /// `POST /update`.
    ///
    /// An agent that applies the update restarts and replies with a
    /// non-JSON body; one that refuses answers `{"error": "..."}`.
    pub async fn update(&self) -> Result<UpdateOutcome, Error> {
        let url = self.url(UPDATE_ENDPOINT)?;
        let body = self.post_empty(url).await?;

        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(reply) => Ok(UpdateOutcome::Responded {
                error: reply
                    .get("error")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned),
            }),
            Err(e) => {
                debug!(error = %e, "update reply is not JSON, agent is restarting");
                Ok(UpdateOutcome::Restarting)
            }
        }
    }
}
