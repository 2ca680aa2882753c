// Discovery probe for a single candidate port.

use tracing::debug;
use url::Url;

use super::INFO_ENDPOINT;
use super::client::parse_json;
use super::models::AgentInfoResponse;
use crate::error::Error;

/// A settled `GET /info` probe: where it landed, what status came back,
/// and the decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoProbe {
    /// Final URL of the response (the endpoint the probe hit).
    pub endpoint_url: Url,
    pub status: u16,
    pub info: AgentInfoResponse,
}

/// Probe `<origin>:<port>/info`.
///
/// Resolves only when a response arrives with a JSON body; connection
/// failures, HTTP errors and non-JSON bodies are all `Err`, so racing
/// probes settle on the first port that actually hosts an agent.
pub async fn probe_info(http: &reqwest::Client, origin: &str, port: u16) -> Result<InfoProbe, Error> {
    let url = Url::parse(&format!("{}:{port}{INFO_ENDPOINT}", origin.trim_end_matches('/')))?;
    debug!("GET {}", url);

    let resp = http.get(url).send().await.map_err(Error::Transport)?;
    let endpoint_url = resp.url().clone();
    let status = resp.status().as_u16();
    let info: AgentInfoResponse = parse_json(resp).await?;

    Ok(InfoProbe {
        endpoint_url,
        status,
        info,
    })
}
