// Agent HTTP client
//
// Wraps `reqwest::Client` with agent-relative URL construction and JSON
// body handling. Endpoint methods live in sibling modules (`tools`,
// `upload`) as inherent impls to keep this file about transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP client bound to one agent URL (e.g. `http://127.0.0.1:8991`).
#[derive(Debug, Clone)]
pub struct AgentHttpClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AgentHttpClient {
    /// Create a client for `base_url` from a `TransportConfig`.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    /// Create a client sharing an existing `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        Ok(Self { http, base_url })
    }

    /// The agent URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve an absolute endpoint path against the agent URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET a JSON body, failing on non-success status.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        parse_json(resp).await
    }

    /// HEAD a URL and return the raw status code.
    pub(crate) async fn head_status(&self, url: Url) -> Result<u16, Error> {
        debug!("HEAD {}", url);

        let resp = self.http.head(url).send().await.map_err(Error::Transport)?;
        Ok(resp.status().as_u16())
    }

    /// GET a URL and return the raw status code, discarding the body.
    pub async fn status_of(&self, url: Url) -> Result<u16, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        Ok(resp.status().as_u16())
    }

    /// POST a JSON body, failing on non-success status. The reply body is
    /// returned as text for callers that care about it.
    pub(crate) async fn post_json(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<String, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        ensure_success(&resp)?;
        resp.text().await.map_err(Error::Transport)
    }

    /// POST with an empty body and return the reply text regardless of
    /// status.
    pub(crate) async fn post_empty(&self, url: Url) -> Result<String, Error> {
        debug!("POST {}", url);

        let resp = self.http.post(url).send().await.map_err(Error::Transport)?;
        resp.text().await.map_err(Error::Transport)
    }
}

fn ensure_success(resp: &reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::HttpStatus {
            status: status.as_u16(),
            url: resp.url().to_string(),
        })
    }
}

/// Check status, then deserialize the body, keeping it for diagnostics.
pub(crate) async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    ensure_success(&resp)?;

    let body = resp.text().await.map_err(Error::Transport)?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}
