// ── Agent discovery ──
//
// Probe every candidate port at once, accept the first agent that passes
// validation, pick the protocol, run the version gate, check for the v2
// tool API, then open the socket.

use boardlink_api::http::UpdateOutcome;
use boardlink_api::{InfoProbe, SocketConnection, SocketHandle, probe_info};
use futures_util::future::select_ok;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::{Agent, SessionState, SocketSession};
use crate::error::CoreError;
use crate::model::agent::present;
use crate::model::{AgentInfo, Protocol};
use crate::sink::SocketRef;

/// Agent builds that are never auto-updated.
const EXCLUDED_CHANNELS: &[&str] = &["ventura", "dev", "rc"];

impl Agent {
    /// Discover the agent and open its socket.
    ///
    /// Resolves `true` once the socket reports connected, `false` if no
    /// agent was found or the socket did not connect in time. Calling it
    /// again while a socket is alive reuses that socket.
    pub async fn connect(&self) -> Result<bool, CoreError> {
        let _guard = self.inner.connect_lock.lock().await;

        if self.has_live_session() {
            debug!("reusing agent socket");
            return Ok(self.await_socket_connected().await);
        }
        self.teardown().await;

        self.inner.session_state.send_replace(SessionState::Probing);
        let ws_address = match self.discover().await {
            Ok(address) => address,
            Err(e) => {
                self.inner.session_state.send_replace(SessionState::NotFound);
                return Err(e);
            }
        };

        let connected = match ws_address {
            Some(address) => self.open_socket(&address).await,
            None => false,
        };
        self.inner.session_state.send_replace(if connected {
            SessionState::Connected
        } else {
            SessionState::NotFound
        });
        Ok(connected)
    }

    /// Find a validated agent and return its socket address. Re-runs once
    /// after a self-update.
    async fn discover(&self) -> Result<Option<String>, CoreError> {
        let mut target_version = self.inner.config.target_version.clone();

        loop {
            let Some((info, protocol)) = self.search().await else {
                info!("no agent found");
                return Ok(None);
            };
            info!(
                endpoint = %info.endpoint_url,
                version = info.version.as_deref().unwrap_or("unknown"),
                %protocol,
                "agent found"
            );

            let installed = info.version.clone();
            self.inner.store.update(|s| {
                s.agent_info = Some(info);
                s.config.protocol = protocol;
            });

            // Agents that report no version skip the gate.
            if let (Some(target), Some(installed)) = (target_version.take(), installed.as_deref()) {
                if needs_update(installed, &target)? {
                    self.update_agent(&target).await?;
                    continue;
                }
            }

            self.establish_v2().await;

            return match self.ws_address() {
                Ok(address) => Ok(Some(address)),
                Err(e) => {
                    warn!(error = %e, "agent has no socket address");
                    Ok(None)
                }
            };
        }
    }

    /// Race `/info` probes over the candidate ports.
    async fn search(&self) -> Option<(AgentInfo, Protocol)> {
        let config = &self.inner.config;
        let probes: Vec<_> = config
            .candidate_ports()
            .map(|port| Box::pin(probe_info(&self.inner.probe_http, &config.origin, port)))
            .collect();
        debug!(origin = %config.origin, count = probes.len(), "probing for agent");

        let found = if probes.is_empty() {
            None
        } else {
            match select_ok(probes).await {
                Ok((probe, _)) => Some(probe),
                Err(e) => {
                    debug!(error = %e, "every probe failed");
                    None
                }
            }
        };
        self.inner.store.update(|s| s.searched_for_agent = true);

        accept_probe(found?, &config.update_url_substring)
    }

    async fn update_agent(&self, target: &str) -> Result<(), CoreError> {
        let client = self.http_client()?;
        info!(version = target, "updating agent");

        match client.update().await {
            Ok(UpdateOutcome::Restarting) => {
                let grace = self.inner.config.update_grace;
                info!(
                    grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                    "agent restarting"
                );
                tokio::time::sleep(grace).await;
                Ok(())
            }
            Ok(UpdateOutcome::Responded { error: Some(message) }) if is_proxy_error(&message) => {
                Err(CoreError::ProxyError { message })
            }
            Ok(UpdateOutcome::Responded { error }) => {
                if let Some(message) = error {
                    warn!(%message, "agent refused the update");
                }
                Ok(())
            }
            Err(e) => Err(CoreError::AgentUpdateFailed {
                message: e.to_string(),
            }),
        }
    }

    async fn establish_v2(&self) {
        let client = match self.http_client() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "skipping v2 capability check");
                return;
            }
        };
        match client.supports_v2().await {
            Ok(true) => {
                debug!("agent supports the v2 tool API");
                self.inner.store.update(|s| s.config.use_v2 = true);
            }
            Ok(false) => debug!("agent has no v2 tool API"),
            Err(e) => warn!(error = %e, "v2 capability check failed"),
        }
    }

    /// Spawn the socket and its pump, then wait for the connect ack.
    async fn open_socket(&self, ws_address: &str) -> bool {
        let store = &self.inner.store;
        let timeout = self.inner.config.connect_timeout;
        let connected = store.wait_for(
            |_, next| next.is_socket_connected(),
            |_| true,
            false,
            timeout,
        );

        let cancel = CancellationToken::new();
        let SocketConnection {
            handle,
            events,
            task,
        } = match SocketHandle::spawn(ws_address, cancel.clone()) {
            Ok(connection) => connection,
            Err(e) => {
                warn!(error = %e, ws_address, "cannot open agent socket");
                return false;
            }
        };
        info!(url = %handle.url(), "opening agent socket");

        let pump = self.spawn_pump(events);
        store.update(|s| s.socket = Some(SocketRef::new(handle.clone())));
        self.replace_session(Some(SocketSession {
            handle: Some(handle),
            cancel,
            tasks: vec![task, pump],
        }));

        let connected = connected.await.into_inner();
        if !connected {
            warn!(
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "agent socket did not connect in time"
            );
        }
        connected
    }

    async fn await_socket_connected(&self) -> bool {
        self.inner
            .store
            .wait_for(
                |_, next| next.is_socket_connected(),
                |_| true,
                false,
                self.inner.config.connect_timeout,
            )
            .await
            .into_inner()
    }
}

/// Validate a probe and derive the protocol. Only a 200 from an agent
/// whose update URL carries `update_url_substring` and which advertises a
/// socket address counts.
fn accept_probe(probe: InfoProbe, update_url_substring: &str) -> Option<(AgentInfo, Protocol)> {
    let InfoProbe {
        endpoint_url,
        status,
        info,
    } = probe;

    let trusted = info
        .update_url
        .as_deref()
        .is_some_and(|url| url.contains(update_url_substring));
    if status != 200 || !trusted {
        warn!(endpoint = %endpoint_url, status, "rejecting agent response");
        return None;
    }
    if present(info.ws.as_ref()).is_none() {
        warn!(endpoint = %endpoint_url, "agent has no ws endpoint");
        return None;
    }

    let mut agent = AgentInfo {
        endpoint_url: endpoint_url.to_string(),
        status,
        http: info.http,
        https: info.https,
        ws: info.ws,
        wss: info.wss,
        os: info.os,
        version: info.version,
        update_url: info.update_url,
    };

    let protocol = if agent.is_secure() {
        Protocol::Https
    } else {
        // Plain-HTTP endpoints are rewritten onto the loopback address.
        for addr in [&mut agent.http, &mut agent.ws].into_iter().flatten() {
            *addr = addr.replace("localhost", "127.0.0.1");
        }
        Protocol::Http
    };

    Some((agent, protocol))
}

/// Whether the installed agent is older than `target`. Excluded channels
/// never update; unparseable versions are an error.
fn needs_update(installed: &str, target: &str) -> Result<bool, CoreError> {
    if EXCLUDED_CHANNELS.iter().any(|marker| installed.contains(marker)) {
        debug!(installed, "agent channel excluded from updates");
        return Ok(false);
    }
    Ok(parse_version(installed)? < parse_version(target)?)
}

fn parse_version(version: &str) -> Result<semver::Version, CoreError> {
    semver::Version::parse(version.trim().trim_start_matches('v')).map_err(|e| {
        CoreError::InvalidVersion {
            version: version.to_owned(),
            reason: e.to_string(),
        }
    })
}

fn is_proxy_error(message: &str) -> bool {
    message.contains("proxy") || message.contains("dial tcp")
}
