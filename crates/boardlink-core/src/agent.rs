// ── Agent composition root ──
//
// Owns the state store, the event streams, the HTTP clients and the one
// socket session. Discovery, ports, downloads, uploads and monitors are
// all methods on `Agent`, split across their own modules.

use std::sync::{Arc, Mutex, PoisonError};

use boardlink_api::{AgentHttpClient, SocketEvent, SocketHandle, TransportConfig};
use strum::Display;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AgentConfig;
use crate::error::CoreError;
use crate::model::agent::present;
use crate::model::{AgentInfo, AgentPort, PortClosure, Protocol, SerialMonitor};
use crate::router;
use crate::sink::{CommandSink, SocketRef};
use crate::store::{ExportedState, StateStore};
use crate::stream::AgentStreams;

// ── SessionState ─────────────────────────────────────────────────────

/// Discovery progress, observable through [`Agent::session_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    Idle,
    Probing,
    Connected,
    NotFound,
}

// ── Agent ────────────────────────────────────────────────────────────

/// Handle to the local agent. Cheap to clone; clones share everything.
#[derive(Debug, Clone)]
pub struct Agent {
    pub(crate) inner: Arc<AgentInner>,
}

#[derive(Debug)]
pub(crate) struct AgentInner {
    pub(crate) config: AgentConfig,
    pub(crate) store: StateStore,
    pub(crate) streams: AgentStreams,
    /// Short-timeout client for `/info` probes.
    pub(crate) probe_http: reqwest::Client,
    pub(crate) http: reqwest::Client,
    pub(crate) session_state: watch::Sender<SessionState>,
    pub(crate) session: Mutex<Option<SocketSession>>,
    /// Serializes `connect` so concurrent callers share one socket.
    pub(crate) connect_lock: tokio::sync::Mutex<()>,
}

/// The live socket and the tasks that serve it.
#[derive(Debug)]
pub(crate) struct SocketSession {
    /// `None` for sinks attached from outside.
    pub(crate) handle: Option<SocketHandle>,
    pub(crate) cancel: CancellationToken,
    pub(crate) tasks: Vec<JoinHandle<()>>,
}

impl SocketSession {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && self.handle.as_ref().is_none_or(|h| !h.is_closed())
    }
}

impl Drop for AgentInner {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = session {
            session.cancel.cancel();
        }
    }
}

impl Agent {
    /// Create an agent handle. Does not touch the network; call
    /// [`connect`](Self::connect) to discover the agent.
    pub fn new(config: AgentConfig) -> Result<Self, CoreError> {
        let probe_http = TransportConfig {
            tls: config.tls,
            timeout: config.probe_timeout,
        }
        .build_client()?;
        let http = TransportConfig {
            tls: config.tls,
            ..TransportConfig::default()
        }
        .build_client()?;
        let (session_state, _) = watch::channel(SessionState::Idle);

        Ok(Self {
            inner: Arc::new(AgentInner {
                config,
                store: StateStore::new(),
                streams: AgentStreams::new(),
                probe_http,
                http,
                session_state,
                session: Mutex::new(None),
                connect_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &StateStore {
        &self.inner.store
    }

    pub fn streams(&self) -> &AgentStreams {
        &self.inner.streams
    }

    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.inner.session_state.subscribe()
    }

    /// Plain snapshot of the state with live handles stripped.
    pub fn export(&self) -> ExportedState {
        self.inner.store.export()
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn agent_info(&self) -> Result<AgentInfo, CoreError> {
        self.inner
            .store
            .snapshot()
            .agent_info
            .clone()
            .ok_or(CoreError::AgentNotConnected)
    }

    /// Base URL of the agent for the negotiated protocol.
    pub fn agent_url(&self) -> Result<String, CoreError> {
        let snap = self.inner.store.snapshot();
        let info = snap.agent_info.as_ref().ok_or(CoreError::AgentNotConnected)?;
        let (url, endpoint) = match snap.config.protocol {
            Protocol::Http => (present(info.http.as_ref()), "http"),
            Protocol::Https => (present(info.https.as_ref()), "https"),
        };
        url.map(str::to_owned)
            .ok_or(CoreError::MissingEndpoint { endpoint })
    }

    /// Socket address for the negotiated protocol (`ws` or `wss`).
    pub fn ws_address(&self) -> Result<String, CoreError> {
        let snap = self.inner.store.snapshot();
        let info = snap.agent_info.as_ref().ok_or(CoreError::AgentNotConnected)?;
        let (address, endpoint) = match snap.config.protocol {
            Protocol::Http => (present(info.ws.as_ref()), "ws"),
            Protocol::Https => (present(info.wss.as_ref()), "wss"),
        };
        address
            .map(str::to_owned)
            .ok_or(CoreError::MissingEndpoint { endpoint })
    }

    pub fn agent_os(&self) -> Result<String, CoreError> {
        let snap = self.inner.store.snapshot();
        let info = snap.agent_info.as_ref().ok_or(CoreError::AgentNotConnected)?;
        present(info.os.as_ref())
            .map(str::to_owned)
            .ok_or(CoreError::MissingEndpoint { endpoint: "os" })
    }

    pub fn ports(&self) -> Vec<AgentPort> {
        self.inner.store.snapshot().ports.clone()
    }

    pub fn network_ports(&self) -> Vec<AgentPort> {
        self.inner.store.snapshot().network_ports.clone()
    }

    pub(crate) fn http_client(&self) -> Result<AgentHttpClient, CoreError> {
        Ok(AgentHttpClient::from_reqwest(
            &self.agent_url()?,
            self.inner.http.clone(),
        )?)
    }

    pub(crate) fn socket(&self) -> Result<SocketRef, CoreError> {
        self.inner
            .store
            .snapshot()
            .socket
            .clone()
            .ok_or(CoreError::NotConnected)
    }

    // ── Liveness ─────────────────────────────────────────────────────

    /// `true` before any discovery; afterwards whether the probed
    /// `/info` endpoint still answers 200.
    pub async fn agent_is_alive(&self) -> bool {
        let snap = self.inner.store.snapshot();
        if !snap.searched_for_agent {
            return true;
        }
        let Some(endpoint) = snap.agent_info.as_ref().map(|i| i.endpoint_url.clone()) else {
            return false;
        };
        drop(snap);

        let Ok(url) = Url::parse(&endpoint) else {
            return false;
        };
        let client = match AgentHttpClient::from_reqwest(&endpoint, self.inner.probe_http.clone()) {
            Ok(client) => client,
            Err(e) => {
                debug!(error = %e, "cannot build liveness client");
                return false;
            }
        };
        match client.status_of(url).await {
            Ok(status) => status == 200,
            Err(e) => {
                debug!(error = %e, "agent liveness probe failed");
                false
            }
        }
    }

    // ── Socket session ───────────────────────────────────────────────

    /// Install an externally driven command sink as the agent socket.
    /// Inbound frames for it are fed through [`handle_frame`](Self::handle_frame).
    pub fn attach_socket(&self, sink: impl CommandSink + 'static) {
        let previous = self.replace_session(Some(SocketSession {
            handle: None,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }));
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        self.inner.store.update(|s| {
            s.socket = Some(SocketRef::new(sink));
            s.socket_connected = Some(true);
        });
        self.inner.session_state.send_replace(SessionState::Connected);
        debug!("external socket attached");
    }

    /// Apply one inbound agent frame (the JSON text of a `message` event).
    pub fn handle_frame(&self, text: &str) {
        router::route(&self.inner.store, &self.inner.streams, text);
    }

    /// Close the socket and join its tasks. Port lists and agent info are kept.
    pub async fn disconnect(&self) {
        self.teardown().await;
        self.inner.session_state.send_replace(SessionState::Idle);
    }

    /// Disconnect and clear everything tied to the session.
    pub async fn reset(&self) {
        self.disconnect().await;
        self.inner.store.reset();
        info!("agent state reset");
    }

    pub(crate) fn has_live_session(&self) -> bool {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(SocketSession::is_live)
    }

    pub(crate) fn replace_session(&self, next: Option<SocketSession>) -> Option<SocketSession> {
        let mut slot = self
            .inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, next)
    }

    pub(crate) async fn teardown(&self) {
        if let Some(session) = self.replace_session(None) {
            session.cancel.cancel();
            for task in session.tasks {
                if let Err(e) = task.await {
                    warn!(error = %e, "socket task ended abnormally");
                }
            }
            info!("agent socket closed");
        }
        let dropped = self.inner.store.update(|s| {
            s.socket = None;
            s.socket_connected = Some(false);
            std::mem::take(&mut s.serial_monitors)
        });
        notify_dropped(&self.inner.streams, dropped);
    }

    /// Spawn the task that feeds socket events into the store, in order.
    pub(crate) fn spawn_pump(
        &self,
        mut events: mpsc::UnboundedReceiver<SocketEvent>,
    ) -> JoinHandle<()> {
        let store = self.inner.store.clone();
        let streams = self.inner.streams.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                apply_socket_event(&store, &streams, event);
            }
            debug!("socket pump finished");
        })
    }
}

fn apply_socket_event(store: &StateStore, streams: &AgentStreams, event: SocketEvent) {
    match event {
        SocketEvent::Connected => {
            info!("agent socket connected");
            store.update(|s| s.socket_connected = Some(true));
        }
        SocketEvent::Disconnected => {
            info!("agent socket disconnected");
            let dropped = store.update(|s| {
                s.socket_connected = Some(false);
                std::mem::take(&mut s.serial_monitors)
            });
            notify_dropped(streams, dropped);
        }
        SocketEvent::Error(reason) => {
            warn!(%reason, "agent socket error");
            store.update(|s| s.socket_connected = Some(false));
        }
        SocketEvent::Message(text) => router::route(store, streams, &text),
    }
}

/// Monitor sessions die with the socket; their streams end as disconnected.
fn notify_dropped(streams: &AgentStreams, dropped: Vec<SerialMonitor>) {
    for monitor in dropped {
        warn!(port = %monitor.port, "serial monitor dropped with the agent socket");
        streams.notify_closure(&monitor.port, PortClosure::Disconnected);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::ProtocolConfig;

    fn agent_with(info: AgentInfo, protocol: Protocol) -> Agent {
        let agent = Agent::new(AgentConfig::default()).unwrap();
        agent.store().update(|s| {
            s.agent_info = Some(info);
            s.config = ProtocolConfig {
                protocol,
                use_v2: false,
            };
        });
        agent
    }

    #[test]
    fn accessors_fail_before_discovery() {
        let agent = Agent::new(AgentConfig::default()).unwrap();
        assert!(matches!(agent.agent_info(), Err(CoreError::AgentNotConnected)));
        assert!(matches!(agent.agent_url(), Err(CoreError::AgentNotConnected)));
        assert!(matches!(agent.ws_address(), Err(CoreError::AgentNotConnected)));
        assert!(matches!(agent.agent_os(), Err(CoreError::AgentNotConnected)));
    }

    #[test]
    fn accessors_follow_protocol() {
        let info = AgentInfo {
            http: Some("http://127.0.0.1:8991".into()),
            https: Some("https://localhost:8992".into()),
            ws: Some("ws://127.0.0.1:8991".into()),
            wss: None,
            os: Some("linux:x86_64".into()),
            ..AgentInfo::default()
        };

        let agent = agent_with(info.clone(), Protocol::Http);
        assert_eq!(agent.agent_url().unwrap(), "http://127.0.0.1:8991");
        assert_eq!(agent.ws_address().unwrap(), "ws://127.0.0.1:8991");
        assert_eq!(agent.agent_os().unwrap(), "linux:x86_64");

        let agent = agent_with(info, Protocol::Https);
        assert_eq!(agent.agent_url().unwrap(), "https://localhost:8992");
        assert!(matches!(
            agent.ws_address(),
            Err(CoreError::MissingEndpoint { endpoint: "wss" })
        ));
    }

    #[test]
    fn empty_endpoint_counts_as_missing() {
        let info = AgentInfo {
            http: Some(String::new()),
            ..AgentInfo::default()
        };
        let agent = agent_with(info, Protocol::Http);
        assert!(matches!(
            agent.agent_url(),
            Err(CoreError::MissingEndpoint { endpoint: "http" })
        ));
        assert!(matches!(
            agent.agent_os(),
            Err(CoreError::MissingEndpoint { endpoint: "os" })
        ));
    }

    #[tokio::test]
    async fn alive_before_search_dead_without_info() {
        let agent = Agent::new(AgentConfig::default()).unwrap();
        assert!(agent.agent_is_alive().await);

        agent.store().update(|s| s.searched_for_agent = true);
        assert!(!agent.agent_is_alive().await);
    }

    #[tokio::test]
    async fn socket_events_drive_liveness() {
        let agent = Agent::new(AgentConfig::default()).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let pump = agent.spawn_pump(rx);

        tx.send(SocketEvent::Connected).unwrap();
        tx.send(SocketEvent::Message(r#"{"Ports":[],"Network":true}"#.into()))
            .unwrap();
        tx.send(SocketEvent::Error("reset by peer".into())).unwrap();
        drop(tx);
        pump.await.unwrap();

        assert_eq!(agent.store().snapshot().socket_connected, Some(false));
    }

    #[tokio::test]
    async fn reset_clears_session_but_keeps_ports() {
        let agent = agent_with(AgentInfo::default(), Protocol::Http);
        agent.store().update(|s| {
            s.ports.push(AgentPort::named("COM3"));
            s.searched_for_agent = true;
        });

        agent.reset().await;

        let snap = agent.store().snapshot();
        assert!(snap.agent_info.is_none());
        assert_eq!(snap.ports.len(), 1);
        assert_eq!(*agent.session_state().borrow(), SessionState::Idle);
    }

    #[tokio::test]
    async fn socket_disconnect_drops_monitor_sessions() {
        let agent = Agent::new(AgentConfig::default()).unwrap();
        agent.store().update(|s| {
            s.serial_monitors.push(SerialMonitor {
                port: "COM3".into(),
                baud: 9600,
                status: crate::model::MonitorStatus::Opened,
            });
        });
        let mut closures = agent.streams().subscribe_closures();

        let (tx, rx) = mpsc::unbounded_channel();
        let pump = agent.spawn_pump(rx);
        tx.send(SocketEvent::Disconnected).unwrap();
        drop(tx);
        pump.await.unwrap();

        assert!(agent.store().snapshot().serial_monitors.is_empty());
        assert_eq!(
            closures.try_recv().unwrap(),
            ("COM3".to_owned(), PortClosure::Disconnected)
        );
    }
}
