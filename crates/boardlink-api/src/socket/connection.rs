// Socket.IO connection task
//
// One background task owns the WebSocket. Commands reach it through an
// unbounded channel so emitting never blocks; lifecycle and `message`
// events flow back through another, in arrival order.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::packet::{EnginePacket, Handshake, SocketPacket, command_frame};
use crate::error::Error;

/// Path and query appended to the agent's `ws`/`wss` address.
pub const SOCKET_IO_PATH: &str = "/socket.io/?EIO=3&transport=websocket";

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// ── SocketEvent ──────────────────────────────────────────────────────

/// Something that happened on the socket, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The Socket.IO namespace connect was acknowledged.
    Connected,
    /// The connection ended (server close, network drop or shutdown).
    Disconnected,
    /// Connection or protocol error; a `Disconnected` follows if fatal.
    Error(String),
    /// Payload of an inbound `message` event (a JSON document as text).
    Message(String),
}

// ── SocketHandle ─────────────────────────────────────────────────────

/// Cheap, cloneable handle for emitting commands to a running socket.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    command_tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
    url: Url,
}

/// A freshly spawned socket: the handle, the ordered event feed and the
/// task driving the connection.
#[derive(Debug)]
pub struct SocketConnection {
    pub handle: SocketHandle,
    pub events: mpsc::UnboundedReceiver<SocketEvent>,
    pub task: JoinHandle<()>,
}

impl SocketHandle {
    /// Spawn the connection task for the agent address `ws_address`
    /// (e.g. `ws://127.0.0.1:8991`).
    ///
    /// Returns immediately; connection progress is reported through
    /// [`SocketConnection::events`]. Must be called within a Tokio runtime.
    pub fn spawn(ws_address: &str, cancel: CancellationToken) -> Result<SocketConnection, Error> {
        let url = socket_io_url(ws_address)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();

        let task_url = url.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            socket_loop(task_url, command_rx, event_tx, task_cancel).await;
        });

        Ok(SocketConnection {
            handle: Self {
                command_tx,
                cancel,
                url,
            },
            events,
            task,
        })
    }

    /// Queue a `command` event. Fails only once the task has exited.
    pub fn emit_command(&self, payload: &str) -> Result<(), Error> {
        debug!(command = payload, "emit");
        self.command_tx
            .send(payload.to_owned())
            .map_err(|_| Error::SocketClosed)
    }

    /// The full Socket.IO URL this handle connects to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `true` once the connection task has exited.
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Signal the background task to close the connection.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Build `<ws_address>/socket.io/?EIO=3&transport=websocket`.
pub fn socket_io_url(ws_address: &str) -> Result<Url, Error> {
    Ok(Url::parse(&format!(
        "{}{SOCKET_IO_PATH}",
        ws_address.trim_end_matches('/')
    ))?)
}

// ── Background task ──────────────────────────────────────────────────

async fn socket_loop(
    url: Url,
    mut command_rx: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<SocketEvent>,
    cancel: CancellationToken,
) {
    match run_session(&url, &mut command_rx, &event_tx, &cancel).await {
        Ok(()) => info!(url = %url, "socket closed"),
        Err(e) => {
            warn!(url = %url, error = %e, "socket error");
            let _ = event_tx.send(SocketEvent::Error(e.to_string()));
        }
    }

    // Receivers may already be gone during shutdown.
    let _ = event_tx.send(SocketEvent::Disconnected);
}

async fn run_session(
    url: &Url,
    command_rx: &mut mpsc::UnboundedReceiver<String>,
    event_tx: &mpsc::UnboundedSender<SocketEvent>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    info!(url = %url, "connecting to agent socket");

    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        result = tokio_tungstenite::connect_async(url.as_str()) => {
            result.map_err(|e| Error::WebSocketConnect(e.to_string()))?
        }
    };
    let (mut write, mut read) = ws_stream.split();

    let handshake = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        result = tokio::time::timeout(HANDSHAKE_TIMEOUT, read_handshake(&mut read)) => {
            result.map_err(|_| Error::Protocol("no Engine.IO handshake".into()))??
        }
    };
    debug!(
        sid = %handshake.sid,
        ping_interval_ms = handshake.ping_interval,
        "engine.io handshake"
    );

    let period = Duration::from_millis(handshake.ping_interval.max(1));
    let mut ping = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(Message::text(EnginePacket::Close.encode())).await;
                let _ = write.close().await;
                return Ok(());
            }
            command = command_rx.recv() => {
                let Some(payload) = command else { return Ok(()) };
                write
                    .send(Message::text(command_frame(&payload)))
                    .await
                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
            }
            _ = ping.tick() => {
                trace!("engine.io ping");
                write
                    .send(Message::text(EnginePacket::Ping(String::new()).encode()))
                    .await
                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match handle_frame(text.as_str(), event_tx) {
                            FrameOutcome::Continue => {}
                            FrameOutcome::Pong(payload) => {
                                write
                                    .send(Message::text(EnginePacket::Pong(payload).encode()))
                                    .await
                                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
                            }
                            FrameOutcome::Closed => return Ok(()),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                    // Binary, Ping, Pong, Frame: tungstenite answers pings itself
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

async fn read_handshake<S>(read: &mut S) -> Result<Handshake, Error>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = read.next().await {
        match frame.map_err(|e| Error::WebSocketConnect(e.to_string()))? {
            Message::Text(text) => {
                if let EnginePacket::Open(handshake) = EnginePacket::decode(text.as_str())? {
                    return Ok(handshake);
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(Error::SocketClosed)
}

enum FrameOutcome {
    Continue,
    Pong(String),
    Closed,
}

fn handle_frame(text: &str, event_tx: &mpsc::UnboundedSender<SocketEvent>) -> FrameOutcome {
    trace!(frame = text, "socket frame");

    let packet = match EnginePacket::decode(text) {
        Ok(packet) => packet,
        Err(e) => {
            warn!(error = %e, "dropping malformed frame");
            return FrameOutcome::Continue;
        }
    };

    match packet {
        EnginePacket::Message(inner) => match SocketPacket::decode(&inner) {
            Ok(SocketPacket::Connect) => {
                info!("socket connected");
                let _ = event_tx.send(SocketEvent::Connected);
            }
            Ok(SocketPacket::Disconnect) => return FrameOutcome::Closed,
            Ok(SocketPacket::Event { name, args }) if name == "message" => {
                if let Some(payload) = args.into_iter().next() {
                    let _ = event_tx.send(SocketEvent::Message(message_text(payload)));
                }
            }
            Ok(SocketPacket::Event { name, .. }) => debug!(event = %name, "ignoring event"),
            Ok(SocketPacket::Error(msg)) => {
                let _ = event_tx.send(SocketEvent::Error(msg));
            }
            Ok(SocketPacket::Ack) => {}
            Err(e) => warn!(error = %e, "dropping malformed packet"),
        },
        EnginePacket::Ping(payload) => return FrameOutcome::Pong(payload),
        EnginePacket::Close => return FrameOutcome::Closed,
        EnginePacket::Pong(_) => trace!("engine.io pong"),
        EnginePacket::Open(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
    }

    FrameOutcome::Continue
}

/// The agent sends `message` payloads as JSON text; tolerate objects too.
fn message_text(payload: Value) -> String {
    match payload {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
