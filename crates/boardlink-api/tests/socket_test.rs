// Socket.IO client tests against an in-process WebSocket server.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use boardlink_api::{SocketEvent, SocketHandle};

const HANDSHAKE: &str = r#"0{"sid":"test","upgrades":[],"pingInterval":25000,"pingTimeout":60000}"#;

/// Accept one client, perform the Engine.IO/Socket.IO handshake, push
/// `greeting` frames, then forward every text frame the client sends.
async fn spawn_server(greeting: Vec<String>) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::text(HANDSHAKE)).await.unwrap();
        ws.send(Message::text("40")).await.unwrap();
        for frame in greeting {
            ws.send(Message::text(frame)).await.unwrap();
        }
        while let Some(Ok(frame)) = ws.next().await {
            if let Message::Text(text) = frame {
                let _ = tx.send(text.as_str().to_owned());
            }
        }
    });

    (format!("ws://{addr}"), rx)
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<SocketEvent>) -> SocketEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_connect_emit_and_receive() {
    let (address, mut server_rx) =
        spawn_server(vec![r#"42["message","{\"Network\":false,\"Ports\":[]}"]"#.into()]).await;

    let mut conn = SocketHandle::spawn(&address, CancellationToken::new()).unwrap();

    assert_eq!(next_event(&mut conn.events).await, SocketEvent::Connected);
    assert_eq!(
        next_event(&mut conn.events).await,
        SocketEvent::Message(r#"{"Network":false,"Ports":[]}"#.into())
    );

    conn.handle.emit_command("list").unwrap();
    let frame = tokio::time::timeout(Duration::from_secs(5), server_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame, r#"42["command","list"]"#);

    conn.handle.shutdown();
    assert_eq!(next_event(&mut conn.events).await, SocketEvent::Disconnected);
    conn.task.await.unwrap();
    assert!(conn.handle.emit_command("list").is_err());
}

#[tokio::test]
async fn test_connection_refused_reports_error_then_disconnect() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut conn =
        SocketHandle::spawn(&format!("ws://127.0.0.1:{port}"), CancellationToken::new()).unwrap();

    assert!(matches!(next_event(&mut conn.events).await, SocketEvent::Error(_)));
    assert_eq!(next_event(&mut conn.events).await, SocketEvent::Disconnected);
}
