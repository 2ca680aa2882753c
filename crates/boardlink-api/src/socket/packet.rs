// Engine.IO v3 / Socket.IO v2 text framing
//
// An Engine.IO packet is a single type digit followed by its payload. A
// Socket.IO packet rides inside an Engine.IO `message` (type 4) and is
// itself a type digit, an optional `/namespace,` prefix, an optional ack
// id, and a JSON array payload for events.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

// ── Engine.IO ────────────────────────────────────────────────────────

/// Parameters from the Engine.IO `open` handshake.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between client pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a ping before dropping us.
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, Error> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::Protocol("empty Engine.IO frame".into()))?;
        let payload = chars.as_str();

        match kind {
            '0' => serde_json::from_str(payload)
                .map(Self::Open)
                .map_err(|e| Error::Protocol(format!("bad open handshake: {e}"))),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(payload.to_owned())),
            '3' => Ok(Self::Pong(payload.to_owned())),
            '4' => Ok(Self::Message(payload.to_owned())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(Error::Protocol(format!("unknown Engine.IO packet type {other:?}"))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            // Clients never send `open`; encode it for completeness.
            Self::Open(hs) => format!(
                "0{{\"sid\":{},\"upgrades\":[],\"pingInterval\":{},\"pingTimeout\":{}}}",
                Value::String(hs.sid.clone()),
                hs.ping_interval,
                hs.ping_timeout
            ),
            Self::Close => "1".into(),
            Self::Ping(p) => format!("2{p}"),
            Self::Pong(p) => format!("3{p}"),
            Self::Message(m) => format!("4{m}"),
            Self::Upgrade => "5".into(),
            Self::Noop => "6".into(),
        }
    }
}

// ── Socket.IO ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect,
    Disconnect,
    Event { name: String, args: Vec<Value> },
    Ack,
    Error(String),
}

impl SocketPacket {
    pub fn decode(message: &str) -> Result<Self, Error> {
        let mut chars = message.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::Protocol("empty Socket.IO packet".into()))?;
        let body = skip_ack_id(skip_namespace(chars.as_str()));

        match kind {
            '0' => Ok(Self::Connect),
            '1' => Ok(Self::Disconnect),
            '2' => decode_event(body),
            '3' => Ok(Self::Ack),
            '4' => Ok(Self::Error(
                serde_json::from_str::<String>(body).unwrap_or_else(|_| body.to_owned()),
            )),
            other => Err(Error::Protocol(format!("unknown Socket.IO packet type {other:?}"))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Connect => "0".into(),
            Self::Disconnect => "1".into(),
            Self::Event { name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                format!("2{}", Value::Array(items))
            }
            Self::Ack => "3".into(),
            Self::Error(msg) => format!("4{}", Value::String(msg.clone())),
        }
    }
}

/// Engine.IO text frame carrying a `command` event with `payload`.
///
/// `command_frame("list")` is `42["command","list"]`.
pub fn command_frame(payload: &str) -> String {
    let event = SocketPacket::Event {
        name: "command".into(),
        args: vec![Value::String(payload.to_owned())],
    };
    EnginePacket::Message(event.encode()).encode()
}

fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

fn skip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(body: &str) -> Result<SocketPacket, Error> {
    let items: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("bad event payload: {e}")))?;
    let mut items = items.into_iter();

    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(Error::Protocol("event without a name".into())),
    };

    Ok(SocketPacket::Event {
        name,
        args: items.collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_open_handshake() {
        let frame = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":60000}"#;
        let EnginePacket::Open(hs) = EnginePacket::decode(frame).unwrap() else {
            panic!("expected open packet");
        };
        assert_eq!(hs.sid, "abc");
        assert_eq!(hs.ping_interval, 25000);
        assert_eq!(hs.ping_timeout, 60000);
    }

    #[test]
    fn command_frame_matches_agent_framing() {
        assert_eq!(command_frame("list"), r#"42["command","list"]"#);
        assert_eq!(
            command_frame("open /dev/ttyACM0 9600 timed"),
            r#"42["command","open /dev/ttyACM0 9600 timed"]"#
        );
    }

    #[test]
    fn decodes_message_event() {
        let EnginePacket::Message(inner) =
            EnginePacket::decode(r#"42["message","{\"P\":\"COM3\",\"D\":\"hi\"}"]"#).unwrap()
        else {
            panic!("expected message packet");
        };
        let packet = SocketPacket::decode(&inner).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                name: "message".into(),
                args: vec![json!(r#"{"P":"COM3","D":"hi"}"#)],
            }
        );
    }

    #[test]
    fn skips_namespace_and_ack_id() {
        let packet = SocketPacket::decode(r#"2/agent,17["message","x"]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                name: "message".into(),
                args: vec![json!("x")],
            }
        );
    }

    #[test]
    fn decodes_lifecycle_packets() {
        assert_eq!(SocketPacket::decode("0").unwrap(), SocketPacket::Connect);
        assert_eq!(SocketPacket::decode("1").unwrap(), SocketPacket::Disconnect);
        assert_eq!(
            SocketPacket::decode(r#"4"not authorized""#).unwrap(),
            SocketPacket::Error("not authorized".into())
        );
        assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(EnginePacket::decode("3probe").unwrap(), EnginePacket::Pong("probe".into()));
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(EnginePacket::decode("").is_err());
        assert!(EnginePacket::decode("9").is_err());
        assert!(SocketPacket::decode("2[42]").is_err());
        assert!(SocketPacket::decode("2not json").is_err());
    }
}
