// ── Wire → domain mapping ──
//
// Agent frames use PascalCase field names (`IsOpen`, `VendorID`, `Msg`).
// Each classified frame is decoded into a typed `AgentMessage`.

use serde::Deserialize;
use serde_json::Value;

use super::classify::{FrameKind, classify};
use crate::model::{AgentPort, MonitorCommand, MonitorData};

// ── Typed messages ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadState {
    Pending,
    Success,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgrammerStatus {
    Starting,
    Busy,
    Error,
    Killed,
    NotFound,
    Done,
    Other(String),
}

impl From<&str> for ProgrammerStatus {
    fn from(status: &str) -> Self {
        match status {
            "Starting" => Self::Starting,
            "Busy" => Self::Busy,
            "Error" => Self::Error,
            "Killed" => Self::Killed,
            "Error 404 Not Found" => Self::NotFound,
            "Done" => Self::Done,
            other => Self::Other(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStatusMessage {
    pub status: ProgrammerStatus,
    pub message: Option<String>,
    pub flash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStatusMessage {
    pub command: MonitorCommand,
    pub port: String,
    pub baud: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    PortList(Vec<AgentPort>),
    NetworkPortList(Vec<AgentPort>),
    DownloadStatus {
        state: DownloadState,
        message: Option<String>,
    },
    UploadStatus(UploadStatusMessage),
    MonitorStatus(MonitorStatusMessage),
    MonitorData(MonitorData),
    Unknown(Value),
}

// ── Wire shapes ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct WirePort {
    name: String,
    serial_number: String,
    device_class: String,
    is_open: bool,
    is_primary: bool,
    baud: u32,
    buffer_algorithm: String,
    ver: String,
    network_port: bool,
    #[serde(rename = "VendorID")]
    vendor_id: String,
    #[serde(rename = "ProductID")]
    product_id: String,
}

impl From<WirePort> for AgentPort {
    fn from(w: WirePort) -> Self {
        Self {
            name: w.name,
            serial_number: w.serial_number,
            device_class: w.device_class,
            is_open: w.is_open,
            is_primary: w.is_primary,
            baud: w.baud,
            buffer_algorithm: w.buffer_algorithm,
            version: w.ver,
            network_port: w.network_port,
            vendor_id: w.vendor_id,
            product_id: w.product_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WirePortList {
    ports: Vec<WirePort>,
}

#[derive(Debug, Deserialize)]
struct WireDownloadStatus {
    #[serde(rename = "DownloadStatus")]
    status: String,
    #[serde(rename = "Msg", default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUploadStatus {
    #[serde(rename = "ProgrammerStatus")]
    status: String,
    #[serde(rename = "Msg", default)]
    message: Option<String>,
    #[serde(rename = "Flash", default)]
    flash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireMonitorStatus {
    cmd: String,
    #[serde(default)]
    port: String,
    #[serde(default)]
    baud: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireMonitorData {
    #[serde(rename = "P")]
    port: String,
    #[serde(rename = "D")]
    data: String,
}

// ── Decoding ─────────────────────────────────────────────────────────

/// Decode one inbound frame. Non-JSON text and frames whose fields do not
/// have the expected shape are `Unknown`.
pub fn decode(text: &str) -> AgentMessage {
    let Ok(frame) = serde_json::from_str::<Value>(text) else {
        return AgentMessage::Unknown(Value::String(text.to_owned()));
    };
    let kind = classify(&frame);
    map_frame(kind, frame)
}

fn map_frame(kind: FrameKind, frame: Value) -> AgentMessage {
    let mapped = match kind {
        FrameKind::PortList => port_list(&frame).map(AgentMessage::PortList),
        FrameKind::NetworkPortList => port_list(&frame).map(AgentMessage::NetworkPortList),
        FrameKind::DownloadStatus => WireDownloadStatus::deserialize(&frame)
            .ok()
            .map(|w| AgentMessage::DownloadStatus {
                state: match w.status.as_str() {
                    "Pending" => DownloadState::Pending,
                    "Success" => DownloadState::Success,
                    _ => DownloadState::Failed(w.status),
                },
                message: w.message,
            }),
        FrameKind::UploadStatus => WireUploadStatus::deserialize(&frame).ok().map(|w| {
            AgentMessage::UploadStatus(UploadStatusMessage {
                status: ProgrammerStatus::from(w.status.as_str()),
                message: w.message,
                flash: w.flash,
            })
        }),
        FrameKind::MonitorStatus => WireMonitorStatus::deserialize(&frame)
            .ok()
            .and_then(|w| {
                let command = w.cmd.parse::<MonitorCommand>().ok()?;
                Some(AgentMessage::MonitorStatus(MonitorStatusMessage {
                    command,
                    port: w.port,
                    baud: w.baud,
                }))
            }),
        FrameKind::MonitorData => WireMonitorData::deserialize(&frame)
            .ok()
            .map(|w| AgentMessage::MonitorData(MonitorData {
                port: w.port,
                data: w.data,
            })),
        FrameKind::Unknown => None,
    };

    mapped.unwrap_or(AgentMessage::Unknown(frame))
}

fn port_list(frame: &Value) -> Option<Vec<AgentPort>> {
    WirePortList::deserialize(frame)
        .ok()
        .map(|list| list.ports.into_iter().map(AgentPort::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn maps_port_list_fields() {
        let text = r#"{
            "Ports": [{
                "Name": "/dev/ttyACM0",
                "SerialNumber": "5D3A9B",
                "DeviceClass": "",
                "IsOpen": false,
                "IsPrimary": true,
                "Baud": 0,
                "BufferAlgorithm": "",
                "Ver": "1.2.7",
                "NetworkPort": false,
                "VendorID": "0x2341",
                "ProductID": "0x804e"
            }],
            "Network": false
        }"#;

        let AgentMessage::PortList(ports) = decode(text) else {
            panic!("expected a port list");
        };
        assert_eq!(
            ports,
            vec![AgentPort {
                name: "/dev/ttyACM0".into(),
                serial_number: "5D3A9B".into(),
                is_primary: true,
                version: "1.2.7".into(),
                vendor_id: "0x2341".into(),
                product_id: "0x804e".into(),
                ..AgentPort::default()
            }]
        );
    }

    #[test]
    fn maps_network_ports() {
        let msg = decode(r#"{"Ports":[{"Name":"192.168.1.20","NetworkPort":true}],"Network":true}"#);
        let AgentMessage::NetworkPortList(ports) = msg else {
            panic!("expected network ports");
        };
        assert!(ports[0].network_port);
    }

    #[test]
    fn maps_status_frames() {
        assert_eq!(
            decode(r#"{"DownloadStatus":"Error","Msg":"checksum mismatch"}"#),
            AgentMessage::DownloadStatus {
                state: DownloadState::Failed("Error".into()),
                message: Some("checksum mismatch".into()),
            }
        );
        assert_eq!(
            decode(r#"{"ProgrammerStatus":"Error 404 Not Found","Msg":"no tool"}"#),
            AgentMessage::UploadStatus(UploadStatusMessage {
                status: ProgrammerStatus::NotFound,
                message: Some("no tool".into()),
                flash: None,
            })
        );
        assert_eq!(
            decode(r#"{"Cmd":"Open","Port":"COM3","Baud":115200}"#),
            AgentMessage::MonitorStatus(MonitorStatusMessage {
                command: MonitorCommand::Open,
                port: "COM3".into(),
                baud: Some(115_200),
            })
        );
        assert_eq!(
            decode(r#"{"P":"COM3","D":"hello\n"}"#),
            AgentMessage::MonitorData(MonitorData {
                port: "COM3".into(),
                data: "hello\n".into(),
            })
        );
    }

    #[test]
    fn non_json_and_malformed_frames_are_unknown() {
        assert!(matches!(decode("Ports"), AgentMessage::Unknown(_)));
        assert!(matches!(decode(r#"{"Ports":["bad"]}"#), AgentMessage::Unknown(_)));
        assert!(matches!(decode(r#"{"P":"COM3","D":42}"#), AgentMessage::Unknown(_)));
    }
}
