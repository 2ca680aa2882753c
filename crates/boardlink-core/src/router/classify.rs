// ── Frame classification ──
//
// Agent frames carry no type tag. The kind is decided by which fields are
// present, checked in a fixed order; the first guard that matches wins.

use serde_json::Value;
use strum::Display;

use crate::model::MonitorCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FrameKind {
    PortList,
    NetworkPortList,
    DownloadStatus,
    UploadStatus,
    MonitorStatus,
    MonitorData,
    Unknown,
}

type Guard = fn(&Value) -> bool;

const GUARDS: &[(Guard, FrameKind)] = &[
    (is_port_list, FrameKind::PortList),
    (is_network_port_list, FrameKind::NetworkPortList),
    (is_download_status, FrameKind::DownloadStatus),
    (is_upload_status, FrameKind::UploadStatus),
    (is_monitor_status, FrameKind::MonitorStatus),
    (is_monitor_data, FrameKind::MonitorData),
];

pub fn classify(frame: &Value) -> FrameKind {
    GUARDS
        .iter()
        .find(|(guard, _)| guard(frame))
        .map_or(FrameKind::Unknown, |(_, kind)| *kind)
}

fn is_port_list(frame: &Value) -> bool {
    has_ports(frame) && !truthy(frame.get("Network"))
}

fn is_network_port_list(frame: &Value) -> bool {
    has_ports(frame) && truthy(frame.get("Network"))
}

fn is_download_status(frame: &Value) -> bool {
    truthy(frame.get("DownloadStatus"))
}

fn is_upload_status(frame: &Value) -> bool {
    truthy(frame.get("ProgrammerStatus"))
}

fn is_monitor_status(frame: &Value) -> bool {
    frame
        .get("Cmd")
        .and_then(Value::as_str)
        .is_some_and(|cmd| cmd.parse::<MonitorCommand>().is_ok())
}

fn is_monitor_data(frame: &Value) -> bool {
    truthy(frame.get("P")) && truthy(frame.get("D"))
}

fn has_ports(frame: &Value) -> bool {
    frame.get("Ports").is_some_and(Value::is_array)
}

/// Loose truthiness: absent, null, false, 0 and "" are false.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_each_frame_kind() {
        let cases = [
            (json!({"Ports": [], "Network": false}), FrameKind::PortList),
            (json!({"Ports": []}), FrameKind::PortList),
            (json!({"Ports": [], "Network": true}), FrameKind::NetworkPortList),
            (json!({"DownloadStatus": "Pending", "Msg": "x"}), FrameKind::DownloadStatus),
            (json!({"ProgrammerStatus": "Busy", "Msg": "x"}), FrameKind::UploadStatus),
            (json!({"Cmd": "Open", "Port": "COM3", "Baud": 9600}), FrameKind::MonitorStatus),
            (json!({"Cmd": "CloseFail", "Port": "COM3"}), FrameKind::MonitorStatus),
            (json!({"P": "COM3", "D": "hello"}), FrameKind::MonitorData),
            (json!({"Version": "1.2.7"}), FrameKind::Unknown),
            (json!({"Cmd": "List"}), FrameKind::Unknown),
            (json!({"P": "COM3", "D": ""}), FrameKind::Unknown),
            (json!("just a string"), FrameKind::Unknown),
        ];

        for (frame, expected) in cases {
            assert_eq!(classify(&frame), expected, "frame: {frame}");
        }
    }

    #[test]
    fn earlier_guard_wins() {
        let frame = json!({"Ports": [], "DownloadStatus": "Success"});
        assert_eq!(classify(&frame), FrameKind::PortList);

        let frame = json!({"ProgrammerStatus": "Busy", "P": "COM3", "D": "x"});
        assert_eq!(classify(&frame), FrameKind::UploadStatus);
    }
}
