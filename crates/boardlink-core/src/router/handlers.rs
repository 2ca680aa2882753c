// ── Frame side effects ──
//
// Each typed message either mutates the store or feeds a stream. Handlers
// run on the socket pump, one frame at a time.

use tracing::{debug, info, trace, warn};

use super::mapper::{
    AgentMessage, DownloadState, MonitorStatusMessage, ProgrammerStatus, UploadStatusMessage,
};
use crate::config::DEFAULT_BAUD_RATE;
use crate::model::{
    AgentPort, MonitorCommand, MonitorStatus, PortClosure, SerialMonitor, TicketStatus,
    UploadStatus,
};
use crate::store::StateStore;
use crate::stream::AgentStreams;

pub fn apply(store: &StateStore, streams: &AgentStreams, message: AgentMessage) {
    match message {
        AgentMessage::PortList(ports) => on_port_list(store, ports),
        AgentMessage::NetworkPortList(ports) => {
            debug!(count = ports.len(), "network ports updated");
            store.update(|s| s.network_ports = ports);
        }
        AgentMessage::DownloadStatus { state, message } => {
            on_download_status(store, &state, message.as_deref());
        }
        AgentMessage::UploadStatus(msg) => on_upload_status(store, streams, &msg),
        AgentMessage::MonitorStatus(msg) => on_monitor_status(store, streams, &msg),
        AgentMessage::MonitorData(chunk) => {
            trace!(port = %chunk.port, bytes = chunk.data.len(), "monitor data");
            streams.push_monitor_data(chunk);
        }
        AgentMessage::Unknown(frame) => trace!(%frame, "unhandled agent frame"),
    }
}

// ── Ports ────────────────────────────────────────────────────────────

fn on_port_list(store: &StateStore, ports: Vec<AgentPort>) {
    let applied = store.update_if(|s| {
        if s.ports_list_quota.is_empty() {
            return false;
        }
        s.ports_list_quota.remove(0);
        s.ports = ports;
        true
    });

    if !applied {
        // Somebody else asked for this listing.
        debug!("unsolicited port list ignored");
    }
}

// ── Downloads ────────────────────────────────────────────────────────

/// The agent does not say which tool a status belongs to: it settles the
/// oldest ticket still waiting, in request order.
fn on_download_status(store: &StateStore, state: &DownloadState, message: Option<&str>) {
    let applied = store.update_if(|s| {
        let Some(ticket) = s
            .download_quota
            .iter_mut()
            .find(|t| t.status.is_some_and(TicketStatus::is_open))
        else {
            return false;
        };

        let next = match state {
            DownloadState::Pending => TicketStatus::Pending,
            DownloadState::Success => TicketStatus::Success,
            DownloadState::Failed(_) => TicketStatus::Error,
        };
        if ticket.status == Some(next) {
            return false;
        }
        ticket.status = Some(next);
        true
    });

    match (applied, state) {
        (true, DownloadState::Failed(status)) => {
            warn!(status = %status, message = message.unwrap_or(""), "tool download failed");
        }
        (true, _) => debug!(?state, message = message.unwrap_or(""), "download status"),
        (false, _) => trace!(?state, "download status without a waiting ticket"),
    }
}

// ── Uploads ──────────────────────────────────────────────────────────

fn on_upload_status(store: &StateStore, streams: &AgentStreams, msg: &UploadStatusMessage) {
    if store.snapshot().upload_quota.is_empty() {
        trace!(status = ?msg.status, "upload status without an upload in flight");
        return;
    }

    let flashed = msg.status == ProgrammerStatus::Done && msg.flash.as_deref() == Some("Ok");
    let target = if flashed {
        UploadStatus::Done
    } else {
        match msg.status {
            ProgrammerStatus::Error | ProgrammerStatus::Killed | ProgrammerStatus::NotFound => {
                UploadStatus::Error
            }
            _ => UploadStatus::InProgress,
        }
    };

    // Terminal states are only ever reached through in-progress.
    if target.is_terminal() {
        store.update_if(|s| {
            if s.upload_status == UploadStatus::None {
                s.upload_status = UploadStatus::InProgress;
                true
            } else {
                false
            }
        });
    }

    store.update(|s| {
        s.upload_status = target;
        if target.is_terminal() && !s.upload_quota.is_empty() {
            s.upload_quota.remove(0);
        }
    });

    if target.is_terminal() {
        info!(status = %target, "upload finished");
    }

    if let Some(message) = msg.message.as_deref().filter(|m| !m.is_empty()) {
        streams.push_upload_message(message);
    }
    if let Some(flash) = msg.flash.as_deref().filter(|_| flashed) {
        streams.push_upload_message(flash);
    }
}

// ── Serial monitors ──────────────────────────────────────────────────

fn on_monitor_status(store: &StateStore, streams: &AgentStreams, msg: &MonitorStatusMessage) {
    let port = msg.port.as_str();
    debug!(port = %port, command = %msg.command, "monitor status");

    match msg.command {
        MonitorCommand::Open | MonitorCommand::OpenFail => {
            let status = if msg.command == MonitorCommand::Open {
                MonitorStatus::Opened
            } else {
                MonitorStatus::Failed
            };
            let existed = store.update(|s| {
                if let Some(entry) = s.monitor_mut(port) {
                    entry.status = status;
                    true
                } else {
                    s.serial_monitors.push(SerialMonitor {
                        port: port.to_owned(),
                        baud: msg.baud.unwrap_or(DEFAULT_BAUD_RATE),
                        status,
                    });
                    false
                }
            });
            if existed && status == MonitorStatus::Failed {
                streams.notify_closure(port, PortClosure::Disconnected);
            }
        }
        MonitorCommand::Close => {
            let mut prior = None;
            store.update_if(|s| {
                let Some(pos) = s.serial_monitors.iter().position(|m| m.port == port) else {
                    return false;
                };
                prior = Some(s.serial_monitors.remove(pos).status);
                true
            });
            if let Some(status) = prior {
                let closure = if status == MonitorStatus::Closing {
                    PortClosure::Closed
                } else {
                    PortClosure::Disconnected
                };
                streams.notify_closure(port, closure);
            }
        }
        MonitorCommand::CloseFail => {
            store.update_if(|s| match s.monitor_mut(port) {
                Some(entry) if entry.status == MonitorStatus::Closing => {
                    entry.status = MonitorStatus::Opened;
                    true
                }
                _ => false,
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Ticket;
    use crate::router::mapper::decode;
    use uuid::Uuid;

    fn route(store: &StateStore, streams: &AgentStreams, text: &str) {
        apply(store, streams, decode(text));
    }

    fn setup() -> (StateStore, AgentStreams) {
        (StateStore::new(), AgentStreams::new())
    }

    #[test]
    fn port_list_requires_a_ticket() {
        let (store, streams) = setup();
        route(&store, &streams, r#"{"Ports":[{"Name":"COM3"}],"Network":false}"#);
        assert!(store.snapshot().ports.is_empty());

        store.update(|s| s.ports_list_quota.push(Ticket::new()));
        route(&store, &streams, r#"{"Ports":[{"Name":"COM3"}],"Network":false}"#);
        let snap = store.snapshot();
        assert_eq!(snap.ports[0].name, "COM3");
        assert!(snap.ports_list_quota.is_empty());
    }

    #[test]
    fn network_ports_apply_directly() {
        let (store, streams) = setup();
        route(&store, &streams, r#"{"Ports":[{"Name":"10.0.0.5"}],"Network":true}"#);
        assert_eq!(store.snapshot().network_ports[0].name, "10.0.0.5");
    }

    #[test]
    fn download_status_settles_tickets_in_order() {
        let (store, streams) = setup();
        let batch = Uuid::new_v4();
        store.update(|s| {
            s.download_quota.push(Ticket::for_batch(batch));
            s.download_quota.push(Ticket::for_batch(batch));
        });

        route(&store, &streams, r#"{"DownloadStatus":"Pending","Msg":""}"#);
        route(&store, &streams, r#"{"DownloadStatus":"Pending","Msg":""}"#);
        let statuses: Vec<_> = store.snapshot().download_quota.iter().map(|t| t.status).collect();
        assert_eq!(statuses, [Some(TicketStatus::Pending), Some(TicketStatus::Sent)]);

        route(&store, &streams, r#"{"DownloadStatus":"Success","Msg":""}"#);
        route(&store, &streams, r#"{"DownloadStatus":"Error","Msg":"boom"}"#);
        let statuses: Vec<_> = store.snapshot().download_quota.iter().map(|t| t.status).collect();
        assert_eq!(statuses, [Some(TicketStatus::Success), Some(TicketStatus::Error)]);

        // Nothing left to settle.
        route(&store, &streams, r#"{"DownloadStatus":"Success","Msg":""}"#);
        assert_eq!(store.snapshot().download_quota.len(), 2);
    }

    #[test]
    fn upload_frames_ignored_without_ticket() {
        let (store, streams) = setup();
        route(&store, &streams, r#"{"ProgrammerStatus":"Busy","Msg":"x"}"#);
        assert_eq!(store.snapshot().upload_status, UploadStatus::None);
        assert!(streams.upload_log().borrow().is_empty());
    }

    #[test]
    fn done_passes_through_in_progress() {
        let (store, streams) = setup();
        store.update(|s| s.upload_quota.push(Ticket::new()));
        let mut rx = store.subscribe();

        route(&store, &streams, r#"{"ProgrammerStatus":"Done","Flash":"Ok","Msg":"finished"}"#);

        assert_eq!(rx.try_recv().unwrap().current.upload_status, UploadStatus::InProgress);
        let last = rx.try_recv().unwrap().current;
        assert_eq!(last.upload_status, UploadStatus::Done);
        assert!(last.upload_quota.is_empty());
        assert_eq!(*streams.upload_log().borrow(), "finished\nOk");
    }

    #[test]
    fn upload_status_mapping() {
        let cases = [
            ("Starting", UploadStatus::InProgress),
            ("Busy", UploadStatus::InProgress),
            ("Something new", UploadStatus::InProgress),
            ("Error", UploadStatus::Error),
            ("Killed", UploadStatus::Error),
            ("Error 404 Not Found", UploadStatus::Error),
        ];
        for (wire, expected) in cases {
            let (store, streams) = setup();
            store.update(|s| {
                s.upload_quota.push(Ticket::new());
                s.upload_status = UploadStatus::InProgress;
            });
            route(
                &store,
                &streams,
                &format!(r#"{{"ProgrammerStatus":"{wire}","Msg":"m"}}"#),
            );
            assert_eq!(store.snapshot().upload_status, expected, "wire status {wire}");
        }
    }

    #[test]
    fn monitor_open_close_lifecycle() {
        let (store, streams) = setup();
        let mut closures = streams.subscribe_closures();

        route(&store, &streams, r#"{"Cmd":"Open","Port":"COM3","Baud":115200}"#);
        let snap = store.snapshot();
        assert_eq!(snap.monitor("COM3").unwrap().status, MonitorStatus::Opened);
        assert_eq!(snap.monitor("COM3").unwrap().baud, 115_200);

        store.update(|s| {
            if let Some(m) = s.monitor_mut("COM3") {
                m.status = MonitorStatus::Closing;
            }
        });
        route(&store, &streams, r#"{"Cmd":"CloseFail","Port":"COM3"}"#);
        assert_eq!(store.snapshot().monitor("COM3").unwrap().status, MonitorStatus::Opened);

        store.update(|s| {
            if let Some(m) = s.monitor_mut("COM3") {
                m.status = MonitorStatus::Closing;
            }
        });
        route(&store, &streams, r#"{"Cmd":"Close","Port":"COM3"}"#);
        assert!(store.snapshot().monitor("COM3").is_none());
        assert_eq!(closures.try_recv().unwrap(), (String::from("COM3"), PortClosure::Closed));
    }

    #[test]
    fn unrequested_close_is_a_disconnection() {
        let (store, streams) = setup();
        let mut closures = streams.subscribe_closures();

        route(&store, &streams, r#"{"Cmd":"Open","Port":"COM3","Baud":9600}"#);
        route(&store, &streams, r#"{"Cmd":"Close","Port":"COM3"}"#);
        assert_eq!(closures.try_recv().unwrap(), (String::from("COM3"), PortClosure::Disconnected));

        // Unknown port: nothing to report.
        route(&store, &streams, r#"{"Cmd":"Close","Port":"COM9"}"#);
        assert!(closures.try_recv().is_err());
    }

    #[test]
    fn open_fail_marks_failed_and_notifies_existing_session() {
        let (store, streams) = setup();
        let mut closures = streams.subscribe_closures();
        store.update(|s| {
            s.serial_monitors.push(SerialMonitor {
                port: "COM3".into(),
                baud: 9600,
                status: MonitorStatus::Opening,
            });
        });

        route(&store, &streams, r#"{"Cmd":"OpenFail","Port":"COM3","Baud":9600}"#);
        assert_eq!(store.snapshot().monitor("COM3").unwrap().status, MonitorStatus::Failed);
        assert_eq!(closures.try_recv().unwrap(), (String::from("COM3"), PortClosure::Disconnected));
    }

    #[test]
    fn monitor_data_goes_to_stream() {
        let (store, streams) = setup();
        let mut rx = streams.subscribe_monitor_data();
        route(&store, &streams, r#"{"P":"COM3","D":"hi"}"#);
        let chunk = rx.try_recv().unwrap();
        assert_eq!(chunk.port, "COM3");
        assert_eq!(chunk.data, "hi");
    }
}
