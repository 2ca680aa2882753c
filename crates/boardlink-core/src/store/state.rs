// ── Orchestration state ──
//
// The single mutable root. Never mutated in place: `StateStore::update`
// clones it, applies a closure and swaps the result in.

use crate::model::{
    AgentInfo, AgentPort, MonitorStatus, ProtocolConfig, SerialMonitor, Ticket, UploadStatus,
};
use crate::sink::SocketRef;

#[derive(Debug, Clone)]
pub struct OrchestrationState {
    /// Negotiated protocol and v2 capability. Written only by discovery.
    pub config: ProtocolConfig,
    /// Validated agent descriptor; `None` means not connected.
    pub agent_info: Option<AgentInfo>,
    /// The open socket, owned by the session manager.
    pub socket: Option<SocketRef>,
    /// `None` unknown, then driven by socket lifecycle events.
    pub socket_connected: Option<bool>,
    pub ports: Vec<AgentPort>,
    pub network_ports: Vec<AgentPort>,
    pub serial_monitors: Vec<SerialMonitor>,
    pub upload_status: UploadStatus,
    pub download_quota: Vec<Ticket>,
    pub upload_quota: Vec<Ticket>,
    pub ports_list_quota: Vec<Ticket>,
    /// Set once the first discovery attempt has finished.
    pub searched_for_agent: bool,
}

impl Default for OrchestrationState {
    fn default() -> Self {
        Self {
            config: ProtocolConfig::default(),
            agent_info: None,
            socket: None,
            socket_connected: Some(false),
            ports: Vec::new(),
            network_ports: Vec::new(),
            serial_monitors: Vec::new(),
            upload_status: UploadStatus::None,
            download_quota: Vec::new(),
            upload_quota: Vec::new(),
            ports_list_quota: Vec::new(),
            searched_for_agent: false,
        }
    }
}

impl OrchestrationState {
    pub fn port(&self, name: &str) -> Option<&AgentPort> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn monitor(&self, port: &str) -> Option<&SerialMonitor> {
        self.serial_monitors.iter().find(|m| m.port == port)
    }

    pub fn monitor_mut(&mut self, port: &str) -> Option<&mut SerialMonitor> {
        self.serial_monitors.iter_mut().find(|m| m.port == port)
    }

    /// A session that still occupies the port (anything but `failed`).
    pub fn has_live_monitor(&self, port: &str) -> bool {
        self.monitor(port)
            .is_some_and(|m| m.status != MonitorStatus::Failed)
    }

    pub fn is_socket_connected(&self) -> bool {
        self.socket_connected == Some(true)
    }

    /// Drop everything tied to the current agent session. Port lists and
    /// `searched_for_agent` survive; they describe the machine, not the
    /// connection.
    pub fn clear_session(&mut self) {
        self.config = ProtocolConfig::default();
        self.agent_info = None;
        self.socket = None;
        self.socket_connected = Some(false);
        self.serial_monitors.clear();
        self.upload_status = UploadStatus::None;
        self.download_quota.clear();
        self.upload_quota.clear();
        self.ports_list_quota.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_disconnected() {
        let state = OrchestrationState::default();
        assert_eq!(state.socket_connected, Some(false));
        assert!(state.agent_info.is_none());
        assert!(!state.searched_for_agent);
    }

    #[test]
    fn failed_monitor_does_not_occupy_port() {
        let mut state = OrchestrationState::default();
        state.serial_monitors.push(SerialMonitor {
            port: "COM3".into(),
            baud: 9600,
            status: MonitorStatus::Failed,
        });
        assert!(!state.has_live_monitor("COM3"));

        if let Some(m) = state.monitor_mut("COM3") {
            m.status = MonitorStatus::Opened;
        }
        assert!(state.has_live_monitor("COM3"));
    }

    #[test]
    fn clear_session_keeps_port_lists() {
        let mut state = OrchestrationState {
            ports: vec![AgentPort::named("COM3")],
            agent_info: Some(AgentInfo::default()),
            searched_for_agent: true,
            upload_quota: vec![Ticket::new()],
            ..OrchestrationState::default()
        };
        state.clear_session();
        assert_eq!(state.ports.len(), 1);
        assert!(state.searched_for_agent);
        assert!(state.agent_info.is_none());
        assert!(state.upload_quota.is_empty());
    }
}
