// ── State export ──
//
// A plain serde snapshot for handing state to another process or window.
// Live handles never leave: no socket, liveness unknown, and the upload
// and port-list tickets (which only make sense to this process's waits)
// are dropped.

use serde::{Deserialize, Serialize};

use super::reactive::StateStore;
use super::state::OrchestrationState;
use crate::model::{AgentInfo, AgentPort, ProtocolConfig, SerialMonitor, Ticket, UploadStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedState {
    pub config: ProtocolConfig,
    pub agent_info: Option<AgentInfo>,
    pub socket_connected: Option<bool>,
    pub ports: Vec<AgentPort>,
    pub network_ports: Vec<AgentPort>,
    pub serial_monitors: Vec<SerialMonitor>,
    pub upload_status: UploadStatus,
    pub download_quota: Vec<Ticket>,
    pub upload_quota: Vec<Ticket>,
    pub ports_list_quota: Vec<Ticket>,
    pub searched_for_agent: bool,
}

impl From<&OrchestrationState> for ExportedState {
    fn from(state: &OrchestrationState) -> Self {
        Self {
            config: state.config,
            agent_info: state.agent_info.clone(),
            socket_connected: None,
            ports: state.ports.clone(),
            network_ports: state.network_ports.clone(),
            serial_monitors: state.serial_monitors.clone(),
            upload_status: state.upload_status,
            download_quota: state.download_quota.clone(),
            upload_quota: Vec::new(),
            ports_list_quota: Vec::new(),
            searched_for_agent: state.searched_for_agent,
        }
    }
}

impl From<ExportedState> for OrchestrationState {
    fn from(exported: ExportedState) -> Self {
        Self {
            config: exported.config,
            agent_info: exported.agent_info,
            socket: None,
            socket_connected: exported.socket_connected,
            ports: exported.ports,
            network_ports: exported.network_ports,
            serial_monitors: exported.serial_monitors,
            upload_status: exported.upload_status,
            download_quota: exported.download_quota,
            upload_quota: exported.upload_quota,
            ports_list_quota: exported.ports_list_quota,
            searched_for_agent: exported.searched_for_agent,
        }
    }
}

impl StateStore {
    /// Serializable copy of the current state with live handles stripped.
    pub fn export(&self) -> ExportedState {
        ExportedState::from(self.snapshot().as_ref())
    }

    /// A new store seeded from an exported snapshot.
    pub fn from_exported(exported: ExportedState) -> Self {
        Self::with_state(exported.into())
    }
}
