// ── Port directory ──

use tracing::debug;

use crate::agent::Agent;
use crate::error::CoreError;
use crate::model::{AgentPort, Ticket, remove_ticket, same_ports};
use crate::store::Waited;

impl Agent {
    /// Ask the agent for its serial ports and wait for the listing.
    ///
    /// Resolves with the new list once it differs from the current one, or
    /// with the current list when nothing changes before the timeout.
    pub async fn refresh_ports(&self) -> Result<Vec<AgentPort>, CoreError> {
        let socket = self.socket()?;
        let store = &self.inner.store;

        let ticket = Ticket::new();
        let id = ticket.id;
        let listed = store.wait_for(
            |prev, next| !same_ports(&prev.ports, &next.ports),
            |s| s.ports.clone(),
            Vec::new(),
            self.inner.config.ports_timeout,
        );
        store.update(|s| s.ports_list_quota.push(ticket));

        if let Err(e) = socket.emit("list") {
            store.update_if(|s| remove_ticket(&mut s.ports_list_quota, id));
            return Err(e);
        }

        let waited = listed.await;
        store.update_if(|s| remove_ticket(&mut s.ports_list_quota, id));

        Ok(match waited {
            Waited::Satisfied(ports) => {
                debug!(count = ports.len(), "port list refreshed");
                ports
            }
            Waited::TimedOut(_) => {
                debug!("port list unchanged");
                self.ports()
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::AgentConfig;
    use crate::test_support::{RecordingSink, attached_agent};

    #[tokio::test]
    async fn requires_a_socket() {
        let agent = Agent::new(AgentConfig::default()).unwrap();
        assert!(matches!(
            agent.refresh_ports().await,
            Err(CoreError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn resolves_with_new_listing() {
        let sink = RecordingSink::default();
        let agent = attached_agent(&sink);

        let responder = agent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            responder.handle_frame(r#"{"Ports":[{"Name":"COM3"},{"Name":"COM4"}],"Network":false}"#);
        });

        let ports = agent.refresh_ports().await.unwrap();
        let names: Vec<_> = ports.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["COM3", "COM4"]);
        assert_eq!(sink.commands(), ["list"]);
        assert!(agent.store().snapshot().ports_list_quota.is_empty());
    }

    #[tokio::test]
    async fn unchanged_listing_times_out_to_current_ports() {
        let agent = attached_agent(&RecordingSink::default());
        agent.store().update(|s| s.ports.push(AgentPort::named("COM3")));

        let ports = agent.refresh_ports().await.unwrap();
        assert_eq!(ports.len(), 1);
        assert!(agent.store().snapshot().ports_list_quota.is_empty());
    }

    #[tokio::test]
    async fn failed_emit_drops_the_ticket() {
        let agent = attached_agent(&RecordingSink::refusing());
        assert!(agent.refresh_ports().await.is_err());
        assert!(agent.store().snapshot().ports_list_quota.is_empty());
    }
}
