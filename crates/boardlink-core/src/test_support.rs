// Shared fakes for unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::error::CoreError;
use crate::sink::CommandSink;

/// Records every emitted command; optionally refuses them all.
#[derive(Debug, Default, Clone)]
pub(crate) struct RecordingSink {
    commands: Arc<Mutex<Vec<String>>>,
    refuse: bool,
}

impl RecordingSink {
    pub(crate) fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CommandSink for RecordingSink {
    fn emit(&self, command: &str) -> Result<(), CoreError> {
        if self.refuse {
            return Err(CoreError::NotConnected);
        }
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.to_owned());
        }
        Ok(())
    }
}

/// An agent with short timeouts and a recording socket attached.
pub(crate) fn attached_agent(sink: &RecordingSink) -> Agent {
    let agent = Agent::new(AgentConfig {
        ports_timeout: Duration::from_millis(200),
        download_timeout: Duration::from_millis(300),
        upload_timeout: Duration::from_millis(300),
        monitor_open_timeout: Duration::from_millis(200),
        monitor_close_timeout: Duration::from_millis(200),
        ..AgentConfig::default()
    })
    .unwrap_or_else(|e| panic!("agent: {e}"));
    agent.attach_socket(sink.clone());
    agent
}
