// ── Serial monitor sessions ──
//
// A monitor is a cold stream: polling it runs the guards, sends `open`
// and then yields the port's serial output until the session ends.
// Dropping the stream stops local observation only.

use async_stream::try_stream;
use futures_core::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::config::DEFAULT_BAUD_RATE;
use crate::error::CoreError;
use crate::model::{MonitorData, MonitorEvent, MonitorStatus, PortClosure, SerialMonitor, UploadStatus};
use crate::sink::SocketRef;
use crate::store::OrchestrationState;

/// One step of an open session.
enum Step {
    Data(MonitorData),
    Closed(PortClosure),
    Lagged(u64),
    Skip,
    End,
}

impl Agent {
    /// Open a serial monitor on `port` (default baud 9600).
    ///
    /// The stream yields `Ready` once the agent confirms the open, then
    /// every data chunk addressed to `port`. It ends after a requested
    /// close and fails with `BoardDisconnected` if the port goes away.
    pub fn open_monitor(
        &self,
        port: &str,
        baud: Option<u32>,
    ) -> impl Stream<Item = Result<MonitorEvent, CoreError>> + Send + use<> {
        let agent = self.clone();
        let port = port.to_owned();
        let baud = baud.unwrap_or(DEFAULT_BAUD_RATE);

        try_stream! {
            let store = agent.inner.store.clone();
            let mut data = agent.inner.streams.subscribe_monitor_data();
            let mut closures = agent.inner.streams.subscribe_closures();
            let socket = agent.claim_port(&port, baud)?;

            let watched = port.clone();
            let extracted = port.clone();
            let opened = store.wait_for(
                move |_, next| {
                    next.monitor(&watched)
                        .is_some_and(|m| matches!(m.status, MonitorStatus::Opened | MonitorStatus::Failed))
                },
                move |s| s.monitor(&extracted).map(|m| m.status),
                None,
                agent.inner.config.monitor_open_timeout,
            );

            debug!(port = %port, baud, "opening serial monitor");
            if let Err(e) = socket.emit(&format!("open {port} {baud} timed")) {
                store.update(|s| s.serial_monitors.retain(|m| m.port != port));
                Err(e)?;
            }

            if opened.await.into_inner() != Some(MonitorStatus::Opened) {
                // A timed-out open must not keep the port occupied.
                store.update_if(|s| match s.monitor_mut(&port) {
                    Some(m) if m.status == MonitorStatus::Opening => {
                        m.status = MonitorStatus::Failed;
                        true
                    }
                    _ => false,
                });
                warn!(port = %port, "serial monitor did not open");
                Err(CoreError::MonitorOpenFailed { port: port.clone() })?;
            }

            info!(port = %port, baud, "serial monitor opened");
            yield MonitorEvent::Ready;

            loop {
                let step = tokio::select! {
                    biased;
                    chunk = data.recv() => match chunk {
                        Ok(chunk) => Step::Data(chunk),
                        Err(RecvError::Lagged(skipped)) => Step::Lagged(skipped),
                        Err(RecvError::Closed) => Step::End,
                    },
                    closure = closures.recv() => match closure {
                        Ok((closed, kind)) if closed == port => Step::Closed(kind),
                        Ok(_) => Step::Skip,
                        Err(RecvError::Lagged(skipped)) => Step::Lagged(skipped),
                        Err(RecvError::Closed) => Step::End,
                    },
                };

                match step {
                    Step::Data(chunk) if chunk.port == port => yield MonitorEvent::Data(chunk.data),
                    Step::Data(_) | Step::Skip => {}
                    Step::Lagged(skipped) => warn!(port = %port, skipped, "serial monitor lagged"),
                    Step::Closed(PortClosure::Closed) | Step::End => {
                        info!(port = %port, "serial monitor closed");
                        break;
                    }
                    Step::Closed(PortClosure::Disconnected) => {
                        warn!(port = %port, "board disconnected");
                        Err(CoreError::BoardDisconnected { port: port.clone() })?;
                    }
                }
            }
        }
    }

    /// Ask the agent to close `port` and wait for the entry to go away.
    pub async fn close_monitor(&self, port: &str) -> Result<String, CoreError> {
        let socket = self.socket()?;
        let store = &self.inner.store;

        let watched = port.to_owned();
        let closed = store.wait_for(
            move |_, next| next.monitor(&watched).is_none(),
            |_| (),
            (),
            self.inner.config.monitor_close_timeout,
        );
        store.update_if(|s| match s.monitor_mut(port) {
            Some(m) => {
                m.status = MonitorStatus::Closing;
                true
            }
            None => false,
        });

        debug!(port = %port, "closing serial monitor");
        socket.emit(&format!("close {port}"))?;

        if closed.await.is_satisfied() {
            Ok(port.to_owned())
        } else {
            warn!(port = %port, "serial monitor did not close");
            Err(CoreError::MonitorCloseFailed {
                port: port.to_owned(),
            })
        }
    }

    /// Write `data` to an opened monitor. Fire and forget.
    pub fn send(&self, port: &str, data: &str) -> Result<(), CoreError> {
        let snap = self.inner.store.snapshot();
        let socket = snap.socket.clone().ok_or(CoreError::NotConnected)?;
        if !snap
            .monitor(port)
            .is_some_and(|m| m.status == MonitorStatus::Opened)
        {
            return Err(CoreError::NoOpenMonitor {
                port: port.to_owned(),
            });
        }
        socket.emit(&format!("send {port} {data}"))
    }

    /// Run the open guards and record the `Opening` entry in one store
    /// write, so two opens of the same port cannot both pass.
    fn claim_port(&self, port: &str, baud: u32) -> Result<SocketRef, CoreError> {
        let mut claimed = Err(CoreError::NotConnected);
        self.inner.store.update_if(|s| {
            claimed = check_open_guards(s, port);
            if claimed.is_err() {
                return false;
            }
            s.serial_monitors.retain(|m| m.port != port);
            s.serial_monitors.push(SerialMonitor {
                port: port.to_owned(),
                baud,
                status: MonitorStatus::Opening,
            });
            true
        });
        claimed
    }
}

/// Checks that run before anything is sent to the agent.
fn check_open_guards(state: &OrchestrationState, port: &str) -> Result<SocketRef, CoreError> {
    if state.upload_status == UploadStatus::InProgress {
        return Err(CoreError::UploadInProgress);
    }
    let socket = state.socket.clone().ok_or(CoreError::NotConnected)?;
    let listed = state.port(port).ok_or_else(|| CoreError::PortNotFound {
        port: port.to_owned(),
    })?;
    if listed.is_open || state.has_live_monitor(port) {
        return Err(CoreError::PortAlreadyOpen {
            port: port.to_owned(),
        });
    }
    Ok(socket)
}
