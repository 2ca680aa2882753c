// ── Agent event streams ──
//
// Side channels that carry data rather than state: serial output, port
// closures and upload log lines. Kept outside `OrchestrationState` so
// high-volume serial traffic never clones the state root.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::model::{MonitorData, PortClosure};

const MONITOR_CHANNEL_CAPACITY: usize = 1024;
const CLOSURE_CHANNEL_CAPACITY: usize = 64;
const UPLOAD_CHANNEL_CAPACITY: usize = 256;

/// Shared broadcast hub. Cheap to clone; clones share channels.
#[derive(Debug, Clone)]
pub struct AgentStreams {
    inner: Arc<StreamsInner>,
}

#[derive(Debug)]
struct StreamsInner {
    monitor_data: broadcast::Sender<MonitorData>,
    closures: broadcast::Sender<(String, PortClosure)>,
    upload_messages: broadcast::Sender<String>,
    upload_log: watch::Sender<String>,
}

impl AgentStreams {
    pub fn new() -> Self {
        let (monitor_data, _) = broadcast::channel(MONITOR_CHANNEL_CAPACITY);
        let (closures, _) = broadcast::channel(CLOSURE_CHANNEL_CAPACITY);
        let (upload_messages, _) = broadcast::channel(UPLOAD_CHANNEL_CAPACITY);
        let (upload_log, _) = watch::channel(String::new());

        Self {
            inner: Arc::new(StreamsInner {
                monitor_data,
                closures,
                upload_messages,
                upload_log,
            }),
        }
    }

    // ── Serial monitor ───────────────────────────────────────────────

    /// Every data chunk, for every port.
    pub fn subscribe_monitor_data(&self) -> broadcast::Receiver<MonitorData> {
        self.inner.monitor_data.subscribe()
    }

    pub(crate) fn push_monitor_data(&self, chunk: MonitorData) {
        let _ = self.inner.monitor_data.send(chunk);
    }

    /// Session endings, keyed by port.
    pub fn subscribe_closures(&self) -> broadcast::Receiver<(String, PortClosure)> {
        self.inner.closures.subscribe()
    }

    pub(crate) fn notify_closure(&self, port: &str, closure: PortClosure) {
        let _ = self.inner.closures.send((port.to_owned(), closure));
    }

    // ── Upload log ───────────────────────────────────────────────────

    /// Upload messages as they arrive.
    pub fn subscribe_upload_messages(&self) -> broadcast::Receiver<String> {
        self.inner.upload_messages.subscribe()
    }

    /// Upload messages as a stream. Skips over lag instead of failing.
    pub fn upload_message_stream(&self) -> impl Stream<Item = String> + Send + use<> {
        BroadcastStream::new(self.inner.upload_messages.subscribe()).filter_map(|msg| match msg {
            Ok(line) => Some(line),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "upload log lagged");
                None
            }
        })
    }

    /// The accumulated upload log, one message per line.
    pub fn upload_log(&self) -> watch::Receiver<String> {
        self.inner.upload_log.subscribe()
    }

    pub fn clear_upload_log(&self) {
        self.inner.upload_log.send_replace(String::new());
    }

    pub(crate) fn push_upload_message(&self, message: &str) {
        let _ = self.inner.upload_messages.send(message.to_owned());
        self.inner.upload_log.send_modify(|log| {
            if !log.is_empty() {
                log.push('\n');
            }
            log.push_str(message);
        });
    }
}

impl Default for AgentStreams {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upload_log_accumulates_and_clears() {
        let streams = AgentStreams::new();
        let log = streams.upload_log();
        let mut live = streams.subscribe_upload_messages();

        streams.push_upload_message("Starting upload");
        streams.push_upload_message("Flashing 24%");

        assert_eq!(*log.borrow(), "Starting upload\nFlashing 24%");
        assert_eq!(live.try_recv().unwrap(), "Starting upload");

        streams.clear_upload_log();
        assert!(log.borrow().is_empty());
    }

    #[tokio::test]
    async fn upload_message_stream_skips_lag() {
        let streams = AgentStreams::new();
        let mut messages = std::pin::pin!(streams.upload_message_stream());

        for i in 0..UPLOAD_CHANNEL_CAPACITY + 4 {
            streams.push_upload_message(&format!("line {i}"));
        }

        assert_eq!(messages.next().await.unwrap(), "line 4");
    }
}
