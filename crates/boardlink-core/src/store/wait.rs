// ── Condition wait ──
//
// The only way operations suspend on the agent: subscribe, send a command,
// then await the first state transition that satisfies a predicate.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::reactive::StateStore;
use super::state::OrchestrationState;

/// Outcome of a condition wait. Timing out is data, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waited<T> {
    Satisfied(T),
    TimedOut(T),
}

impl<T> Waited<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Satisfied(v) | Self::TimedOut(v) => v,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Waited<U> {
        match self {
            Self::Satisfied(v) => Waited::Satisfied(f(v)),
            Self::TimedOut(v) => Waited::TimedOut(f(v)),
        }
    }
}

impl StateStore {
    /// Wait for `predicate(previous, current)` to hold.
    ///
    /// Subscribes immediately, before the returned future is polled, so a
    /// caller can create the wait, emit a command and then await without
    /// missing the response. The snapshot at call time is checked first as
    /// `predicate(current, current)`. Resolves with `extract(state)` for the
    /// satisfying state, or `timeout_value` once `timeout` elapses.
    pub fn wait_for<T, P, E>(
        &self,
        predicate: P,
        extract: E,
        timeout_value: T,
        timeout: Duration,
    ) -> impl Future<Output = Waited<T>> + Send + use<T, P, E>
    where
        T: Send + 'static,
        P: Fn(&OrchestrationState, &OrchestrationState) -> bool + Send + 'static,
        E: Fn(&OrchestrationState) -> T + Send + 'static,
    {
        let mut changes = self.subscribe();
        let initial = self.snapshot();
        let store = self.clone();

        async move {
            if predicate(&initial, &initial) {
                return Waited::Satisfied(extract(&initial));
            }
            drop(initial);

            let deadline = tokio::time::sleep(timeout);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    () = &mut deadline => {
                        debug!(timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX), "condition wait timed out");
                        return Waited::TimedOut(timeout_value);
                    }
                    change = changes.recv() => match change {
                        Ok(change) => {
                            if predicate(&change.previous, &change.current) {
                                return Waited::Satisfied(extract(&change.current));
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "condition wait lagged, re-checking current state");
                            let now = store.snapshot();
                            if predicate(&now, &now) {
                                return Waited::Satisfied(extract(&now));
                            }
                        }
                        Err(RecvError::Closed) => return Waited::TimedOut(timeout_value),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{AgentPort, UploadStatus};

    #[tokio::test(start_paused = true)]
    async fn never_satisfied_resolves_to_default_after_timeout() {
        let store = StateStore::new();
        let started = tokio::time::Instant::now();

        let waited = store
            .wait_for(|_, _| false, |_| 1, 42, Duration::from_secs(5))
            .await;

        assert_eq!(waited, Waited::TimedOut(42));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn already_true_resolves_immediately() {
        let store = StateStore::new();
        store.update(|s| s.upload_status = UploadStatus::Done);

        let waited = store
            .wait_for(
                |_, next| next.upload_status.is_terminal(),
                |s| s.upload_status,
                UploadStatus::Error,
                Duration::from_secs(60),
            )
            .await;

        assert_eq!(waited, Waited::Satisfied(UploadStatus::Done));
    }

    #[tokio::test]
    async fn subscription_is_eager() {
        let store = StateStore::new();

        // Created before the mutation, awaited after it.
        let wait = store.wait_for(
            |prev, next| prev.ports.is_empty() && !next.ports.is_empty(),
            |s| s.ports.len(),
            0,
            Duration::from_secs(60),
        );
        store.update(|s| s.ports.push(AgentPort::named("COM3")));

        assert_eq!(wait.await, Waited::Satisfied(1));
    }

    #[tokio::test]
    async fn resolves_on_first_matching_transition() {
        let store = StateStore::new();
        let wait = store.wait_for(
            |_, next| next.ports.len() >= 2,
            |s| s.ports.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
            Vec::new(),
            Duration::from_secs(60),
        );

        let writer = store.clone();
        tokio::spawn(async move {
            writer.update(|s| s.ports.push(AgentPort::named("A")));
            writer.update(|s| s.ports.push(AgentPort::named("B")));
            writer.update(|s| s.ports.push(AgentPort::named("C")));
        });

        assert_eq!(wait.await.into_inner(), vec!["A".to_owned(), "B".to_owned()]);
    }

    #[test]
    fn waited_helpers() {
        let w = Waited::TimedOut(3);
        assert!(w.is_timed_out());
        assert_eq!(w.map(|v| v * 2), Waited::TimedOut(6));
        assert!(Waited::Satisfied(()).is_satisfied());
    }
}
