// ── Reactive state store ──
//
// Wait-free reads through `ArcSwap`, a single writer lock, and a
// broadcast of `(previous, current)` pairs sent while the lock is held so
// subscribers observe mutations in the order they were applied.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tokio::sync::broadcast;

use super::state::OrchestrationState;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// One applied mutation.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub previous: Arc<OrchestrationState>,
    pub current: Arc<OrchestrationState>,
}

/// Process-wide snapshot store. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct StateStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    current: ArcSwap<OrchestrationState>,
    writer: Mutex<()>,
    changes: broadcast::Sender<StateChange>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::with_state(OrchestrationState::default())
    }

    pub fn with_state(state: OrchestrationState) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                current: ArcSwap::from_pointee(state),
                writer: Mutex::new(()),
                changes,
            }),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<OrchestrationState> {
        self.inner.current.load_full()
    }

    /// Receive every subsequent change.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.changes.subscribe()
    }

    /// Apply `f` to a copy of the state, swap it in and broadcast.
    pub fn update<R>(&self, f: impl FnOnce(&mut OrchestrationState) -> R) -> R {
        self.apply(f, true)
    }

    /// Like [`update`](Self::update) but without notifying subscribers.
    pub fn update_silently<R>(&self, f: impl FnOnce(&mut OrchestrationState) -> R) -> R {
        self.apply(f, false)
    }

    /// Apply `f`; keep and broadcast the result only if it returns `true`.
    pub fn update_if(&self, f: impl FnOnce(&mut OrchestrationState) -> bool) -> bool {
        let _guard = self.inner.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.inner.current.load_full();
        let mut next = (*previous).clone();
        if !f(&mut next) {
            return false;
        }

        let current = Arc::new(next);
        self.inner.current.store(Arc::clone(&current));
        let _ = self.inner.changes.send(StateChange { previous, current });
        true
    }

    /// Clear the agent session, keeping port lists.
    pub fn reset(&self) {
        self.update(OrchestrationState::clear_session);
    }

    fn apply<R>(&self, f: impl FnOnce(&mut OrchestrationState) -> R, broadcast: bool) -> R {
        let _guard = self.inner.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.inner.current.load_full();
        let mut next = (*previous).clone();
        let out = f(&mut next);

        let current = Arc::new(next);
        self.inner.current.store(Arc::clone(&current));
        if broadcast {
            // No subscribers is fine.
            let _ = self.inner.changes.send(StateChange { previous, current });
        }
        out
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{AgentPort, UploadStatus};

    #[test]
    fn update_broadcasts_previous_and_current() {
        let store = StateStore::new();
        let mut rx = store.subscribe();

        store.update(|s| s.ports.push(AgentPort::named("COM3")));

        let change = rx.try_recv().unwrap();
        assert!(change.previous.ports.is_empty());
        assert_eq!(change.current.ports.len(), 1);
        assert_eq!(store.snapshot().ports.len(), 1);
    }

    #[test]
    fn changes_arrive_in_mutation_order() {
        let store = StateStore::new();
        let mut rx = store.subscribe();

        store.update(|s| s.upload_status = UploadStatus::InProgress);
        store.update(|s| s.upload_status = UploadStatus::Done);

        assert_eq!(rx.try_recv().unwrap().current.upload_status, UploadStatus::InProgress);
        assert_eq!(rx.try_recv().unwrap().current.upload_status, UploadStatus::Done);
    }

    #[test]
    fn silent_and_rejected_updates_do_not_broadcast() {
        let store = StateStore::new();
        let mut rx = store.subscribe();

        store.update_silently(|s| s.searched_for_agent = true);
        assert!(store.snapshot().searched_for_agent);

        let applied = store.update_if(|s| {
            s.ports.push(AgentPort::named("COM9"));
            false
        });
        assert!(!applied);
        assert!(store.snapshot().ports.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clones_share_state() {
        let store = StateStore::new();
        let other = store.clone();
        other.update(|s| s.searched_for_agent = true);
        assert!(store.snapshot().searched_for_agent);
    }
}
