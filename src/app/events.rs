// LaneWatch - app/events.rs
//
// Fan-out of violation events to any number of listeners.
//
// Listeners are plain callbacks registered with `subscribe` and removed with
// `unsubscribe`. `subscribe_channel` adapts the callback model to an mpsc
// receiver for consumers that prefer polling.
//
// Publishing with zero listeners is a no-op. Listeners are invoked inline on
// the publishing lane's worker thread, outside the registry lock, in
// registration order.

use crate::core::model::Violation;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};

/// Callback invoked for every published violation.
pub type Listener = Arc<dyn Fn(&Violation) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Thread-safe listener registry. Cloning yields another handle to the same
/// registry.
#[derive(Clone, Default)]
pub struct ViolationBus {
    listeners: Arc<Mutex<Vec<(ListenerId, Listener)>>>,
    next_id: Arc<AtomicU64>,
}

impl ViolationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It receives every violation published after this
    /// call returns.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Violation) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        tracing::debug!(listener = id.0, "Listener subscribed");
        id
    }

    /// Register a channel listener and return its receiving end.
    ///
    /// The listener stays registered after the receiver is dropped; sends to
    /// a closed channel are ignored. Call `unsubscribe` with the returned id
    /// to remove it.
    pub fn subscribe_channel(&self) -> (ListenerId, mpsc::Receiver<Violation>) {
        let (tx, rx) = mpsc::channel();
        let id = self.subscribe(move |violation| {
            let _ = tx.send(violation.clone());
        });
        (id, rx)
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() != before;
        if removed {
            tracing::debug!(listener = id.0, "Listener unsubscribed");
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    /// Deliver `violation` to every registered listener.
    pub fn publish(&self, violation: &Violation) {
        self.deliver(violation, None);
    }

    /// As [`publish`](Self::publish), but stops before the next listener
    /// once `halt` is set. A listener that sets it (by stopping the lane it
    /// runs on) is the last one to see this violation.
    pub(crate) fn publish_unless_halted(&self, violation: &Violation, halt: &AtomicBool) {
        self.deliver(violation, Some(halt));
    }

    fn deliver(&self, violation: &Violation, halt: Option<&AtomicBool>) {
        // Snapshot so a listener may (un)subscribe without deadlocking.
        let snapshot: Vec<Listener> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            if halt.is_some_and(|h| h.load(Ordering::SeqCst)) {
                return;
            }
            listener(violation);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        // A panicking listener cannot leave the Vec half-updated.
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ViolationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViolationBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
