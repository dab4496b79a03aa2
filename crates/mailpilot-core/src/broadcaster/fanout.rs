use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::types::{Notification, SessionEvent};
use crate::state::AgentState;

/// Result returned by observer callbacks
pub type ObserverResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

type StateCallback = Arc<dyn Fn(&AgentState) -> ObserverResult + Send + Sync>;
type MessageCallback = Arc<dyn Fn(&SessionEvent) -> ObserverResult + Send + Sync>;

struct Subscriber {
    id: u64,
    on_state: StateCallback,
    on_message: MessageCallback,
}

struct Inner {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<Notification>,
}

impl Inner {
    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        before != subscribers.len()
    }
}

/// Single-writer, multi-reader fan-out of session state and events.
///
/// Cloning yields another handle to the same subscriber list.
#[derive(Clone)]
pub struct StateBroadcaster {
    inner: Arc<Inner>,
}

impl Default for StateBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl StateBroadcaster {
    /// Create a broadcaster whose async channel buffers `capacity` items
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                sender,
            }),
        }
    }

    /// Register callbacks. Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe<S, M>(&self, on_state: S, on_message: M) -> Subscription
    where
        S: Fn(&AgentState) -> ObserverResult + Send + Sync + 'static,
        M: Fn(&SessionEvent) -> ObserverResult + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers().push(Subscriber {
            id,
            on_state: Arc::new(on_state),
            on_message: Arc::new(on_message),
        });
        debug!(subscriber = id, "Observer subscribed");

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Receive every future notification on an async channel.
    ///
    /// Slow receivers miss items (`RecvError::Lagged`) rather than blocking the
    /// publisher.
    #[must_use]
    pub fn subscribe_channel(&self) -> broadcast::Receiver<Notification> {
        self.inner.sender.subscribe()
    }

    /// Number of callback subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }

    /// Push a state snapshot. Returns how many callbacks succeeded.
    pub fn publish_state(&self, state: &AgentState) -> usize {
        let callbacks: Vec<(u64, StateCallback)> = self
            .inner
            .subscribers()
            .iter()
            .map(|s| (s.id, Arc::clone(&s.on_state)))
            .collect();

        let delivered = deliver(&callbacks, state, "state");
        // send() returns Err if there are no receivers, which is fine
        let _ = self.inner.sender.send(Notification::State(state.clone()));
        delivered
    }

    /// Push a message event. Returns how many callbacks succeeded.
    pub fn publish_message(&self, event: &SessionEvent) -> usize {
        let callbacks: Vec<(u64, MessageCallback)> = self
            .inner
            .subscribers()
            .iter()
            .map(|s| (s.id, Arc::clone(&s.on_message)))
            .collect();

        let delivered = deliver(&callbacks, event, "message");
        let _ = self.inner.sender.send(Notification::Message(event.clone()));
        delivered
    }
}

/// Call each callback in order outside the subscriber lock, so callbacks may
/// subscribe or unsubscribe. Errors and panics are logged and skipped.
fn deliver<T: ?Sized>(
    callbacks: &[(u64, Arc<dyn Fn(&T) -> ObserverResult + Send + Sync>)],
    item: &T,
    channel: &'static str,
) -> usize {
    let mut delivered = 0;
    for (id, callback) in callbacks {
        match catch_unwind(AssertUnwindSafe(|| callback(item))) {
            Ok(Ok(())) => delivered += 1,
            Ok(Err(e)) => warn!(subscriber = id, channel, error = %e, "Observer failed"),
            Err(_) => warn!(subscriber = id, channel, "Observer panicked"),
        }
    }
    delivered
}

/// Handle returned by [`StateBroadcaster::subscribe`]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
    active: bool,
}

impl Subscription {
    /// Subscriber id, as it appears in logs
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving callbacks
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the callbacks registered for the broadcaster's lifetime
    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            if inner.remove(self.id) {
                debug!(subscriber = self.id, "Observer unsubscribed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
