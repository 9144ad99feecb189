use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use models::{ServerListState, ServerRecord};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

pub type ServerListCallback = Arc<dyn Fn() + Send + Sync>;

/// Registration returned by [`ServerListEmitter::subscribe`].
///
/// Not `Clone`: handing it back to `unsubscribe` consumes it, so a
/// registration is removed at most once.
#[must_use = "dropping a subscription handle leaves the callback registered"]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
}

/// Source of the payload-less "server list updated" signal.
pub trait ServerListEmitter: Send + Sync {
    fn subscribe(&self, callback: ServerListCallback) -> Subscription;

    /// Returns whether the registration was still present.
    fn unsubscribe(&self, subscription: Subscription) -> bool;
}

/// Server list kept in memory and persisted inside the database snapshot.
#[derive(Default)]
pub struct InMemoryServerListProvider {
    servers: RwLock<Vec<ServerRecord>>,
    subscribers: Mutex<Vec<(u64, ServerListCallback)>>,
    next_id: AtomicU64,
}

impl InMemoryServerListProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: ServerListState) -> Self {
        Self { servers: RwLock::new(state.servers), ..Self::default() }
    }

    pub fn state(&self) -> ServerListState {
        ServerListState { servers: self.servers.read().clone() }
    }

    pub fn fetch_server_list(&self) -> Vec<ServerRecord> {
        self.servers.read().clone()
    }

    /// Replace the list and notify every subscriber.
    pub fn update_server_list(&self, servers: Vec<ServerRecord>) {
        let count = servers.len();
        *self.servers.write() = servers;
        debug!(servers = count, "server list updated");
        self.notify();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn notify(&self) {
        // callbacks run outside the registry lock so they may read the list or unsubscribe
        let callbacks: Vec<ServerListCallback> =
            self.subscribers.lock().iter().map(|(_, callback)| Arc::clone(callback)).collect();
        for callback in callbacks {
            callback();
        }
    }
}

impl ServerListEmitter for InMemoryServerListProvider {
    fn subscribe(&self, callback: ServerListCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push((id, callback));
        Subscription { id }
    }

    fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != subscription.id);
        subscribers.len() != before
    }
}

impl fmt::Debug for InMemoryServerListProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryServerListProvider")
            .field("servers", &*self.servers.read())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
