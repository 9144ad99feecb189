use std::sync::Arc;

use tracing::debug;

use crate::server_list::{ServerListEmitter, Subscription};

/// Observer registration that runs `on_change` for every server-list update.
///
/// The bridge only borrows the emitter for registration; it owns the
/// subscription handle and removes it on `detach` or drop.
pub struct ChangeNotifierBridge {
    emitter: Arc<dyn ServerListEmitter>,
    subscription: Option<Subscription>,
}

impl ChangeNotifierBridge {
    pub fn attach<F>(emitter: Arc<dyn ServerListEmitter>, on_change: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let subscription = emitter.subscribe(Arc::new(on_change));
        Self { emitter, subscription: Some(subscription) }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Remove the registration. Returns `false` if it was already gone.
    pub fn detach(&mut self) -> bool {
        match self.subscription.take() {
            Some(subscription) => {
                let removed = self.emitter.unsubscribe(subscription);
                debug!(removed, "server list subscription detached");
                removed
            }
            None => false,
        }
    }
}

impl Drop for ChangeNotifierBridge {
    fn drop(&mut self) {
        self.detach();
    }
}
