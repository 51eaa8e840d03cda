//! Session change publisher.
//!
//! Backends keep the client-side session in a [`ClientSession`] and push
//! every change through [`AuthEvents`]. Subscribers receive each change
//! exactly once, synchronously, in subscription order. A [`Subscription`]
//! removes its listener when dropped.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::model::{AuthEvent, Session};

/// Callback invoked on every session change.
pub type AuthListener = Arc<dyn Fn(AuthEvent, Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, AuthListener)>,
}

/// Publisher of session change notifications.
#[derive(Clone, Default)]
pub struct AuthEvents {
    listeners: Arc<Mutex<Listeners>>,
}

impl AuthEvents {
    /// Create a publisher with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned
    /// handle is dropped.
    pub fn subscribe(&self, listener: AuthListener) -> Subscription {
        let mut listeners = self.listeners.lock();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, listener));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver a change to every current listener.
    ///
    /// Returns the number of listeners notified. Listeners run outside the
    /// registry lock, so they may subscribe or unsubscribe themselves.
    pub fn publish(&self, event: AuthEvent, session: Option<&Session>) -> usize {
        let snapshot: Vec<AuthListener> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        debug!(?event, listeners = snapshot.len(), "Publishing auth event");
        for listener in &snapshot {
            listener(event, session);
        }
        snapshot.len()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }
}

impl std::fmt::Debug for AuthEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEvents")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle of a registered listener.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Client-side session holder shared by the backends.
#[derive(Debug, Default)]
pub struct ClientSession {
    current: RwLock<Option<Session>>,
    events: AuthEvents,
}

impl ClientSession {
    /// Create an empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored session, if any.
    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Access token of the stored session.
    pub fn access_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.access_token.clone())
    }

    /// Store a session (or none) and notify subscribers.
    pub fn replace(&self, event: AuthEvent, session: Option<Session>) {
        *self.current.write() = session.clone();
        self.events.publish(event, session.as_ref());
    }

    /// Forget the stored session without notifying anyone.
    pub fn clear_local(&self) {
        *self.current.write() = None;
    }

    /// Publisher for this holder.
    pub fn events(&self) -> &AuthEvents {
        &self.events
    }
}
