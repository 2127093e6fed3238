//! In-process publish/subscribe.
//!
//! Delivery is synchronous: [`EventBus::publish`] calls every listener
//! registered for the event's kind before returning.  Listeners of one kind
//! are called in registration order, but callers should not rely on that.

use crate::auth::{AuthMethod, AuthState};
use crate::gesture::GestureUpdate;

/// Typed payloads carried on the bus.
#[derive(Clone, Debug, PartialEq)]
pub enum CoreEvent {
    /// Emitted once, on the transition into `Online`.
    AuthSuccess { method: AuthMethod },
    /// Latest classifier output, including the explicit idle case.
    GestureUpdate(GestureUpdate),
    StateChanged { new_state: AuthState },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    AuthSuccess,
    GestureUpdate,
    StateChanged,
}

impl CoreEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CoreEvent::AuthSuccess { .. }  => EventKind::AuthSuccess,
            CoreEvent::GestureUpdate(_)    => EventKind::GestureUpdate,
            CoreEvent::StateChanged { .. } => EventKind::StateChanged,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&CoreEvent)>;

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(SubscriptionId, EventKind, Listener)>,
    next_id:   u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&CoreEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, Box::new(listener)));
        id
    }

    /// Returns `false` if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener of its kind.  Returns how many
    /// listeners were called.
    pub fn publish(&mut self, event: &CoreEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for (_, k, listener) in self.listeners.iter_mut() {
            if *k == kind {
                listener(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn publish_all<'a, I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = &'a CoreEvent>,
    {
        events.into_iter().map(|e| self.publish(e)).sum()
    }

    /// Drop every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
