//! Change notifications published by the [`DriverBridge`](crate::bridge::DriverBridge).
//!
//! Front-ends subscribe to the event kinds they care about.  Delivery is
//! synchronous: [`EventBus::notify`] calls every matching handler on the
//! calling thread, in the order the handlers were registered, before it
//! returns.

use std::fmt;

/// A notification emitted by the bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverEvent {
    /// The connection status was re-read from the state channel.
    DeviceConnected(bool),
    /// The display distance was written to the driver.
    DisplayDistanceChanged(f64),
    /// Widescreen mode was written to the driver.
    WidescreenModeChanged(bool),
}

impl DriverEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DriverEvent::DeviceConnected(_) => EventKind::DeviceConnected,
            DriverEvent::DisplayDistanceChanged(_) => EventKind::DisplayDistanceChanged,
            DriverEvent::WidescreenModeChanged(_) => EventKind::WidescreenModeChanged,
        }
    }
}

/// Discriminant of [`DriverEvent`], used to pick what to subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DeviceConnected,
    DisplayDistanceChanged,
    WidescreenModeChanged,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::DeviceConnected => write!(f, "device-connected"),
            EventKind::DisplayDistanceChanged => write!(f, "display-distance-changed"),
            EventKind::WidescreenModeChanged => write!(f, "widescreen-mode-changed"),
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&DriverEvent)>;

/// Registry of event handlers.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(SubscriptionId, EventKind, Handler)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&DriverEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, kind, Box::new(handler)));
        id
    }

    /// Remove a handler.  Returns `false` if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _, _)| *h != id);
        self.handlers.len() != before
    }

    /// Deliver `event` to every handler subscribed to its kind.
    pub fn notify(&mut self, event: &DriverEvent) {
        let kind = event.kind();
        for (_, k, handler) in self.handlers.iter_mut() {
            if *k == kind {
                handler(event);
            }
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
