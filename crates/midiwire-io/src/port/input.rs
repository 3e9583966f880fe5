//! Inbound port: decode, then fan out to listeners.

use super::{ConnectionState, PortInfo, PortMeta, PortState};
use crate::error::Result;
use midiwire_proto::{
    decode, listener, ChannelSpec, Clock, Event, EventType, Listener, ListenerRegistry,
};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A source of MIDI events with its own listener registry.
///
/// Listeners run on the caller of [`receive`](Self::receive), after the
/// registry lock has been released, so they may add or remove listeners on
/// the same port.
pub struct InputPort {
    meta: PortMeta,
    clock: Arc<dyn Clock>,
    registry: RwLock<ListenerRegistry>,
}

impl fmt::Debug for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputPort")
            .field("meta", &self.meta)
            .field("listeners", &self.registry.read().listener_count())
            .finish()
    }
}

impl InputPort {
    pub(crate) fn new(meta: PortMeta, clock: Arc<dyn Clock>) -> Self {
        Self {
            meta,
            clock,
            registry: RwLock::new(ListenerRegistry::new()),
        }
    }

    pub fn id(&self) -> &str {
        self.meta.id()
    }

    pub fn name(&self) -> &str {
        self.meta.name()
    }

    pub fn manufacturer(&self) -> &str {
        self.meta.manufacturer()
    }

    pub fn state(&self) -> PortState {
        self.meta.state()
    }

    pub fn connection(&self) -> ConnectionState {
        self.meta.connection()
    }

    pub fn info(&self) -> PortInfo {
        self.meta.info()
    }

    pub(crate) fn meta(&self) -> &PortMeta {
        &self.meta
    }

    // ==================== Receiving ====================

    /// Decodes one message that arrived at `timestamp` (milliseconds) and
    /// delivers it to the matching listeners in registration order.
    ///
    /// Returns the decoded event. A closed port still decodes but delivers
    /// nothing.
    pub fn receive(&self, bytes: &[u8], timestamp: f64) -> Event {
        let event = decode(bytes, timestamp);
        if self.meta.connection() == ConnectionState::Closed {
            trace!("Input port {} closed, not dispatching", self.meta.id());
            return event;
        }

        let listeners = self.registry.read().listeners(&event);
        for listener in &listeners {
            listener(&event);
        }
        event
    }

    /// Like [`receive`](Self::receive), stamped with the port's clock.
    pub fn receive_now(&self, bytes: &[u8]) -> Event {
        self.receive(bytes, self.clock.now_ms())
    }

    // ==================== Listeners ====================

    pub fn add_listener(
        &self,
        event_type: EventType,
        channels: &ChannelSpec,
        listener: Listener,
    ) -> Result<()> {
        Ok(self
            .registry
            .write()
            .add_listener(event_type, channels, listener)?)
    }

    /// Registers a closure for an event type given by name and returns the
    /// handle needed to remove it later.
    pub fn on<F>(&self, event_type: &str, channels: &ChannelSpec, f: F) -> Result<Listener>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let event_type: EventType = event_type.parse()?;
        let handle = listener(f);
        self.add_listener(event_type, channels, handle.clone())?;
        Ok(handle)
    }

    /// See [`ListenerRegistry::remove_listener`].
    pub fn remove_listener(
        &self,
        event_type: Option<EventType>,
        channels: &ChannelSpec,
        listener: Option<&Listener>,
    ) -> Result<()> {
        Ok(self
            .registry
            .write()
            .remove_listener(event_type, channels, listener)?)
    }

    pub fn has_listener(
        &self,
        event_type: EventType,
        channels: &ChannelSpec,
        listener: &Listener,
    ) -> bool {
        self.registry
            .read()
            .has_listener(event_type, channels, listener)
    }

    pub fn listener_count(&self) -> usize {
        self.registry.read().listener_count()
    }

    // ==================== Lifecycle ====================

    pub fn open(&self) {
        self.meta.set_connection(ConnectionState::Open);
    }

    /// Stops delivery to listeners. Registrations are kept.
    pub fn close(&self) {
        self.meta.set_connection(ConnectionState::Closed);
    }
}
