//! Listener registry keyed by event type and channel.
//!
//! Channel-scoped kinds get one list per channel; device-wide kinds get a
//! single list. Both tables are fixed-size, indexed by
//! [`EventType::channel_index`] / [`EventType::system_index`] and the
//! zero-based channel.

use crate::channel::ChannelSpec;
use crate::error::Result;
use crate::event::{Event, EventType};
use crate::tables::MIDI_CHANNEL_COUNT;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const CHANNEL_KINDS: usize = EventType::CHANNEL.len();
const SYSTEM_KINDS: usize = EventType::SYSTEM.len();
const CHANNELS: usize = MIDI_CHANNEL_COUNT as usize;

/// Shared event callback. Identity is pointer identity of the `Arc`.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Wraps a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Listeners due for one event, in registration order.
pub type ListenerSnapshot = SmallVec<[Listener; 4]>;

fn prune(list: &mut Vec<Listener>, listener: Option<&Listener>) {
    match listener {
        Some(target) => list.retain(|l| !Arc::ptr_eq(l, target)),
        None => list.clear(),
    }
}

pub struct ListenerRegistry {
    channel: [[Vec<Listener>; CHANNELS]; CHANNEL_KINDS],
    system: [Vec<Listener>; SYSTEM_KINDS],
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            channel: std::array::from_fn(|_| std::array::from_fn(|_| Vec::new())),
            system: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Registers `listener` for `event_type`.
    ///
    /// The channel spec is validated for every kind but only used by
    /// channel-scoped kinds, which get the listener appended on each channel.
    pub fn add_listener(
        &mut self,
        event_type: EventType,
        channels: &ChannelSpec,
        listener: Listener,
    ) -> Result<()> {
        let channels = channels.expand()?;
        match (event_type.channel_index(), event_type.system_index()) {
            (Some(row), _) => {
                for ch in &channels {
                    self.channel[row][ch.index()].push(listener.clone());
                }
                debug!("Added {} listener on {} channel(s)", event_type, channels.len());
            }
            (None, Some(row)) => {
                self.system[row].push(listener);
                debug!("Added {} listener", event_type);
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// Like [`add_listener`](Self::add_listener) with the type given by name.
    pub fn add_listener_by_name(
        &mut self,
        event_type: &str,
        channels: &ChannelSpec,
        listener: Listener,
    ) -> Result<()> {
        self.add_listener(event_type.parse()?, channels, listener)
    }

    /// Removes listeners.
    ///
    /// - `event_type = None` drops every listener of every kind.
    /// - `listener = None` clears the lists for the type on the given channels.
    /// - Otherwise every occurrence of `listener` is removed.
    pub fn remove_listener(
        &mut self,
        event_type: Option<EventType>,
        channels: &ChannelSpec,
        listener: Option<&Listener>,
    ) -> Result<()> {
        let Some(event_type) = event_type else {
            *self = Self::new();
            debug!("Removed all listeners");
            return Ok(());
        };

        let channels = channels.expand()?;
        match (event_type.channel_index(), event_type.system_index()) {
            (Some(row), _) => {
                for ch in &channels {
                    prune(&mut self.channel[row][ch.index()], listener);
                }
            }
            (None, Some(row)) => prune(&mut self.system[row], listener),
            (None, None) => {}
        }
        debug!("Removed {} listener(s)", event_type);
        Ok(())
    }

    /// For device-wide kinds, whether the listener is registered. For
    /// channel-scoped kinds, whether it is registered on every given channel.
    /// An invalid channel spec has no listeners.
    pub fn has_listener(
        &self,
        event_type: EventType,
        channels: &ChannelSpec,
        listener: &Listener,
    ) -> bool {
        let contains = |list: &Vec<Listener>| list.iter().any(|l| Arc::ptr_eq(l, listener));
        match (event_type.channel_index(), event_type.system_index()) {
            (Some(row), _) => match channels.expand() {
                Ok(channels) => channels
                    .iter()
                    .all(|ch| contains(&self.channel[row][ch.index()])),
                Err(_) => false,
            },
            (None, Some(row)) => contains(&self.system[row]),
            (None, None) => false,
        }
    }

    /// The listeners an event would be delivered to, in registration order.
    pub fn listeners(&self, event: &Event) -> ListenerSnapshot {
        let event_type = event.event_type();
        let list = match (event.channel(), event_type.channel_index()) {
            (Some(ch), Some(row)) => &self.channel[row][ch.index()],
            _ => match event_type.system_index() {
                Some(row) => &self.system[row],
                None => return SmallVec::new(),
            },
        };
        list.iter().cloned().collect()
    }

    /// Invokes the event's listeners synchronously, in registration order.
    ///
    /// A panicking listener unwinds through here and skips the rest.
    pub fn dispatch(&self, event: &Event) {
        for listener in &self.listeners(event) {
            listener(event);
        }
    }

    /// Registrations across all tables; a listener on N channels counts N.
    pub fn listener_count(&self) -> usize {
        let channel: usize = self.channel.iter().flatten().map(Vec::len).sum();
        let system: usize = self.system.iter().map(Vec::len).sum();
        channel + system
    }
}
