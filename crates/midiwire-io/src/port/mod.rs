//! MIDI ports.
//!
//! An [`InputPort`] turns arriving bytes into events for its listeners; an
//! [`OutputPort`] turns high-level sends into bytes for its transmitter.
//! Both carry the same descriptive [`PortInfo`].

mod input;
mod output;

pub use input::InputPort;
pub use output::OutputPort;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Input,
    Output,
}

/// Whether the device behind the port is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    #[default]
    Connected,
    Disconnected,
}

/// Whether the port is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Open,
    Closed,
    Pending,
}

/// Snapshot of a port's identity and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub id: String,
    pub name: String,
    pub manufacturer: String,
    pub port_type: PortType,
    pub state: PortState,
    pub connection: ConnectionState,
}

/// Name and manufacturer for a port about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDescriptor {
    pub name: String,
    pub manufacturer: String,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manufacturer: String::new(),
        }
    }

    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }
}

impl From<&str> for PortDescriptor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PortDescriptor {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Identity fixed at creation plus status that changes over the port's life.
#[derive(Debug)]
pub(crate) struct PortMeta {
    id: String,
    name: String,
    manufacturer: String,
    port_type: PortType,
    status: RwLock<(PortState, ConnectionState)>,
}

impl PortMeta {
    pub(crate) fn new(id: String, descriptor: PortDescriptor, port_type: PortType) -> Self {
        Self {
            id,
            name: descriptor.name,
            manufacturer: descriptor.manufacturer,
            port_type,
            status: RwLock::new((PortState::Connected, ConnectionState::Open)),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub(crate) fn state(&self) -> PortState {
        self.status.read().0
    }

    pub(crate) fn connection(&self) -> ConnectionState {
        self.status.read().1
    }

    pub(crate) fn set_state(&self, state: PortState) {
        self.status.write().0 = state;
    }

    pub(crate) fn set_connection(&self, connection: ConnectionState) {
        self.status.write().1 = connection;
    }

    pub(crate) fn info(&self) -> PortInfo {
        let (state, connection) = *self.status.read();
        PortInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            manufacturer: self.manufacturer.clone(),
            port_type: self.port_type,
            state,
            connection,
        }
    }

    /// Case-insensitive substring match on the port name.
    pub(crate) fn name_matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_info_snapshot() {
        let meta = PortMeta::new(
            "input-0".into(),
            PortDescriptor::new("Keystation 49").manufacturer("M-Audio"),
            PortType::Input,
        );
        let info = meta.info();
        assert_eq!(info.id, "input-0");
        assert_eq!(info.name, "Keystation 49");
        assert_eq!(info.manufacturer, "M-Audio");
        assert_eq!(info.state, PortState::Connected);
        assert_eq!(info.connection, ConnectionState::Open);

        meta.set_connection(ConnectionState::Closed);
        meta.set_state(PortState::Disconnected);
        assert_eq!(meta.connection(), ConnectionState::Closed);
        // Earlier snapshots do not change
        assert_eq!(info.connection, ConnectionState::Open);
        assert_eq!(meta.info().state, PortState::Disconnected);
    }

    #[test]
    fn test_name_matches_substring() {
        let meta = PortMeta::new("output-3".into(), "IAC Driver Bus 1".into(), PortType::Output);
        assert!(meta.name_matches("iac"));
        assert!(meta.name_matches("Bus 1"));
        assert!(!meta.name_matches("Bus 2"));
        // An empty query matches everything, as a substring search does
        assert!(meta.name_matches(""));
    }
}
