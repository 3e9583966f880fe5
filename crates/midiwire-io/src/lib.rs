//! MIDI port layer for midiwire.
//!
//! Wraps the pure protocol core in ports a host can feed and drain:
//!
//! - [`InputPort`]: `receive(bytes, timestamp)` decodes and dispatches to
//!   listeners registered per (event type, channel)
//! - [`OutputPort`]: high-level sends encoded then handed to a [`Transmitter`]
//! - [`MidiSystem`]: explicit handle owning ports, configuration and clock
//!
//! Feature gates: `midi-io` (hardware I/O through midir).

pub mod error;
pub use error::{Error, Result};

mod system;
pub use system::{
    MidiSystem, MidiSystemBuilder, SystemConfig, DEFAULT_CLIENT_NAME, DEFAULT_QUEUE_CAPACITY,
};

mod port;
pub use port::{
    ConnectionState, InputPort, OutputPort, PortDescriptor, PortInfo, PortState, PortType,
};

pub mod transmit;
pub use transmit::{ChannelTransmitter, RecordingTransmitter, Transmitter};

#[cfg(feature = "midi-io")]
pub mod io;

#[cfg(feature = "midi-io")]
pub use io::{DeviceInfo, MidirInput, MidirTransmitter};

pub use midiwire_proto as proto;
