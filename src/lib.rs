//! # midiwire - MIDI 1.0 wire protocol engine
//!
//! Bidirectional: raw bytes in, typed events out to listeners; high-level
//! intents in, validated and scheduled bytes out.
//!
//! ## Architecture
//!
//! midiwire is an umbrella crate over:
//! - **midiwire-proto** - Pure protocol core (decoder, encoder, RPN/NRPN, listener registry)
//! - **midiwire-io** - Ports, transmitters, the `MidiSystem` handle, optional midir backend
//!
//! ## Quick Start
//!
//! ```
//! use midiwire::prelude::*;
//!
//! let midi = MidiSystem::builder().build()?;
//!
//! let input = midi.create_input_port("Keyboard");
//! input.on("noteon", &ChannelSpec::One(1), |event| {
//!     println!("note {:?}", event.note());
//! })?;
//! input.receive(&[0x90, 60, 100], 0.0);
//!
//! let recorder = RecordingTransmitter::new();
//! let output = midi.create_output_port("Synth", recorder.clone());
//! output.set_pitch_bend_range(2, 0, &ChannelSpec::All, TimeSpec::Now)?;
//! assert_eq!(recorder.len(), 16 * 6);
//! # Ok::<(), midiwire::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Protocol core and ports, no system libraries
//! - `midi-hardware` - Hardware input and output through midir

pub mod error;
pub use error::{Error, Result};

/// Re-export of midiwire-proto for direct access
pub use midiwire_proto as proto;

/// Re-export of midiwire-io for direct access
pub use midiwire_io as io;

pub use midiwire_io::{
    ChannelTransmitter, ConnectionState, InputPort, MidiSystem, MidiSystemBuilder, OutputPort,
    PortDescriptor, PortInfo, PortState, PortType, RecordingTransmitter, SystemConfig,
    Transmitter,
};

#[cfg(feature = "midi-hardware")]
pub use midiwire_io::{DeviceInfo, MidirInput, MidirTransmitter};

pub use midiwire_proto::{
    decode, listener, name_to_number, number_to_octave, Channel, ChannelMessage, ChannelSpec,
    Clock, ControlId, Encoder, Event, EventKind, EventType, Listener, ListenerRegistry,
    ManualClock, Note, NoteOptions, NoteSelection, NoteSpec, ParameterId, ParameterValue,
    RegisteredParameter, ScheduledMessage, SendTime, SystemClock, SystemMessage, TimeSpec,
    Velocity,
};

pub mod prelude {
    // System and ports
    pub use crate::{InputPort, MidiSystem, MidiSystemBuilder, OutputPort};

    // Transmitters
    pub use crate::{ChannelTransmitter, RecordingTransmitter, Transmitter};

    // Essential protocol types
    pub use crate::proto::{
        ChannelMessage, ChannelSpec, Event, EventType, Listener, NoteOptions, NoteSpec,
        SendTime, SystemMessage, TimeSpec, Velocity,
    };

    #[cfg(feature = "midi-hardware")]
    pub use crate::{DeviceInfo, MidirInput, MidirTransmitter};
}
