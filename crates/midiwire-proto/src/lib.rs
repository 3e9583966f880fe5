//! MIDI 1.0 wire protocol core.
//!
//! Pure, I/O-free building blocks shared by the port layer:
//!
//! - **Decoding**: raw bytes + arrival timestamp → typed [`Event`]
//! - **Encoding**: high-level intents → validated [`ScheduledMessage`]s
//! - **Parameters**: RPN/NRPN select / data entry / deselect sequences
//! - **Listeners**: per-(event type, channel) callback registry
//!
//! # Example
//!
//! ```
//! use midiwire_proto::{decode, ChannelSpec, Encoder, EventType, NoteOptions, SendTime};
//!
//! let encoder = Encoder::default();
//! let messages = encoder
//!     .play_note(&["C3".into()], &ChannelSpec::One(3), &NoteOptions::default(), 0.0)
//!     .unwrap();
//! assert_eq!(messages[0].bytes(), &[0x92, 60, 64]);
//! assert_eq!(messages[0].time, SendTime::Now);
//!
//! let event = decode(messages[0].bytes(), 10.0);
//! assert_eq!(event.event_type(), EventType::NoteOn);
//! assert_eq!(event.channel().map(|c| c.number()), Some(3));
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod channel;
pub mod decode;
pub mod encode;
pub mod event;
pub mod listener;
pub mod message;
pub mod note;
pub mod parameter;
pub mod tables;
pub mod time;
pub mod utils;

pub use channel::{Channel, ChannelSpec, Channels};
pub use decode::decode;
pub use encode::{ControlId, Encoder, NoteOptions, NoteSelection, Velocity, DEFAULT_VELOCITY};
pub use event::{ChannelMessage, DecodedNote, Event, EventKind, EventType, SystemMessage};
pub use listener::{listener, Listener, ListenerRegistry, ListenerSnapshot};
pub use message::{RawMessage, ScheduledMessage};
pub use note::{guess_note_number, name_to_number, number_to_octave, Note, NoteSpec};
pub use parameter::{ParameterId, ParameterValue};
pub use tables::{
    channel_mode_name, channel_mode_number, controller_name, controller_number,
    ChannelModeCommand, Controller, RegisteredParameter,
};
pub use time::{resolve, Clock, ManualClock, SendTime, SystemClock, TimeSpec};
pub use utils::{merge_14bit, split_14bit, to_array};
