//! Decoded inbound events.

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::message::RawMessage;
use crate::tables::{ChannelModeCommand, Controller};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every kind of event a listener can subscribe to.
///
/// The first nine are channel-scoped; the rest are device-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    NoteOff,
    NoteOn,
    KeyAftertouch,
    ControlChange,
    ChannelMode,
    ProgramChange,
    ChannelAftertouch,
    PitchBend,
    UnknownChannelMessage,

    Sysex,
    Timecode,
    SongPosition,
    SongSelect,
    TuningRequest,
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    Reset,
    UnknownSystemMessage,
}

impl EventType {
    pub const CHANNEL: [EventType; 9] = [
        Self::NoteOff,
        Self::NoteOn,
        Self::KeyAftertouch,
        Self::ControlChange,
        Self::ChannelMode,
        Self::ProgramChange,
        Self::ChannelAftertouch,
        Self::PitchBend,
        Self::UnknownChannelMessage,
    ];

    pub const SYSTEM: [EventType; 12] = [
        Self::Sysex,
        Self::Timecode,
        Self::SongPosition,
        Self::SongSelect,
        Self::TuningRequest,
        Self::Clock,
        Self::Start,
        Self::Continue,
        Self::Stop,
        Self::ActiveSensing,
        Self::Reset,
        Self::UnknownSystemMessage,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::NoteOff => "noteoff",
            Self::NoteOn => "noteon",
            Self::KeyAftertouch => "keyaftertouch",
            Self::ControlChange => "controlchange",
            Self::ChannelMode => "channelmode",
            Self::ProgramChange => "programchange",
            Self::ChannelAftertouch => "channelaftertouch",
            Self::PitchBend => "pitchbend",
            Self::UnknownChannelMessage => "unknownchannelmessage",
            Self::Sysex => "sysex",
            Self::Timecode => "timecode",
            Self::SongPosition => "songposition",
            Self::SongSelect => "songselect",
            Self::TuningRequest => "tuningrequest",
            Self::Clock => "clock",
            Self::Start => "start",
            Self::Continue => "continue",
            Self::Stop => "stop",
            Self::ActiveSensing => "activesensing",
            Self::Reset => "reset",
            Self::UnknownSystemMessage => "unknownsystemmessage",
        }
    }

    #[inline]
    pub fn is_channel(self) -> bool {
        self.channel_index().is_some()
    }

    /// Row in the channel listener table.
    pub fn channel_index(self) -> Option<usize> {
        Self::CHANNEL.iter().position(|t| *t == self)
    }

    /// Row in the system listener table.
    pub fn system_index(self) -> Option<usize> {
        Self::SYSTEM.iter().position(|t| *t == self)
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::CHANNEL
            .iter()
            .chain(Self::SYSTEM.iter())
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| Error::UnsupportedEventType(s.to_string()))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Note as reported by the decoder.
///
/// `name` comes from a 16-entry lookup, so numbers whose residue mod 16 is
/// 12-15 carry no name. Use [`crate::Note::from_number`] for a canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodedNote {
    pub number: u8,
    pub name: Option<&'static str>,
    pub octave: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChannelMessage {
    NoteOff {
        note: DecodedNote,
        velocity: f64,
        raw_velocity: u8,
    },
    NoteOn {
        note: DecodedNote,
        velocity: f64,
        raw_velocity: u8,
    },
    KeyAftertouch {
        note: DecodedNote,
        value: f64,
    },
    ControlChange {
        controller: Controller,
        value: u8,
    },
    ChannelMode {
        command: ChannelModeCommand,
        value: u8,
    },
    ProgramChange {
        program: u8,
    },
    ChannelAftertouch {
        value: f64,
    },
    /// Normalised bend in [-1, 1).
    PitchBend {
        value: f64,
    },
    Unknown,
}

impl ChannelMessage {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::NoteOff { .. } => EventType::NoteOff,
            Self::NoteOn { .. } => EventType::NoteOn,
            Self::KeyAftertouch { .. } => EventType::KeyAftertouch,
            Self::ControlChange { .. } => EventType::ControlChange,
            Self::ChannelMode { .. } => EventType::ChannelMode,
            Self::ProgramChange { .. } => EventType::ProgramChange,
            Self::ChannelAftertouch { .. } => EventType::ChannelAftertouch,
            Self::PitchBend { .. } => EventType::PitchBend,
            Self::Unknown => EventType::UnknownChannelMessage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SystemMessage {
    Sysex,
    /// MTC quarter frame: piece index (0-7) and its 4-bit value.
    Timecode {
        piece: u8,
        value: u8,
    },
    /// Song position in MIDI beats (sixteenth notes).
    SongPosition {
        beats: u16,
    },
    SongSelect {
        song: u8,
    },
    TuningRequest,
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    Reset,
    Unknown,
}

impl SystemMessage {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Sysex => EventType::Sysex,
            Self::Timecode { .. } => EventType::Timecode,
            Self::SongPosition { .. } => EventType::SongPosition,
            Self::SongSelect { .. } => EventType::SongSelect,
            Self::TuningRequest => EventType::TuningRequest,
            Self::Clock => EventType::Clock,
            Self::Start => EventType::Start,
            Self::Continue => EventType::Continue,
            Self::Stop => EventType::Stop,
            Self::ActiveSensing => EventType::ActiveSensing,
            Self::Reset => EventType::Reset,
            Self::Unknown => EventType::UnknownSystemMessage,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Channel {
        channel: Channel,
        message: ChannelMessage,
    },
    System(SystemMessage),
}

/// An inbound message with its arrival time and decoded meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Arrival time in milliseconds.
    pub timestamp: f64,
    /// The bytes exactly as received.
    pub data: RawMessage,
    pub kind: EventKind,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match &self.kind {
            EventKind::Channel { message, .. } => message.event_type(),
            EventKind::System(message) => message.event_type(),
        }
    }

    pub fn channel(&self) -> Option<Channel> {
        match &self.kind {
            EventKind::Channel { channel, .. } => Some(*channel),
            EventKind::System(_) => None,
        }
    }

    pub fn channel_message(&self) -> Option<&ChannelMessage> {
        match &self.kind {
            EventKind::Channel { message, .. } => Some(message),
            EventKind::System(_) => None,
        }
    }

    pub fn note(&self) -> Option<DecodedNote> {
        match self.channel_message()? {
            ChannelMessage::NoteOff { note, .. }
            | ChannelMessage::NoteOn { note, .. }
            | ChannelMessage::KeyAftertouch { note, .. } => Some(*note),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sizes() {
        assert_eq!(EventType::CHANNEL.len(), 9);
        assert_eq!(EventType::SYSTEM.len(), 12);
        assert!(EventType::CHANNEL.iter().all(|t| t.is_channel()));
        assert!(EventType::SYSTEM.iter().all(|t| !t.is_channel()));
    }

    #[test]
    fn test_indices() {
        assert_eq!(EventType::NoteOff.channel_index(), Some(0));
        assert_eq!(EventType::UnknownChannelMessage.channel_index(), Some(8));
        assert_eq!(EventType::Sysex.system_index(), Some(0));
        assert_eq!(EventType::UnknownSystemMessage.system_index(), Some(11));
        assert_eq!(EventType::Clock.channel_index(), None);
    }

    #[test]
    fn test_names_parse_back() {
        for t in EventType::CHANNEL.iter().chain(EventType::SYSTEM.iter()) {
            assert_eq!(t.name().parse::<EventType>(), Ok(*t));
        }
        assert_eq!(
            "sysexend".parse::<EventType>(),
            Err(Error::UnsupportedEventType("sysexend".into()))
        );
    }

    #[test]
    fn test_event_accessors() {
        let event = Event {
            timestamp: 1.0,
            data: smallvec::smallvec![0x92, 60, 100],
            kind: EventKind::Channel {
                channel: Channel::new(3).unwrap(),
                message: ChannelMessage::NoteOn {
                    note: DecodedNote {
                        number: 60,
                        name: Some("C"),
                        octave: Some(3),
                    },
                    velocity: 100.0 / 127.0,
                    raw_velocity: 100,
                },
            },
        };
        assert_eq!(event.event_type(), EventType::NoteOn);
        assert_eq!(event.channel().map(Channel::number), Some(3));
        assert_eq!(event.note().map(|n| n.number), Some(60));
    }
}
