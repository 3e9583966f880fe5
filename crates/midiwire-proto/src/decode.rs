//! Raw bytes to [`Event`].
//!
//! Decoding is total: malformed or unrecognised input becomes an
//! `Unknown` channel or system message instead of an error.

use crate::channel::Channel;
use crate::event::{ChannelMessage, DecodedNote, Event, EventKind, SystemMessage};
use crate::note::number_to_octave;
use crate::tables::{
    command, system, ChannelModeCommand, Controller, CHANNEL_SPECIFIC_MESSAGE_MAX, NOTE_NAMES,
    SEMITONE_COUNT,
};
use crate::utils::{byte_to_normalized, merge_14bit};
use tracing::trace;

/// Decodes one complete message received at `timestamp` (milliseconds).
pub fn decode(bytes: &[u8], timestamp: f64) -> Event {
    let kind = match bytes.first() {
        Some(&status) if status <= CHANNEL_SPECIFIC_MESSAGE_MAX => EventKind::Channel {
            channel: Channel::from_status(status),
            message: decode_channel(status >> 4, &bytes[1..]),
        },
        Some(&status) => EventKind::System(decode_system(status, &bytes[1..])),
        None => EventKind::System(SystemMessage::Unknown),
    };

    if matches!(
        kind,
        EventKind::Channel {
            message: ChannelMessage::Unknown,
            ..
        } | EventKind::System(SystemMessage::Unknown)
    ) {
        trace!("Unrecognised MIDI message: {:02X?}", bytes);
    }

    Event {
        timestamp,
        data: bytes.into(),
        kind,
    }
}

fn decoded_note(number: u8) -> DecodedNote {
    DecodedNote {
        number,
        name: NOTE_NAMES.get((number % SEMITONE_COUNT) as usize).copied(),
        octave: number_to_octave(number as i32),
    }
}

fn decode_channel(cmd: u8, data: &[u8]) -> ChannelMessage {
    match (cmd, data) {
        (command::NOTE_OFF, &[d1, d2, ..]) => ChannelMessage::NoteOff {
            note: decoded_note(d1),
            velocity: byte_to_normalized(d2),
            raw_velocity: d2,
        },
        // Note on with zero velocity is a note off
        (command::NOTE_ON, &[d1, 0, ..]) => ChannelMessage::NoteOff {
            note: decoded_note(d1),
            velocity: 0.0,
            raw_velocity: 0,
        },
        (command::NOTE_ON, &[d1, d2, ..]) => ChannelMessage::NoteOn {
            note: decoded_note(d1),
            velocity: byte_to_normalized(d2),
            raw_velocity: d2,
        },
        (command::KEY_AFTERTOUCH, &[d1, d2, ..]) => ChannelMessage::KeyAftertouch {
            note: decoded_note(d1),
            value: byte_to_normalized(d2),
        },
        (command::CONTROL_CHANGE, &[d1, d2, ..]) if d1 <= 119 => match Controller::new(d1) {
            Ok(controller) => ChannelMessage::ControlChange {
                controller,
                value: d2,
            },
            Err(_) => ChannelMessage::Unknown,
        },
        (command::CONTROL_CHANGE, &[d1, d2, ..]) => match ChannelModeCommand::new(d1) {
            Ok(mode) => ChannelMessage::ChannelMode {
                command: mode,
                value: d2,
            },
            Err(_) => ChannelMessage::Unknown,
        },
        (command::PROGRAM_CHANGE, &[d1, ..]) => ChannelMessage::ProgramChange { program: d1 },
        (command::CHANNEL_AFTERTOUCH, &[d1, ..]) => ChannelMessage::ChannelAftertouch {
            value: byte_to_normalized(d1),
        },
        (command::PITCH_BEND, &[d1, d2, ..]) => ChannelMessage::PitchBend {
            value: (((d2 as i32) << 7) + d1 as i32 - 8192) as f64 / 8192.0,
        },
        _ => ChannelMessage::Unknown,
    }
}

fn decode_system(status: u8, data: &[u8]) -> SystemMessage {
    match (status, data) {
        (system::SYSEX, _) => SystemMessage::Sysex,
        (system::TIMECODE, &[d1, ..]) => SystemMessage::Timecode {
            piece: (d1 >> 4) & 0x07,
            value: d1 & 0x0F,
        },
        (system::SONG_POSITION, &[lsb, msb, ..]) => SystemMessage::SongPosition {
            beats: merge_14bit(lsb, msb),
        },
        (system::SONG_SELECT, &[song, ..]) => SystemMessage::SongSelect { song },
        (system::TUNING_REQUEST, _) => SystemMessage::TuningRequest,
        (system::CLOCK, _) => SystemMessage::Clock,
        (system::START, _) => SystemMessage::Start,
        (system::CONTINUE, _) => SystemMessage::Continue,
        (system::STOP, _) => SystemMessage::Stop,
        (system::ACTIVE_SENSING, _) => SystemMessage::ActiveSensing,
        (system::RESET, _) => SystemMessage::Reset,
        _ => SystemMessage::Unknown,
    }
}
