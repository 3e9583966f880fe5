//! High-level intents to raw messages.
//!
//! Every operation validates all of its inputs before producing anything, so
//! a failed call never yields a partial batch. Times are already resolved
//! (see [`crate::time::resolve`]); the caller decides when "now" is.

use crate::channel::{Channel, ChannelSpec};
use crate::error::{data_byte, Error, Result};
use crate::message::{channel_message, RawMessage, ScheduledMessage};
use crate::note::{guess_note_number, NoteSpec};
use crate::tables::{channel_mode_number, command, controller_number, system};
use crate::time::SendTime;
use crate::utils::split_14bit;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

pub const DEFAULT_VELOCITY: u8 = 64;
const DEFAULT_PRESSURE: f64 = 0.5;

/// A note-on or note-off velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Velocity {
    /// Scaled from [0, 1]. Anything else falls back to the default.
    Normalized(f64),
    /// Taken as-is from [0, 127]. Anything else is an error.
    Raw(f64),
}

impl Velocity {
    fn to_byte(velocity: Option<Velocity>, what: &'static str) -> Result<u8> {
        match velocity {
            None => Ok(DEFAULT_VELOCITY),
            Some(Velocity::Normalized(v)) if (0.0..=1.0).contains(&v) => {
                Ok((v * 127.0).round() as u8)
            }
            Some(Velocity::Normalized(v)) => {
                debug!("Ignoring {what} {v} outside [0, 1], using {DEFAULT_VELOCITY}");
                Ok(DEFAULT_VELOCITY)
            }
            Some(Velocity::Raw(v)) if (0.0..=127.0).contains(&v) => Ok(v.round() as u8),
            Some(Velocity::Raw(v)) => Err(Error::OutOfRange {
                what,
                value: v,
                min: 0.0,
                max: 127.0,
            }),
        }
    }
}

/// Options for [`Encoder::play_note`] and [`Encoder::stop_note`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteOptions {
    pub velocity: Option<Velocity>,
    /// Release velocity for the note-off scheduled by `duration`.
    pub release: Option<Velocity>,
    /// Milliseconds until an automatic note-off. Zero or `None` means none.
    pub duration: Option<f64>,
    pub time: SendTime,
}

impl NoteOptions {
    pub fn velocity(mut self, velocity: Velocity) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn release(mut self, release: Velocity) -> Self {
        self.release = Some(release);
        self
    }

    pub fn duration(mut self, ms: f64) -> Self {
        self.duration = Some(ms);
        self
    }

    pub fn at(mut self, time: SendTime) -> Self {
        self.time = time;
        self
    }
}

/// Which notes a note-off addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoteSelection {
    /// Every sounding note, via the `allnotesoff` channel mode message.
    All,
    Notes(Vec<NoteSpec>),
}

impl From<&str> for NoteSelection {
    fn from(s: &str) -> Self {
        if s == "all" {
            NoteSelection::All
        } else {
            NoteSelection::Notes(vec![s.into()])
        }
    }
}

impl From<NoteSpec> for NoteSelection {
    fn from(note: NoteSpec) -> Self {
        NoteSelection::Notes(vec![note])
    }
}

impl From<u8> for NoteSelection {
    fn from(note: u8) -> Self {
        NoteSelection::Notes(vec![note.into()])
    }
}

impl From<Vec<NoteSpec>> for NoteSelection {
    fn from(notes: Vec<NoteSpec>) -> Self {
        NoteSelection::Notes(notes)
    }
}

/// A controller or channel mode message given by number or canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlId {
    Number(i64),
    Name(String),
}

impl From<u8> for ControlId {
    fn from(n: u8) -> Self {
        ControlId::Number(n as i64)
    }
}

impl From<&str> for ControlId {
    fn from(s: &str) -> Self {
        ControlId::Name(s.to_string())
    }
}

/// Lenient pressure scaling: anything outside [0, 1] becomes 0.5.
fn pressure_byte(pressure: f64) -> u8 {
    let pressure = if (0.0..=1.0).contains(&pressure) {
        pressure
    } else {
        debug!("Ignoring pressure {pressure} outside [0, 1], using {DEFAULT_PRESSURE}");
        DEFAULT_PRESSURE
    };
    (pressure * 127.0).round() as u8
}

fn resolve_notes(notes: &[NoteSpec]) -> Result<SmallVec<[u8; 8]>> {
    notes.iter().map(guess_note_number).collect()
}

/// Stateless message builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    sysex_enabled: bool,
}

impl Encoder {
    pub fn new(sysex_enabled: bool) -> Self {
        Self { sysex_enabled }
    }

    pub fn sysex_enabled(&self) -> bool {
        self.sysex_enabled
    }

    /// One message per resolved channel, all at `time`.
    fn per_channel(
        channels: &ChannelSpec,
        time: SendTime,
        build: impl Fn(Channel) -> RawMessage,
    ) -> Result<Vec<ScheduledMessage>> {
        Ok(channels
            .expand()?
            .into_iter()
            .map(|ch| ScheduledMessage::new(build(ch), time))
            .collect())
    }

    /// Sends an arbitrary message after checking the status and data bytes.
    pub fn send(&self, status: i64, data: &[i64], time: SendTime) -> Result<Vec<ScheduledMessage>> {
        if !(128..=255).contains(&status) {
            return Err(Error::InvalidStatus(status));
        }
        let mut message = RawMessage::with_capacity(data.len() + 1);
        message.push(status as u8);
        for &byte in data {
            message.push(data_byte("data byte", byte)?);
        }
        Ok(vec![ScheduledMessage::new(message, time)])
    }

    /// Note-on for every note on every channel (notes outer, channels inner).
    ///
    /// With a non-zero `duration` a matching note-off per pair follows at
    /// `(time or now) + max(duration, 0)`.
    pub fn play_note(
        &self,
        notes: &[NoteSpec],
        channels: &ChannelSpec,
        options: &NoteOptions,
        now: f64,
    ) -> Result<Vec<ScheduledMessage>> {
        let velocity = Velocity::to_byte(options.velocity, "velocity")?;
        let notes = resolve_notes(notes)?;
        let channels = channels.expand()?;

        let release = match options.duration {
            Some(d) if d != 0.0 && !d.is_nan() => {
                let release = Velocity::to_byte(options.release, "release velocity")?;
                Some((release, options.time.or_now(now) + d.max(0.0)))
            }
            _ => None,
        };

        let pairs = notes.len() * channels.len();
        let mut out = Vec::with_capacity(if release.is_some() { pairs * 2 } else { pairs });
        for &note in &notes {
            for ch in &channels {
                out.push(ScheduledMessage::new(
                    channel_message(ch.status(command::NOTE_ON), note, velocity),
                    options.time,
                ));
            }
        }
        if let Some((release, off_time)) = release {
            for &note in &notes {
                for ch in &channels {
                    out.push(ScheduledMessage::new(
                        channel_message(ch.status(command::NOTE_OFF), note, release),
                        SendTime::At(off_time),
                    ));
                }
            }
        }
        Ok(out)
    }

    /// Note-off for every note on every channel, or `allnotesoff` for
    /// [`NoteSelection::All`].
    pub fn stop_note(
        &self,
        notes: &NoteSelection,
        channels: &ChannelSpec,
        options: &NoteOptions,
    ) -> Result<Vec<ScheduledMessage>> {
        let notes = match notes {
            NoteSelection::All => {
                return self.channel_mode(&"allnotesoff".into(), 0, channels, options.time)
            }
            NoteSelection::Notes(notes) => resolve_notes(notes)?,
        };
        let velocity = Velocity::to_byte(options.velocity, "velocity")?;
        let channels = channels.expand()?;

        let mut out = Vec::with_capacity(notes.len() * channels.len());
        for &note in &notes {
            for ch in &channels {
                out.push(ScheduledMessage::new(
                    channel_message(ch.status(command::NOTE_OFF), note, velocity),
                    options.time,
                ));
            }
        }
        Ok(out)
    }

    pub fn key_aftertouch(
        &self,
        notes: &[NoteSpec],
        channels: &ChannelSpec,
        pressure: f64,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let notes = resolve_notes(notes)?;
        let channels = channels.expand()?;
        let pressure = pressure_byte(pressure);

        let mut out = Vec::with_capacity(notes.len() * channels.len());
        for &note in &notes {
            for ch in &channels {
                out.push(ScheduledMessage::new(
                    channel_message(ch.status(command::KEY_AFTERTOUCH), note, pressure),
                    time,
                ));
            }
        }
        Ok(out)
    }

    pub fn control_change(
        &self,
        controller: &ControlId,
        value: i64,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let number = match controller {
            ControlId::Name(name) => controller_number(name)
                .ok_or_else(|| Error::UnknownController(name.clone()))?,
            ControlId::Number(n) if (0..=119).contains(n) => *n as u8,
            ControlId::Number(n) => {
                return Err(Error::out_of_range("controller number", *n as f64, 0, 119))
            }
        };
        let value = data_byte("controller value", value)?;
        Self::per_channel(channels, time, |ch| {
            channel_message(ch.status(command::CONTROL_CHANGE), number, value)
        })
    }

    pub fn channel_mode(
        &self,
        mode: &ControlId,
        value: i64,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let number = match mode {
            ControlId::Name(name) => channel_mode_number(name)
                .ok_or_else(|| Error::UnknownChannelMode(name.clone()))?,
            ControlId::Number(n) if (120..=127).contains(n) => *n as u8,
            ControlId::Number(n) => {
                return Err(Error::out_of_range("channel mode number", *n as f64, 120, 127))
            }
        };
        let value = data_byte("channel mode value", value)?;
        Self::per_channel(channels, time, |ch| {
            channel_message(ch.status(command::CONTROL_CHANGE), number, value)
        })
    }

    pub fn program_change(
        &self,
        program: i64,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let program = data_byte("program", program)?;
        Self::per_channel(channels, time, |ch| {
            smallvec::smallvec![ch.status(command::PROGRAM_CHANGE), program]
        })
    }

    pub fn channel_aftertouch(
        &self,
        pressure: f64,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let pressure = pressure_byte(pressure);
        Self::per_channel(channels, time, |ch| {
            smallvec::smallvec![ch.status(command::CHANNEL_AFTERTOUCH), pressure]
        })
    }

    /// Bend in [-1, 1]; 0 is centre.
    pub fn pitch_bend(
        &self,
        bend: f64,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        if !(-1.0..=1.0).contains(&bend) {
            return Err(Error::OutOfRange {
                what: "pitch bend",
                value: bend,
                min: -1.0,
                max: 1.0,
            });
        }
        let level = ((bend + 1.0) / 2.0 * 16383.0).round() as u16;
        let (msb, lsb) = split_14bit(level);
        Self::per_channel(channels, time, |ch| {
            channel_message(ch.status(command::PITCH_BEND), lsb, msb)
        })
    }

    /// SysEx frame `F0 <manufacturer> <data> F7`.
    pub fn sysex(
        &self,
        manufacturer: &[u8],
        data: &[u8],
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        if !self.sysex_enabled {
            return Err(Error::SysexDisabled);
        }
        for &byte in manufacturer {
            data_byte("manufacturer id", byte)?;
        }
        for &byte in data {
            data_byte("sysex data byte", byte)?;
        }
        let mut message = RawMessage::with_capacity(manufacturer.len() + data.len() + 2);
        message.push(system::SYSEX);
        message.extend_from_slice(manufacturer);
        message.extend_from_slice(data);
        message.push(system::SYSEX_END);
        Ok(vec![ScheduledMessage::new(message, time)])
    }

    pub fn timecode_quarter_frame(&self, value: i64, time: SendTime) -> Result<Vec<ScheduledMessage>> {
        let value = data_byte("timecode value", value)?;
        Ok(vec![ScheduledMessage::new(
            smallvec::smallvec![system::TIMECODE, value],
            time,
        )])
    }

    /// Song position in MIDI beats, sent LSB first.
    pub fn song_position(&self, beats: i64, time: SendTime) -> Result<Vec<ScheduledMessage>> {
        if !(0..=16383).contains(&beats) {
            return Err(Error::out_of_range("song position", beats as f64, 0, 16383));
        }
        let (msb, lsb) = split_14bit(beats as u16);
        Ok(vec![ScheduledMessage::new(
            channel_message(system::SONG_POSITION, lsb, msb),
            time,
        )])
    }

    pub fn song_select(&self, song: i64, time: SendTime) -> Result<Vec<ScheduledMessage>> {
        let song = data_byte("song number", song)?;
        Ok(vec![ScheduledMessage::new(
            smallvec::smallvec![system::SONG_SELECT, song],
            time,
        )])
    }

    fn status_only(status: u8, time: SendTime) -> Vec<ScheduledMessage> {
        vec![ScheduledMessage::new(smallvec::smallvec![status], time)]
    }

    pub fn tuning_request(&self, time: SendTime) -> Vec<ScheduledMessage> {
        Self::status_only(system::TUNING_REQUEST, time)
    }

    pub fn clock(&self, time: SendTime) -> Vec<ScheduledMessage> {
        Self::status_only(system::CLOCK, time)
    }

    pub fn start(&self, time: SendTime) -> Vec<ScheduledMessage> {
        Self::status_only(system::START, time)
    }

    pub fn continue_(&self, time: SendTime) -> Vec<ScheduledMessage> {
        Self::status_only(system::CONTINUE, time)
    }

    pub fn stop(&self, time: SendTime) -> Vec<ScheduledMessage> {
        Self::status_only(system::STOP, time)
    }

    pub fn active_sensing(&self, time: SendTime) -> Vec<ScheduledMessage> {
        Self::status_only(system::ACTIVE_SENSING, time)
    }

    pub fn reset(&self, time: SendTime) -> Vec<ScheduledMessage> {
        Self::status_only(system::RESET, time)
    }
}
