//! Outbound port: high-level sends, encoded then transmitted in order.

use super::{ConnectionState, PortInfo, PortMeta, PortState};
use crate::error::{Error, Result};
use crate::transmit::Transmitter;
use midiwire_proto::{
    resolve, ChannelSpec, Clock, ControlId, Encoder, NoteOptions, NoteSelection, NoteSpec,
    ParameterId, ParameterValue, ScheduledMessage, SendTime, TimeSpec,
};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A destination for MIDI messages.
///
/// Every send validates and encodes the whole batch first; nothing reaches
/// the transmitter unless encoding succeeded. Times are resolved against the
/// port's clock, so anything not strictly in the future goes out now.
pub struct OutputPort {
    meta: PortMeta,
    encoder: Encoder,
    clock: Arc<dyn Clock>,
    transmitter: Box<dyn Transmitter>,
}

impl fmt::Debug for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputPort")
            .field("meta", &self.meta)
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}

impl OutputPort {
    pub(crate) fn new(
        meta: PortMeta,
        encoder: Encoder,
        clock: Arc<dyn Clock>,
        transmitter: Box<dyn Transmitter>,
    ) -> Self {
        Self {
            meta,
            encoder,
            clock,
            transmitter,
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

    pub fn sysex_enabled(&self) -> bool {
        self.encoder.sysex_enabled()
    }

    pub(crate) fn meta(&self) -> &PortMeta {
        &self.meta
    }

    pub fn open(&self) {
        self.meta.set_connection(ConnectionState::Open);
    }

    /// Further sends fail with [`Error::MidiPort`] until reopened.
    pub fn close(&self) {
        self.meta.set_connection(ConnectionState::Closed);
    }

    /// Drops messages the transmitter accepted but has not delivered yet.
    pub fn clear(&self) {
        self.transmitter.clear();
    }

    /// Resolves a requested time against this port's clock.
    pub fn resolve_time(&self, time: impl Into<TimeSpec>) -> SendTime {
        resolve(time.into(), self.clock.now_ms())
    }

    fn transmit_all(&self, messages: Vec<ScheduledMessage>) -> Result<()> {
        if self.meta.connection() == ConnectionState::Closed {
            return Err(Error::MidiPort(format!(
                "Output port {} is closed",
                self.meta.id()
            )));
        }
        trace!(
            "Output port {} sending {} message(s)",
            self.meta.id(),
            messages.len()
        );
        for message in &messages {
            self.transmitter.transmit(message.bytes(), message.time)?;
        }
        Ok(())
    }

    // ==================== Raw ====================

    /// Sends an arbitrary status byte and data bytes.
    pub fn send(&self, status: i64, data: &[i64], time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.send(status, data, time)?)
    }

    // ==================== Channel Voice ====================

    /// Note-on for each note on each channel, with an optional automatic
    /// note-off after `options.duration` milliseconds.
    pub fn play_note(
        &self,
        notes: &[NoteSpec],
        channels: &ChannelSpec,
        options: NoteOptions,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let options = options.at(self.resolve_time(time));
        let messages = self
            .encoder
            .play_note(notes, channels, &options, self.clock.now_ms())?;
        self.transmit_all(messages)
    }

    /// Note-off for the given notes, or `allnotesoff` for [`NoteSelection::All`].
    pub fn stop_note(
        &self,
        notes: impl Into<NoteSelection>,
        channels: &ChannelSpec,
        options: NoteOptions,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let options = options.at(self.resolve_time(time));
        self.transmit_all(self.encoder.stop_note(&notes.into(), channels, &options)?)
    }

    pub fn send_key_aftertouch(
        &self,
        notes: &[NoteSpec],
        channels: &ChannelSpec,
        pressure: f64,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(
            self.encoder
                .key_aftertouch(notes, channels, pressure, time)?,
        )
    }

    pub fn send_control_change(
        &self,
        controller: impl Into<ControlId>,
        value: i64,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(
            self.encoder
                .control_change(&controller.into(), value, channels, time)?,
        )
    }

    pub fn send_channel_mode(
        &self,
        command: impl Into<ControlId>,
        value: i64,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(
            self.encoder
                .channel_mode(&command.into(), value, channels, time)?,
        )
    }

    pub fn send_program_change(
        &self,
        program: i64,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.program_change(program, channels, time)?)
    }

    pub fn send_channel_aftertouch(
        &self,
        pressure: f64,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.channel_aftertouch(pressure, channels, time)?)
    }

    /// `bend` in [-1, 1], 0 is centre.
    pub fn send_pitch_bend(
        &self,
        bend: f64,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.pitch_bend(bend, channels, time)?)
    }

    // ==================== Parameters ====================

    pub fn set_registered_parameter(
        &self,
        parameter: impl Into<ParameterId>,
        value: impl Into<ParameterValue>,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.set_registered_parameter(
            &parameter.into(),
            value.into(),
            channels,
            time,
        )?)
    }

    pub fn set_non_registered_parameter(
        &self,
        parameter: [i64; 2],
        value: impl Into<ParameterValue>,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.set_non_registered_parameter(
            parameter,
            value.into(),
            channels,
            time,
        )?)
    }

    pub fn increment_registered_parameter(
        &self,
        parameter: impl Into<ParameterId>,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.increment_registered_parameter(
            &parameter.into(),
            channels,
            time,
        )?)
    }

    pub fn decrement_registered_parameter(
        &self,
        parameter: impl Into<ParameterId>,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.decrement_registered_parameter(
            &parameter.into(),
            channels,
            time,
        )?)
    }

    pub fn set_pitch_bend_range(
        &self,
        semitones: i64,
        cents: i64,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(
            self.encoder
                .set_pitch_bend_range(semitones, cents, channels, time)?,
        )
    }

    pub fn set_modulation_range(
        &self,
        semitones: i64,
        cents: i64,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(
            self.encoder
                .set_modulation_range(semitones, cents, channels, time)?,
        )
    }

    /// Tuning in semitones, within (-65, 64).
    pub fn set_master_tuning(
        &self,
        value: f64,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.set_master_tuning(value, channels, time)?)
    }

    pub fn set_tuning_program(
        &self,
        program: i64,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.set_tuning_program(program, channels, time)?)
    }

    pub fn set_tuning_bank(
        &self,
        bank: i64,
        channels: &ChannelSpec,
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.set_tuning_bank(bank, channels, time)?)
    }

    // ==================== System ====================

    /// `F0 manufacturer… data… F7`. Requires a system built with sysex enabled.
    pub fn send_sysex(
        &self,
        manufacturer: &[u8],
        data: &[u8],
        time: impl Into<TimeSpec>,
    ) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.sysex(manufacturer, data, time)?)
    }

    pub fn send_timecode_quarter_frame(&self, value: i64, time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.timecode_quarter_frame(value, time)?)
    }

    pub fn send_song_position(&self, beats: i64, time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.song_position(beats, time)?)
    }

    pub fn send_song_select(&self, song: i64, time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.song_select(song, time)?)
    }

    pub fn send_tuning_request(&self, time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.tuning_request(time))
    }

    pub fn send_clock(&self, time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.clock(time))
    }

    pub fn send_start(&self, time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.start(time))
    }

    pub fn send_continue(&self, time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.continue_(time))
    }

    pub fn send_stop(&self, time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.stop(time))
    }

    pub fn send_active_sensing(&self, time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.active_sensing(time))
    }

    pub fn send_reset(&self, time: impl Into<TimeSpec>) -> Result<()> {
        let time = self.resolve_time(time);
        self.transmit_all(self.encoder.reset(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{PortDescriptor, PortType};
    use crate::transmit::RecordingTransmitter;
    use midiwire_proto::{ManualClock, Velocity};

    fn port(sysex: bool) -> (OutputPort, RecordingTransmitter, Arc<ManualClock>) {
        let recorder = RecordingTransmitter::new();
        let clock = Arc::new(ManualClock::new(1000.0));
        let port = OutputPort::new(
            PortMeta::new("output-0".into(), PortDescriptor::new("Test Out"), PortType::Output),
            Encoder::new(sysex),
            clock.clone(),
            Box::new(recorder.clone()),
        );
        (port, recorder, clock)
    }

    #[test]
    fn test_play_note_with_duration() {
        let (port, recorder, _) = port(false);
        port.play_note(
            &["C3".into()],
            &ChannelSpec::One(1),
            NoteOptions::default()
                .velocity(Velocity::Normalized(1.0))
                .duration(500.0),
            TimeSpec::Now,
        )
        .unwrap();

        let sent = recorder.messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].bytes(), &[0x90, 60, 127]);
        assert_eq!(sent[0].time, SendTime::Now);
        assert_eq!(sent[1].bytes(), &[0x80, 60, 64]);
        assert_eq!(sent[1].time, SendTime::At(1500.0));
    }

    #[test]
    fn test_relative_time_uses_clock() {
        let (port, recorder, clock) = port(false);
        port.send_clock("+20").unwrap();
        clock.set(2000.0);
        port.send_start(1500.0).unwrap();
        port.send_stop(2500.0).unwrap();

        let times: Vec<SendTime> = recorder.messages().iter().map(|m| m.time).collect();
        assert_eq!(
            times,
            vec![SendTime::At(1020.0), SendTime::Now, SendTime::At(2500.0)]
        );
    }

    #[test]
    fn test_failed_encode_transmits_nothing() {
        let (port, recorder, _) = port(false);
        let notes: Vec<NoteSpec> = vec!["C3".into(), "H3".into()];
        assert!(port
            .play_note(&notes, &ChannelSpec::All, NoteOptions::default(), TimeSpec::Now)
            .is_err());
        assert!(port
            .send_pitch_bend(1.5, &ChannelSpec::One(1), TimeSpec::Now)
            .is_err());
        assert!(port
            .send_control_change(120u8, 0, &ChannelSpec::One(1), TimeSpec::Now)
            .is_err());
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_sysex_permission() {
        let (denied, recorder, _) = port(false);
        assert!(matches!(
            denied.send_sysex(&[0x7D], &[1, 2], TimeSpec::Now),
            Err(Error::Proto(midiwire_proto::Error::SysexDisabled))
        ));
        assert!(recorder.is_empty());

        let (allowed, recorder, _) = port(true);
        allowed.send_sysex(&[0x7D], &[1, 2], TimeSpec::Now).unwrap();
        assert_eq!(recorder.bytes(), vec![vec![0xF0, 0x7D, 1, 2, 0xF7]]);
    }

    #[test]
    fn test_closed_port_rejects_sends() {
        let (port, recorder, _) = port(false);
        port.close();
        assert!(matches!(port.send_reset(TimeSpec::Now), Err(Error::MidiPort(_))));
        port.open();
        port.send_reset(TimeSpec::Now).unwrap();
        assert_eq!(recorder.bytes(), vec![vec![0xFF]]);
    }

    #[test]
    fn test_stop_all_notes() {
        let (port, recorder, _) = port(false);
        port.stop_note("all", &ChannelSpec::List(vec![1, 2]), NoteOptions::default(), TimeSpec::Now)
            .unwrap();
        assert_eq!(
            recorder.bytes(),
            vec![vec![0xB0, 123, 0], vec![0xB1, 123, 0]]
        );
    }

    #[test]
    fn test_system_common_bytes() {
        let (port, recorder, _) = port(false);
        port.send_song_position(0x90, TimeSpec::Now).unwrap();
        port.send_song_select(9, TimeSpec::Now).unwrap();
        port.send_timecode_quarter_frame(0x35, TimeSpec::Now).unwrap();
        port.send_tuning_request(TimeSpec::Now).unwrap();
        port.send_active_sensing(TimeSpec::Now).unwrap();
        port.send_continue(TimeSpec::Now).unwrap();
        assert_eq!(
            recorder.bytes(),
            vec![
                vec![0xF2, 0x10, 0x01],
                vec![0xF3, 9],
                vec![0xF1, 0x35],
                vec![0xF6],
                vec![0xFE],
                vec![0xFB],
            ]
        );
    }
}
