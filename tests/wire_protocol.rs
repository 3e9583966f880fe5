//! End-to-end tests through the umbrella crate.
//!
//! Run with:
//! ```bash
//! cargo test -p midiwire --test wire_protocol
//! ```

use approx::assert_relative_eq;
use midiwire::prelude::*;
use midiwire::{Error, ManualClock, Result};
use std::sync::{Arc, Mutex};

/// Collects (type, channel, value) for pitch bend and aftertouch events.
fn capture(input: &InputPort) -> Arc<Mutex<Vec<(EventType, Option<u8>, f64)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in ["pitchbend", "channelaftertouch"] {
        let seen = seen.clone();
        input
            .on(kind, &ChannelSpec::All, move |event| {
                let value = match event.channel_message() {
                    Some(ChannelMessage::PitchBend { value }) => *value,
                    Some(ChannelMessage::ChannelAftertouch { value }) => *value,
                    _ => f64::NAN,
                };
                seen.lock().unwrap().push((
                    event.event_type(),
                    event.channel().map(|c| c.number()),
                    value,
                ));
            })
            .unwrap();
    }
    seen
}

#[test]
fn test_pitch_bend_values_survive_loopback() -> Result<()> {
    let midi = MidiSystem::builder().build()?;
    let recorder = RecordingTransmitter::new();
    let output = midi.create_output_port("Out", recorder.clone());
    let input = midi.create_input_port("In");
    let seen = capture(&input);

    for bend in [-1.0, -0.5, 0.0, 0.25, 1.0] {
        output.send_pitch_bend(bend, &ChannelSpec::One(5), TimeSpec::Now)?;
    }
    for bytes in recorder.bytes() {
        input.receive(&bytes, 0.0);
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 5);
    let expected = [-1.0, -0.5, 0.0, 0.25, 1.0];
    for ((kind, channel, value), want) in seen.iter().zip(expected) {
        assert_eq!(*kind, EventType::PitchBend);
        assert_eq!(*channel, Some(5));
        assert_relative_eq!(*value, want, epsilon = 1e-3);
    }
    Ok(())
}

#[test]
fn test_lenient_aftertouch_falls_back_to_half() -> Result<()> {
    let midi = MidiSystem::builder().build()?;
    let recorder = RecordingTransmitter::new();
    let output = midi.create_output_port("Out", recorder.clone());
    let input = midi.create_input_port("In");
    let seen = capture(&input);

    output.send_channel_aftertouch(3.0, &ChannelSpec::One(1), TimeSpec::Now)?;
    output.send_channel_aftertouch(f64::NAN, &ChannelSpec::One(1), TimeSpec::Now)?;
    assert_eq!(recorder.bytes(), vec![vec![0xD0, 64], vec![0xD0, 64]]);

    for bytes in recorder.bytes() {
        input.receive(&bytes, 0.0);
    }
    for (_, _, value) in seen.lock().unwrap().iter() {
        assert_relative_eq!(*value, 64.0 / 127.0);
    }
    Ok(())
}

#[test]
fn test_errors_convert_to_umbrella_error() {
    fn bend_too_far(output: &OutputPort) -> Result<()> {
        output.send_pitch_bend(2.0, &ChannelSpec::One(1), TimeSpec::Now)?;
        Ok(())
    }

    fn bad_note() -> Result<u8> {
        Ok(midiwire::name_to_number("X4")?)
    }

    let midi = MidiSystem::builder().build().unwrap();
    let output = midi.create_output_port("Out", RecordingTransmitter::new());
    assert!(matches!(bend_too_far(&output), Err(Error::Io(_))));
    assert!(matches!(bad_note(), Err(Error::Proto(_))));
}

#[test]
fn test_master_tuning_through_port() -> Result<()> {
    let clock = Arc::new(ManualClock::new(0.0));
    let midi = MidiSystem::builder().clock(clock).build()?;
    let recorder = RecordingTransmitter::new();
    let output = midi.create_output_port("Out", recorder.clone());

    output.set_master_tuning(0.0, &ChannelSpec::One(1), TimeSpec::Now)?;

    // Coarse (RPN 0x0002, one data byte) then fine (RPN 0x0001, two)
    let bytes = recorder.bytes();
    assert_eq!(bytes.len(), 11);
    assert_eq!(bytes[0], vec![0xB0, 0x65, 0x00]);
    assert_eq!(bytes[1], vec![0xB0, 0x64, 0x02]);
    assert_eq!(bytes[2], vec![0xB0, 0x06, 64]);
    assert_eq!(bytes[4], vec![0xB0, 0x64, 0x7F]);
    assert_eq!(bytes[6], vec![0xB0, 0x64, 0x01]);
    // Fine centre: round(0.5 * 16383) = 8192 -> msb 64, lsb 0
    assert_eq!(bytes[7], vec![0xB0, 0x06, 64]);
    assert_eq!(bytes[8], vec![0xB0, 0x26, 0]);
    assert_eq!(bytes[10], vec![0xB0, 0x64, 0x7F]);
    Ok(())
}
