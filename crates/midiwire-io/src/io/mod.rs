//! Hardware MIDI I/O.
//!
//! Device enumeration and connections via midir. Requires the `midi-io`
//! feature.

mod input;
mod output;

pub use input::MidirInput;
pub use output::MidirTransmitter;

use crate::error::{Error, Result};
use midir::{MidiInput, MidiOutput};

/// A device as reported by the host MIDI API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Position in the host's port list at enumeration time.
    pub index: usize,
    pub name: String,
}

pub fn list_input_devices(client_name: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();
    if let Ok(midi_input) = MidiInput::new(&format!("{client_name}-device-list")) {
        for (index, port) in midi_input.ports().iter().enumerate() {
            let name = midi_input
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Device {}", index));
            devices.push(DeviceInfo { index, name });
        }
    }
    devices
}

pub fn list_output_devices(client_name: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();
    if let Ok(midi_output) = MidiOutput::new(&format!("{client_name}-device-list")) {
        for (index, port) in midi_output.ports().iter().enumerate() {
            let name = midi_output
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Device {}", index));
            devices.push(DeviceInfo { index, name });
        }
    }
    devices
}

/// First device whose name contains `name`, ignoring case.
pub(crate) fn find_device(devices: Vec<DeviceInfo>, name: &str) -> Result<DeviceInfo> {
    let query = name.to_lowercase();
    devices
        .into_iter()
        .find(|d| d.name.to_lowercase().contains(&query))
        .ok_or_else(|| Error::MidiDevice(format!("No MIDI device found matching '{}'", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_device_substring() {
        let devices = vec![
            DeviceInfo {
                index: 0,
                name: "IAC Driver Bus 1".into(),
            },
            DeviceInfo {
                index: 1,
                name: "Arturia KeyStep".into(),
            },
        ];
        assert_eq!(find_device(devices.clone(), "keystep").unwrap().index, 1);
        assert_eq!(find_device(devices.clone(), "Bus").unwrap().index, 0);
        assert!(matches!(
            find_device(devices, "Launchpad"),
            Err(Error::MidiDevice(_))
        ));
    }
}
