//! Hardware input: forwards midir callbacks into an [`InputPort`].

use crate::error::{Error, Result};
use crate::port::{ConnectionState, InputPort};
use crate::system::SystemConfig;
use midir::{Ignore, MidiInput, MidiInputConnection};
use midiwire_proto::Clock;
use std::sync::Arc;
use tracing::debug;

/// A live connection from a hardware input to a port.
///
/// Messages are stamped with the system clock on arrival, so inbound and
/// outbound times share one domain. Dropping the connection closes it.
pub struct MidirInput {
    connection: Option<MidiInputConnection<()>>,
    port: Arc<InputPort>,
    device_name: String,
}

impl MidirInput {
    /// System exclusive messages are only let through when the system was
    /// built with sysex enabled.
    pub fn connect(
        config: &SystemConfig,
        device_index: usize,
        port: Arc<InputPort>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut midi_input = MidiInput::new(&config.client_name)?;
        midi_input.ignore(if config.sysex_enabled {
            Ignore::None
        } else {
            Ignore::Sysex
        });

        let ports = midi_input.ports();
        let device = ports.get(device_index).ok_or_else(|| {
            Error::MidiDevice(format!("MIDI input device {} not found", device_index))
        })?;

        let device_name = midi_input
            .port_name(device)
            .unwrap_or_else(|_| format!("Device {}", device_index));

        let target = Arc::clone(&port);
        let connection = midi_input.connect(
            device,
            &format!("{}-input", config.client_name),
            move |_stamp, message, _| {
                target.receive(message, clock.now_ms());
            },
            (),
        )?;

        port.meta().set_connection(ConnectionState::Open);
        debug!(
            "Connected MIDI input device {} to port {}: {}",
            device_index,
            port.id(),
            device_name
        );

        Ok(Self {
            connection: Some(connection),
            port,
            device_name,
        })
    }

    pub fn port(&self) -> &Arc<InputPort> {
        &self.port
    }

    pub fn port_id(&self) -> &str {
        self.port.id()
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Drop for MidirInput {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
            self.port.meta().set_connection(ConnectionState::Closed);
            debug!("Closed MIDI input device {}", self.device_name);
        }
    }
}
