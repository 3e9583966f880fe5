//! The MIDI system handle: port registry, configuration and clock.
//!
//! ## Quick Start
//!
//! ```
//! use midiwire_io::{MidiSystem, RecordingTransmitter};
//! use midiwire_proto::{ChannelSpec, TimeSpec};
//!
//! let midi = MidiSystem::builder().build()?;
//!
//! let input = midi.create_input_port("Keyboard");
//! input.on("noteon", &ChannelSpec::All, |event| {
//!     println!("{:?}", event.note());
//! })?;
//! input.receive(&[0x90, 60, 100], 0.0);
//!
//! let recorder = RecordingTransmitter::new();
//! let output = midi.create_output_port("Synth", recorder.clone());
//! output.send_pitch_bend(0.0, &ChannelSpec::One(1), TimeSpec::Now)?;
//! assert_eq!(recorder.bytes(), vec![vec![0xE0, 0x00, 0x40]]);
//! # Ok::<(), midiwire_io::Error>(())
//! ```

mod builder;

pub use builder::{MidiSystemBuilder, SystemConfig, DEFAULT_CLIENT_NAME, DEFAULT_QUEUE_CAPACITY};

use crate::error::{Error, Result};
use crate::port::{
    ConnectionState, InputPort, OutputPort, PortDescriptor, PortInfo, PortMeta, PortState,
    PortType,
};
use crate::transmit::{ChannelTransmitter, Transmitter};
use arc_swap::ArcSwap;
use crossbeam_channel::Receiver;
use midiwire_proto::{Clock, Encoder, ScheduledMessage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[cfg(feature = "midi-io")]
use crate::io::{DeviceInfo, MidirInput, MidirTransmitter};

// ============================================================================
// MidiSystem - Main Entry Point
// ============================================================================

/// Owns every port created through it. Clone is cheap (Arc internally).
///
/// There is no global instance; pass the handle to whatever needs ports.
#[derive(Clone)]
pub struct MidiSystem {
    inner: Arc<MidiSystemInner>,
}

pub(crate) struct MidiSystemInner {
    pub(crate) config: SystemConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) inputs: ArcSwap<Vec<Arc<InputPort>>>,
    pub(crate) outputs: ArcSwap<Vec<Arc<OutputPort>>>,
    pub(crate) next_input: AtomicUsize,
    pub(crate) next_output: AtomicUsize,
    /// Live hardware input connections; dropping one closes it.
    #[cfg(feature = "midi-io")]
    pub(crate) hardware_inputs: parking_lot::Mutex<Vec<MidirInput>>,
}

impl std::fmt::Debug for MidiSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiSystem")
            .field("config", &self.inner.config)
            .field("inputs", &self.inner.inputs.load().len())
            .field("outputs", &self.inner.outputs.load().len())
            .finish()
    }
}

impl MidiSystem {
    pub fn builder() -> MidiSystemBuilder {
        MidiSystemBuilder::default()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    pub fn sysex_enabled(&self) -> bool {
        self.inner.config.sysex_enabled
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    /// Current reading of the system clock in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.inner.clock.now_ms()
    }

    // ==================== Port Management ====================

    /// Creates an input port. Feed it with [`InputPort::receive`].
    pub fn create_input_port(&self, descriptor: impl Into<PortDescriptor>) -> Arc<InputPort> {
        let index = self.inner.next_input.fetch_add(1, Ordering::Relaxed);
        let descriptor = descriptor.into();
        let name = descriptor.name.clone();
        let port = Arc::new(InputPort::new(
            PortMeta::new(format!("input-{index}"), descriptor, PortType::Input),
            self.clock(),
        ));
        self.inner.inputs.rcu(|ports| {
            let mut ports = (**ports).clone();
            ports.push(Arc::clone(&port));
            ports
        });

        tracing::debug!("Created MIDI input port {}: {}", index, name);
        port
    }

    /// Creates an output port delivering to `transmitter`.
    pub fn create_output_port(
        &self,
        descriptor: impl Into<PortDescriptor>,
        transmitter: impl Transmitter + 'static,
    ) -> Arc<OutputPort> {
        let index = self.inner.next_output.fetch_add(1, Ordering::Relaxed);
        let descriptor = descriptor.into();
        let name = descriptor.name.clone();
        let port = Arc::new(OutputPort::new(
            PortMeta::new(format!("output-{index}"), descriptor, PortType::Output),
            Encoder::new(self.inner.config.sysex_enabled),
            self.clock(),
            Box::new(transmitter),
        ));
        self.inner.outputs.rcu(|ports| {
            let mut ports = (**ports).clone();
            ports.push(Arc::clone(&port));
            ports
        });

        tracing::debug!("Created MIDI output port {}: {}", index, name);
        port
    }

    /// Creates an output port whose messages land on a bounded queue of
    /// `queue_capacity` for a consumer thread to drain.
    pub fn create_queued_output_port(
        &self,
        descriptor: impl Into<PortDescriptor>,
    ) -> (Arc<OutputPort>, Receiver<ScheduledMessage>) {
        let (transmitter, receiver) = ChannelTransmitter::new(self.inner.config.queue_capacity);
        (self.create_output_port(descriptor, transmitter), receiver)
    }

    pub fn input(&self, id: &str) -> Option<Arc<InputPort>> {
        self.inner.inputs.load().iter().find(|p| p.id() == id).cloned()
    }

    pub fn output(&self, id: &str) -> Option<Arc<OutputPort>> {
        self.inner.outputs.load().iter().find(|p| p.id() == id).cloned()
    }

    /// First input whose name contains `name`, ignoring case.
    pub fn input_by_name(&self, name: &str) -> Option<Arc<InputPort>> {
        self.inner
            .inputs
            .load()
            .iter()
            .find(|p| p.meta().name_matches(name))
            .cloned()
    }

    /// First output whose name contains `name`, ignoring case.
    pub fn output_by_name(&self, name: &str) -> Option<Arc<OutputPort>> {
        self.inner
            .outputs
            .load()
            .iter()
            .find(|p| p.meta().name_matches(name))
            .cloned()
    }

    pub fn list_inputs(&self) -> Vec<PortInfo> {
        self.inner.inputs.load().iter().map(|p| p.info()).collect()
    }

    pub fn list_outputs(&self) -> Vec<PortInfo> {
        self.inner.outputs.load().iter().map(|p| p.info()).collect()
    }

    /// Inputs followed by outputs.
    pub fn list_ports(&self) -> Vec<PortInfo> {
        let mut ports = self.list_inputs();
        ports.extend(self.list_outputs());
        ports
    }

    /// Unregisters an input. Outstanding handles see it as disconnected and
    /// closed; any hardware connection feeding it is dropped.
    pub fn remove_input_port(&self, id: &str) -> Result<()> {
        let port = self
            .input(id)
            .ok_or_else(|| Error::PortNotFound(id.to_string()))?;
        self.inner
            .inputs
            .rcu(|ports| ports.iter().filter(|p| p.id() != id).cloned().collect::<Vec<_>>());

        #[cfg(feature = "midi-io")]
        self.inner
            .hardware_inputs
            .lock()
            .retain(|connection| connection.port_id() != id);

        port.meta().set_state(PortState::Disconnected);
        port.meta().set_connection(ConnectionState::Closed);
        tracing::debug!("Removed MIDI input port {}", id);
        Ok(())
    }

    /// Unregisters an output. Pending scheduled messages are cleared.
    pub fn remove_output_port(&self, id: &str) -> Result<()> {
        let port = self
            .output(id)
            .ok_or_else(|| Error::PortNotFound(id.to_string()))?;
        self.inner
            .outputs
            .rcu(|ports| ports.iter().filter(|p| p.id() != id).cloned().collect::<Vec<_>>());

        port.clear();
        port.meta().set_state(PortState::Disconnected);
        port.meta().set_connection(ConnectionState::Closed);
        tracing::debug!("Removed MIDI output port {}", id);
        Ok(())
    }

    // ==================== Hardware I/O ====================

    #[cfg(feature = "midi-io")]
    pub fn list_input_devices(&self) -> Vec<DeviceInfo> {
        crate::io::list_input_devices(&self.inner.config.client_name)
    }

    #[cfg(feature = "midi-io")]
    pub fn list_output_devices(&self) -> Vec<DeviceInfo> {
        crate::io::list_output_devices(&self.inner.config.client_name)
    }

    /// Opens the first hardware input whose name contains `name` and returns
    /// the port its messages are delivered to.
    #[cfg(feature = "midi-io")]
    pub fn connect_input_device(&self, name: &str) -> Result<Arc<InputPort>> {
        let device = crate::io::find_device(self.list_input_devices(), name)?;
        let port = self.create_input_port(device.name.as_str());
        port.meta().set_connection(ConnectionState::Pending);

        match MidirInput::connect(
            &self.inner.config,
            device.index,
            Arc::clone(&port),
            self.clock(),
        ) {
            Ok(connection) => {
                self.inner.hardware_inputs.lock().push(connection);
                Ok(port)
            }
            Err(e) => {
                let _ = self.remove_input_port(port.id());
                Err(e)
            }
        }
    }

    /// Opens the first hardware output whose name contains `name` behind a
    /// new output port.
    #[cfg(feature = "midi-io")]
    pub fn connect_output_device(&self, name: &str) -> Result<Arc<OutputPort>> {
        let device = crate::io::find_device(self.list_output_devices(), name)?;
        let transmitter = MidirTransmitter::connect(&self.inner.config, device.index, self.clock())?;
        Ok(self.create_output_port(device.name.as_str(), transmitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmit::RecordingTransmitter;
    use midiwire_proto::{ChannelSpec, SendTime, TimeSpec};

    #[test]
    fn test_port_ids_and_lookup() {
        let midi = MidiSystem::builder().build().unwrap();
        let keys = midi.create_input_port(PortDescriptor::new("Keys").manufacturer("Roland"));
        let pads = midi.create_input_port("Pads");
        let synth = midi.create_output_port("Synth", RecordingTransmitter::new());

        assert_eq!(keys.id(), "input-0");
        assert_eq!(pads.id(), "input-1");
        assert_eq!(synth.id(), "output-0");
        assert_eq!(keys.manufacturer(), "Roland");

        assert!(Arc::ptr_eq(&midi.input("input-1").unwrap(), &pads));
        assert!(Arc::ptr_eq(&midi.input_by_name("KEY").unwrap(), &keys));
        assert!(Arc::ptr_eq(&midi.output_by_name("synth").unwrap(), &synth));
        assert!(midi.output("input-0").is_none());
        assert!(midi.input_by_name("drums").is_none());
    }

    #[test]
    fn test_list_ports() {
        let midi = MidiSystem::builder().build().unwrap();
        midi.create_input_port("In");
        midi.create_output_port("Out", RecordingTransmitter::new());

        let inputs = midi.list_inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].port_type, PortType::Input);
        assert_eq!(midi.list_outputs()[0].name, "Out");
        assert_eq!(midi.list_ports().len(), 2);
    }

    #[test]
    fn test_remove_port() {
        let midi = MidiSystem::builder().build().unwrap();
        let input = midi.create_input_port("In");
        let output = midi.create_output_port("Out", RecordingTransmitter::new());

        midi.remove_input_port("input-0").unwrap();
        midi.remove_output_port("output-0").unwrap();
        assert!(midi.list_ports().is_empty());
        assert_eq!(input.state(), PortState::Disconnected);
        assert_eq!(output.connection(), ConnectionState::Closed);
        assert!(matches!(
            midi.remove_input_port("input-0"),
            Err(Error::PortNotFound(_))
        ));

        // Ids are not reused
        assert_eq!(midi.create_input_port("Again").id(), "input-1");
    }

    #[test]
    fn test_output_ports_inherit_sysex() {
        let midi = MidiSystem::builder().sysex(true).build().unwrap();
        let recorder = RecordingTransmitter::new();
        let out = midi.create_output_port("Out", recorder.clone());
        assert!(out.sysex_enabled());
        out.send_sysex(&[0x00, 0x20, 0x33], &[0x10], TimeSpec::Now)
            .unwrap();
        assert_eq!(recorder.bytes()[0], vec![0xF0, 0x00, 0x20, 0x33, 0x10, 0xF7]);
    }

    #[test]
    fn test_queued_output_port() {
        let midi = MidiSystem::builder().queue_capacity(2).build().unwrap();
        let (out, rx) = midi.create_queued_output_port("Queue");
        out.send_program_change(5, &ChannelSpec::One(2), TimeSpec::Now)
            .unwrap();
        // Two messages into a queue with one free slot
        assert!(matches!(
            out.send_program_change(6, &ChannelSpec::List(vec![1, 2]), TimeSpec::Now),
            Err(Error::QueueFull)
        ));

        let first = rx.recv().unwrap();
        assert_eq!(first.bytes(), &[0xC1, 5]);
        assert_eq!(first.time, SendTime::Now);
        assert_eq!(rx.recv().unwrap().bytes(), &[0xC0, 6]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clone_shares_ports() {
        let midi = MidiSystem::builder().build().unwrap();
        let other = midi.clone();
        other.create_input_port("Shared");
        assert_eq!(midi.list_inputs().len(), 1);
    }
}
