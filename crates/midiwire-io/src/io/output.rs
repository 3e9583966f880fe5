//! Hardware output: a dedicated thread owning the midir connection.
//!
//! `Now` messages are written as soon as the thread sees them. `At(t)`
//! messages wait in a time-ordered queue until the clock reaches `t`;
//! messages due at the same time keep their submission order.

use crate::error::{Error, Result};
use crate::system::SystemConfig;
use crate::transmit::Transmitter;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use midir::{MidiOutput, MidiOutputConnection};
use midiwire_proto::{Clock, RawMessage, ScheduledMessage, SendTime};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

const IDLE_WAIT_MS: f64 = 100.0;

enum OutputCommand {
    Send(ScheduledMessage),
    Clear,
    Shutdown,
}

struct Pending {
    due: f64,
    seq: u64,
    message: RawMessage,
}

// Reversed so the max-heap pops the earliest due, then the earliest submitted
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .total_cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Pending {}

/// Transmitter writing to a hardware output through midir.
pub struct MidirTransmitter {
    command_sender: Sender<OutputCommand>,
    device_name: String,
    is_connected: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MidirTransmitter {
    /// Spawns the output thread and connects it to the device at
    /// `device_index`. Returns once the connection succeeded or failed.
    pub fn connect(
        config: &SystemConfig,
        device_index: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let (command_sender, command_receiver) = bounded(config.queue_capacity);
        let (ready_sender, ready_receiver) = bounded::<Result<String>>(1);
        let is_connected = Arc::new(AtomicBool::new(false));
        let is_connected_clone = Arc::clone(&is_connected);
        let client_name = config.client_name.clone();

        let thread = thread::Builder::new()
            .name("midi-output-thread".to_string())
            .spawn(move || {
                let connection = match Self::connect_to_device(&client_name, device_index) {
                    Ok((connection, name)) => {
                        is_connected_clone.store(true, Ordering::SeqCst);
                        let _ = ready_sender.send(Ok(name));
                        connection
                    }
                    Err(e) => {
                        let _ = ready_sender.send(Err(e));
                        return;
                    }
                };
                Self::midi_output_thread(connection, command_receiver, clock);
                is_connected_clone.store(false, Ordering::SeqCst);
            })
            .map_err(|e| Error::MidiDevice(format!("Failed to spawn MIDI output thread: {e}")))?;

        let device_name = ready_receiver
            .recv()
            .map_err(|_| Error::TransmitterClosed)??;
        debug!("Connected MIDI output device {}: {}", device_index, device_name);

        Ok(Self {
            command_sender,
            device_name,
            is_connected,
            thread: Some(thread),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    fn connect_to_device(
        client_name: &str,
        device_index: usize,
    ) -> Result<(MidiOutputConnection, String)> {
        let midi_output = MidiOutput::new(client_name)?;

        let ports = midi_output.ports();
        let port = ports.get(device_index).ok_or_else(|| {
            Error::MidiDevice(format!("MIDI output device {} not found", device_index))
        })?;

        let port_name = midi_output
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {}", device_index));

        let connection = midi_output.connect(port, &format!("{client_name}-output"))?;

        Ok((connection, port_name))
    }

    fn midi_output_thread(
        mut connection: MidiOutputConnection,
        command_receiver: Receiver<OutputCommand>,
        clock: Arc<dyn Clock>,
    ) {
        let mut pending: BinaryHeap<Pending> = BinaryHeap::new();
        let mut seq: u64 = 0;

        loop {
            let now = clock.now_ms();
            while pending.peek().is_some_and(|p| p.due <= now) {
                if let Some(due) = pending.pop() {
                    Self::write(&mut connection, &due.message);
                }
            }

            let wait_ms = match pending.peek() {
                Some(next) if !(next.due - now).is_nan() => {
                    (next.due - now).clamp(0.0, IDLE_WAIT_MS)
                }
                Some(_) => 0.0,
                None => IDLE_WAIT_MS,
            };

            match command_receiver.recv_timeout(Duration::from_secs_f64(wait_ms / 1000.0)) {
                Ok(OutputCommand::Send(message)) => match message.time {
                    SendTime::Now => Self::write(&mut connection, &message.message),
                    SendTime::At(due) => {
                        pending.push(Pending {
                            due,
                            seq,
                            message: message.message,
                        });
                        seq = seq.wrapping_add(1);
                    }
                },
                Ok(OutputCommand::Clear) => {
                    debug!("Cleared {} scheduled MIDI message(s)", pending.len());
                    pending.clear();
                }
                Ok(OutputCommand::Shutdown) => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        drop(connection);
    }

    fn write(connection: &mut MidiOutputConnection, bytes: &[u8]) {
        if let Err(e) = connection.send(bytes) {
            warn!("Failed to send MIDI message {:02X?}: {}", bytes, e);
        }
    }
}

impl Transmitter for MidirTransmitter {
    fn transmit(&self, bytes: &[u8], time: SendTime) -> Result<()> {
        let message = ScheduledMessage::new(RawMessage::from_slice(bytes), time);
        self.command_sender
            .try_send(OutputCommand::Send(message))
            .map_err(|e| match e {
                TrySendError::Full(_) => {
                    debug!("MIDI output thread queue full, dropping {:02X?}", bytes);
                    Error::QueueFull
                }
                TrySendError::Disconnected(_) => Error::TransmitterClosed,
            })
    }

    fn clear(&self) {
        if self.command_sender.try_send(OutputCommand::Clear).is_err() {
            debug!("Cannot clear MIDI output: thread not accepting commands");
        }
    }
}

impl Drop for MidirTransmitter {
    fn drop(&mut self) {
        let _ = self.command_sender.send(OutputCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(due: f64, seq: u64) -> Pending {
        Pending {
            due,
            seq,
            message: RawMessage::from_slice(&[0xF8]),
        }
    }

    #[test]
    fn test_pending_order() {
        let mut heap = BinaryHeap::new();
        heap.push(pending(30.0, 0));
        heap.push(pending(10.0, 1));
        heap.push(pending(10.0, 2));
        heap.push(pending(20.0, 3));

        let order: Vec<(f64, u64)> = std::iter::from_fn(|| heap.pop())
            .map(|p| (p.due, p.seq))
            .collect();
        assert_eq!(order, vec![(10.0, 1), (10.0, 2), (20.0, 3), (30.0, 0)]);
    }
}
