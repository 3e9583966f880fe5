//! Outbound delivery.
//!
//! An [`OutputPort`](crate::OutputPort) encodes, then hands every message to
//! its [`Transmitter`] in production order. What happens next (recording,
//! queueing for another thread, writing to hardware) is the transmitter's
//! business.

use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use midiwire_proto::{RawMessage, ScheduledMessage, SendTime};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Sink for encoded messages.
///
/// `transmit` must not block waiting for `time`; delayed delivery is the
/// implementation's job.
pub trait Transmitter: Send + Sync {
    fn transmit(&self, bytes: &[u8], time: SendTime) -> Result<()>;

    /// Drops messages accepted but not yet delivered, where supported.
    fn clear(&self) {}
}

impl<T: Transmitter + ?Sized> Transmitter for Arc<T> {
    fn transmit(&self, bytes: &[u8], time: SendTime) -> Result<()> {
        (**self).transmit(bytes, time)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

impl<T: Transmitter + ?Sized> Transmitter for Box<T> {
    fn transmit(&self, bytes: &[u8], time: SendTime) -> Result<()> {
        (**self).transmit(bytes, time)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// Collects everything it is given. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransmitter {
    sent: Arc<Mutex<Vec<ScheduledMessage>>>,
}

impl RecordingTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    pub fn messages(&self) -> Vec<ScheduledMessage> {
        self.sent.lock().clone()
    }

    /// Just the bytes, oldest first.
    pub fn bytes(&self) -> Vec<Vec<u8>> {
        self.sent.lock().iter().map(|m| m.bytes().to_vec()).collect()
    }

    /// Empties the buffer, returning what it held.
    pub fn take(&self) -> Vec<ScheduledMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl Transmitter for RecordingTransmitter {
    fn transmit(&self, bytes: &[u8], time: SendTime) -> Result<()> {
        self.sent
            .lock()
            .push(ScheduledMessage::new(RawMessage::from_slice(bytes), time));
        Ok(())
    }

    /// Recorded messages count as delivered, so there is nothing to drop.
    fn clear(&self) {}
}

/// Hands messages to a consumer thread over a bounded queue.
///
/// Never blocks: a full queue is reported as [`Error::QueueFull`] and the
/// message is dropped.
#[derive(Debug, Clone)]
pub struct ChannelTransmitter {
    sender: Sender<ScheduledMessage>,
}

impl ChannelTransmitter {
    /// Creates the transmitter and the receiving end for the consumer.
    pub fn new(capacity: usize) -> (Self, Receiver<ScheduledMessage>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }

    /// Messages waiting in the queue.
    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}

impl Transmitter for ChannelTransmitter {
    fn transmit(&self, bytes: &[u8], time: SendTime) -> Result<()> {
        let message = ScheduledMessage::new(RawMessage::from_slice(bytes), time);
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => {
                debug!("MIDI output queue full, dropping {:02X?}", bytes);
                Error::QueueFull
            }
            TrySendError::Disconnected(_) => Error::TransmitterClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_transmitter_shares_buffer() {
        let recorder = RecordingTransmitter::new();
        let clone = recorder.clone();
        clone.transmit(&[0x90, 60, 64], SendTime::Now).unwrap();
        clone.transmit(&[0xF8], SendTime::At(5.0)).unwrap();

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.bytes(), vec![vec![0x90, 60, 64], vec![0xF8]]);
        assert_eq!(recorder.messages()[1].time, SendTime::At(5.0));

        let taken = recorder.take();
        assert_eq!(taken.len(), 2);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_channel_transmitter_queue_full() {
        let (tx, rx) = ChannelTransmitter::new(2);
        tx.transmit(&[0xFA], SendTime::Now).unwrap();
        tx.transmit(&[0xFC], SendTime::Now).unwrap();
        assert_eq!(tx.pending(), 2);
        assert!(matches!(
            tx.transmit(&[0xF8], SendTime::Now),
            Err(Error::QueueFull)
        ));

        assert_eq!(rx.recv().unwrap().bytes(), &[0xFA]);
        assert_eq!(rx.recv().unwrap().bytes(), &[0xFC]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_transmitter_closed() {
        let (tx, rx) = ChannelTransmitter::new(4);
        drop(rx);
        assert!(matches!(
            tx.transmit(&[0xFF], SendTime::Now),
            Err(Error::TransmitterClosed)
        ));
    }

    #[test]
    fn test_arc_transmitter_delegates() {
        let recorder = Arc::new(RecordingTransmitter::new());
        let shared: Arc<dyn Transmitter> = recorder.clone();
        shared.transmit(&[0xFE], SendTime::Now).unwrap();
        assert_eq!(recorder.bytes(), vec![vec![0xFE]]);
    }
}
