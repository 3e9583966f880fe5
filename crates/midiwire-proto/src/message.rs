//! Raw wire messages.

use crate::time::SendTime;
use smallvec::SmallVec;

/// A status byte followed by its data bytes.
///
/// Channel and system common messages fit inline; only SysEx spills to the
/// heap.
pub type RawMessage = SmallVec<[u8; 3]>;

/// An encoded message paired with the time it should be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledMessage {
    pub message: RawMessage,
    pub time: SendTime,
}

impl ScheduledMessage {
    #[inline]
    pub fn new(message: RawMessage, time: SendTime) -> Self {
        Self { message, time }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.message
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.message.first().copied().unwrap_or(0)
    }
}

/// Builds a three-byte channel message.
#[inline]
pub(crate) fn channel_message(status: u8, data1: u8, data2: u8) -> RawMessage {
    smallvec::smallvec![status, data1, data2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_storage() {
        let msg = channel_message(0x90, 60, 100);
        assert!(!msg.spilled());
        assert_eq!(msg.as_slice(), &[0x90, 60, 100]);
    }

    #[test]
    fn test_scheduled_message_accessors() {
        let msg = ScheduledMessage::new(channel_message(0xB0, 7, 127), SendTime::At(5.0));
        assert_eq!(msg.status(), 0xB0);
        assert_eq!(msg.bytes(), &[0xB0, 7, 127]);
        assert_eq!(msg.time, SendTime::At(5.0));
    }
}
