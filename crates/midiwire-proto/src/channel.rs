//! MIDI channels and channel sets.

use crate::error::{Error, Result};
use crate::tables::MIDI_CHANNEL_COUNT;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Channels resolved from a [`ChannelSpec`], inline for the common case.
pub type Channels = SmallVec<[Channel; 16]>;

/// A MIDI channel, 1-16.
///
/// On the wire the channel is carried as `channel - 1` in the low nibble of
/// the status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Channel(u8);

impl Channel {
    pub fn new(channel: i64) -> Result<Self> {
        if (1..=MIDI_CHANNEL_COUNT as i64).contains(&channel) {
            Ok(Self(channel as u8))
        } else {
            Err(Error::InvalidChannel(channel))
        }
    }

    /// Channel from the low nibble of a status byte.
    #[inline]
    pub fn from_status(status: u8) -> Self {
        Self((status & 0x0F) + 1)
    }

    #[inline]
    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based wire value.
    #[inline]
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    #[inline]
    pub fn status(self, command: u8) -> u8 {
        (command << 4) | (self.0 - 1)
    }

    pub fn all() -> impl Iterator<Item = Channel> {
        (1..=MIDI_CHANNEL_COUNT).map(Channel)
    }
}

impl TryFrom<u8> for Channel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value as i64)
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> u8 {
        channel.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A selection of channels: all 16, one, or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelSpec {
    #[default]
    All,
    One(i64),
    List(Vec<i64>),
}

impl ChannelSpec {
    /// Resolves to concrete channels, failing on the first invalid entry.
    pub fn expand(&self) -> Result<Channels> {
        match self {
            ChannelSpec::All => Ok(Channel::all().collect()),
            ChannelSpec::One(ch) => Ok(smallvec::smallvec![Channel::new(*ch)?]),
            ChannelSpec::List(list) => list.iter().map(|&ch| Channel::new(ch)).collect(),
        }
    }
}

impl From<Channel> for ChannelSpec {
    fn from(channel: Channel) -> Self {
        ChannelSpec::One(channel.0 as i64)
    }
}

impl From<u8> for ChannelSpec {
    fn from(channel: u8) -> Self {
        ChannelSpec::One(channel as i64)
    }
}

impl From<Vec<u8>> for ChannelSpec {
    fn from(list: Vec<u8>) -> Self {
        ChannelSpec::List(list.into_iter().map(i64::from).collect())
    }
}

impl<const N: usize> From<[u8; N]> for ChannelSpec {
    fn from(list: [u8; N]) -> Self {
        ChannelSpec::List(list.iter().map(|&c| c as i64).collect())
    }
}

impl FromStr for ChannelSpec {
    type Err = Error;

    /// Parses `"all"`, `"3"` or a comma separated list such as `"1,2,10"`.
    /// A list containing `all` selects every channel.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.iter().any(|p| p.eq_ignore_ascii_case("all")) {
            return Ok(ChannelSpec::All);
        }
        let list = parts
            .iter()
            .map(|p| {
                p.parse::<i64>()
                    .map_err(|_| Error::InvalidChannelSpec(s.to_string()))
                    .and_then(|ch| Channel::new(ch).map(|c| c.0 as i64))
            })
            .collect::<Result<Vec<_>>>()?;
        match list.as_slice() {
            [one] => Ok(ChannelSpec::One(*one)),
            _ => Ok(ChannelSpec::List(list)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bounds() {
        assert!(Channel::new(0).is_err());
        assert_eq!(Channel::new(1).unwrap().number(), 1);
        assert_eq!(Channel::new(16).unwrap().index(), 15);
        assert_eq!(Channel::new(17), Err(Error::InvalidChannel(17)));
    }

    #[test]
    fn test_status_nibble() {
        let ch = Channel::new(3).unwrap();
        assert_eq!(ch.status(0x9), 0x92);
        assert_eq!(Channel::from_status(0x92), ch);
        assert_eq!(Channel::from_status(0xEF).number(), 16);
    }

    #[test]
    fn test_expand_all() {
        let channels = ChannelSpec::All.expand().unwrap();
        assert_eq!(channels.len(), 16);
        assert_eq!(channels[0].number(), 1);
        assert_eq!(channels[15].number(), 16);
    }

    #[test]
    fn test_expand_keeps_list_order() {
        let channels = ChannelSpec::from([10u8, 2, 5]).expand().unwrap();
        let numbers: Vec<u8> = channels.iter().map(|c| c.number()).collect();
        assert_eq!(numbers, vec![10, 2, 5]);
    }

    #[test]
    fn test_expand_rejects_any_invalid_entry() {
        assert_eq!(
            ChannelSpec::from([1u8, 17]).expand(),
            Err(Error::InvalidChannel(17))
        );
        assert_eq!(ChannelSpec::One(0).expand(), Err(Error::InvalidChannel(0)));
    }

    #[test]
    fn test_parse() {
        assert_eq!("all".parse(), Ok(ChannelSpec::All));
        assert_eq!("7".parse(), Ok(ChannelSpec::One(7)));
        assert_eq!("1, 2,all".parse(), Ok(ChannelSpec::All));
        assert_eq!("1,9".parse(), Ok(ChannelSpec::List(vec![1, 9])));
        assert!("0".parse::<ChannelSpec>().is_err());
        assert_eq!(
            "x".parse::<ChannelSpec>(),
            Err(Error::InvalidChannelSpec("x".into()))
        );
    }
}
