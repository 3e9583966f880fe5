//! Registered (RPN) and non-registered (NRPN) parameter sequences.
//!
//! Each call emits, per channel and without interleaving channels:
//!
//! 1. parameter select (CC 101/100 for RPN, CC 99/98 for NRPN)
//! 2. data entry (CC 6, then CC 38 when a second byte is given) or a
//!    data increment/decrement (CC 96/97)
//! 3. deselect (CC 101/100 set to 127)
//!
//! Sequences are not atomic: another writer on the same channel between
//! select and deselect will corrupt both.

use crate::channel::{Channel, ChannelSpec};
use crate::encode::Encoder;
use crate::error::{data_byte, Error, Result};
use crate::message::{channel_message, ScheduledMessage};
use crate::tables::{cc, command, RegisteredParameter};
use crate::time::SendTime;
use crate::utils::split_14bit;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

/// A parameter addressed by table entry, table name or raw `[msb, lsb]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterId {
    Registered(RegisteredParameter),
    Name(String),
    Bytes([i64; 2]),
}

impl ParameterId {
    fn resolve(&self) -> Result<[u8; 2]> {
        match self {
            ParameterId::Registered(p) => Ok(p.to_bytes()),
            ParameterId::Name(name) => Ok(name.parse::<RegisteredParameter>()?.to_bytes()),
            ParameterId::Bytes([msb, lsb]) => Ok([
                data_byte("parameter msb", *msb)?,
                data_byte("parameter lsb", *lsb)?,
            ]),
        }
    }
}

impl From<RegisteredParameter> for ParameterId {
    fn from(p: RegisteredParameter) -> Self {
        ParameterId::Registered(p)
    }
}

impl From<&str> for ParameterId {
    fn from(s: &str) -> Self {
        ParameterId::Name(s.to_string())
    }
}

impl From<[u8; 2]> for ParameterId {
    fn from([msb, lsb]: [u8; 2]) -> Self {
        ParameterId::Bytes([msb as i64, lsb as i64])
    }
}

/// Data entry value: a mandatory coarse byte and an optional fine byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParameterValue {
    pub msb: i64,
    pub lsb: Option<i64>,
}

impl ParameterValue {
    pub fn new(msb: i64, lsb: Option<i64>) -> Self {
        Self { msb, lsb }
    }
}

impl From<u8> for ParameterValue {
    fn from(msb: u8) -> Self {
        Self::new(msb as i64, None)
    }
}

impl From<i64> for ParameterValue {
    fn from(msb: i64) -> Self {
        Self::new(msb, None)
    }
}

impl From<[u8; 2]> for ParameterValue {
    fn from([msb, lsb]: [u8; 2]) -> Self {
        Self::new(msb as i64, Some(lsb as i64))
    }
}

impl From<(i64, i64)> for ParameterValue {
    fn from((msb, lsb): (i64, i64)) -> Self {
        Self::new(msb, Some(lsb))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registry {
    Registered,
    NonRegistered,
}

impl Registry {
    fn select_controllers(self) -> (u8, u8) {
        match self {
            Registry::Registered => (cc::RPN_COARSE, cc::RPN_FINE),
            Registry::NonRegistered => (cc::NRPN_COARSE, cc::NRPN_FINE),
        }
    }
}

/// Control changes between select and deselect.
type Body = SmallVec<[(u8, u8); 2]>;

fn data_entry(value: ParameterValue) -> Result<Body> {
    let msb = data_byte("parameter value msb", value.msb)?;
    let mut body: Body = smallvec::smallvec![(cc::DATA_ENTRY_COARSE, msb)];
    match value.lsb {
        Some(lsb) if (0..=127).contains(&lsb) => body.push((cc::DATA_ENTRY_FINE, lsb as u8)),
        Some(lsb) => debug!("Skipping parameter value lsb {lsb} outside [0, 127]"),
        None => {}
    }
    Ok(body)
}

fn push_sequence(
    out: &mut Vec<ScheduledMessage>,
    registry: Registry,
    id: [u8; 2],
    body: &Body,
    ch: Channel,
    time: SendTime,
) {
    let status = ch.status(command::CONTROL_CHANGE);
    let (coarse, fine) = registry.select_controllers();
    let mut emit = |controller: u8, value: u8| {
        out.push(ScheduledMessage::new(
            channel_message(status, controller, value),
            time,
        ))
    };

    emit(coarse, id[0]);
    emit(fine, id[1]);
    for &(controller, value) in body {
        emit(controller, value);
    }
    emit(cc::RPN_COARSE, cc::PARAMETER_NULL);
    emit(cc::RPN_FINE, cc::PARAMETER_NULL);
}

fn sequence(
    registry: Registry,
    id: [u8; 2],
    body: Body,
    channels: &ChannelSpec,
    time: SendTime,
) -> Result<Vec<ScheduledMessage>> {
    let channels = channels.expand()?;
    let mut out = Vec::with_capacity(channels.len() * (4 + body.len()));
    for &ch in &channels {
        push_sequence(&mut out, registry, id, &body, ch, time);
    }
    trace!(
        "{:?} parameter {:02X?} on {} channel(s): {} messages",
        registry,
        id,
        channels.len(),
        out.len()
    );
    Ok(out)
}

fn check_range(what: &'static str, value: i64) -> Result<i64> {
    data_byte(what, value).map(i64::from)
}

impl Encoder {
    pub fn set_registered_parameter(
        &self,
        parameter: &ParameterId,
        value: ParameterValue,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let id = parameter.resolve()?;
        sequence(Registry::Registered, id, data_entry(value)?, channels, time)
    }

    pub fn set_non_registered_parameter(
        &self,
        parameter: [i64; 2],
        value: ParameterValue,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let id = ParameterId::Bytes(parameter).resolve()?;
        sequence(Registry::NonRegistered, id, data_entry(value)?, channels, time)
    }

    pub fn increment_registered_parameter(
        &self,
        parameter: &ParameterId,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let id = parameter.resolve()?;
        let body = smallvec::smallvec![(cc::DATA_INCREMENT, 0)];
        sequence(Registry::Registered, id, body, channels, time)
    }

    pub fn decrement_registered_parameter(
        &self,
        parameter: &ParameterId,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let id = parameter.resolve()?;
        let body = smallvec::smallvec![(cc::DATA_DECREMENT, 0)];
        sequence(Registry::Registered, id, body, channels, time)
    }

    /// Pitch bend sensitivity in semitones and cents.
    pub fn set_pitch_bend_range(
        &self,
        semitones: i64,
        cents: i64,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let value = ParameterValue::new(
            check_range("semitones", semitones)?,
            Some(check_range("cents", cents)?),
        );
        self.set_registered_parameter(
            &RegisteredParameter::PitchBendRange.into(),
            value,
            channels,
            time,
        )
    }

    pub fn set_modulation_range(
        &self,
        semitones: i64,
        cents: i64,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let value = ParameterValue::new(
            check_range("semitones", semitones)?,
            Some(check_range("cents", cents)?),
        );
        self.set_registered_parameter(
            &RegisteredParameter::ModulationRange.into(),
            value,
            channels,
            time,
        )
    }

    /// Master tuning in semitones, strictly between -65 and 64.
    ///
    /// The whole part goes out through channel coarse tuning (offset by 64)
    /// and the fractional part through channel fine tuning as a 14-bit value.
    /// Each channel gets its coarse sequence followed by its fine sequence.
    pub fn set_master_tuning(
        &self,
        value: f64,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        if !(value > -65.0 && value < 64.0) {
            return Err(Error::OutOfRange {
                what: "master tuning",
                value,
                min: -65.0,
                max: 64.0,
            });
        }
        let whole = value.floor();
        let coarse = data_byte("coarse tuning", whole as i64 + 64)?;
        let fine = (((value - whole) + 1.0) / 2.0 * 16383.0).round() as u16;
        let (fine_msb, fine_lsb) = split_14bit(fine);

        let coarse_id = RegisteredParameter::ChannelCoarseTuning.to_bytes();
        let fine_id = RegisteredParameter::ChannelFineTuning.to_bytes();
        let coarse_body: Body = smallvec::smallvec![(cc::DATA_ENTRY_COARSE, coarse)];
        let fine_body: Body = smallvec::smallvec![
            (cc::DATA_ENTRY_COARSE, fine_msb),
            (cc::DATA_ENTRY_FINE, fine_lsb)
        ];

        let channels = channels.expand()?;
        let mut out = Vec::with_capacity(channels.len() * 11);
        for &ch in &channels {
            push_sequence(&mut out, Registry::Registered, coarse_id, &coarse_body, ch, time);
            push_sequence(&mut out, Registry::Registered, fine_id, &fine_body, ch, time);
        }
        trace!("Master tuning {value} on {} channel(s)", channels.len());
        Ok(out)
    }

    pub fn set_tuning_program(
        &self,
        program: i64,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let program = check_range("tuning program", program)?;
        self.set_registered_parameter(
            &RegisteredParameter::TuningProgram.into(),
            program.into(),
            channels,
            time,
        )
    }

    pub fn set_tuning_bank(
        &self,
        bank: i64,
        channels: &ChannelSpec,
        time: SendTime,
    ) -> Result<Vec<ScheduledMessage>> {
        let bank = check_range("tuning bank", bank)?;
        self.set_registered_parameter(
            &RegisteredParameter::TuningBank.into(),
            bank.into(),
            channels,
            time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ccs(messages: &[ScheduledMessage]) -> Vec<(u8, u8)> {
        messages
            .iter()
            .map(|m| (m.bytes()[1], m.bytes()[2]))
            .collect()
    }

    fn one(ch: i64) -> ChannelSpec {
        ChannelSpec::One(ch)
    }

    #[test]
    fn test_pitch_bend_range_sequence() {
        let enc = Encoder::default();
        let out = enc
            .set_registered_parameter(&"pitchbendrange".into(), [2, 0].into(), &one(1), SendTime::Now)
            .unwrap();
        assert_eq!(
            ccs(&out),
            vec![(0x65, 0), (0x64, 0), (0x06, 2), (0x26, 0), (0x65, 127), (0x64, 127)]
        );
        assert!(out.iter().all(|m| m.status() == 0xB0));
    }

    #[test]
    fn test_msb_only_value_has_no_fine_entry() {
        let enc = Encoder::default();
        let out = enc
            .set_registered_parameter(
                &RegisteredParameter::TuningProgram.into(),
                5u8.into(),
                &one(4),
                SendTime::At(10.0),
            )
            .unwrap();
        assert_eq!(
            ccs(&out),
            vec![(0x65, 0), (0x64, 3), (0x06, 5), (0x65, 127), (0x64, 127)]
        );
        assert!(out.iter().all(|m| m.status() == 0xB3 && m.time == SendTime::At(10.0)));
    }

    #[test]
    fn test_out_of_range_lsb_is_skipped() {
        let enc = Encoder::default();
        let out = enc
            .set_registered_parameter(
                &"pitchbendrange".into(),
                (2, 300).into(),
                &one(1),
                SendTime::Now,
            )
            .unwrap();
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_channels_are_not_interleaved() {
        let enc = Encoder::default();
        let out = enc
            .set_registered_parameter(
                &"pitchbendrange".into(),
                [2, 0].into(),
                &[1u8, 2].into(),
                SendTime::Now,
            )
            .unwrap();
        assert_eq!(out.len(), 12);
        assert!(out[..6].iter().all(|m| m.status() == 0xB0));
        assert!(out[6..].iter().all(|m| m.status() == 0xB1));
    }

    #[test]
    fn test_unknown_parameter_name() {
        let enc = Encoder::default();
        assert_eq!(
            enc.set_registered_parameter(&"vibrato".into(), 1u8.into(), &one(1), SendTime::Now),
            Err(Error::UnknownParameter("vibrato".into()))
        );
    }

    #[test]
    fn test_invalid_msb_produces_nothing() {
        let enc = Encoder::default();
        assert!(enc
            .set_registered_parameter(&"gain".into(), 128i64.into(), &one(1), SendTime::Now)
            .is_err());
        assert!(enc
            .set_registered_parameter(&[0u8, 0].into(), 1u8.into(), &one(0), SendTime::Now)
            .is_err());
    }

    #[test]
    fn test_raw_registered_parameter_bytes() {
        let enc = Encoder::default();
        let out = enc
            .set_registered_parameter(&[0x3D, 0x02].into(), 64u8.into(), &one(1), SendTime::Now)
            .unwrap();
        assert_eq!(ccs(&out)[..2], [(0x65, 0x3D), (0x64, 0x02)]);
        assert!(enc
            .set_registered_parameter(
                &ParameterId::Bytes([128, 0]),
                64u8.into(),
                &one(1),
                SendTime::Now
            )
            .is_err());
    }

    #[test]
    fn test_non_registered_parameter() {
        let enc = Encoder::default();
        let out = enc
            .set_non_registered_parameter([1, 8], (100, 0).into(), &one(1), SendTime::Now)
            .unwrap();
        assert_eq!(
            ccs(&out),
            vec![(0x63, 1), (0x62, 8), (0x06, 100), (0x26, 0), (0x65, 127), (0x64, 127)]
        );
        assert!(enc
            .set_non_registered_parameter([1, 200], 0i64.into(), &one(1), SendTime::Now)
            .is_err());
    }

    #[test]
    fn test_increment_and_decrement() {
        let enc = Encoder::default();
        let inc = enc
            .increment_registered_parameter(&"tuningbank".into(), &one(1), SendTime::Now)
            .unwrap();
        assert_eq!(
            ccs(&inc),
            vec![(0x65, 0), (0x64, 4), (0x60, 0), (0x65, 127), (0x64, 127)]
        );
        let dec = enc
            .decrement_registered_parameter(&"tuningbank".into(), &one(1), SendTime::Now)
            .unwrap();
        assert_eq!(ccs(&dec)[2], (0x61, 0));
    }

    #[test]
    fn test_range_wrappers() {
        let enc = Encoder::default();
        let out = enc.set_modulation_range(1, 50, &one(1), SendTime::Now).unwrap();
        assert_eq!(ccs(&out)[..4], [(0x65, 0), (0x64, 5), (0x06, 1), (0x26, 50)]);
        assert!(enc.set_pitch_bend_range(128, 0, &one(1), SendTime::Now).is_err());
        assert!(enc.set_pitch_bend_range(2, -1, &one(1), SendTime::Now).is_err());
    }

    #[test]
    fn test_tuning_program_and_bank() {
        let enc = Encoder::default();
        let out = enc.set_tuning_bank(9, &one(1), SendTime::Now).unwrap();
        assert_eq!(ccs(&out)[..3], [(0x65, 0), (0x64, 4), (0x06, 9)]);
        assert!(enc.set_tuning_program(128, &one(1), SendTime::Now).is_err());
    }

    #[test]
    fn test_master_tuning() {
        let enc = Encoder::default();
        let out = enc.set_master_tuning(0.0, &one(1), SendTime::Now).unwrap();
        // Coarse: 5 messages, fine: 6 messages
        assert_eq!(out.len(), 11);
        assert_eq!(ccs(&out)[..5], [(0x65, 0), (0x64, 2), (0x06, 64), (0x65, 127), (0x64, 127)]);
        // Fraction 0 maps to the 14-bit centre 8192
        assert_eq!(
            ccs(&out)[5..],
            [(0x65, 0), (0x64, 1), (0x06, 64), (0x26, 0), (0x65, 127), (0x64, 127)]
        );

        assert!(enc.set_master_tuning(64.0, &one(1), SendTime::Now).is_err());
        assert!(enc.set_master_tuning(-65.0, &one(1), SendTime::Now).is_err());
        assert!(enc.set_master_tuning(f64::NAN, &one(1), SendTime::Now).is_err());
    }

    #[test]
    fn test_master_tuning_per_channel_order() {
        let enc = Encoder::default();
        let out = enc
            .set_master_tuning(-1.5, &[2u8, 3].into(), SendTime::Now)
            .unwrap();
        assert_eq!(out.len(), 22);
        assert!(out[..11].iter().all(|m| m.status() == 0xB1));
        assert!(out[11..].iter().all(|m| m.status() == 0xB2));
        // floor(-1.5) + 64
        assert_eq!(ccs(&out)[2], (0x06, 62));
    }
}
