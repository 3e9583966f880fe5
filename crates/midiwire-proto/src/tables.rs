//! Fixed MIDI 1.0 constants and name tables.
//!
//! The names are the canonical lowercase identifiers used by the name-based
//! APIs (`"volumecoarse"`, `"allnotesoff"`, `"pitchbendrange"`) and must stay
//! verbatim for interoperability.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIDI_CHANNEL_COUNT: u8 = 16;

/// Highest status byte that still carries a channel in its low nibble.
pub const CHANNEL_SPECIFIC_MESSAGE_MAX: u8 = 239;

/// Modulus used when the decoder looks up a note name for a note number.
pub const SEMITONE_COUNT: u8 = 16;

/// Sharp-based pitch class names, indexed by semitone.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Channel voice command nibbles (high nibble of the status byte).
pub mod command {
    pub const NOTE_OFF: u8 = 0x8;
    pub const NOTE_ON: u8 = 0x9;
    pub const KEY_AFTERTOUCH: u8 = 0xA;
    /// Shared by control change (data1 0-119) and channel mode (data1 120-127).
    pub const CONTROL_CHANGE: u8 = 0xB;
    pub const PROGRAM_CHANGE: u8 = 0xC;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD;
    pub const PITCH_BEND: u8 = 0xE;
}

/// System common and real-time status bytes.
pub mod system {
    pub const SYSEX: u8 = 0xF0;
    pub const TIMECODE: u8 = 0xF1;
    pub const SONG_POSITION: u8 = 0xF2;
    pub const SONG_SELECT: u8 = 0xF3;
    pub const TUNING_REQUEST: u8 = 0xF6;
    pub const SYSEX_END: u8 = 0xF7;
    pub const CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;
    pub const ACTIVE_SENSING: u8 = 0xFE;
    pub const RESET: u8 = 0xFF;
}

/// Control change numbers used by the RPN/NRPN protocols.
pub mod cc {
    pub const DATA_ENTRY_COARSE: u8 = 0x06;
    pub const DATA_ENTRY_FINE: u8 = 0x26;
    pub const DATA_INCREMENT: u8 = 0x60;
    pub const DATA_DECREMENT: u8 = 0x61;
    pub const NRPN_FINE: u8 = 0x62;
    pub const NRPN_COARSE: u8 = 0x63;
    pub const RPN_FINE: u8 = 0x64;
    pub const RPN_COARSE: u8 = 0x65;
    /// Parameter id byte meaning "no parameter selected".
    pub const PARAMETER_NULL: u8 = 0x7F;
}

const CONTROLLER_NAMES: &[(u8, &str)] = &[
    (0, "bankselectcoarse"),
    (1, "modulationwheelcoarse"),
    (2, "breathcontrollercoarse"),
    (4, "footcontrollercoarse"),
    (5, "portamentotimecoarse"),
    (6, "dataentrycoarse"),
    (7, "volumecoarse"),
    (8, "balancecoarse"),
    (10, "pancoarse"),
    (11, "expressioncoarse"),
    (12, "effectcontrol1coarse"),
    (13, "effectcontrol2coarse"),
    (16, "generalpurposeslider1"),
    (17, "generalpurposeslider2"),
    (18, "generalpurposeslider3"),
    (19, "generalpurposeslider4"),
    (32, "bankselectfine"),
    (33, "modulationwheelfine"),
    (34, "breathcontrollerfine"),
    (36, "footcontrollerfine"),
    (37, "portamentotimefine"),
    (38, "dataentryfine"),
    (39, "volumefine"),
    (40, "balancefine"),
    (42, "panfine"),
    (43, "expressionfine"),
    (44, "effectcontrol1fine"),
    (45, "effectcontrol2fine"),
    (64, "holdpedal"),
    (65, "portamento"),
    (66, "sustenutopedal"),
    (67, "softpedal"),
    (68, "legatopedal"),
    (69, "hold2pedal"),
    (70, "soundvariation"),
    (71, "resonance"),
    (72, "soundreleasetime"),
    (73, "soundattacktime"),
    (74, "brightness"),
    (75, "soundcontrol6"),
    (76, "soundcontrol7"),
    (77, "soundcontrol8"),
    (78, "soundcontrol9"),
    (79, "soundcontrol10"),
    (80, "generalpurposebutton1"),
    (81, "generalpurposebutton2"),
    (82, "generalpurposebutton3"),
    (83, "generalpurposebutton4"),
    (91, "reverblevel"),
    (92, "tremololevel"),
    (93, "choruslevel"),
    (94, "celestelevel"),
    (95, "phaserlevel"),
    (96, "databuttonincrement"),
    (97, "databuttondecrement"),
    (98, "nonregisteredparametercoarse"),
    (99, "nonregisteredparameterfine"),
    (100, "registeredparametercoarse"),
    (101, "registeredparameterfine"),
];

const CHANNEL_MODE_NAMES: [&str; 8] = [
    "allsoundoff",
    "resetallcontrollers",
    "localcontrol",
    "allnotesoff",
    "omnimodeoff",
    "omnimodeon",
    "monomodeon",
    "polymodeon",
];

/// Name of control change `number`, which must be a controller (0-119).
pub fn controller_name(number: u8) -> Result<Option<&'static str>> {
    if number > 119 {
        return Err(Error::out_of_range("control change number", number, 0, 119));
    }
    Ok(CONTROLLER_NAMES
        .iter()
        .find(|(n, _)| *n == number)
        .map(|(_, name)| *name))
}

pub fn controller_number(name: &str) -> Option<u8> {
    CONTROLLER_NAMES
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(number, _)| *number)
}

/// Name of channel mode message `number`, which must be 120-127.
pub fn channel_mode_name(number: u8) -> Result<&'static str> {
    if !(120..=127).contains(&number) {
        return Err(Error::out_of_range("channel mode number", number, 120, 127));
    }
    Ok(CHANNEL_MODE_NAMES[(number - 120) as usize])
}

pub fn channel_mode_number(name: &str) -> Option<u8> {
    CHANNEL_MODE_NAMES
        .iter()
        .position(|n| *n == name)
        .map(|i| 120 + i as u8)
}

/// A control change controller (0-119) with its canonical name, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Controller {
    pub number: u8,
    pub name: Option<&'static str>,
}

impl Controller {
    pub fn new(number: u8) -> Result<Self> {
        Ok(Self {
            number,
            name: controller_name(number)?,
        })
    }
}

/// A channel mode message (120-127) with its canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelModeCommand {
    pub number: u8,
    pub name: &'static str,
}

impl ChannelModeCommand {
    pub fn new(number: u8) -> Result<Self> {
        Ok(Self {
            number,
            name: channel_mode_name(number)?,
        })
    }
}

/// Registered parameter numbers addressable through the RPN protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum RegisteredParameter {
    PitchBendRange = 0x0000,
    ChannelFineTuning = 0x0001,
    ChannelCoarseTuning = 0x0002,
    TuningProgram = 0x0003,
    TuningBank = 0x0004,
    ModulationRange = 0x0005,

    AzimuthAngle = 0x3D00,
    ElevationAngle = 0x3D01,
    Gain = 0x3D02,
    DistanceRatio = 0x3D03,
    MaximumDistance = 0x3D04,
    MaximumDistanceGain = 0x3D05,
    ReferenceDistanceRatio = 0x3D06,
    PanSpreadAngle = 0x3D07,
    RollAngle = 0x3D08,
}

impl RegisteredParameter {
    pub const ALL: [RegisteredParameter; 15] = [
        Self::PitchBendRange,
        Self::ChannelFineTuning,
        Self::ChannelCoarseTuning,
        Self::TuningProgram,
        Self::TuningBank,
        Self::ModulationRange,
        Self::AzimuthAngle,
        Self::ElevationAngle,
        Self::Gain,
        Self::DistanceRatio,
        Self::MaximumDistance,
        Self::MaximumDistanceGain,
        Self::ReferenceDistanceRatio,
        Self::PanSpreadAngle,
        Self::RollAngle,
    ];

    pub const fn id(self) -> u16 {
        self as u16
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::PitchBendRange => "pitchbendrange",
            Self::ChannelFineTuning => "channelfinetuning",
            Self::ChannelCoarseTuning => "channelcoarsetuning",
            Self::TuningProgram => "tuningprogram",
            Self::TuningBank => "tuningbank",
            Self::ModulationRange => "modulationrange",
            Self::AzimuthAngle => "azimuthangle",
            Self::ElevationAngle => "elevationangle",
            Self::Gain => "gain",
            Self::DistanceRatio => "distanceratio",
            Self::MaximumDistance => "maximumdistance",
            Self::MaximumDistanceGain => "maximumdistancegain",
            Self::ReferenceDistanceRatio => "referencedistanceratio",
            Self::PanSpreadAngle => "panspreadangle",
            Self::RollAngle => "rollangle",
        }
    }

    /// The two parameter-select bytes `[msb, lsb]`.
    pub fn to_bytes(self) -> [u8; 2] {
        let [hi, lo] = crate::utils::to_array(self.id());
        [hi, lo]
    }
}

impl FromStr for RegisteredParameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::UnknownParameter(s.to_string()))
    }
}

impl fmt::Display for RegisteredParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
