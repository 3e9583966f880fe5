//! Error types for the MIDI protocol core.
//!
//! Decoding never produces these; every outbound encoder and registry
//! mutation validates its inputs up front and reports the first violation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("MIDI channels must be between 1 and 16, got {0}")]
    InvalidChannel(i64),

    #[error("invalid channel selection: '{0}'")]
    InvalidChannelSpec(String),

    #[error("{what} must be between {min} and {max}, got {value}")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid note name: '{0}'")]
    InvalidNoteName(String),

    #[error("invalid controller name: '{0}'")]
    UnknownController(String),

    #[error("invalid channel mode message name: '{0}'")]
    UnknownChannelMode(String),

    #[error("the specified parameter is not available: '{0}'")]
    UnknownParameter(String),

    #[error("the specified event type is not supported: '{0}'")]
    UnsupportedEventType(String),

    #[error("the status byte must be between 128 (0x80) and 255 (0xFF), got {0}")]
    InvalidStatus(i64),

    #[error("SysEx message support must first be enabled")]
    SysexDisabled,
}

impl Error {
    pub(crate) fn out_of_range(what: &'static str, value: impl Into<f64>, min: i64, max: i64) -> Self {
        Error::OutOfRange {
            what,
            value: value.into(),
            min: min as f64,
            max: max as f64,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Checks that `value` is a MIDI data byte (0-127).
#[inline]
pub(crate) fn data_byte(what: &'static str, value: impl Into<i64>) -> Result<u8> {
    let value = value.into();
    if (0..=127).contains(&value) {
        Ok(value as u8)
    } else {
        Err(Error::out_of_range(what, value as f64, 0, 127))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_byte_bounds() {
        assert_eq!(data_byte("value", 0), Ok(0));
        assert_eq!(data_byte("value", 127), Ok(127));
        assert!(matches!(
            data_byte("value", 128),
            Err(Error::OutOfRange { what: "value", .. })
        ));
        assert!(data_byte("value", -1).is_err());
    }

    #[test]
    fn test_messages_name_the_offending_value() {
        let err = data_byte("program", 200).unwrap_err();
        assert_eq!(err.to_string(), "program must be between 0 and 127, got 200");
        assert_eq!(
            Error::InvalidChannel(17).to_string(),
            "MIDI channels must be between 1 and 16, got 17"
        );
    }
}
