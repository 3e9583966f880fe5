//! Note names and note numbers.
//!
//! Names use the octave convention where middle C (note 60) is `C3` and the
//! lowest note is `C-2`:
//!
//! ```
//! use midiwire_proto::note::{name_to_number, number_to_octave};
//!
//! assert_eq!(name_to_number("C3").unwrap(), 60);
//! assert_eq!(name_to_number("c#-2").unwrap(), 1);
//! assert_eq!(number_to_octave(127), Some(8));
//! ```

use crate::error::{Error, Result};
use crate::tables::NOTE_NAMES;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

pub const MIN_OCTAVE: i32 = -2;
pub const MAX_OCTAVE: i32 = 8;

static NOTE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([CDEFGAB])(#{0,2}|b{0,2})([-+]?\d+)$")
        .unwrap_or_else(|e| unreachable!("note name pattern is valid: {e}"))
});

fn semitone(letter: char) -> i32 {
    match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        _ => 11,
    }
}

/// Converts a note name such as `"C3"`, `"F#-1"` or `"Bbb4"` to its number.
pub fn name_to_number(name: &str) -> Result<u8> {
    let caps = NOTE_NAME
        .captures(name)
        .ok_or_else(|| Error::InvalidNoteName(name.to_string()))?;

    let letter = caps[1].chars().next().unwrap_or('C');
    let accidentals = &caps[2];
    let octave: i64 = caps[3]
        .parse()
        .map_err(|_| Error::InvalidNoteName(name.to_string()))?;

    if !(MIN_OCTAVE as i64..=MAX_OCTAVE as i64).contains(&octave) {
        return Err(Error::out_of_range(
            "octave",
            octave as f64,
            MIN_OCTAVE as i64,
            MAX_OCTAVE as i64,
        ));
    }

    let mut number = (octave as i32 + 2) * 12 + semitone(letter);
    // A single capture holds either sharps or flats, never both.
    let count = accidentals.len() as i32;
    if accidentals.starts_with('#') {
        number += count;
    } else {
        number -= count;
    }

    if !(0..=127).contains(&number) {
        return Err(Error::out_of_range("note number", number, 0, 127));
    }
    Ok(number as u8)
}

/// Octave of a note number, or `None` outside 0-127.
pub fn number_to_octave(number: i32) -> Option<i32> {
    if !(0..=127).contains(&number) {
        return None;
    }
    Some((number as f64 / 12.0 - 1.0).floor() as i32 - 1)
}

/// A note given either by number or by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteSpec {
    Number(i64),
    Name(String),
}

impl From<u8> for NoteSpec {
    fn from(n: u8) -> Self {
        NoteSpec::Number(n as i64)
    }
}

impl From<&str> for NoteSpec {
    fn from(s: &str) -> Self {
        NoteSpec::Name(s.to_string())
    }
}

impl From<String> for NoteSpec {
    fn from(s: String) -> Self {
        NoteSpec::Name(s)
    }
}

/// Resolves a number, numeric string or note name to a note number.
pub fn guess_note_number(spec: &NoteSpec) -> Result<u8> {
    match spec {
        NoteSpec::Number(n) => crate::error::data_byte("note number", *n),
        NoteSpec::Name(s) => match s.trim().parse::<i64>() {
            Ok(n) => crate::error::data_byte("note number", n),
            Err(_) => name_to_number(s),
        },
    }
}

/// A fully described note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Note {
    pub number: u8,
    pub name: &'static str,
    pub octave: i32,
}

impl Note {
    pub fn from_number(number: u8) -> Result<Self> {
        let octave = number_to_octave(number as i32)
            .ok_or_else(|| Error::out_of_range("note number", number, 0, 127))?;
        Ok(Self {
            number,
            name: NOTE_NAMES[(number % 12) as usize],
            octave,
        })
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::from_number(name_to_number(name)?)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_names() {
        assert_eq!(name_to_number("C-2"), Ok(0));
        assert_eq!(name_to_number("G8"), Ok(127));
        assert_eq!(name_to_number("C3"), Ok(60));
        assert_eq!(name_to_number("A3"), Ok(69));
    }

    #[test]
    fn test_accidentals() {
        assert_eq!(name_to_number("C#3"), Ok(61));
        assert_eq!(name_to_number("C##3"), Ok(62));
        assert_eq!(name_to_number("Db3"), Ok(61));
        assert_eq!(name_to_number("Ebb3"), Ok(62));
        assert_eq!(name_to_number("c3"), Ok(60));
        assert_eq!(name_to_number("C+3"), Ok(60));
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(name_to_number("H3"), Err(Error::InvalidNoteName("H3".into())));
        assert!(matches!(name_to_number("C#b3"), Err(Error::InvalidNoteName(_))));
        assert!(matches!(name_to_number("C"), Err(Error::InvalidNoteName(_))));
        assert!(matches!(name_to_number(""), Err(Error::InvalidNoteName(_))));
    }

    #[test]
    fn test_out_of_range_names() {
        // Octave 9 is outside the addressable range
        assert!(matches!(
            name_to_number("C9"),
            Err(Error::OutOfRange { what: "octave", .. })
        ));
        // Valid octave, but the accidental pushes past 127 / below 0
        assert!(matches!(
            name_to_number("G#8"),
            Err(Error::OutOfRange { what: "note number", .. })
        ));
        assert!(matches!(
            name_to_number("Cb-2"),
            Err(Error::OutOfRange { what: "note number", .. })
        ));
    }

    #[test]
    fn test_number_to_octave() {
        assert_eq!(number_to_octave(0), Some(-2));
        assert_eq!(number_to_octave(11), Some(-2));
        assert_eq!(number_to_octave(12), Some(-1));
        assert_eq!(number_to_octave(60), Some(3));
        assert_eq!(number_to_octave(127), Some(8));
        assert_eq!(number_to_octave(128), None);
        assert_eq!(number_to_octave(-1), None);
    }

    #[test]
    fn test_guess_note_number() {
        assert_eq!(guess_note_number(&60u8.into()), Ok(60));
        assert_eq!(guess_note_number(&"60".into()), Ok(60));
        assert_eq!(guess_note_number(&"F#-1".into()), Ok(18));
        assert!(guess_note_number(&NoteSpec::Number(128)).is_err());
        assert!(guess_note_number(&"-3".into()).is_err());
    }

    #[test]
    fn test_note_from_number() {
        let note = Note::from_number(61).unwrap();
        assert_eq!(note.name, "C#");
        assert_eq!(note.octave, 3);
        assert_eq!(note.to_string(), "C#3");
        assert!(Note::from_number(128).is_err());
    }

    #[test]
    fn test_names_round_trip_through_numbers() {
        for n in 0..=127u8 {
            let note = Note::from_number(n).unwrap();
            assert_eq!(name_to_number(&note.to_string()), Ok(n), "note {n}");
        }
    }
}
