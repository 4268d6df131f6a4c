//! Pitch symbol resolution
//!
//! Maps scientific pitch notation (`C4`, `F#3`) to equal-tempered frequencies.
//! Resolution is fail-soft: rests and anything that does not parse resolve to
//! `0.0`, which callers treat as "produce no sound".

use std::str::FromStr;
use thiserror::Error;

/// Reference pitch A4 in Hz
pub const A4_FREQUENCY: f64 = 440.0;

/// Absolute semitone index of A4, counting C0 as 0
pub const A4_SEMITONE_INDEX: i32 = 57;

/// Canonical rest marker
pub const REST: &str = "R";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PitchError {
    #[error("Empty pitch")]
    Empty,
    #[error("Missing octave digit in pitch: {0}")]
    MissingOctave(String),
    #[error("Unknown key name: {0}")]
    UnknownKey(String),
}

/// Pitch classes with support for black keys (sharps only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// Convert pitch class to semitone number (C=0, C#=1, D=2, ...)
    pub fn semitone(&self) -> u8 {
        match self {
            PitchClass::C => 0,
            PitchClass::CSharp => 1,
            PitchClass::D => 2,
            PitchClass::DSharp => 3,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::FSharp => 6,
            PitchClass::G => 7,
            PitchClass::GSharp => 8,
            PitchClass::A => 9,
            PitchClass::ASharp => 10,
            PitchClass::B => 11,
        }
    }
}

impl FromStr for PitchClass {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" | "c" => Ok(PitchClass::C),
            "C#" | "c#" => Ok(PitchClass::CSharp),
            "D" | "d" => Ok(PitchClass::D),
            "D#" | "d#" => Ok(PitchClass::DSharp),
            "E" | "e" => Ok(PitchClass::E),
            "F" | "f" => Ok(PitchClass::F),
            "F#" | "f#" => Ok(PitchClass::FSharp),
            "G" | "g" => Ok(PitchClass::G),
            "G#" | "g#" => Ok(PitchClass::GSharp),
            "A" | "a" => Ok(PitchClass::A),
            "A#" | "a#" => Ok(PitchClass::ASharp),
            "B" | "b" => Ok(PitchClass::B),
            _ => Err(PitchError::UnknownKey(s.to_string())),
        }
    }
}

/// A sounding pitch: key name plus single-digit octave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub pitch_class: PitchClass,
    pub octave: u8,
}

impl Pitch {
    /// Absolute semitone index with C0 = 0
    pub fn semitone_index(&self) -> i32 {
        self.octave as i32 * 12 + self.pitch_class.semitone() as i32
    }

    /// Equal-tempered frequency: f = 440 * 2^((n - 57) / 12)
    pub fn frequency(&self) -> f64 {
        let offset = (self.semitone_index() - A4_SEMITONE_INDEX) as f64;
        A4_FREQUENCY * 2f64.powf(offset / 12.0)
    }
}

impl FromStr for Pitch {
    type Err = PitchError;

    /// Trailing digit is the octave, everything before it is the key name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let last = s.chars().last().ok_or(PitchError::Empty)?;
        let octave = last
            .to_digit(10)
            .ok_or_else(|| PitchError::MissingOctave(s.to_string()))? as u8;
        let key = &s[..s.len() - last.len_utf8()];
        let pitch_class = PitchClass::from_str(key)?;
        Ok(Pitch {
            pitch_class,
            octave,
        })
    }
}

/// Whether a pitch symbol marks a rest (`R`, `r` or `rest`)
pub fn is_rest(pitch: &str) -> bool {
    let pitch = pitch.trim();
    pitch.eq_ignore_ascii_case(REST) || pitch.eq_ignore_ascii_case("rest")
}

/// Resolve a pitch symbol to Hz
///
/// Returns `0.0` for rests and for symbols that do not parse.
///
/// # Example
/// ```
/// use notecast::pitch::frequency;
///
/// assert_eq!(frequency("A4"), 440.0);
/// assert_eq!(frequency("R"), 0.0);
/// assert_eq!(frequency("H2"), 0.0);
/// ```
pub fn frequency(pitch: &str) -> f64 {
    if is_rest(pitch) {
        return 0.0;
    }
    Pitch::from_str(pitch).map(|p| p.frequency()).unwrap_or(0.0)
}
