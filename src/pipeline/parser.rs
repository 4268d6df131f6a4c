//! Parsers for melody input
//!
//! Two sources feed the engine:
//! - JSON from the sheet-music recognizer: an array of `{pitch, duration}`
//!   objects (extra fields such as `id` are ignored), or an object with a
//!   `notes` array and optional `bpm` / `instrument`.
//! - A line-based text format for hand-written melodies:
//!
//! ```text
//! <pitch> <duration>, <pitch> <duration>  # comment
//! ```
//!
//! Pitches: scientific notation (`C4`, `F#3`) or `R` for a rest.
//! Durations: quarter-note units (1 = quarter, 0.5 = eighth).

use crate::instrument::Instrument;
use crate::pitch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One melody entry: a pitch symbol held for a number of quarter-note units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: String,
    pub duration: f64,
}

impl Note {
    pub fn new(pitch: impl Into<String>, duration: f64) -> Self {
        Self {
            pitch: pitch.into(),
            duration,
        }
    }

    pub fn rest(duration: f64) -> Self {
        Self::new(pitch::REST, duration)
    }

    pub fn is_rest(&self) -> bool {
        pitch::is_rest(&self.pitch)
    }

    /// Frequency in Hz, or 0.0 for rests and unreadable pitches
    pub fn frequency(&self) -> f64 {
        pitch::frequency(&self.pitch)
    }
}

/// A melody together with optional playback settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Melody {
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<Instrument>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MelodyDocument {
    Notes(Vec<Note>),
    Melody(Melody),
}

/// Parse errors
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid entry on line {line}: {message}")]
    InvalidEntry { line: usize, message: String },

    #[error("Invalid duration on line {line}: {value}")]
    InvalidDuration { line: usize, value: String },

    #[error("Invalid melody JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn parse_duration(text: &str, line: usize) -> Result<f64, ParseError> {
    let invalid = || ParseError::InvalidDuration {
        line,
        value: text.to_string(),
    };
    let duration: f64 = text.parse().map_err(|_| invalid())?;
    if duration > 0.0 && duration.is_finite() {
        Ok(duration)
    } else {
        Err(invalid())
    }
}

/// Parse a single entry
/// Format: <pitch> <duration>
fn parse_entry(s: &str, line: usize) -> Result<Note, ParseError> {
    let mut parts = s.split_whitespace();
    let (pitch, duration) = match (parts.next(), parts.next(), parts.next()) {
        (Some(pitch), Some(duration), None) => (pitch, duration),
        _ => {
            return Err(ParseError::InvalidEntry {
                line,
                message: format!("expected '<pitch> <duration>', got '{}'", s),
            })
        }
    };

    Ok(Note::new(pitch, parse_duration(duration, line)?))
}

/// Parse one line of the text format
/// Format: entry, entry, ...  # comment
pub fn parse_line(line: &str, line_number: usize) -> Result<Vec<Note>, ParseError> {
    // Remove comments (split on " #" to preserve sharp signs in pitches like "C#4")
    let line = line.split(" #").next().unwrap_or(line).trim();

    line.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| parse_entry(entry, line_number))
        .collect()
}

/// Parse a full text melody
/// Returns the notes in playing order
pub fn parse_melody(text: &str) -> Result<Vec<Note>, ParseError> {
    let mut notes = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        notes.extend(parse_line(line, i + 1)?);
    }

    Ok(notes)
}

/// Parse recognizer JSON: either a bare note array or a `{notes, bpm, instrument}` object
///
/// # Example
/// ```
/// use notecast::pipeline::parser::parse_melody_json;
///
/// let melody = parse_melody_json(r#"[{"id": 7, "pitch": "C4", "duration": 1}]"#).unwrap();
/// assert_eq!(melody.notes[0].pitch, "C4");
/// assert_eq!(melody.bpm, None);
/// ```
pub fn parse_melody_json(text: &str) -> Result<Melody, ParseError> {
    let melody = match serde_json::from_str::<MelodyDocument>(text)? {
        MelodyDocument::Notes(notes) => Melody {
            notes,
            ..Default::default()
        },
        MelodyDocument::Melody(melody) => melody,
    };
    Ok(melody)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry() {
        let note = parse_entry("C#4 0.5", 1).unwrap();
        assert_eq!(note, Note::new("C#4", 0.5));

        let note = parse_entry("R 2", 1).unwrap();
        assert!(note.is_rest());
        assert_eq!(note.duration, 2.0);
    }

    #[test]
    fn test_parse_line() {
        let notes = parse_line("C4 1, D4 0.5, R 0.5", 3).unwrap();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[1], Note::new("D4", 0.5));

        let notes = parse_line("F#3 1  # sharp survives the comment split", 1).unwrap();
        assert_eq!(notes, vec![Note::new("F#3", 1.0)]);
    }

    #[test]
    fn test_parse_melody() {
        let text = r#"
# Ode to Joy, first bar
E4 1, E4 1, F4 1, G4 1
G4 1, F4 1   # second bar
E4 1, D4 1
        "#;

        let notes = parse_melody(text).unwrap();
        assert_eq!(notes.len(), 8);
        assert_eq!(notes[0].pitch, "E4");
        assert_eq!(notes[7].pitch, "D4");
    }

    #[test]
    fn test_unknown_pitch_is_not_a_parse_error() {
        let notes = parse_melody("H4 1").unwrap();
        assert_eq!(notes[0].frequency(), 0.0);
        assert!(!notes[0].is_rest());
    }

    #[test]
    fn test_invalid_duration() {
        for text in ["C4 0", "C4 -1", "C4 abc", "C4 inf"] {
            match parse_melody(text) {
                Err(ParseError::InvalidDuration { line, .. }) => assert_eq!(line, 1),
                other => panic!("expected InvalidDuration for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_invalid_entry_reports_line() {
        let err = parse_melody("C4 1\n\nC4").unwrap_err();
        assert!(matches!(err, ParseError::InvalidEntry { line: 3, .. }));

        assert!(parse_melody("C4 1 extra").is_err());
    }

    #[test]
    fn test_parse_json_array() {
        let json = r#"[
            {"id": "a1", "pitch": "C4", "duration": 1},
            {"id": "a2", "pitch": "R", "duration": 0.5}
        ]"#;
        let melody = parse_melody_json(json).unwrap();
        assert_eq!(melody.notes, vec![Note::new("C4", 1.0), Note::rest(0.5)]);
        assert_eq!(melody.instrument, None);
    }

    #[test]
    fn test_parse_json_object() {
        let json = r#"{"notes": [{"pitch": "A4", "duration": 2}], "bpm": 90, "instrument": "violin"}"#;
        let melody = parse_melody_json(json).unwrap();
        assert_eq!(melody.notes.len(), 1);
        assert_eq!(melody.bpm, Some(90.0));
        assert_eq!(melody.instrument, Some(Instrument::Violin));
    }

    #[test]
    fn test_parse_json_capitalized_instrument() {
        let json = r#"{"notes": [{"pitch": "A4", "duration": 1}], "instrument": "Violin"}"#;
        let melody = parse_melody_json(json).unwrap();
        assert_eq!(melody.instrument, Some(Instrument::Violin));
    }

    #[test]
    fn test_parse_json_invalid() {
        assert!(matches!(
            parse_melody_json(r#"{"pitch": "C4"}"#),
            Err(ParseError::Json(_))
        ));
    }
}
