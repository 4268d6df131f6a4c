//! Melody playback pipeline
//!
//! - Parser: read melodies from the text and JSON formats
//! - Timeline: tempo arithmetic and note windows
//! - VoiceManager: live voice set and audio clock
//! - Scheduler: session lifecycle, lookahead scheduling and previews

pub mod parser;
pub mod scheduler;
pub mod timeline;
pub mod voicemgr;

pub use parser::{parse_melody, parse_melody_json, Melody, Note, ParseError};
pub use scheduler::{PlaybackEngine, PlaybackState, ScheduleReport, SkippedNote};
pub use timeline::{note_seconds, seconds_per_beat, NoteWindow, Timeline};
pub use voicemgr::{SessionId, VoiceId, VoiceInfo, VoiceManager, VoiceSpec, VoiceTag};
