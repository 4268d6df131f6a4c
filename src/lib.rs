//! Melody playback with a synchronized note cursor
//!
//! Turns an ordered list of pitch/duration pairs plus a tempo into scheduled,
//! enveloped tones, and estimates from wall-clock time alone which note is
//! sounding so a UI can highlight it.
//!
//! - [`pitch`]: pitch symbol to frequency
//! - [`instrument`]: per-instrument waveform and gain envelope
//! - [`pipeline`]: input parsing, tempo timeline, live voice set, playback engine
//! - [`output`]: the audio output context and its backends
//! - [`cursor`]: the independent cursor estimator and its frame loop

pub mod config;
pub mod cursor;
pub mod error;
pub mod generator;
pub mod instrument;
pub mod output;
pub mod pipeline;
pub mod pitch;
pub mod wav;

pub use config::EngineConfig;
pub use cursor::{estimate_index, CursorFeed, CursorFrame, CursorTracker};
pub use error::{OutputError, PlaybackError};
pub use instrument::Instrument;
pub use output::{AudioContext, ContextState, OfflineBackend, OutputBackend};
pub use pipeline::{Note, PlaybackEngine, PlaybackState, ScheduleReport, Timeline};
pub use pitch::frequency;
