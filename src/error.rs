//! # Error Types
//!
//! Errors surfaced synchronously by the playback control surface.
//!
//! - `PlaybackError` - a `play_sequence`/`play_tone` call was rejected
//! - `OutputError` - the audio output context could not be started
//!
//! An unknown pitch is not an error: it resolves to silence and
//! is reported through [`ScheduleReport::skipped`](crate::pipeline::ScheduleReport).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The sequence had no notes.
    ///
    /// # Example
    /// ```
    /// # use notecast::PlaybackError;
    /// assert_eq!(
    ///     PlaybackError::EmptySequence.to_string(),
    ///     "Cannot play an empty sequence"
    /// );
    /// ```
    #[error("Cannot play an empty sequence")]
    EmptySequence,

    /// Tempo was zero, negative or not finite.
    #[error("Invalid tempo: {0} bpm (must be a positive number)")]
    InvalidTempo(f64),

    /// A note duration was zero, negative or not finite.
    ///
    /// # Example
    /// ```
    /// # use notecast::PlaybackError;
    /// let err = PlaybackError::InvalidDuration { index: 3, duration: 0.0 };
    /// assert_eq!(err.to_string(), "Invalid duration 0 for note 3 (must be positive)");
    /// ```
    #[error("Invalid duration {duration} for note {index} (must be positive)")]
    InvalidDuration { index: usize, duration: f64 },

    /// The output context could not be resumed, so nothing was scheduled.
    #[error("Audio output unavailable: {0}")]
    Output(#[from] OutputError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OutputError {
    #[error("No audio output device available")]
    NoDevice,

    #[error("Audio context is closed")]
    Closed,

    #[error("Failed to resume audio output: {0}")]
    Resume(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
}
