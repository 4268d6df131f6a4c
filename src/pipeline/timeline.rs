//! Tempo arithmetic shared by the scheduler and the cursor
//!
//! Both sides place notes with [`note_seconds`], so they reach the same
//! conclusions about where each note starts and ends without talking to
//! each other.

use crate::error::PlaybackError;
use crate::pipeline::parser::Note;

/// Length of one quarter-note unit in seconds
pub fn seconds_per_beat(bpm: f64) -> f64 {
    60.0 / bpm
}

/// Length of `duration` quarter-note units in seconds
pub fn note_seconds(duration: f64, bpm: f64) -> f64 {
    duration * seconds_per_beat(bpm)
}

/// Where one note sits on the timeline, relative to the sequence start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteWindow {
    /// Position in the input sequence
    pub index: usize,
    pub start: f64,
    pub duration: f64,
}

impl NoteWindow {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Half-open containment: `[start, end)`
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end()
    }
}

/// Back-to-back note windows for a sequence at a fixed tempo
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    bpm: f64,
    windows: Vec<NoteWindow>,
}

impl Timeline {
    /// Validate a sequence and lay it out
    ///
    /// Rejects empty sequences, tempos that are not positive and finite, and
    /// durations that are not positive and finite.
    ///
    /// # Example
    /// ```
    /// use notecast::{Note, Timeline};
    ///
    /// let notes = vec![Note::new("C4", 1.0), Note::rest(1.0), Note::new("D4", 2.0)];
    /// let timeline = Timeline::new(&notes, 120.0).unwrap();
    /// assert_eq!(timeline.windows()[2].start, 1.0);
    /// assert_eq!(timeline.total_duration(), 2.0);
    /// ```
    pub fn new(notes: &[Note], bpm: f64) -> Result<Self, PlaybackError> {
        if notes.is_empty() {
            return Err(PlaybackError::EmptySequence);
        }
        if !(bpm > 0.0 && bpm.is_finite()) {
            return Err(PlaybackError::InvalidTempo(bpm));
        }

        let mut windows = Vec::with_capacity(notes.len());
        let mut cursor = 0.0;
        for (index, note) in notes.iter().enumerate() {
            if !(note.duration > 0.0 && note.duration.is_finite()) {
                return Err(PlaybackError::InvalidDuration {
                    index,
                    duration: note.duration,
                });
            }
            let window = NoteWindow {
                index,
                start: cursor,
                duration: note_seconds(note.duration, bpm),
            };
            cursor = window.end();
            windows.push(window);
        }

        Ok(Self { bpm, windows })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn windows(&self) -> &[NoteWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// End of the last note, in seconds from the sequence start
    pub fn total_duration(&self) -> f64 {
        self.windows.last().map(NoteWindow::end).unwrap_or(0.0)
    }

    /// Index of the note whose window contains `elapsed`, if any
    pub fn index_at(&self, elapsed: f64) -> Option<usize> {
        if elapsed.is_nan() || elapsed < 0.0 {
            return None;
        }
        // First window that has not ended yet
        let i = self.windows.partition_point(|w| w.end() <= elapsed);
        self.windows
            .get(i)
            .filter(|w| w.contains(elapsed))
            .map(|w| w.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn notes(entries: &[(&str, f64)]) -> Vec<Note> {
        entries.iter().map(|&(p, d)| Note::new(p, d)).collect()
    }

    #[test]
    fn test_seconds_per_beat() {
        assert_eq!(seconds_per_beat(60.0), 1.0);
        assert_eq!(seconds_per_beat(120.0), 0.5);
        assert_eq!(note_seconds(2.0, 90.0), 2.0 * (60.0 / 90.0));
    }

    #[test]
    fn test_windows_partition_time() {
        let seq = notes(&[("C4", 1.0), ("D4", 0.5), ("R", 0.25), ("E4", 1.5), ("F4", 0.75)]);
        for bpm in [40.0, 60.0, 97.0, 120.0, 233.0] {
            let timeline = Timeline::new(&seq, bpm).unwrap();
            let total_units: f64 = seq.iter().map(|n| n.duration).sum();

            let sum: f64 = timeline.windows().iter().map(|w| w.duration).sum();
            assert_abs_diff_eq!(sum, total_units * 60.0 / bpm, epsilon = 1e-9);
            assert_abs_diff_eq!(timeline.total_duration(), total_units * 60.0 / bpm, epsilon = 1e-9);

            assert_eq!(timeline.windows()[0].start, 0.0);
            for pair in timeline.windows().windows(2) {
                // Next note starts exactly where the previous one ends
                assert_eq!(pair[0].end(), pair[1].start);
            }
        }
    }

    #[test]
    fn test_index_at_boundaries() {
        let timeline = Timeline::new(&notes(&[("C4", 1.0), ("D4", 1.0)]), 60.0).unwrap();
        assert_eq!(timeline.index_at(-0.001), None);
        assert_eq!(timeline.index_at(0.0), Some(0));
        assert_eq!(timeline.index_at(0.999), Some(0));
        assert_eq!(timeline.index_at(1.0), Some(1));
        assert_eq!(timeline.index_at(1.001), Some(1));
        assert_eq!(timeline.index_at(2.0), None);
        assert_eq!(timeline.index_at(2.5), None);
        assert_eq!(timeline.index_at(f64::NAN), None);
    }

    #[test]
    fn test_rests_occupy_time() {
        let timeline = Timeline::new(&notes(&[("C4", 1.0), ("R", 1.0), ("D4", 1.0)]), 60.0).unwrap();
        assert_eq!(timeline.index_at(1.5), Some(1));
        assert_eq!(timeline.windows()[2].start, 2.0);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(Timeline::new(&[], 120.0), Err(PlaybackError::EmptySequence)));

        let seq = notes(&[("C4", 1.0)]);
        for bpm in [0.0, -60.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(Timeline::new(&seq, bpm), Err(PlaybackError::InvalidTempo(_))));
        }

        let seq = notes(&[("C4", 1.0), ("D4", 0.0)]);
        assert!(matches!(
            Timeline::new(&seq, 120.0),
            Err(PlaybackError::InvalidDuration { index: 1, .. })
        ));
        let seq = notes(&[("C4", -1.0)]);
        assert!(Timeline::new(&seq, 120.0).is_err());
    }
}
