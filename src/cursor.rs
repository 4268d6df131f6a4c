//! Note cursor
//!
//! Estimates which note is sounding from wall-clock time alone. The tracker
//! never looks at the audio clock or the voice set: it anchors itself at
//! "now + lookahead", the same epoch the engine schedules against, and walks
//! the same [`Timeline`]. The two clocks drift by a few tens of milliseconds,
//! which is fine for highlighting.

use crate::config::{ConfigError, EngineConfig};
use crate::pipeline::timeline::Timeline;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Index of the note sounding `elapsed` seconds after the first note began
///
/// # Example
/// ```
/// use notecast::{estimate_index, Note, Timeline};
///
/// let notes = vec![Note::new("C4", 1.0), Note::new("D4", 1.0)];
/// let timeline = Timeline::new(&notes, 60.0).unwrap();
/// assert_eq!(estimate_index(0.999, &timeline), Some(0));
/// assert_eq!(estimate_index(1.001, &timeline), Some(1));
/// assert_eq!(estimate_index(2.5, &timeline), None);
/// ```
pub fn estimate_index(elapsed: f64, timeline: &Timeline) -> Option<usize> {
    timeline.index_at(elapsed)
}

/// Result of one cursor tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorFrame {
    /// Note to highlight, if any
    pub index: Option<usize>,
    /// Whether another tick should be requested
    pub continue_ticking: bool,
}

impl CursorFrame {
    const STOPPED: CursorFrame = CursorFrame {
        index: None,
        continue_ticking: false,
    };
}

/// Wall-clock estimator for the currently playing note
#[derive(Debug, Clone)]
pub struct CursorTracker {
    timeline: Timeline,
    lookahead: Duration,
    grace: Duration,
    anchor: Option<Instant>,
}

impl CursorTracker {
    /// Fails if `config` does not pass [`EngineConfig::validate`]
    pub fn new(timeline: Timeline, config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            timeline,
            lookahead: config.lookahead(),
            grace: config.cursor_grace(),
            anchor: None,
        })
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// Start tracking; the first note is expected one lookahead after `now`
    pub fn activate(&mut self, now: Instant) {
        self.anchor = Some(now + self.lookahead);
        debug!(notes = self.timeline.len(), "cursor activated");
    }

    /// Stop tracking
    pub fn deactivate(&mut self) -> CursorFrame {
        if self.anchor.take().is_some() {
            debug!("cursor deactivated");
        }
        CursorFrame::STOPPED
    }

    /// Seconds since the anchor; negative before it
    fn elapsed(&self, anchor: Instant, now: Instant) -> f64 {
        match now.checked_duration_since(anchor) {
            Some(after) => after.as_secs_f64(),
            None => -anchor.duration_since(now).as_secs_f64(),
        }
    }

    /// Estimate the note at `now`
    ///
    /// Ticking stops, and the tracker deactivates, once `now` passes the end
    /// of the last note plus the grace tail.
    pub fn tick(&mut self, now: Instant) -> CursorFrame {
        let Some(anchor) = self.anchor else {
            return CursorFrame::STOPPED;
        };

        let elapsed = self.elapsed(anchor, now);
        if elapsed > self.timeline.total_duration() + self.grace.as_secs_f64() {
            return self.deactivate();
        }

        let index = estimate_index(elapsed, &self.timeline);
        trace!(elapsed, ?index, "cursor tick");
        CursorFrame {
            index,
            continue_ticking: true,
        }
    }
}

/// Runs a [`CursorTracker`] on its own thread at a fixed frame interval
///
/// Every tick sends the current index (or `None`) over a channel. The feed
/// always ends with a final `None`, both when the grace tail runs out and
/// when [`CursorFeed::stop`] is called.
pub struct CursorFeed {
    receiver: Receiver<Option<usize>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CursorFeed {
    /// Activate `tracker` now and start ticking it
    pub fn spawn(mut tracker: CursorTracker, frame_interval: Duration) -> Self {
        let (tx, receiver) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        tracker.activate(Instant::now());
        let handle = thread::spawn(move || {
            while running_clone.load(Ordering::Relaxed) {
                let frame = tracker.tick(Instant::now());
                if !frame.continue_ticking {
                    break;
                }
                if tx.send(frame.index).is_err() {
                    // Receiver dropped
                    return;
                }
                thread::sleep(frame_interval);
            }
            tracker.deactivate();
            let _ = tx.send(None);
        });

        Self {
            receiver,
            running,
            handle: Some(handle),
        }
    }

    /// Channel carrying one value per tick
    pub fn receiver(&self) -> &Receiver<Option<usize>> {
        &self.receiver
    }

    /// Halt the loop; a final `None` follows whatever is already queued
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the loop to finish
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CursorFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parser::Note;

    fn tracker(entries: &[(&str, f64)], bpm: f64, lookahead: f64, grace: f64) -> CursorTracker {
        let notes: Vec<Note> = entries.iter().map(|&(p, d)| Note::new(p, d)).collect();
        let config = EngineConfig {
            lookahead_secs: lookahead,
            cursor_grace_secs: grace,
            ..Default::default()
        };
        CursorTracker::new(Timeline::new(&notes, bpm).unwrap(), &config).unwrap()
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_boundaries_after_anchor() {
        let mut cursor = tracker(&[("C4", 1.0), ("D4", 1.0)], 60.0, 0.0, 1.0);
        let start = Instant::now();
        cursor.activate(start);

        assert_eq!(cursor.tick(start + secs(0.999)).index, Some(0));
        assert_eq!(cursor.tick(start + secs(1.001)).index, Some(1));

        let tail = cursor.tick(start + secs(2.5));
        assert_eq!(tail.index, None);
        assert!(tail.continue_ticking);
    }

    #[test]
    fn test_lookahead_delays_first_note() {
        let mut cursor = tracker(&[("C4", 1.0)], 60.0, 0.1, 1.0);
        let start = Instant::now();
        cursor.activate(start);

        let before = cursor.tick(start + secs(0.05));
        assert_eq!(before.index, None);
        assert!(before.continue_ticking);
        assert_eq!(cursor.tick(start + secs(0.15)).index, Some(0));
    }

    #[test]
    fn test_grace_tail_ends_ticking() {
        let mut cursor = tracker(&[("C4", 1.0), ("R", 1.0)], 120.0, 0.0, 1.0);
        let start = Instant::now();
        cursor.activate(start);

        // Rest still highlights its own index
        assert_eq!(cursor.tick(start + secs(0.75)).index, Some(1));
        assert!(cursor.tick(start + secs(1.9)).continue_ticking);

        let done = cursor.tick(start + secs(2.1));
        assert_eq!(done, CursorFrame::STOPPED);
        assert!(!cursor.is_active());
        assert_eq!(cursor.tick(start + secs(0.1)), CursorFrame::STOPPED);
    }

    #[test]
    fn test_deactivate_reports_none() {
        let mut cursor = tracker(&[("C4", 4.0)], 60.0, 0.0, 1.0);
        let start = Instant::now();
        cursor.activate(start);
        assert!(cursor.is_active());

        assert_eq!(cursor.deactivate(), CursorFrame::STOPPED);
        assert_eq!(cursor.tick(start + secs(1.0)).index, None);
    }

    #[test]
    fn test_negative_lookahead_rejected() {
        let timeline = Timeline::new(&[Note::new("C4", 1.0)], 60.0).unwrap();
        let config = EngineConfig {
            lookahead_secs: -0.5,
            ..Default::default()
        };
        assert!(matches!(
            CursorTracker::new(timeline, &config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_feed_ends_with_none() {
        let cursor = tracker(&[("C4", 1.0)], 600.0, 0.0, 0.01);
        let feed = CursorFeed::spawn(cursor, Duration::from_millis(1));

        let values: Vec<Option<usize>> = feed.receiver().iter().collect();
        assert_eq!(values.last(), Some(&None));
        assert!(values.contains(&Some(0)));
        feed.join();
    }

    #[test]
    fn test_feed_stop() {
        let cursor = tracker(&[("C4", 100.0)], 60.0, 0.0, 1.0);
        let feed = CursorFeed::spawn(cursor, Duration::from_millis(1));
        feed.stop();

        let values: Vec<Option<usize>> = feed.receiver().iter().collect();
        assert_eq!(values.last(), Some(&None));
        feed.join();
    }
}
