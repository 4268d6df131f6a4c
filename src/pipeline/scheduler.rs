//! Playback engine
//!
//! Schedules a whole note sequence against the audio clock in one pass,
//! tracks the session it belongs to, and cancels it on demand.
//!
//! Session lifecycle: `Idle → Scheduling → Playing → (Completed | Cancelled)`.
//! Only one session exists at a time; starting a new one first stops the old
//! one. The completion callback is gated on the session id, so a callback for
//! a session that has since been stopped does nothing.

use crate::config::{ConfigError, EngineConfig};
use crate::error::PlaybackError;
use crate::generator::GainAutomation;
use crate::instrument::Instrument;
use crate::output::AudioContext;
use crate::pipeline::parser::Note;
use crate::pipeline::timeline::Timeline;
use crate::pipeline::voicemgr::{SessionId, VoiceId, VoiceInfo, VoiceSpec, VoiceTag};
use crate::pitch;
use crate::wav::write_wav_16bit;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extra render time past the end of a sequence before offline rendering gives up
const RENDER_SAFETY_SECS: f64 = 2.0;

/// Where the current (or last) session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Scheduling,
    Playing,
    Completed,
    Cancelled,
}

impl PlaybackState {
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Scheduling | PlaybackState::Playing)
    }
}

/// A note that was not scheduled because its pitch did not resolve
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedNote {
    pub index: usize,
    pub pitch: String,
}

/// Outcome of scheduling a sequence
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleReport {
    pub session: SessionId,
    /// Audio clock time of the first note
    pub start_time: f64,
    /// Audio clock time at which the last note ends
    pub end_time: f64,
    /// Number of voices registered
    pub voices: usize,
    /// Notes left silent because their pitch is unknown (rests are not listed)
    pub skipped: Vec<SkippedNote>,
}

#[derive(Debug)]
struct SessionSlot {
    current: Option<SessionId>,
    state: PlaybackState,
    /// Audio clock time at which the current session's last note ends
    end_time: f64,
}

impl SessionSlot {
    /// Mark `id` completed if it is still the active session
    fn complete(&mut self, id: SessionId) -> bool {
        if self.current == Some(id) && self.state.is_active() {
            self.state = PlaybackState::Completed;
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Cancel whatever is active; returns the cancelled session
    fn cancel(&mut self) -> Option<SessionId> {
        if self.state.is_active() {
            self.state = PlaybackState::Cancelled;
            self.current.take()
        } else {
            None
        }
    }
}

/// Schedules note sequences and previews on an owned audio context
pub struct PlaybackEngine {
    context: AudioContext,
    config: EngineConfig,
    session: Arc<Mutex<SessionSlot>>,
    next_session: u64,
}

impl PlaybackEngine {
    /// Create an engine over an existing (usually suspended) context
    ///
    /// Fails if `config` does not pass [`EngineConfig::validate`].
    pub fn new(context: AudioContext, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            context,
            config,
            session: Arc::new(Mutex::new(SessionSlot {
                current: None,
                state: PlaybackState::Idle,
                end_time: 0.0,
            })),
            next_session: 0,
        })
    }

    /// Create an engine whose clock advances only through [`PlaybackEngine::render`]
    pub fn offline(config: EngineConfig) -> Result<Self, ConfigError> {
        let context = AudioContext::offline(&config);
        Self::new(context, config)
    }

    /// Create an engine on the default output device
    #[cfg(feature = "realtime")]
    pub fn realtime(config: EngineConfig) -> Result<Self, ConfigError> {
        let context = AudioContext::realtime(&config);
        Self::new(context, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AudioContext {
        &mut self.context
    }

    pub fn state(&self) -> PlaybackState {
        self.session.lock().state
    }

    pub fn is_playing(&self) -> bool {
        self.state().is_active()
    }

    /// Id of the active session, if any
    pub fn current_session(&self) -> Option<SessionId> {
        self.session.lock().current
    }

    pub fn live_voice_count(&self) -> usize {
        self.context.voices().lock().voice_count()
    }

    pub fn live_voices(&self) -> Vec<VoiceInfo> {
        self.context.voices().lock().live_voices()
    }

    /// Schedule a full sequence and start playing it
    ///
    /// The sequence is validated before the output is touched. Any active
    /// session is stopped before the first new voice is registered. Notes
    /// whose pitch does not resolve stay silent but keep their time slot.
    /// `on_complete` runs once when the last note's end time is reached,
    /// unless the session is stopped first.
    pub fn play_sequence<F>(
        &mut self,
        notes: &[Note],
        bpm: f64,
        instrument: Instrument,
        on_complete: F,
    ) -> Result<ScheduleReport, PlaybackError>
    where
        F: FnOnce() + Send + 'static,
    {
        let timeline = Timeline::new(notes, bpm)?;
        self.context.resume()?;
        self.stop();

        let id = SessionId(self.next_session);
        self.next_session += 1;
        {
            let mut slot = self.session.lock();
            slot.current = Some(id);
            slot.state = PlaybackState::Scheduling;
        }

        let mut voices = self.context.voices().lock();
        let start_time = voices.current_time() + self.config.lookahead_secs;
        let end_time = start_time + timeline.total_duration();

        let mut scheduled = 0;
        let mut skipped = Vec::new();
        for window in timeline.windows() {
            let note = &notes[window.index];
            let frequency = pitch::frequency(&note.pitch);
            if frequency <= 0.0 {
                if !note.is_rest() {
                    warn!(index = window.index, pitch = %note.pitch, "unresolvable pitch, leaving a silent gap");
                    skipped.push(SkippedNote {
                        index: window.index,
                        pitch: note.pitch.clone(),
                    });
                }
                continue;
            }

            let start = start_time + window.start;
            let mut gain = GainAutomation::new(0.0);
            let waveform = instrument.shape_envelope(&mut gain, start, window.duration);
            voices.add_voice(VoiceSpec {
                tag: VoiceTag::Session(id),
                frequency,
                waveform,
                gain,
                start,
                stop: start + window.duration,
            });
            scheduled += 1;
        }

        let slot = self.session.clone();
        voices.schedule_callback(
            end_time,
            Box::new(move || {
                let completed = slot.lock().complete(id);
                if completed {
                    info!(session = id.0, "playback completed");
                    on_complete();
                }
            }),
        );
        {
            let mut slot = self.session.lock();
            slot.state = PlaybackState::Playing;
            slot.end_time = end_time;
        }
        drop(voices);

        info!(
            session = id.0,
            notes = notes.len(),
            voices = scheduled,
            skipped = skipped.len(),
            bpm,
            instrument = %instrument,
            "playback scheduled"
        );

        Ok(ScheduleReport {
            session: id,
            start_time,
            end_time,
            voices: scheduled,
            skipped,
        })
    }

    /// Silence every live voice and cancel the active session
    ///
    /// Safe to call at any time, any number of times. Returns how many voices
    /// were silenced.
    pub fn stop(&mut self) -> usize {
        let cancelled = self.session.lock().cancel();
        let silenced = {
            let mut voices = self.context.voices().lock();
            voices.cancel_callbacks();
            voices.stop_all()
        };

        if let Some(id) = cancelled {
            info!(session = id.0, silenced, "playback stopped");
        } else if silenced > 0 {
            debug!(silenced, "stopped preview voices");
        }
        silenced
    }

    /// Play a single short note right away, outside any session
    ///
    /// Returns `None` without sounding anything for rests and unknown pitches.
    pub fn play_tone(
        &mut self,
        pitch: &str,
        instrument: Instrument,
    ) -> Result<Option<VoiceId>, PlaybackError> {
        self.context.resume()?;

        let frequency = pitch::frequency(pitch);
        if frequency <= 0.0 {
            debug!(pitch, "nothing to preview");
            return Ok(None);
        }

        let duration = self.config.preview_duration_secs;
        let mut voices = self.context.voices().lock();
        let start = voices.current_time();
        let mut gain = GainAutomation::new(0.0);
        let waveform = instrument.shape_envelope(&mut gain, start, duration);
        let id = voices.add_voice(VoiceSpec {
            tag: VoiceTag::Preview,
            frequency,
            waveform,
            gain,
            start,
            stop: start + duration,
        });

        debug!(pitch, instrument = %instrument, voice = id.0, "preview tone");
        Ok(Some(id))
    }

    /// Pull one buffer from an offline context
    pub fn render(&self, buffer: &mut [f32]) {
        self.context.render(buffer);
    }

    /// Render frames until the session is over and every voice has finished
    ///
    /// Trailing rests are rendered as silence. Only meaningful for offline
    /// contexts.
    pub fn render_offline(&mut self) -> Vec<f32> {
        let mut samples = Vec::new();
        let mut frame_buffer = vec![0.0f32; self.config.frame_size];

        let sample_rate = self.context.sample_rate() as f64;
        let session_end = {
            let slot = self.session.lock();
            if slot.state.is_active() {
                slot.end_time
            } else {
                0.0
            }
        };
        let pending = self
            .live_voices()
            .iter()
            .map(|v| v.stop)
            .fold(self.context.current_time().max(session_end), f64::max);
        let max_samples =
            ((pending - self.context.current_time() + RENDER_SAFETY_SECS) * sample_rate) as usize;
        let max_iterations = max_samples / self.config.frame_size + 1;

        let mut iterations = 0;
        while (self.is_playing() || self.live_voice_count() > 0) && iterations < max_iterations {
            self.render(&mut frame_buffer);
            samples.extend_from_slice(&frame_buffer);
            iterations += 1;
        }

        samples
    }

    /// Render offline and write the result as a 16-bit mono WAV file
    pub fn generate_wav(&mut self, output_path: impl AsRef<Path>) -> Result<usize, hound::Error> {
        let samples = self.render_offline();
        write_wav_16bit(output_path, &samples, self.context.sample_rate())?;
        Ok(samples.len())
    }
}
