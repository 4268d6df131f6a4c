//! Live voice set
//!
//! Owns every currently scheduled or sounding voice together with the audio
//! clock they are scheduled against. Voices remove themselves from the set on
//! the frame where they reach their stop time; `stop_all` removes them at once.
//! Deferred callbacks share the same clock and are handed back to the caller
//! when they fall due, so they run outside whatever lock guards this manager.

use crate::generator::{GainAutomation, GeneratorState, Oscillator, SignalGenerator, Waveform};
use tracing::trace;

/// A deferred action run on the audio clock
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Identifies one playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// Identifies one voice in the live set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

/// Who a voice belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceTag {
    Session(SessionId),
    Preview,
}

/// Everything needed to start a voice
#[derive(Debug, Clone)]
pub struct VoiceSpec {
    pub tag: VoiceTag,
    pub frequency: f64,
    pub waveform: Waveform,
    pub gain: GainAutomation,
    /// Absolute start time on the audio clock, in seconds
    pub start: f64,
    /// Absolute stop time on the audio clock, in seconds
    pub stop: f64,
}

/// Snapshot of a live voice
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceInfo {
    pub id: VoiceId,
    pub tag: VoiceTag,
    pub frequency: f64,
    pub waveform: Waveform,
    pub start: f64,
    pub stop: f64,
}

/// A scheduled tone: oscillator shaped by its gain automation
struct Voice {
    id: VoiceId,
    tag: VoiceTag,
    oscillator: Oscillator,
    gain: GainAutomation,
    start: f64,
    stop: f64,
    sample_rate: u32,
    /// Clock frame at which this voice began rendering
    origin_frame: u64,
    position: u64,
    completed: bool,
}

impl Voice {
    fn info(&self) -> VoiceInfo {
        VoiceInfo {
            id: self.id,
            tag: self.tag,
            frequency: self.oscillator.frequency(),
            waveform: self.oscillator.waveform(),
            start: self.start,
            stop: self.stop,
        }
    }
}

impl SignalGenerator for Voice {
    fn process(&mut self, buffer: &mut [f32]) -> GeneratorState {
        let rate = self.sample_rate as f64;
        for (i, sample) in buffer.iter_mut().enumerate() {
            let t = (self.origin_frame + self.position + i as u64) as f64 / rate;
            if t >= self.stop {
                *sample = 0.0;
                self.completed = true;
            } else if t < self.start {
                *sample = 0.0;
            } else {
                *sample = self.oscillator.next_sample() * self.gain.value_at(t);
            }
        }
        self.position += buffer.len() as u64;

        if self.completed {
            GeneratorState::Complete
        } else {
            GeneratorState::Running
        }
    }

    fn is_complete(&self) -> bool {
        self.completed
    }
}

struct ScheduledCallback {
    at: f64,
    callback: Callback,
}

/// Manages the live voices and the audio clock
pub struct VoiceManager {
    sample_rate: u32,
    master_gain: f32,
    frames_rendered: u64,
    voices: Vec<Voice>,
    callbacks: Vec<ScheduledCallback>,
    next_voice_id: u64,
    voice_buffer: Vec<f32>,
}

impl VoiceManager {
    /// Create a new voice manager
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `master_gain` - Scaling applied to the mix before clipping
    pub fn new(sample_rate: u32, master_gain: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            master_gain,
            frames_rendered: 0,
            voices: Vec::new(),
            callbacks: Vec::new(),
            next_voice_id: 0,
            voice_buffer: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Switch to the output device's rate; only possible before the first frame
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> bool {
        if self.frames_rendered > 0 || !self.voices.is_empty() {
            return false;
        }
        self.sample_rate = sample_rate.max(1);
        true
    }

    /// Current audio clock time in seconds
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    /// Frames rendered since creation
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Register a voice in the live set
    pub fn add_voice(&mut self, spec: VoiceSpec) -> VoiceId {
        let id = VoiceId(self.next_voice_id);
        self.next_voice_id += 1;

        self.voices.push(Voice {
            id,
            tag: spec.tag,
            oscillator: Oscillator::new(spec.waveform, spec.frequency, self.sample_rate),
            gain: spec.gain,
            start: spec.start,
            stop: spec.stop,
            sample_rate: self.sample_rate,
            origin_frame: self.frames_rendered,
            position: 0,
            completed: false,
        });
        id
    }

    /// Snapshots of every live voice, in scheduling order
    pub fn live_voices(&self) -> Vec<VoiceInfo> {
        self.voices.iter().map(Voice::info).collect()
    }

    /// Check if there are any live voices
    pub fn has_active_voices(&self) -> bool {
        !self.voices.is_empty()
    }

    /// Get the number of live voices
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Silence and drop every voice immediately; returns how many there were
    pub fn stop_all(&mut self) -> usize {
        let count = self.voices.len();
        self.voices.clear();
        count
    }

    /// Run `callback` once the clock reaches `at`
    pub fn schedule_callback(&mut self, at: f64, callback: Callback) {
        let index = self.callbacks.partition_point(|c| c.at <= at);
        self.callbacks
            .insert(index, ScheduledCallback { at, callback });
    }

    /// Drop every pending callback; returns how many there were
    pub fn cancel_callbacks(&mut self) -> usize {
        let count = self.callbacks.len();
        self.callbacks.clear();
        count
    }

    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    /// Process one frame and mix all live voices
    ///
    /// Writes the mix into `buffer`, advances the clock, removes voices that
    /// completed and returns the callbacks that fell due, in time order.
    pub fn process_frame(&mut self, buffer: &mut [f32]) -> Vec<Callback> {
        buffer.fill(0.0);

        if !self.voices.is_empty() {
            self.voice_buffer.resize(buffer.len(), 0.0);

            for voice in self.voices.iter_mut() {
                voice.process(&mut self.voice_buffer);
                for (sample, voice_sample) in buffer.iter_mut().zip(self.voice_buffer.iter()) {
                    *sample += *voice_sample;
                }
            }

            self.voices.retain(|voice| {
                if voice.is_complete() {
                    trace!(voice = voice.id.0, "voice finished");
                }
                !voice.is_complete()
            });

            for sample in buffer.iter_mut() {
                *sample = soft_clip(*sample * self.master_gain);
            }
        }

        self.frames_rendered += buffer.len() as u64;

        let now = self.current_time();
        let due = self.callbacks.partition_point(|c| c.at <= now);
        self.callbacks
            .drain(..due)
            .map(|scheduled| scheduled.callback)
            .collect()
    }
}

/// Soft clipping to prevent distortion
/// Uses a gentle tanh-like curve for values above threshold
fn soft_clip(sample: f32) -> f32 {
    if sample.abs() <= 1.0 {
        sample
    } else {
        sample.signum() * (1.0 + (sample.abs() - 1.0).tanh() * 0.5)
    }
}
