//! Audio output context
//!
//! [`AudioContext`] is the explicitly owned handle to an output: it holds the
//! shared [`VoiceManager`] (voices plus audio clock) and a backend that pulls
//! rendered frames from it. A context starts suspended; the backend is opened
//! on the first [`AudioContext::resume`].
//!
//! Backends:
//! - [`OfflineBackend`] - no hardware; the caller drives the clock through
//!   [`AudioContext::render`]. Used for tests and WAV export.
//! - `realtime::CpalBackend` - default output device via cpal (feature `realtime`)

#[cfg(feature = "realtime")]
pub mod realtime;

#[cfg(feature = "realtime")]
pub use realtime::CpalBackend;

use crate::config::EngineConfig;
use crate::error::OutputError;
use crate::pipeline::voicemgr::VoiceManager;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Voice set and clock shared between the engine and the rendering side
pub type SharedVoices = Arc<Mutex<VoiceManager>>;

/// Render one buffer from the shared voice set, then run due callbacks
///
/// Callbacks run after the lock is released, so they may call back into the
/// engine.
pub fn render_shared(voices: &SharedVoices, buffer: &mut [f32]) {
    let due = voices.lock().process_frame(buffer);
    for callback in due {
        callback();
    }
}

/// Lifecycle of an output context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created or paused; the clock does not advance
    Suspended,
    /// Frames are being pulled
    Running,
    /// Shut down for good
    Closed,
}

/// Something that pulls frames from the voice set
pub trait OutputBackend {
    /// Start (or restart) pulling frames; returns the output sample rate
    fn resume(&mut self, voices: &SharedVoices) -> Result<u32, OutputError>;

    /// Pause pulling frames
    fn suspend(&mut self) -> Result<(), OutputError>;

    /// Whether frames are pulled by hardware rather than by `AudioContext::render`
    fn is_realtime(&self) -> bool;
}

/// Backend with no device: frames are rendered on demand
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    sample_rate: u32,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl OutputBackend for OfflineBackend {
    fn resume(&mut self, _voices: &SharedVoices) -> Result<u32, OutputError> {
        Ok(self.sample_rate)
    }

    fn suspend(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn is_realtime(&self) -> bool {
        false
    }
}

/// Owned handle to an audio output
pub struct AudioContext {
    voices: SharedVoices,
    backend: Box<dyn OutputBackend>,
    state: ContextState,
}

impl AudioContext {
    /// Create a suspended context over `backend`
    pub fn new(backend: Box<dyn OutputBackend>, config: &EngineConfig) -> Self {
        Self {
            voices: Arc::new(Mutex::new(VoiceManager::new(
                config.sample_rate,
                config.master_gain,
            ))),
            backend,
            state: ContextState::Suspended,
        }
    }

    /// Create a suspended context rendered on demand
    pub fn offline(config: &EngineConfig) -> Self {
        Self::new(Box::new(OfflineBackend::new(config.sample_rate)), config)
    }

    /// Create a suspended context on the default output device
    #[cfg(feature = "realtime")]
    pub fn realtime(config: &EngineConfig) -> Self {
        Self::new(Box::new(CpalBackend::new()), config)
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Make sure the output is running
    ///
    /// Opens the backend on first use. On failure the context stays
    /// suspended and the error is returned.
    pub fn resume(&mut self) -> Result<(), OutputError> {
        match self.state {
            ContextState::Running => return Ok(()),
            ContextState::Closed => return Err(OutputError::Closed),
            ContextState::Suspended => {}
        }

        let sample_rate = self.backend.resume(&self.voices)?;
        {
            let mut voices = self.voices.lock();
            if sample_rate != voices.sample_rate() && voices.set_sample_rate(sample_rate) {
                debug!(sample_rate, "adopted output sample rate");
            }
        }

        self.state = ContextState::Running;
        info!(
            sample_rate = self.sample_rate(),
            realtime = self.backend.is_realtime(),
            "audio output running"
        );
        Ok(())
    }

    /// Pause the output; the clock stops with it
    pub fn suspend(&mut self) -> Result<(), OutputError> {
        if self.state == ContextState::Running {
            self.backend.suspend()?;
            self.state = ContextState::Suspended;
            debug!("audio output suspended");
        }
        Ok(())
    }

    /// Silence everything and shut the output down for good
    pub fn close(&mut self) {
        if self.state == ContextState::Closed {
            return;
        }
        // A backend that fails to pause is still abandoned
        let _ = self.backend.suspend();
        {
            let mut voices = self.voices.lock();
            voices.stop_all();
            voices.cancel_callbacks();
        }
        self.state = ContextState::Closed;
        debug!("audio output closed");
    }

    /// Current audio clock time in seconds
    pub fn current_time(&self) -> f64 {
        self.voices.lock().current_time()
    }

    pub fn sample_rate(&self) -> u32 {
        self.voices.lock().sample_rate()
    }

    pub fn is_realtime(&self) -> bool {
        self.backend.is_realtime()
    }

    /// Shared voice set this context renders
    pub fn voices(&self) -> &SharedVoices {
        &self.voices
    }

    /// Pull one buffer by hand
    ///
    /// While the context is not running this writes silence and the clock
    /// stays put. With a realtime backend the device already pulls frames,
    /// so this only writes silence.
    pub fn render(&self, buffer: &mut [f32]) {
        if self.state != ContextState::Running || self.backend.is_realtime() {
            buffer.fill(0.0);
            return;
        }
        render_shared(&self.voices, buffer);
    }
}
