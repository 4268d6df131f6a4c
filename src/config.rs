//! Engine configuration
//!
//! All timing constants shared by the playback engine and the cursor tracker
//! live here, so both sides read the same lookahead.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config syntax: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Configuration for the playback engine and cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz for offline rendering
    pub sample_rate: u32,
    /// Number of samples per rendered frame
    pub frame_size: usize,
    /// Buffer added to "now" before the first scheduled note, in seconds
    pub lookahead_secs: f64,
    /// Length of a `play_tone` preview, in seconds
    pub preview_duration_secs: f64,
    /// How long the cursor keeps ticking past the last note, in seconds
    pub cursor_grace_secs: f64,
    /// Cursor loop tick interval in milliseconds
    pub cursor_frame_interval_ms: u64,
    /// Output scaling applied to the mix before clipping
    pub master_gain: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            frame_size: 64,
            lookahead_secs: 0.1,
            preview_duration_secs: 0.5,
            cursor_grace_secs: 1.0,
            cursor_frame_interval_ms: 16, // ≈60 fps
            master_gain: 0.8,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; missing keys take their default values
    ///
    /// # Example
    /// ```
    /// use notecast::EngineConfig;
    ///
    /// let config = EngineConfig::from_toml_str("lookahead_secs = 0.05").unwrap();
    /// assert_eq!(config.lookahead_secs, 0.05);
    /// assert_eq!(config.sample_rate, 44100);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if self.frame_size == 0 {
            return Err(ConfigError::Invalid("frame_size must be positive".into()));
        }
        if !(self.lookahead_secs >= 0.0 && self.lookahead_secs.is_finite()) {
            return Err(ConfigError::Invalid(
                "lookahead_secs must be a non-negative number".into(),
            ));
        }
        if !(self.preview_duration_secs > 0.0 && self.preview_duration_secs.is_finite()) {
            return Err(ConfigError::Invalid(
                "preview_duration_secs must be positive".into(),
            ));
        }
        if !(self.cursor_grace_secs >= 0.0 && self.cursor_grace_secs.is_finite()) {
            return Err(ConfigError::Invalid(
                "cursor_grace_secs must be a non-negative number".into(),
            ));
        }
        if self.cursor_frame_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "cursor_frame_interval_ms must be positive".into(),
            ));
        }
        if !(self.master_gain >= 0.0 && self.master_gain.is_finite()) {
            return Err(ConfigError::Invalid(
                "master_gain must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    pub fn lookahead(&self) -> Duration {
        Duration::from_secs_f64(self.lookahead_secs)
    }

    pub fn cursor_grace(&self) -> Duration {
        Duration::from_secs_f64(self.cursor_grace_secs)
    }

    pub fn cursor_frame_interval(&self) -> Duration {
        Duration::from_millis(self.cursor_frame_interval_ms)
    }
}
