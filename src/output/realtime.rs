//! Real-time audio output using cpal
//! Works with JACK, ALSA, CoreAudio, WASAPI, etc.

use super::{render_shared, OutputBackend, SharedVoices};
use crate::error::OutputError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

/// Default output device, opened on first resume
pub struct CpalBackend {
    stream: Option<cpal::Stream>,
    sample_rate: u32,
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            stream: None,
            sample_rate: 0,
        }
    }

    fn open(&mut self, voices: &SharedVoices) -> Result<(), OutputError> {
        let host = cpal::default_host();
        info!("Audio host: {:?}", host.id());

        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
        if let Ok(name) = device.name() {
            info!("Audio device: {}", name);
        }

        let config = device
            .default_output_config()
            .map_err(|e| OutputError::Resume(format!("no default output config: {}", e)))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        // The clock must run at the device rate before the first callback
        if !voices.lock().set_sample_rate(sample_rate) {
            return Err(OutputError::Resume(format!(
                "cannot switch a running clock to {} Hz",
                sample_rate
            )));
        }

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config.into(), voices.clone(), channels)
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config.into(), voices.clone(), channels)
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config.into(), voices.clone(), channels)
            }
            other => return Err(OutputError::UnsupportedFormat(format!("{:?}", other))),
        }?;

        self.stream = Some(stream);
        self.sample_rate = sample_rate;
        Ok(())
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    voices: SharedVoices,
    channels: usize,
) -> Result<cpal::Stream, OutputError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = channels.max(1);
    let mut mono: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                mono.resize(frames, 0.0);
                render_shared(&voices, &mut mono);

                for (frame, &sample) in data.chunks_mut(channels).zip(mono.iter()) {
                    for out in frame.iter_mut() {
                        *out = T::from_sample(sample);
                    }
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| OutputError::Resume(format!("failed to build output stream: {}", e)))
}

impl OutputBackend for CpalBackend {
    fn resume(&mut self, voices: &SharedVoices) -> Result<u32, OutputError> {
        if self.stream.is_none() {
            self.open(voices)?;
        }
        if let Some(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| OutputError::Resume(format!("failed to start stream: {}", e)))?;
        }
        Ok(self.sample_rate)
    }

    fn suspend(&mut self) -> Result<(), OutputError> {
        if let Some(stream) = &self.stream {
            stream
                .pause()
                .map_err(|e| OutputError::Resume(format!("failed to pause stream: {}", e)))?;
        }
        Ok(())
    }

    fn is_realtime(&self) -> bool {
        true
    }
}
