//! WAV file writer utility
//!
//! Writes rendered mono output as 16-bit PCM through hound.

use std::path::Path;

/// Convert one sample in [-1.0, 1.0] to 16-bit PCM, clamping anything outside
pub fn to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        // -1.0 maps to i16::MIN
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Write a 16-bit PCM mono WAV file
///
/// # Example
/// ```no_run
/// use notecast::wav::write_wav_16bit;
///
/// let samples = vec![0.0f32; 44100]; // 1 second of silence
/// write_wav_16bit("silence.wav", &samples, 44100).unwrap();
/// ```
pub fn write_wav_16bit(
    path: impl AsRef<Path>,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(to_i16(sample))?;
    }
    writer.finalize()
}
