use super::{GeneratorState, SignalGenerator};
use serde::{Deserialize, Serialize};

/// Periodic waveform shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl Waveform {
    /// Value of one cycle at `phase` in [0, 1)
    ///
    /// Every shape starts at 0 (or the top of its first half for square)
    /// and rises first.
    pub fn sample(&self, phase: f64) -> f32 {
        let value = match self {
            Waveform::Sine => (2.0 * std::f64::consts::PI * phase).sin(),
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Waveform::Sawtooth => {
                if phase < 0.5 {
                    2.0 * phase
                } else {
                    2.0 * phase - 2.0
                }
            }
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        value as f32
    }
}

/// Free-running tone generator at a fixed frequency
///
/// Never completes on its own; the owning voice decides when it stops.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f64,
    /// Cycles advanced per sample
    increment: f64,
    /// Position within the current cycle, in [0, 1)
    phase: f64,
}

impl Oscillator {
    /// # Example
    /// ```
    /// use notecast::generator::{Oscillator, Waveform};
    ///
    /// let mut osc = Oscillator::new(Waveform::Square, 441.0, 44100);
    /// assert_eq!(osc.next_sample(), 1.0);
    /// ```
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: u32) -> Self {
        Self {
            waveform,
            frequency,
            increment: frequency / sample_rate.max(1) as f64,
            phase: 0.0,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Produce one sample and advance the phase, wrapping to [0, 1)
    pub fn next_sample(&mut self) -> f32 {
        let value = self.waveform.sample(self.phase);
        self.phase = (self.phase + self.increment).fract();
        value
    }
}

impl SignalGenerator for Oscillator {
    fn process(&mut self, buffer: &mut [f32]) -> GeneratorState {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
        GeneratorState::Running
    }

    fn is_complete(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_waveform_shapes() {
        assert_abs_diff_eq!(Waveform::Sine.sample(0.25), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(Waveform::Sine.sample(0.75), -1.0, epsilon = 1e-6);
        assert_eq!(Waveform::Triangle.sample(0.0), 0.0);
        assert_eq!(Waveform::Triangle.sample(0.25), 1.0);
        assert_eq!(Waveform::Triangle.sample(0.75), -1.0);
        assert_eq!(Waveform::Sawtooth.sample(0.0), 0.0);
        assert_eq!(Waveform::Sawtooth.sample(0.25), 0.5);
        assert_eq!(Waveform::Sawtooth.sample(0.5), -1.0);
        assert_eq!(Waveform::Square.sample(0.1), 1.0);
        assert_eq!(Waveform::Square.sample(0.6), -1.0);
    }

    #[test]
    fn test_output_bounded() {
        for waveform in [
            Waveform::Sine,
            Waveform::Triangle,
            Waveform::Sawtooth,
            Waveform::Square,
        ] {
            let mut osc = Oscillator::new(waveform, 1234.5, 44100);
            let mut buffer = [0.0f32; 512];
            let state = osc.process(&mut buffer);
            assert_eq!(state, GeneratorState::Running);
            for &sample in buffer.iter() {
                assert!(
                    (-1.0..=1.0).contains(&sample),
                    "{:?} sample {} out of bounds",
                    waveform,
                    sample
                );
            }
        }
    }

    #[test]
    fn test_phase_wrapping() {
        // A quarter-cycle per sample
        let mut osc = Oscillator::new(Waveform::Triangle, 11025.0, 44100);
        let mut buffer = [0.0f32; 5];
        osc.process(&mut buffer);
        assert_eq!(buffer, [0.0, 1.0, 0.0, -1.0, 0.0]);
        assert!(osc.phase() >= 0.0 && osc.phase() < 1.0);
        assert!(!osc.is_complete());
    }
}
