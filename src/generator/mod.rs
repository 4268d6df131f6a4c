//! Sample-producing building blocks
//!
//! - [`oscillator`]: periodic waveforms at a fixed frequency
//! - [`automation`]: scheduled gain curves that shape a voice over time

pub mod automation;
pub mod oscillator;

pub use automation::{AutomationEvent, GainAutomation, RampKind, MIN_EXPONENTIAL_TARGET};
pub use oscillator::{Oscillator, Waveform};

/// Represents the current state of a signal generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Generator is still producing samples
    Running,
    /// Generator has completed and will produce no more samples
    Complete,
}

/// Something that fills frames of samples
///
/// Oscillators never complete; voices complete once they pass their stop
/// time and are then dropped from the live set.
pub trait SignalGenerator {
    /// Fill `buffer` with the next frame
    ///
    /// A generator that completes during this frame still writes the whole
    /// buffer, with silence after its end.
    fn process(&mut self, buffer: &mut [f32]) -> GeneratorState;

    fn is_complete(&self) -> bool;
}
