//! Instrument voices
//!
//! Each instrument pairs a waveform with a gain envelope made of a few ramp
//! segments anchored to the note's start and end:
//!
//! | Instrument | Waveform | Envelope |
//! |---|---|---|
//! | Piano | sine | 0 → 0.8 linear over 20ms, exponential decay to 0.01 at note end |
//! | Guitar | triangle | 0 → 0.7 linear over 10ms, exponential decay to 0.01 at note end |
//! | Violin | sawtooth | 0 → 0.5 linear over 200ms, hold until end − 100ms, linear release to 0 |
//! | Flute | triangle | 0 → 0.6 linear over 50ms, linear release to 0 at note end |
//! | Synth | square | 0 → 0.3 linear over 50ms, hold until end − 50ms, linear release to 0 |
//! | Plain | sine | flat 0.5, linear release to 0 at note end |
//!
//! Notes shorter than the attack cut the attack at the note end, and a hold
//! never starts before the attack finishes.

use crate::generator::{GainAutomation, Waveform, MIN_EXPONENTIAL_TARGET};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Instrument selection for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Instrument {
    #[default]
    Piano,
    Guitar,
    Violin,
    Flute,
    /// Square-wave lead
    Synth,
    /// Fallback for unrecognised instrument names
    Plain,
}

/// What happens after the attack peak
#[derive(Debug, Clone, Copy, PartialEq)]
enum Body {
    /// Exponential decay to the floor, reaching it at note end
    Decay,
    /// Hold the peak, then a linear release of the given length
    HoldRelease { release: f64 },
    /// Linear release to 0 across the rest of the note
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EnvelopePolicy {
    waveform: Waveform,
    peak: f32,
    /// Linear attack length in seconds; `None` starts at the peak
    attack: Option<f64>,
    body: Body,
}

impl Instrument {
    pub const ALL: [Instrument; 6] = [
        Instrument::Piano,
        Instrument::Guitar,
        Instrument::Violin,
        Instrument::Flute,
        Instrument::Synth,
        Instrument::Plain,
    ];

    /// Look up an instrument by name, falling back to [`Instrument::Plain`]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "piano" => Instrument::Piano,
            "guitar" => Instrument::Guitar,
            "violin" => Instrument::Violin,
            "flute" => Instrument::Flute,
            "synth" | "synth-lead" | "synth_lead" | "lead" => Instrument::Synth,
            _ => Instrument::Plain,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::Guitar => "guitar",
            Instrument::Violin => "violin",
            Instrument::Flute => "flute",
            Instrument::Synth => "synth",
            Instrument::Plain => "plain",
        }
    }

    fn policy(&self) -> EnvelopePolicy {
        match self {
            Instrument::Piano => EnvelopePolicy {
                waveform: Waveform::Sine,
                peak: 0.8,
                attack: Some(0.02),
                body: Body::Decay,
            },
            Instrument::Guitar => EnvelopePolicy {
                waveform: Waveform::Triangle,
                peak: 0.7,
                attack: Some(0.01),
                body: Body::Decay,
            },
            Instrument::Violin => EnvelopePolicy {
                waveform: Waveform::Sawtooth,
                peak: 0.5,
                attack: Some(0.2),
                body: Body::HoldRelease { release: 0.1 },
            },
            Instrument::Flute => EnvelopePolicy {
                waveform: Waveform::Triangle,
                peak: 0.6,
                attack: Some(0.05),
                body: Body::Release,
            },
            Instrument::Synth => EnvelopePolicy {
                waveform: Waveform::Square,
                peak: 0.3,
                attack: Some(0.05),
                body: Body::HoldRelease { release: 0.05 },
            },
            Instrument::Plain => EnvelopePolicy {
                waveform: Waveform::Sine,
                peak: 0.5,
                attack: None,
                body: Body::Release,
            },
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.policy().waveform
    }

    /// Schedule this instrument's envelope on `gain` for a note at `start`
    /// lasting `duration` seconds, and return the waveform to play it with
    ///
    /// # Example
    /// ```
    /// use notecast::generator::{GainAutomation, Waveform};
    /// use notecast::Instrument;
    ///
    /// let mut gain = GainAutomation::new(0.0);
    /// let waveform = Instrument::Piano.shape_envelope(&mut gain, 1.0, 0.5);
    /// assert_eq!(waveform, Waveform::Sine);
    /// assert_eq!(gain.value_at(1.02), 0.8);
    /// ```
    pub fn shape_envelope(&self, gain: &mut GainAutomation, start: f64, duration: f64) -> Waveform {
        let policy = self.policy();
        let end = start + duration.max(0.0);

        let attack_end = match policy.attack {
            Some(attack) => {
                let attack_end = (start + attack).min(end);
                gain.set_value_at_time(0.0, start)
                    .linear_ramp_to_value_at_time(policy.peak, attack_end);
                attack_end
            }
            None => {
                gain.set_value_at_time(policy.peak, start);
                start
            }
        };

        match policy.body {
            Body::Decay => {
                gain.exponential_ramp_to_value_at_time(MIN_EXPONENTIAL_TARGET, end);
            }
            Body::HoldRelease { release } => {
                let hold_end = (end - release).max(attack_end);
                gain.linear_ramp_to_value_at_time(policy.peak, hold_end)
                    .linear_ramp_to_value_at_time(0.0, end);
            }
            Body::Release => {
                gain.linear_ramp_to_value_at_time(0.0, end);
            }
        }

        policy.waveform
    }
}

impl FromStr for Instrument {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Instrument::from_name(s))
    }
}

// Names from JSON go through the same lookup as names from the command line
impl From<String> for Instrument {
    fn from(name: String) -> Self {
        Instrument::from_name(&name)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::RampKind;
    use approx::assert_abs_diff_eq;

    fn shaped(instrument: Instrument, start: f64, duration: f64) -> (GainAutomation, Waveform) {
        let mut gain = GainAutomation::new(0.0);
        let waveform = instrument.shape_envelope(&mut gain, start, duration);
        (gain, waveform)
    }

    #[test]
    fn test_waveforms() {
        assert_eq!(Instrument::Piano.waveform(), Waveform::Sine);
        assert_eq!(Instrument::Guitar.waveform(), Waveform::Triangle);
        assert_eq!(Instrument::Violin.waveform(), Waveform::Sawtooth);
        assert_eq!(Instrument::Flute.waveform(), Waveform::Triangle);
        assert_eq!(Instrument::Synth.waveform(), Waveform::Square);
        assert_eq!(Instrument::Plain.waveform(), Waveform::Sine);
    }

    #[test]
    fn test_piano_envelope() {
        let (gain, waveform) = shaped(Instrument::Piano, 1.0, 1.0);
        assert_eq!(waveform, Waveform::Sine);

        let events = gain.events();
        assert_eq!(events.len(), 3);
        assert_eq!((events[0].kind, events[0].value, events[0].time), (RampKind::Set, 0.0, 1.0));
        assert_eq!(events[1].kind, RampKind::Linear);
        assert_eq!(events[1].value, 0.8);
        assert_abs_diff_eq!(events[1].time, 1.02, epsilon = 1e-12);
        assert_eq!(events[2].kind, RampKind::Exponential);
        assert_eq!(events[2].value, 0.01);
        assert_eq!(events[2].time, 2.0);

        assert_abs_diff_eq!(gain.value_at(1.01), 0.4, epsilon = 1e-4);
        assert!(gain.value_at(1.5) < 0.8 && gain.value_at(1.5) > 0.01);
    }

    #[test]
    fn test_guitar_envelope() {
        let (gain, _) = shaped(Instrument::Guitar, 0.0, 0.5);
        let events = gain.events();
        assert_eq!(events[1].value, 0.7);
        assert_abs_diff_eq!(events[1].time, 0.01, epsilon = 1e-12);
        assert_eq!(events[2].kind, RampKind::Exponential);
        assert_eq!(events[2].value, 0.01);
        assert_eq!(events[2].time, 0.5);
    }

    #[test]
    fn test_violin_envelope() {
        let (gain, waveform) = shaped(Instrument::Violin, 0.0, 1.0);
        assert_eq!(waveform, Waveform::Sawtooth);
        assert_abs_diff_eq!(gain.value_at(0.1), 0.25, epsilon = 1e-6);
        assert_eq!(gain.value_at(0.2), 0.5);
        assert_eq!(gain.value_at(0.5), 0.5);
        assert_abs_diff_eq!(gain.value_at(0.9), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(gain.value_at(0.95), 0.25, epsilon = 1e-4);
        assert_eq!(gain.value_at(1.0), 0.0);
    }

    #[test]
    fn test_flute_envelope() {
        let (gain, _) = shaped(Instrument::Flute, 0.0, 1.05);
        assert_eq!(gain.value_at(0.05), 0.6);
        assert_abs_diff_eq!(gain.value_at(0.55), 0.3, epsilon = 1e-4);
        assert_eq!(gain.value_at(1.05), 0.0);
    }

    #[test]
    fn test_synth_envelope() {
        let (gain, waveform) = shaped(Instrument::Synth, 2.0, 1.0);
        assert_eq!(waveform, Waveform::Square);
        assert_eq!(gain.value_at(2.05), 0.3);
        assert_abs_diff_eq!(gain.value_at(2.5), 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(gain.value_at(2.95), 0.3, epsilon = 1e-4);
        assert_eq!(gain.value_at(3.0), 0.0);
    }

    #[test]
    fn test_plain_envelope() {
        let (gain, waveform) = shaped(Instrument::Plain, 0.0, 2.0);
        assert_eq!(waveform, Waveform::Sine);
        assert_eq!(gain.value_at(0.0), 0.5);
        assert_abs_diff_eq!(gain.value_at(1.0), 0.25, epsilon = 1e-6);
        assert_eq!(gain.value_at(2.0), 0.0);
    }

    #[test]
    fn test_exponential_envelopes_never_target_zero() {
        for instrument in Instrument::ALL {
            for duration in [0.005, 0.1, 1.0, 4.0] {
                let (gain, _) = shaped(instrument, 0.0, duration);
                for event in gain.events() {
                    if event.kind == RampKind::Exponential {
                        assert!(event.value > 0.0, "{} targets {}", instrument, event.value);
                    }
                }
            }
        }
    }

    #[test]
    fn test_short_notes_keep_events_inside_note() {
        for instrument in Instrument::ALL {
            let (gain, _) = shaped(instrument, 1.0, 0.03);
            for event in gain.events() {
                assert!(event.time >= 1.0 && event.time <= 1.03 + 1e-12);
            }
            for pair in gain.events().windows(2) {
                assert!(pair[0].time <= pair[1].time);
            }
            assert_eq!(gain.end_time(), Some(1.03));
        }
    }

    #[test]
    fn test_envelope_bounded() {
        for instrument in Instrument::ALL {
            let (gain, _) = shaped(instrument, 0.0, 0.75);
            for i in 0..=750 {
                let value = gain.value_at(i as f64 / 1000.0);
                assert!((0.0..=0.8).contains(&value), "{} gave {}", instrument, value);
            }
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(Instrument::from_name("Violin"), Instrument::Violin);
        assert_eq!(Instrument::from_name("synth-lead"), Instrument::Synth);
        assert_eq!(Instrument::from_name("kazoo"), Instrument::Plain);
        assert_eq!("flute".parse::<Instrument>(), Ok(Instrument::Flute));
        for instrument in Instrument::ALL {
            assert_eq!(Instrument::from_name(instrument.name()), instrument);
        }
    }

    #[test]
    fn test_serde_names() {
        let parsed: Instrument = serde_json::from_str("\"guitar\"").unwrap();
        assert_eq!(parsed, Instrument::Guitar);
        let parsed: Instrument = serde_json::from_str("\"theremin\"").unwrap();
        assert_eq!(parsed, Instrument::Plain);
        assert_eq!(serde_json::to_string(&Instrument::Synth).unwrap(), "\"synth\"");
    }

    #[test]
    fn test_serde_matches_from_name() {
        for name in ["Violin", "PIANO", " flute ", "Synth-Lead", "lead", "Plain"] {
            let parsed: Instrument = serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(parsed, Instrument::from_name(name), "{}", name);
        }
        let parsed: Instrument = serde_json::from_str("\"Violin\"").unwrap();
        assert_eq!(parsed, Instrument::Violin);
    }
}
