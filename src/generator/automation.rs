//! Gain automation
//!
//! A gain parameter driven by timestamped automation events, evaluated at any
//! point on the audio clock. Events are kept ordered by time; a ramp event
//! interpolates from the event before it to its own value at its own time.

/// Smallest target an exponential ramp may approach
///
/// An exponential curve toward 0 never arrives, so targets at or below this
/// floor are raised to it.
pub const MIN_EXPONENTIAL_TARGET: f32 = 0.01;

/// How an automation event reaches its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampKind {
    /// Jump to the value at the event time
    Set,
    /// Straight line from the previous event
    Linear,
    /// Constant-ratio curve from the previous event
    Exponential,
}

/// A single automation point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationEvent {
    pub kind: RampKind,
    pub value: f32,
    /// Absolute time on the audio clock, in seconds
    pub time: f64,
}

/// Amplitude-over-time curve applied to one voice
#[derive(Debug, Clone, PartialEq)]
pub struct GainAutomation {
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl Default for GainAutomation {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl GainAutomation {
    /// Create an automation holding `default_value` until the first event
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(AutomationEvent {
            kind: RampKind::Set,
            value,
            time,
        })
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(AutomationEvent {
            kind: RampKind::Linear,
            value,
            time,
        })
    }

    /// Schedule an exponential ramp; the target is clamped to [`MIN_EXPONENTIAL_TARGET`]
    ///
    /// # Example
    /// ```
    /// use notecast::generator::{GainAutomation, MIN_EXPONENTIAL_TARGET};
    ///
    /// let mut gain = GainAutomation::new(0.0);
    /// gain.set_value_at_time(0.8, 0.0)
    ///     .exponential_ramp_to_value_at_time(0.0, 1.0);
    /// assert_eq!(gain.events()[1].value, MIN_EXPONENTIAL_TARGET);
    /// ```
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) -> &mut Self {
        let value = if value.is_nan() {
            MIN_EXPONENTIAL_TARGET
        } else {
            value.max(MIN_EXPONENTIAL_TARGET)
        };
        self.insert(AutomationEvent {
            kind: RampKind::Exponential,
            value,
            time,
        })
    }

    /// Keep events ordered by time; equal times keep insertion order
    fn insert(&mut self, event: AutomationEvent) -> &mut Self {
        let at = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(at, event);
        self
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    /// Time of the last event, if any
    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(|e| e.time)
    }

    /// Evaluate the gain at an absolute time
    pub fn value_at(&self, time: f64) -> f32 {
        // Number of events at or before `time`
        let passed = self.events.partition_point(|e| e.time <= time);

        let previous = if passed > 0 {
            Some(self.events[passed - 1])
        } else {
            None
        };

        match (previous, self.events.get(passed)) {
            (Some(prev), Some(next)) if next.kind != RampKind::Set => {
                interpolate(prev, *next, time)
            }
            (Some(prev), _) => prev.value,
            (None, _) => self.default_value,
        }
    }
}

fn interpolate(from: AutomationEvent, to: AutomationEvent, time: f64) -> f32 {
    let span = to.time - from.time;
    if span <= 0.0 {
        return to.value;
    }
    let t = ((time - from.time) / span).clamp(0.0, 1.0);
    let (v0, v1) = (from.value as f64, to.value as f64);

    match to.kind {
        RampKind::Linear => (v0 + (v1 - v0) * t) as f32,
        RampKind::Exponential => {
            if v0 <= 0.0 || v1 <= 0.0 {
                // No exponential path through zero: hold until the event time
                from.value
            } else {
                (v0 * (v1 / v0).powf(t)) as f32
            }
        }
        RampKind::Set => from.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_default_before_first_event() {
        let mut gain = GainAutomation::new(0.25);
        gain.set_value_at_time(1.0, 2.0);
        assert_eq!(gain.value_at(0.0), 0.25);
        assert_eq!(gain.value_at(1.999), 0.25);
        assert_eq!(gain.value_at(2.0), 1.0);
        assert_eq!(gain.value_at(10.0), 1.0);
    }

    #[test]
    fn test_linear_ramp() {
        let mut gain = GainAutomation::new(0.0);
        gain.set_value_at_time(0.0, 1.0)
            .linear_ramp_to_value_at_time(1.0, 2.0);

        assert_eq!(gain.value_at(1.0), 0.0);
        assert_abs_diff_eq!(gain.value_at(1.25), 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(gain.value_at(1.5), 0.5, epsilon = 1e-6);
        assert_eq!(gain.value_at(2.0), 1.0);
        assert_eq!(gain.value_at(3.0), 1.0);
    }

    #[test]
    fn test_exponential_ramp() {
        let mut gain = GainAutomation::new(0.0);
        gain.set_value_at_time(1.0, 0.0)
            .exponential_ramp_to_value_at_time(0.01, 1.0);

        // Halfway through a 100:1 ratio curve is the geometric mean
        assert_abs_diff_eq!(gain.value_at(0.5), 0.1, epsilon = 1e-5);
        assert_abs_diff_eq!(gain.value_at(1.0), 0.01, epsilon = 1e-7);
    }

    #[test]
    fn test_exponential_target_floor() {
        let mut gain = GainAutomation::new(0.0);
        gain.exponential_ramp_to_value_at_time(0.0, 1.0)
            .exponential_ramp_to_value_at_time(-3.0, 2.0)
            .exponential_ramp_to_value_at_time(f32::NAN, 3.0);

        for event in gain.events() {
            assert_eq!(event.value, MIN_EXPONENTIAL_TARGET);
        }
    }

    #[test]
    fn test_exponential_from_zero_holds() {
        let mut gain = GainAutomation::new(0.0);
        gain.set_value_at_time(0.0, 0.0)
            .exponential_ramp_to_value_at_time(0.5, 1.0);
        assert_eq!(gain.value_at(0.5), 0.0);
        assert_eq!(gain.value_at(1.0), 0.5);
    }

    #[test]
    fn test_events_sorted_by_time() {
        let mut gain = GainAutomation::new(0.0);
        gain.linear_ramp_to_value_at_time(0.0, 3.0)
            .set_value_at_time(0.0, 1.0)
            .linear_ramp_to_value_at_time(1.0, 2.0);

        let times: Vec<f64> = gain.events().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
        assert_abs_diff_eq!(gain.value_at(2.5), 0.5, epsilon = 1e-6);
        assert_eq!(gain.end_time(), Some(3.0));
    }

    #[test]
    fn test_ramp_without_prior_event_holds_default() {
        let mut gain = GainAutomation::new(0.3);
        gain.linear_ramp_to_value_at_time(1.0, 1.0);
        assert_eq!(gain.value_at(0.5), 0.3);
        assert_eq!(gain.value_at(1.0), 1.0);
    }
}
