//! Runtime knobs of a body.

use avatar_core::constants::{
    DEFAULT_ECHO_TIMEOUT_MICROS, DEFAULT_EVENT_CAPACITY, DEFAULT_MEASURING_PERIOD_MS,
    TRIGGER_PULSE_MICROS,
};
use std::time::Duration;

/// Timing and buffering settings shared by every device of a body.
///
/// # Examples
///
/// ```
/// use avatar_body::BodySettings;
/// use std::time::Duration;
///
/// let settings = BodySettings {
///     measuring_period: Duration::from_millis(100),
///     ..BodySettings::default()
/// };
/// assert_eq!(settings.echo_timeout, Duration::from_millis(38));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodySettings {
    /// Upper bound for each echo edge wait before a cycle reports out of range.
    pub echo_timeout: Duration,

    /// Width of the range-finder trigger pulse.
    pub trigger_pulse: Duration,

    /// Buffer size of every event topic.
    pub event_capacity: usize,

    /// Sampling period used when a start call does not give one.
    pub measuring_period: Duration,
}

impl Default for BodySettings {
    fn default() -> Self {
        Self {
            echo_timeout: Duration::from_micros(DEFAULT_ECHO_TIMEOUT_MICROS),
            trigger_pulse: Duration::from_micros(TRIGGER_PULSE_MICROS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            measuring_period: Duration::from_millis(DEFAULT_MEASURING_PERIOD_MS),
        }
    }
}
