use crate::constants::{
    HC_SR04_DIVIDER_TO_CM, HC_SR04_DIVIDER_TO_INCH, HC_SR04_MAX_LIMIT_CM, HC_SR04_MAX_LIMIT_INCH,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability a peripheral is grouped under inside a body.
///
/// Each capability owns one ordered collection; a peripheral's position is
/// its index inside that collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// On/off light output.
    Led,
    /// Momentary push button input.
    Button,
    /// On/off sound output.
    Buzzer,
    /// Pulse-width range finder.
    DistanceSensor,
    /// Text or number output.
    Display,
    /// Rotary actuator.
    Servo,
    /// Orientation sensor.
    OrientationSensor,
}

impl Capability {
    /// All capabilities in registry order.
    pub const ALL: [Capability; 7] = [
        Capability::Led,
        Capability::Button,
        Capability::Buzzer,
        Capability::DistanceSensor,
        Capability::Display,
        Capability::Servo,
        Capability::OrientationSensor,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Led => "LED",
            Self::Button => "Button",
            Self::Buzzer => "Buzzer",
            Self::DistanceSensor => "Distance sensor",
            Self::Display => "Display",
            Self::Servo => "Servo",
            Self::OrientationSensor => "Orientation sensor",
        };
        f.write_str(name)
    }
}

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinLevel {
    #[default]
    Low,
    High,
}

impl PinLevel {
    #[must_use]
    pub fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for PinLevel {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// Unit a range-finder reading is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceUnit {
    Centimeters,
    Inches,
}

impl DistanceUnit {
    /// Echo microseconds per unit of distance.
    #[must_use]
    pub fn divider(self) -> f32 {
        match self {
            Self::Centimeters => HC_SR04_DIVIDER_TO_CM,
            Self::Inches => HC_SR04_DIVIDER_TO_INCH,
        }
    }

    /// Smallest value reported as out of range.
    #[must_use]
    pub fn max_limit(self) -> f32 {
        match self {
            Self::Centimeters => HC_SR04_MAX_LIMIT_CM,
            Self::Inches => HC_SR04_MAX_LIMIT_INCH,
        }
    }

    /// Short unit label ("cm", "in").
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Centimeters => "cm",
            Self::Inches => "in",
        }
    }
}

/// A converted range-finder reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Distance {
    /// Distance in the requested unit.
    Measured(f32),
    /// Nothing within the sensor's range, or the echo never resolved.
    OutOfRange,
}

impl Distance {
    /// Numeric value with `f32::INFINITY` standing in for out of range.
    #[must_use]
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Measured(value) => value,
            Self::OutOfRange => f32::INFINITY,
        }
    }

    #[must_use]
    pub fn is_out_of_range(self) -> bool {
        matches!(self, Self::OutOfRange)
    }
}

/// Convert an echo pulse to a distance.
///
/// The pulse width is `fall_nanos - rise_nanos`; a fall that precedes the
/// rise is treated as a zero-width pulse. Results at or beyond the unit's
/// maximum limit are [`Distance::OutOfRange`].
///
/// # Examples
///
/// ```
/// use avatar_core::{Distance, DistanceUnit, echo_distance};
///
/// // 5800 µs of echo is 100 cm.
/// let d = echo_distance(0, 5_800_000, DistanceUnit::Centimeters);
/// assert_eq!(d, Distance::Measured(100.0));
///
/// let far = echo_distance(0, 30_000_000, DistanceUnit::Centimeters);
/// assert!(far.is_out_of_range());
/// ```
#[must_use]
pub fn echo_distance(rise_nanos: u64, fall_nanos: u64, unit: DistanceUnit) -> Distance {
    let width_nanos = fall_nanos.saturating_sub(rise_nanos);
    let value = width_nanos as f32 / 1000.0 / unit.divider();
    if value < unit.max_limit() {
        Distance::Measured(value)
    } else {
        Distance::OutOfRange
    }
}

/// One range-finder measurement cycle.
///
/// Timestamps are nanoseconds on a monotonic clock private to the
/// measurement engine; only their difference is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSample {
    /// Position of the sensor inside its collection.
    pub position: usize,

    /// When the echo line went from low to high.
    pub echo_rise_nanos: u64,

    /// When the echo line went from high back to low.
    pub echo_fall_nanos: u64,

    /// The echo did not resolve before the timeout fired.
    pub timed_out: bool,

    /// Wall-clock time the cycle completed.
    pub captured_at: DateTime<Utc>,
}

impl DistanceSample {
    /// Sample from a completed echo.
    #[must_use]
    pub fn new(position: usize, echo_rise_nanos: u64, echo_fall_nanos: u64) -> Self {
        Self {
            position,
            echo_rise_nanos,
            echo_fall_nanos,
            timed_out: false,
            captured_at: Utc::now(),
        }
    }

    /// Sample for a cycle whose echo never resolved.
    #[must_use]
    pub fn timed_out(position: usize, at_nanos: u64) -> Self {
        Self {
            position,
            echo_rise_nanos: at_nanos,
            echo_fall_nanos: at_nanos,
            timed_out: true,
            captured_at: Utc::now(),
        }
    }

    /// Echo pulse width in nanoseconds.
    #[must_use]
    pub fn pulse_width_nanos(&self) -> u64 {
        self.echo_fall_nanos.saturating_sub(self.echo_rise_nanos)
    }

    /// Convert to the given unit.
    #[must_use]
    pub fn distance(&self, unit: DistanceUnit) -> Distance {
        if self.timed_out {
            return Distance::OutOfRange;
        }
        echo_distance(self.echo_rise_nanos, self.echo_fall_nanos, unit)
    }

    #[must_use]
    pub fn to_cm(&self) -> Distance {
        self.distance(DistanceUnit::Centimeters)
    }

    #[must_use]
    pub fn to_inches(&self) -> Distance {
        self.distance(DistanceUnit::Inches)
    }
}

/// Three-axis vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Axes {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One orientation-sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    /// Position of the sensor inside its collection.
    pub position: usize,

    /// Acceleration in g.
    pub acceleration: Axes,

    /// Angular rate in °/s.
    pub rotation: Axes,

    /// Pitch in degrees, derived from acceleration.
    pub pitch_deg: f64,

    /// Roll in degrees, derived from acceleration.
    pub roll_deg: f64,

    pub captured_at: DateTime<Utc>,
}

impl OrientationSample {
    /// Build a sample, deriving pitch and roll from the gravity vector.
    #[must_use]
    pub fn from_motion(position: usize, acceleration: Axes, rotation: Axes) -> Self {
        let pitch = (-acceleration.x)
            .atan2((acceleration.y.powi(2) + acceleration.z.powi(2)).sqrt())
            .to_degrees();
        let roll = acceleration.y.atan2(acceleration.z).to_degrees();

        Self {
            position,
            acceleration,
            rotation,
            pitch_deg: pitch,
            roll_deg: roll,
            captured_at: Utc::now(),
        }
    }
}

/// A button changed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub position: usize,
    pub level: PinLevel,
    pub captured_at: DateTime<Utc>,
}

impl ButtonEvent {
    #[must_use]
    pub fn new(position: usize, level: PinLevel) -> Self {
        Self {
            position,
            level,
            captured_at: Utc::now(),
        }
    }

    /// The button went high (pressed with a pull-down).
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.level.is_high()
    }
}

/// Outcome of a weather-service call, published by the network collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherReport {
    pub successful: bool,
    pub http_code: u16,
    pub message: String,
    /// Raw service payload, if the call returned one.
    pub payload: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 5_800_000, 100.0)]
    #[case(1_000, 1_000 + 580_000, 10.0)]
    #[case(0, 0, 0.0)]
    fn test_echo_distance_cm(#[case] rise: u64, #[case] fall: u64, #[case] expected: f32) {
        let d = echo_distance(rise, fall, DistanceUnit::Centimeters);
        match d {
            Distance::Measured(value) => assert!((value - expected).abs() < 1e-3),
            Distance::OutOfRange => panic!("expected a measurement"),
        }
    }

    #[test]
    fn test_echo_distance_inches() {
        let d = echo_distance(0, 1_480_000, DistanceUnit::Inches);
        assert_eq!(d, Distance::Measured(10.0));
    }

    #[rstest]
    #[case(DistanceUnit::Centimeters, 58 * 400 * 1000)]
    #[case(DistanceUnit::Inches, 148 * 158 * 1000)]
    fn test_echo_distance_at_limit_is_out_of_range(#[case] unit: DistanceUnit, #[case] width: u64) {
        assert_eq!(echo_distance(0, width, unit), Distance::OutOfRange);
        assert!(!echo_distance(0, width - 1000, unit).is_out_of_range());
    }

    #[test]
    fn test_echo_distance_fall_before_rise() {
        assert_eq!(
            echo_distance(10, 5, DistanceUnit::Centimeters),
            Distance::Measured(0.0)
        );
    }

    #[test]
    fn test_timed_out_sample_is_out_of_range() {
        let sample = DistanceSample::timed_out(0, 42);
        assert_eq!(sample.to_cm(), Distance::OutOfRange);
        assert_eq!(sample.to_inches(), Distance::OutOfRange);
        assert_eq!(sample.to_cm().as_f32(), f32::INFINITY);
    }

    #[test]
    fn test_sample_pulse_width() {
        let sample = DistanceSample::new(2, 100, 1_100);
        assert_eq!(sample.position, 2);
        assert_eq!(sample.pulse_width_nanos(), 1_000);
    }

    #[test]
    fn test_orientation_level_sensor() {
        let sample = OrientationSample::from_motion(0, Axes::new(0.0, 0.0, 1.0), Axes::default());
        assert!(sample.pitch_deg.abs() < 1e-9);
        assert!(sample.roll_deg.abs() < 1e-9);
    }

    #[test]
    fn test_orientation_tilted_nose_down() {
        let sample = OrientationSample::from_motion(0, Axes::new(-1.0, 0.0, 0.0), Axes::default());
        assert!((sample.pitch_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::Led.to_string(), "LED");
        assert_eq!(Capability::DistanceSensor.to_string(), "Distance sensor");
    }

    #[test]
    fn test_pin_level_from_bool() {
        assert_eq!(PinLevel::from(true), PinLevel::High);
        assert!(!PinLevel::from(false).is_high());
    }

    proptest! {
        #[test]
        fn prop_echo_distance_is_pure(rise in 0u64..1_000_000_000, width in 0u64..50_000_000) {
            let a = echo_distance(rise, rise + width, DistanceUnit::Centimeters);
            let b = echo_distance(rise, rise + width, DistanceUnit::Centimeters);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_echo_distance_depends_only_on_width(
            rise_a in 0u64..1_000_000_000,
            rise_b in 0u64..1_000_000_000,
            width in 0u64..50_000_000,
        ) {
            prop_assert_eq!(
                echo_distance(rise_a, rise_a + width, DistanceUnit::Inches),
                echo_distance(rise_b, rise_b + width, DistanceUnit::Inches)
            );
        }

        #[test]
        fn prop_measured_values_stay_below_limit(width in 0u64..100_000_000) {
            if let Distance::Measured(cm) = echo_distance(0, width, DistanceUnit::Centimeters) {
                prop_assert!(cm < HC_SR04_MAX_LIMIT_CM);
            }
        }
    }
}
