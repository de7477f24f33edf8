//! Capability trait definitions.
//!
//! Each capability is the set of operations a peripheral model must support
//! for the body to drive it. Models are swappable behind a capability; the
//! body only ever talks to the [`devices`](crate::devices) enum wrappers.
//!
//! Operations that take real time (a timed servo sweep, a multiplexed
//! display refresh) are native `async fn` methods. Everything else is a
//! plain synchronous pin write or read.
//!
//! Like the other async traits in this workspace, the async capability
//! traits are not object-safe. Use generics or the `Any*` enums.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::pins::InputListener;
use avatar_core::{Axes, PinLevel};
use std::sync::Arc;
use std::time::Duration;

/// On/off output such as an LED or an active buzzer.
pub trait SwitchableOutput {
    /// Turn the output on.
    ///
    /// # Errors
    /// Returns an error if the pin write fails.
    fn activate(&self) -> Result<()>;

    /// Turn the output off.
    ///
    /// # Errors
    /// Returns an error if the pin write fails.
    fn deactivate(&self) -> Result<()>;

    /// Whether the output is currently on.
    fn is_active(&self) -> bool;
}

/// Momentary push button.
pub trait PushButton {
    /// Current level on the button pin.
    fn state(&self) -> PinLevel;

    fn is_pressed(&self) -> bool {
        self.state().is_high()
    }

    /// Register a raw level-change listener.
    fn on_change(&self, listener: InputListener);

    /// Register a pair of callbacks, one per edge.
    ///
    /// # Examples
    ///
    /// ```
    /// use avatar_core::{PinLevel, PullResistance};
    /// use avatar_hardware::mock::MockBoard;
    /// use avatar_hardware::parts::Button;
    /// use avatar_hardware::traits::PushButton;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicBool, Ordering};
    ///
    /// let (board, handle) = MockBoard::new();
    /// let button = Button::new(&board, 5, PullResistance::PullDown, "start").unwrap();
    ///
    /// let pressed = Arc::new(AtomicBool::new(false));
    /// let flag = Arc::clone(&pressed);
    /// button.add_listener(move || flag.store(true, Ordering::SeqCst), || {});
    ///
    /// handle.set_input(5, PinLevel::High);
    /// assert!(pressed.load(Ordering::SeqCst));
    /// ```
    fn add_listener(
        &self,
        on_high: impl Fn() + Send + Sync + 'static,
        on_low: impl Fn() + Send + Sync + 'static,
    ) {
        self.on_change(Arc::new(move |level| match level {
            PinLevel::High => on_high(),
            PinLevel::Low => on_low(),
        }));
    }
}

/// Servo-like actuator positioned by angle.
///
/// Angles are in degrees relative to the centre position. Requests outside
/// the mechanical range are clamped, never rejected.
pub trait RotaryActuator {
    /// Last commanded angle.
    fn current_angle(&self) -> f32;

    /// Total travel in degrees.
    fn angle_limit(&self) -> f32;

    /// Jump to `angle` immediately. Returns the clamped angle applied.
    ///
    /// # Errors
    /// Returns an error if the PWM write fails.
    fn set_angle(&self, angle: f32) -> Result<f32>;

    /// Move to `angle`, spreading the travel over `duration` when given.
    ///
    /// # Errors
    /// Returns an error if any PWM write fails.
    async fn move_to(&self, angle: f32, duration: Option<Duration>) -> Result<f32>;
}

/// Trigger/echo range finder.
///
/// The measurement protocol itself (pulse the trigger, time the echo) is
/// driven by the caller; the device only exposes its pins and an activity
/// flag the measurement loop observes.
pub trait RangeFinder {
    /// Drive the trigger pin high.
    ///
    /// # Errors
    /// Returns an error if the pin write fails.
    fn trigger_high(&self) -> Result<()>;

    /// Drive the trigger pin low.
    ///
    /// # Errors
    /// Returns an error if the pin write fails.
    fn trigger_low(&self) -> Result<()>;

    /// Current level on the echo pin.
    fn echo_level(&self) -> PinLevel;

    /// Whether a measurement loop should keep running.
    fn is_active(&self) -> bool;

    fn set_active(&self, active: bool);
}

/// Content prepared for a text output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText {
    /// Characters to draw, already truncated to the device width.
    pub text: String,

    /// Index of the character followed by a decimal point, for devices
    /// that draw the point as a separate segment.
    pub dot_after: Option<usize>,
}

/// Display that can show short text or numbers.
pub trait TextOutput {
    /// Number of characters the device can show at once.
    fn width(&self) -> usize;

    /// Format a number or text for this device.
    ///
    /// The number wins when both are given. Returns `None` when there is
    /// nothing to show.
    fn render(&self, number: Option<f64>, text: Option<&str>) -> Option<RenderedText>;

    /// Show rendered content.
    ///
    /// With a `hold`, the display is cleared once it elapses. Without one,
    /// the content stays until the next call. Multiplexed devices keep
    /// refreshing for as long as the content is shown, so this future may
    /// never complete on its own.
    ///
    /// # Errors
    /// Returns an error if a pin or bus write fails.
    async fn show(&self, content: &RenderedText, hold: Option<Duration>) -> Result<()>;

    /// Blank the display.
    ///
    /// # Errors
    /// Returns an error if a pin or bus write fails.
    fn clear(&self) -> Result<()>;
}

/// Raw motion reading in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionReading {
    /// Acceleration in g.
    pub acceleration: Axes,

    /// Angular rate in degrees per second.
    pub rotation: Axes,
}

/// Accelerometer/gyroscope orientation sensor.
pub trait OrientationSensor {
    /// Read one motion sample.
    ///
    /// # Errors
    /// Returns an error if the bus read fails.
    fn read_motion(&self) -> Result<MotionReading>;
}
