//! Enum wrappers for capability dispatch.
//!
//! The async capability traits are not object-safe, so a body holds one
//! `Any*` enum per device instead of a `Box<dyn ...>`. Each enum forwards the
//! capability trait to the concrete model it wraps, and reports which model
//! that is.
//!
//! # Examples
//!
//! ```
//! use avatar_hardware::devices::AnySwitchableOutput;
//! use avatar_hardware::mock::MockBoard;
//! use avatar_hardware::parts::DigitalSwitch;
//! use avatar_hardware::traits::SwitchableOutput;
//!
//! let (board, _handle) = MockBoard::new();
//! let led = AnySwitchableOutput::Digital(DigitalSwitch::new(&board, 17, "led").unwrap());
//!
//! led.activate().unwrap();
//! assert!(led.is_active());
//! ```

use crate::Result;
use crate::models::{DisplayModel, OrientationModel, RangeFinderModel, ServoModel};
use crate::parts::{Button, DigitalSwitch, HcSr04, Lcd1602, Mpu6050, SevenSegment3461Bs1, Sg90};
use crate::pins::InputListener;
use crate::traits::{
    MotionReading, OrientationSensor, PushButton, RangeFinder, RenderedText, RotaryActuator,
    SwitchableOutput, TextOutput,
};
use avatar_core::PinLevel;
use std::time::Duration;

/// Any on/off output (LEDs and buzzers).
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySwitchableOutput {
    /// Output on a single digital pin.
    Digital(DigitalSwitch),
}

impl SwitchableOutput for AnySwitchableOutput {
    fn activate(&self) -> Result<()> {
        match self {
            Self::Digital(device) => device.activate(),
        }
    }

    fn deactivate(&self) -> Result<()> {
        match self {
            Self::Digital(device) => device.deactivate(),
        }
    }

    fn is_active(&self) -> bool {
        match self {
            Self::Digital(device) => device.is_active(),
        }
    }
}

/// Any push button.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyPushButton {
    /// Button on a pulled digital input.
    Digital(Button),
}

impl PushButton for AnyPushButton {
    fn state(&self) -> PinLevel {
        match self {
            Self::Digital(device) => device.state(),
        }
    }

    fn on_change(&self, listener: InputListener) {
        match self {
            Self::Digital(device) => device.on_change(listener),
        }
    }
}

/// Any range finder.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyRangeFinder {
    HcSr04(HcSr04),
}

impl AnyRangeFinder {
    #[must_use]
    pub fn model(&self) -> RangeFinderModel {
        match self {
            Self::HcSr04(_) => RangeFinderModel::HcSr04,
        }
    }
}

impl RangeFinder for AnyRangeFinder {
    fn trigger_high(&self) -> Result<()> {
        match self {
            Self::HcSr04(device) => device.trigger_high(),
        }
    }

    fn trigger_low(&self) -> Result<()> {
        match self {
            Self::HcSr04(device) => device.trigger_low(),
        }
    }

    fn echo_level(&self) -> PinLevel {
        match self {
            Self::HcSr04(device) => device.echo_level(),
        }
    }

    fn is_active(&self) -> bool {
        match self {
            Self::HcSr04(device) => device.is_active(),
        }
    }

    fn set_active(&self, active: bool) {
        match self {
            Self::HcSr04(device) => device.set_active(active),
        }
    }
}

/// Any rotary actuator.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyRotaryActuator {
    Sg90(Sg90),
}

impl AnyRotaryActuator {
    #[must_use]
    pub fn model(&self) -> ServoModel {
        match self {
            Self::Sg90(_) => ServoModel::Sg90,
        }
    }
}

impl RotaryActuator for AnyRotaryActuator {
    fn current_angle(&self) -> f32 {
        match self {
            Self::Sg90(device) => device.current_angle(),
        }
    }

    fn angle_limit(&self) -> f32 {
        match self {
            Self::Sg90(device) => device.angle_limit(),
        }
    }

    fn set_angle(&self, angle: f32) -> Result<f32> {
        match self {
            Self::Sg90(device) => device.set_angle(angle),
        }
    }

    async fn move_to(&self, angle: f32, duration: Option<Duration>) -> Result<f32> {
        match self {
            Self::Sg90(device) => device.move_to(angle, duration).await,
        }
    }
}

/// Any text output.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTextOutput {
    SevenSegment(SevenSegment3461Bs1),
    Lcd(Lcd1602),
}

impl AnyTextOutput {
    #[must_use]
    pub fn model(&self) -> DisplayModel {
        match self {
            Self::SevenSegment(_) => DisplayModel::SevenSegment3461Bs1,
            Self::Lcd(_) => DisplayModel::Lcd1602,
        }
    }
}

impl TextOutput for AnyTextOutput {
    fn width(&self) -> usize {
        match self {
            Self::SevenSegment(device) => device.width(),
            Self::Lcd(device) => device.width(),
        }
    }

    fn render(&self, number: Option<f64>, text: Option<&str>) -> Option<RenderedText> {
        match self {
            Self::SevenSegment(device) => device.render(number, text),
            Self::Lcd(device) => device.render(number, text),
        }
    }

    async fn show(&self, content: &RenderedText, hold: Option<Duration>) -> Result<()> {
        match self {
            Self::SevenSegment(device) => device.show(content, hold).await,
            Self::Lcd(device) => device.show(content, hold).await,
        }
    }

    fn clear(&self) -> Result<()> {
        match self {
            Self::SevenSegment(device) => device.clear(),
            Self::Lcd(device) => device.clear(),
        }
    }
}

/// Any orientation sensor.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyOrientationSensor {
    Mpu6050(Mpu6050),
}

impl AnyOrientationSensor {
    #[must_use]
    pub fn model(&self) -> OrientationModel {
        match self {
            Self::Mpu6050(_) => OrientationModel::Mpu6050,
        }
    }
}

impl OrientationSensor for AnyOrientationSensor {
    fn read_motion(&self) -> Result<MotionReading> {
        match self {
            Self::Mpu6050(device) => device.read_motion(),
        }
    }
}
