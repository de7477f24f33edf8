//! Pin driver interface.
//!
//! These traits are the contract consumed from the hardware-access library:
//! digital outputs and inputs, PWM channels and I2C devices. Every handle is
//! owned by exactly one peripheral model and is used through `&self`, so
//! implementations synchronise internally.
//!
//! Unlike the capability traits, everything here is synchronous and
//! object-safe. Board backends hand out `Box<dyn ...>` handles so peripheral
//! models do not need to be generic over the backend.
//!
//! # Examples
//!
//! ```
//! use avatar_core::PinLevel;
//! use avatar_hardware::mock::MockBoard;
//! use avatar_hardware::pins::PinDriver;
//!
//! let (board, handle) = MockBoard::new();
//! let led = board.digital_output(17, "led").unwrap();
//!
//! led.high().unwrap();
//! assert_eq!(handle.output_level(17), Some(PinLevel::High));
//! ```

use crate::error::Result;
use avatar_core::{PinLevel, PullResistance};
use std::fmt::Debug;
use std::sync::Arc;

/// Callback fired on every debounced input level change.
pub type InputListener = Arc<dyn Fn(PinLevel) + Send + Sync>;

/// A digital output pin.
pub trait DigitalOutput: Send + Sync + Debug {
    /// BCM pin number.
    fn pin(&self) -> u8;

    /// Drive the pin to `level`.
    ///
    /// # Errors
    /// Returns an error if the driver rejects the write.
    fn set_state(&self, level: PinLevel) -> Result<()>;

    /// Last level written.
    fn state(&self) -> PinLevel;

    fn high(&self) -> Result<()> {
        self.set_state(PinLevel::High)
    }

    fn low(&self) -> Result<()> {
        self.set_state(PinLevel::Low)
    }
}

/// A digital input pin with a pull resistor.
pub trait DigitalInput: Send + Sync + Debug {
    fn pin(&self) -> u8;

    /// Current level on the pin.
    fn state(&self) -> PinLevel;

    fn is_high(&self) -> bool {
        self.state().is_high()
    }

    fn is_low(&self) -> bool {
        !self.is_high()
    }

    /// Register a listener for level changes. Listeners are never removed.
    fn add_listener(&self, listener: InputListener);
}

/// A PWM channel running at a fixed frequency.
pub trait PwmOutput: Send + Sync + Debug {
    fn pin(&self) -> u8;

    fn frequency(&self) -> u32;

    /// Start or update the output with the given duty cycle in percent.
    ///
    /// # Errors
    /// Returns an error if the driver rejects the duty cycle.
    fn on(&self, duty_percent: f32) -> Result<()>;

    /// Stop the output.
    ///
    /// # Errors
    /// Returns an error if the driver rejects the write.
    fn off(&self) -> Result<()>;

    /// Duty cycle currently applied, zero when off.
    fn duty_cycle(&self) -> f32;
}

/// A device on an I2C bus.
pub trait I2cDevice: Send + Sync + Debug {
    fn bus(&self) -> u8;

    fn address(&self) -> u16;

    /// Write one raw byte.
    ///
    /// # Errors
    /// Returns an error if the device does not acknowledge.
    fn write_byte(&self, byte: u8) -> Result<()>;

    /// Write one byte into a register.
    ///
    /// # Errors
    /// Returns an error if the device does not acknowledge.
    fn write_register(&self, register: u8, value: u8) -> Result<()>;

    /// Read a big-endian signed word starting at `register`.
    ///
    /// # Errors
    /// Returns an error if the read fails.
    fn read_register_word(&self, register: u8) -> Result<i16>;
}

/// Factory for pin and bus handles.
///
/// `name` is only used for diagnostics.
pub trait PinDriver: Send + Sync {
    /// Claim `pin` as a digital output, initially low.
    ///
    /// # Errors
    /// Returns `HardwareError::PinUnavailable` if the pin is already claimed.
    fn digital_output(&self, pin: u8, name: &str) -> Result<Box<dyn DigitalOutput>>;

    /// Claim `pin` as a digital input.
    ///
    /// # Errors
    /// Returns `HardwareError::PinUnavailable` if the pin is already claimed.
    fn digital_input(
        &self,
        pin: u8,
        pull: PullResistance,
        name: &str,
    ) -> Result<Box<dyn DigitalInput>>;

    /// Claim `pin` as a PWM channel at `frequency_hz`.
    ///
    /// # Errors
    /// Returns `HardwareError::PinUnavailable` if the pin is already claimed.
    fn pwm_output(&self, pin: u8, frequency_hz: u32, name: &str) -> Result<Box<dyn PwmOutput>>;

    /// Open the device at `address` on `bus`.
    ///
    /// # Errors
    /// Returns `HardwareError::BusUnavailable` if nothing answers there.
    fn i2c_device(&self, bus: u8, address: u16, name: &str) -> Result<Box<dyn I2cDevice>>;
}
