//! Hardware abstraction layer for Avatar bodies.
//!
//! This crate sits between the body orchestration layer and the board's
//! pin driver. It defines:
//!
//! - the [`pins`] interface consumed from the hardware-access library
//!   (digital outputs and inputs, PWM, I2C),
//! - the capability [`traits`] a peripheral model must implement,
//! - the concrete peripheral [`parts`] (LEDs, buttons, buzzers, HC-SR04,
//!   SG90, 3461BS-1, LCD1602, MPU6050),
//! - the [`models`] matcher that maps declared model strings to those parts,
//! - the [`devices`] enum wrappers a body stores, one per capability,
//! - and a [`mock`] board for tests and development.
//!
//! # Example
//!
//! ```
//! use avatar_hardware::devices::AnyRangeFinder;
//! use avatar_hardware::mock::{EchoResponse, MockBoard};
//! use avatar_hardware::models::{KnownModel, RangeFinderModel};
//! use avatar_hardware::parts::HcSr04;
//! use avatar_hardware::traits::RangeFinder;
//!
//! let (board, handle) = MockBoard::new();
//! handle.wire_echo(23, 24, EchoResponse::for_distance_cm(50.0));
//!
//! let sensor = match RangeFinderModel::resolve("hc-sr04") {
//!     Some(RangeFinderModel::HcSr04) => {
//!         AnyRangeFinder::HcSr04(HcSr04::new(&board, 23, 24, "front").unwrap())
//!     }
//!     None => unreachable!(),
//! };
//!
//! assert!(!sensor.is_active());
//! ```
//!
//! # Error Handling
//!
//! Every fallible operation returns [`Result<T>`][error::Result] with a
//! [`HardwareError`].

pub mod devices;
pub mod error;
pub mod mock;
pub mod models;
pub mod parts;
pub mod pins;
pub mod traits;

pub use error::{HardwareError, Result};
pub use models::{
    DisplayModel, KnownModel, OrientationModel, RangeFinderModel, ServoModel, normalize_model,
};
pub use pins::PinDriver;
pub use traits::{
    MotionReading, OrientationSensor, PushButton, RangeFinder, RenderedText, RotaryActuator,
    SwitchableOutput, TextOutput,
};
