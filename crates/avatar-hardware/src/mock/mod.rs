//! Mock board for testing and development.
//!
//! [`MockBoard`] implements [`PinDriver`](crate::pins::PinDriver) entirely in
//! memory. Tests keep the paired [`MockBoardHandle`] to inspect output levels
//! and PWM duty cycles, drive input pins, simulate ultrasonic echoes and
//! preload I2C register words.

mod board;
mod i2c;
mod pins;

pub use board::{ECHO_RESPONSE_DELAY, EchoResponse, MockBoard, MockBoardHandle};
