//! Timing, conversion and addressing constants for supported peripherals.
//!
//! Constants are grouped by peripheral family. Values that come from a
//! datasheet (register addresses, scale factors, pulse widths) must not be
//! changed without checking the part in question.
//!
//! # Usage
//!
//! ```
//! use avatar_core::constants::*;
//! use std::time::Duration;
//!
//! let period = Duration::from_millis(DEFAULT_MEASURING_PERIOD_MS);
//! assert_eq!(period.as_millis(), 500);
//! ```

// ============================================================================
// Ultrasonic Range Finder (HC-SR04)
// ============================================================================

/// Echo microseconds per centimetre of distance (round trip at ~343 m/s).
pub const HC_SR04_DIVIDER_TO_CM: f32 = 58.0;

/// Echo microseconds per inch of distance.
pub const HC_SR04_DIVIDER_TO_INCH: f32 = 148.0;

/// Readings at or beyond this many centimetres are reported as out of range.
pub const HC_SR04_MAX_LIMIT_CM: f32 = 400.0;

/// Readings at or beyond this many inches are reported as out of range.
pub const HC_SR04_MAX_LIMIT_INCH: f32 = 158.0;

/// Width of the trigger pulse that starts a measurement cycle.
pub const TRIGGER_PULSE_MICROS: u64 = 10;

/// Upper bound for each echo busy-wait phase.
///
/// The HC-SR04 holds its echo line high for about 38 ms when nothing is in
/// range, so a phase that lasts longer than that will never resolve.
pub const DEFAULT_ECHO_TIMEOUT_MICROS: u64 = 38_000;

/// Default delay between two measurement cycles.
pub const DEFAULT_MEASURING_PERIOD_MS: u64 = 500;

// ============================================================================
// Rotary Actuator (SG90)
// ============================================================================

/// Total travel of the servo horn in degrees.
pub const SG90_ANGLE_RANGE_DEG: f32 = 180.0;

/// PWM frame frequency expected by hobby servos.
pub const SG90_PWM_FREQUENCY_HZ: u32 = 50;

/// Pulse width commanding the -90° end stop.
pub const SG90_MIN_PULSE_MICROS: f32 = 500.0;

/// Pulse width commanding the +90° end stop.
pub const SG90_MAX_PULSE_MICROS: f32 = 2500.0;

/// Interval between intermediate positions of a timed servo move.
pub const SERVO_STEP_MILLIS: u64 = 20;

// ============================================================================
// Seven-Segment Display (3461BS-1)
// ============================================================================

/// Number of digits on the display.
pub const SEVEN_SEGMENT_DIGITS: usize = 4;

/// Number of GPIO pins the display is wired with.
pub const SEVEN_SEGMENT_PIN_COUNT: usize = 12;

/// Duration of one full multiplexing frame across all lit digits.
pub const SEVEN_SEGMENT_FRAME_MILLIS: u64 = 16;

// ============================================================================
// Character LCD (LCD1602 behind a PCF8574 backpack)
// ============================================================================

/// Factory I2C address of the PCF8574 backpack.
pub const LCD1602_DEFAULT_ADDRESS: u16 = 0x27;

/// Default number of character columns.
pub const LCD1602_DEFAULT_COLUMNS: usize = 16;

/// Default number of character rows.
pub const LCD1602_DEFAULT_ROWS: usize = 2;

/// Connection type string that selects the I2C backpack variant.
pub const CONNECTION_TYPE_I2C: &str = "i2c";

// ============================================================================
// Inertial Measurement Unit (MPU6050)
// ============================================================================

/// Factory I2C address of the MPU6050 (AD0 low).
pub const MPU6050_DEFAULT_ADDRESS: u16 = 0x68;

/// Sample rate divider register.
pub const MPU6050_REG_SMPLRT_DIV: u8 = 0x19;

/// Digital low-pass filter configuration register.
pub const MPU6050_REG_CONFIG: u8 = 0x1A;

/// First accelerometer output register (X high byte).
pub const MPU6050_REG_ACCEL_XOUT_H: u8 = 0x3B;

/// First gyroscope output register (X high byte).
pub const MPU6050_REG_GYRO_XOUT_H: u8 = 0x43;

/// Power management register; writing zero wakes the device.
pub const MPU6050_REG_PWR_MGMT_1: u8 = 0x6B;

/// LSB per g at the default ±2 g full-scale range.
pub const MPU6050_ACCEL_SCALE: f64 = 16384.0;

/// LSB per °/s at the default ±250 °/s full-scale range.
pub const MPU6050_GYRO_SCALE: f64 = 131.0;

// ============================================================================
// Buses
// ============================================================================

/// I2C bus used when a descriptor does not name one (pins 2/3 on a Pi header).
pub const DEFAULT_I2C_BUS: u8 = 1;

// ============================================================================
// Event Bus
// ============================================================================

/// Per-topic broadcast buffer; slower subscribers skip ahead past this.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Minimum gap between two readings a tracker forwards.
pub const DEFAULT_LOGGING_PERIOD_MS: u64 = 1000;
