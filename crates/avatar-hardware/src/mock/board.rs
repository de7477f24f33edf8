//! In-memory board implementing [`PinDriver`].
//!
//! The board keeps every pin and bus device in one shared state so a
//! [`MockBoardHandle`] can inspect what peripheral models wrote and drive
//! what they read.

use super::i2c::{I2cRecord, MockI2c};
use super::pins::{MockInput, MockOutput, MockPwm};
use crate::error::{HardwareError, Result};
use crate::pins::{DigitalInput, DigitalOutput, I2cDevice, InputListener, PinDriver, PwmOutput};
use avatar_core::{PinLevel, PullResistance};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

/// Delay between the trigger falling edge and the simulated echo rising.
///
/// Roughly the time an HC-SR04 spends sending its 40 kHz burst.
pub const ECHO_RESPONSE_DELAY: Duration = Duration::from_micros(200);

/// How a simulated range finder answers a trigger pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoResponse {
    /// Echo line stays high for this long.
    Pulse(Duration),

    /// Echo line never rises.
    Silent,
}

impl EchoResponse {
    /// Echo pulse for an obstacle at `cm` centimetres.
    #[must_use]
    pub fn for_distance_cm(cm: f32) -> Self {
        let micros = (cm * avatar_core::constants::HC_SR04_DIVIDER_TO_CM).max(0.0);
        Self::Pulse(Duration::from_micros(micros as u64))
    }
}

#[derive(Debug)]
struct EchoSim {
    trigger: u8,
    response: EchoResponse,
    window: Option<(Instant, Instant)>,
}

#[derive(Debug, Default)]
pub(super) struct OutputRecord {
    pub(super) level: PinLevel,
    pub(super) history: Vec<PinLevel>,
}

pub(super) struct InputRecord {
    pub(super) level: PinLevel,
    pub(super) listeners: Vec<InputListener>,
}

#[derive(Debug, Default)]
pub(super) struct PwmRecord {
    pub(super) frequency: u32,
    pub(super) duty: f32,
    pub(super) history: Vec<f32>,
}

#[derive(Default)]
pub(super) struct BoardState {
    claimed: HashSet<u8>,
    unavailable: HashSet<u8>,
    failing_writes: HashSet<u8>,
    pub(super) outputs: HashMap<u8, OutputRecord>,
    pub(super) inputs: HashMap<u8, InputRecord>,
    pub(super) pwm: HashMap<u8, PwmRecord>,
    pub(super) i2c: HashMap<(u8, u16), I2cRecord>,
    echoes: HashMap<u8, EchoSim>,
}

impl BoardState {
    fn claim(&mut self, pin: u8) -> Result<()> {
        if self.unavailable.contains(&pin) || !self.claimed.insert(pin) {
            return Err(HardwareError::pin_unavailable(pin));
        }
        Ok(())
    }

    pub(super) fn check_write(&self, pin: u8) -> Result<()> {
        if self.failing_writes.contains(&pin) {
            return Err(HardwareError::communication(format!(
                "write to pin {pin} rejected"
            )));
        }
        Ok(())
    }

    /// Record an output write and arm any echo wired to this trigger.
    pub(super) fn write_output(&mut self, pin: u8, level: PinLevel) {
        let record = self.outputs.entry(pin).or_default();
        let falling = record.level == PinLevel::High && level == PinLevel::Low;
        record.level = level;
        record.history.push(level);

        if falling {
            let now = Instant::now();
            for echo in self.echoes.values_mut().filter(|e| e.trigger == pin) {
                echo.window = match echo.response {
                    EchoResponse::Pulse(width) => {
                        let rise = now + ECHO_RESPONSE_DELAY;
                        Some((rise, rise + width))
                    }
                    EchoResponse::Silent => None,
                };
            }
        }
    }

    pub(super) fn input_level(&self, pin: u8) -> PinLevel {
        if let Some(echo) = self.echoes.get(&pin) {
            let now = Instant::now();
            return match echo.window {
                Some((rise, fall)) if now >= rise && now < fall => PinLevel::High,
                _ => PinLevel::Low,
            };
        }

        self.inputs
            .get(&pin)
            .map(|record| record.level)
            .unwrap_or_default()
    }
}

pub(super) type SharedState = Arc<Mutex<BoardState>>;

pub(super) fn lock(state: &SharedState) -> MutexGuard<'_, BoardState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulated single-board computer.
///
/// # Examples
///
/// ```
/// use avatar_core::PullResistance;
/// use avatar_hardware::mock::MockBoard;
/// use avatar_hardware::pins::PinDriver;
///
/// let (board, handle) = MockBoard::new();
/// let button = board.digital_input(5, PullResistance::PullDown, "button").unwrap();
///
/// assert!(button.is_low());
/// handle.set_input(5, true.into());
/// assert!(button.is_high());
/// ```
#[derive(Clone)]
pub struct MockBoard {
    state: SharedState,
}

impl MockBoard {
    /// Create a board and the handle used to observe and drive it.
    pub fn new() -> (Self, MockBoardHandle) {
        let state: SharedState = Arc::default();
        (
            Self {
                state: Arc::clone(&state),
            },
            MockBoardHandle { state },
        )
    }
}

impl std::fmt::Debug for MockBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBoard").finish_non_exhaustive()
    }
}

impl PinDriver for MockBoard {
    fn digital_output(&self, pin: u8, name: &str) -> Result<Box<dyn DigitalOutput>> {
        let mut state = lock(&self.state);
        state.claim(pin)?;
        state.outputs.insert(pin, OutputRecord::default());
        trace!(pin, name, "Claimed digital output");

        Ok(Box::new(MockOutput::new(pin, Arc::clone(&self.state))))
    }

    fn digital_input(
        &self,
        pin: u8,
        pull: PullResistance,
        name: &str,
    ) -> Result<Box<dyn DigitalInput>> {
        let mut state = lock(&self.state);
        state.claim(pin)?;

        let level = match pull {
            PullResistance::PullUp => PinLevel::High,
            PullResistance::PullDown => PinLevel::Low,
        };
        state.inputs.insert(
            pin,
            InputRecord {
                level,
                listeners: Vec::new(),
            },
        );
        trace!(pin, name, ?pull, "Claimed digital input");

        Ok(Box::new(MockInput::new(pin, Arc::clone(&self.state))))
    }

    fn pwm_output(&self, pin: u8, frequency_hz: u32, name: &str) -> Result<Box<dyn PwmOutput>> {
        let mut state = lock(&self.state);
        state.claim(pin)?;
        state.pwm.insert(
            pin,
            PwmRecord {
                frequency: frequency_hz,
                ..PwmRecord::default()
            },
        );
        trace!(pin, name, frequency_hz, "Claimed PWM output");

        Ok(Box::new(MockPwm::new(
            pin,
            frequency_hz,
            Arc::clone(&self.state),
        )))
    }

    fn i2c_device(&self, bus: u8, address: u16, name: &str) -> Result<Box<dyn I2cDevice>> {
        let state = lock(&self.state);
        if !state.i2c.contains_key(&(bus, address)) {
            return Err(HardwareError::bus_unavailable(bus, address));
        }
        trace!(bus, address, name, "Opened I2C device");

        Ok(Box::new(MockI2c::new(bus, address, Arc::clone(&self.state))))
    }
}

/// Handle for observing and driving a [`MockBoard`].
///
/// Cloneable and shareable across tasks.
#[derive(Clone)]
pub struct MockBoardHandle {
    state: SharedState,
}

impl std::fmt::Debug for MockBoardHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBoardHandle").finish_non_exhaustive()
    }
}

impl MockBoardHandle {
    /// Make every future claim of `pin` fail.
    pub fn mark_unavailable(&self, pin: u8) {
        lock(&self.state).unavailable.insert(pin);
    }

    /// Make every write to `pin` fail.
    pub fn fail_writes(&self, pin: u8) {
        lock(&self.state).failing_writes.insert(pin);
    }

    /// Whether a peripheral has claimed `pin`.
    #[must_use]
    pub fn is_claimed(&self, pin: u8) -> bool {
        lock(&self.state).claimed.contains(&pin)
    }

    /// Current level of an output pin, `None` if the pin is not an output.
    #[must_use]
    pub fn output_level(&self, pin: u8) -> Option<PinLevel> {
        lock(&self.state).outputs.get(&pin).map(|r| r.level)
    }

    /// Every level written to an output pin, oldest first.
    #[must_use]
    pub fn output_history(&self, pin: u8) -> Vec<PinLevel> {
        lock(&self.state)
            .outputs
            .get(&pin)
            .map(|r| r.history.clone())
            .unwrap_or_default()
    }

    /// Current PWM duty cycle, `None` if the pin is not a PWM channel.
    #[must_use]
    pub fn pwm_duty(&self, pin: u8) -> Option<f32> {
        lock(&self.state).pwm.get(&pin).map(|r| r.duty)
    }

    /// PWM frequency the channel was opened with.
    #[must_use]
    pub fn pwm_frequency(&self, pin: u8) -> Option<u32> {
        lock(&self.state).pwm.get(&pin).map(|r| r.frequency)
    }

    /// Every duty cycle applied to a PWM channel, oldest first.
    #[must_use]
    pub fn pwm_history(&self, pin: u8) -> Vec<f32> {
        lock(&self.state)
            .pwm
            .get(&pin)
            .map(|r| r.history.clone())
            .unwrap_or_default()
    }

    /// Drive an input pin and fire its listeners if the level changed.
    ///
    /// Returns `false` if `pin` is not a claimed input.
    pub fn set_input(&self, pin: u8, level: PinLevel) -> bool {
        let listeners = {
            let mut state = lock(&self.state);
            let Some(record) = state.inputs.get_mut(&pin) else {
                return false;
            };
            if record.level == level {
                return true;
            }
            record.level = level;
            record.listeners.clone()
        };

        for listener in listeners {
            listener(level);
        }
        true
    }

    /// Wire a simulated range finder: `echo` answers pulses on `trigger`.
    pub fn wire_echo(&self, trigger: u8, echo: u8, response: EchoResponse) {
        lock(&self.state).echoes.insert(
            echo,
            EchoSim {
                trigger,
                response,
                window: None,
            },
        );
    }

    /// Change how an already wired echo pin answers future triggers.
    pub fn set_echo_response(&self, echo: u8, response: EchoResponse) {
        if let Some(sim) = lock(&self.state).echoes.get_mut(&echo) {
            sim.response = response;
        }
    }

    /// Attach a device that answers at `address` on `bus`.
    pub fn attach_i2c(&self, bus: u8, address: u16) {
        lock(&self.state).i2c.entry((bus, address)).or_default();
    }

    /// Preload the word returned when reading `register`.
    pub fn set_register_word(&self, bus: u8, address: u16, register: u8, value: i16) {
        lock(&self.state)
            .i2c
            .entry((bus, address))
            .or_default()
            .words
            .insert(register, value);
    }

    /// Raw bytes written to an I2C device, oldest first.
    #[must_use]
    pub fn i2c_bytes(&self, bus: u8, address: u16) -> Vec<u8> {
        lock(&self.state)
            .i2c
            .get(&(bus, address))
            .map(|r| r.bytes.clone())
            .unwrap_or_default()
    }

    /// Register writes made to an I2C device, oldest first.
    #[must_use]
    pub fn i2c_register_writes(&self, bus: u8, address: u16) -> Vec<(u8, u8)> {
        lock(&self.state)
            .i2c
            .get(&(bus, address))
            .map(|r| r.register_writes.clone())
            .unwrap_or_default()
    }
}
