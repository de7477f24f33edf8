//! Pin handles handed out by [`MockBoard`](super::MockBoard).

use super::board::{SharedState, lock};
use crate::error::Result;
use crate::pins::{DigitalInput, DigitalOutput, InputListener, PwmOutput};
use avatar_core::PinLevel;
use std::fmt;

pub(super) struct MockOutput {
    pin: u8,
    state: SharedState,
}

impl MockOutput {
    pub(super) fn new(pin: u8, state: SharedState) -> Self {
        Self { pin, state }
    }
}

impl fmt::Debug for MockOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockOutput").field("pin", &self.pin).finish()
    }
}

impl DigitalOutput for MockOutput {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn set_state(&self, level: PinLevel) -> Result<()> {
        let mut state = lock(&self.state);
        state.check_write(self.pin)?;
        state.write_output(self.pin, level);
        Ok(())
    }

    fn state(&self) -> PinLevel {
        lock(&self.state)
            .outputs
            .get(&self.pin)
            .map(|r| r.level)
            .unwrap_or_default()
    }
}

pub(super) struct MockInput {
    pin: u8,
    state: SharedState,
}

impl MockInput {
    pub(super) fn new(pin: u8, state: SharedState) -> Self {
        Self { pin, state }
    }
}

impl fmt::Debug for MockInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockInput").field("pin", &self.pin).finish()
    }
}

impl DigitalInput for MockInput {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn state(&self) -> PinLevel {
        lock(&self.state).input_level(self.pin)
    }

    fn add_listener(&self, listener: InputListener) {
        if let Some(record) = lock(&self.state).inputs.get_mut(&self.pin) {
            record.listeners.push(listener);
        }
    }
}

pub(super) struct MockPwm {
    pin: u8,
    frequency: u32,
    state: SharedState,
}

impl MockPwm {
    pub(super) fn new(pin: u8, frequency: u32, state: SharedState) -> Self {
        Self {
            pin,
            frequency,
            state,
        }
    }

    fn apply(&self, duty: f32) -> Result<()> {
        let mut state = lock(&self.state);
        state.check_write(self.pin)?;
        let record = state.pwm.entry(self.pin).or_default();
        record.duty = duty;
        record.history.push(duty);
        Ok(())
    }
}

impl fmt::Debug for MockPwm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPwm")
            .field("pin", &self.pin)
            .field("frequency", &self.frequency)
            .finish()
    }
}

impl PwmOutput for MockPwm {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn on(&self, duty_percent: f32) -> Result<()> {
        self.apply(duty_percent.clamp(0.0, 100.0))
    }

    fn off(&self) -> Result<()> {
        self.apply(0.0)
    }

    fn duty_cycle(&self) -> f32 {
        lock(&self.state)
            .pwm
            .get(&self.pin)
            .map(|r| r.duty)
            .unwrap_or_default()
    }
}
