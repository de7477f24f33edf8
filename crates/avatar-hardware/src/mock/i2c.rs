//! Simulated I2C devices.
//!
//! A simulated device is a bag of register words plus a log of everything
//! written to it. Reads of registers nobody preloaded return zero.

use super::board::{SharedState, lock};
use crate::error::{HardwareError, Result};
use crate::pins::I2cDevice;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Default)]
pub(super) struct I2cRecord {
    pub(super) words: HashMap<u8, i16>,
    pub(super) bytes: Vec<u8>,
    pub(super) register_writes: Vec<(u8, u8)>,
}

pub(super) struct MockI2c {
    bus: u8,
    address: u16,
    state: SharedState,
}

impl MockI2c {
    pub(super) fn new(bus: u8, address: u16, state: SharedState) -> Self {
        Self {
            bus,
            address,
            state,
        }
    }

    fn with_record<T>(&self, f: impl FnOnce(&mut I2cRecord) -> T) -> Result<T> {
        let mut state = lock(&self.state);
        state
            .i2c
            .get_mut(&(self.bus, self.address))
            .map(f)
            .ok_or_else(|| HardwareError::bus_unavailable(self.bus, self.address))
    }
}

impl fmt::Debug for MockI2c {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockI2c")
            .field("bus", &self.bus)
            .field("address", &format_args!("{:#04x}", self.address))
            .finish()
    }
}

impl I2cDevice for MockI2c {
    fn bus(&self) -> u8 {
        self.bus
    }

    fn address(&self) -> u16 {
        self.address
    }

    fn write_byte(&self, byte: u8) -> Result<()> {
        self.with_record(|record| record.bytes.push(byte))
    }

    fn write_register(&self, register: u8, value: u8) -> Result<()> {
        self.with_record(|record| record.register_writes.push((register, value)))
    }

    fn read_register_word(&self, register: u8) -> Result<i16> {
        self.with_record(|record| record.words.get(&register).copied().unwrap_or_default())
    }
}
