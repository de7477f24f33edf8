use crate::error::Result;
use crate::pins::{DigitalInput, DigitalOutput, PinDriver};
use crate::traits::RangeFinder;
use avatar_core::{PinLevel, PullResistance};
use std::sync::atomic::{AtomicBool, Ordering};

/// HC-SR04 ultrasonic range finder.
///
/// The echo pin is held high for as long as the sound pulse travelled, so
/// the distance is the echo width over a unit-specific divider.
#[derive(Debug)]
pub struct HcSr04 {
    trigger: Box<dyn DigitalOutput>,
    echo: Box<dyn DigitalInput>,
    active: AtomicBool,
}

impl HcSr04 {
    /// Claim the trigger output and the echo input.
    ///
    /// # Errors
    /// Returns an error if either pin cannot be claimed.
    pub fn new(driver: &dyn PinDriver, trigger: u8, echo: u8, name: &str) -> Result<Self> {
        let trigger = driver.digital_output(trigger, name)?;
        trigger.low()?;
        let echo = driver.digital_input(echo, PullResistance::PullDown, name)?;

        Ok(Self {
            trigger,
            echo,
            active: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn pins(&self) -> (u8, u8) {
        (self.trigger.pin(), self.echo.pin())
    }
}

impl RangeFinder for HcSr04 {
    fn trigger_high(&self) -> Result<()> {
        self.trigger.high()
    }

    fn trigger_low(&self) -> Result<()> {
        self.trigger.low()
    }

    fn echo_level(&self) -> PinLevel {
        self.echo.state()
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }
}
