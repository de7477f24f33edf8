use crate::error::Result;
use crate::pins::{DigitalOutput, PinDriver};
use crate::traits::SwitchableOutput;
use avatar_core::PinLevel;

/// Output driven by a single digital pin, active high.
///
/// Used for LEDs and active buzzers alike.
#[derive(Debug)]
pub struct DigitalSwitch {
    output: Box<dyn DigitalOutput>,
}

impl DigitalSwitch {
    /// Claim `pin` as an output, initially off.
    ///
    /// # Errors
    /// Returns an error if the pin cannot be claimed.
    pub fn new(driver: &dyn PinDriver, pin: u8, name: &str) -> Result<Self> {
        let output = driver.digital_output(pin, name)?;
        output.low()?;
        Ok(Self { output })
    }

    #[must_use]
    pub fn pin(&self) -> u8 {
        self.output.pin()
    }
}

impl SwitchableOutput for DigitalSwitch {
    fn activate(&self) -> Result<()> {
        self.output.set_state(PinLevel::High)
    }

    fn deactivate(&self) -> Result<()> {
        self.output.set_state(PinLevel::Low)
    }

    fn is_active(&self) -> bool {
        self.output.state().is_high()
    }
}
