use crate::error::Result;
use crate::pins::{DigitalInput, InputListener, PinDriver};
use crate::traits::PushButton;
use avatar_core::{PinLevel, PullResistance};

/// Push button on a pulled digital input.
#[derive(Debug)]
pub struct Button {
    input: Box<dyn DigitalInput>,
}

impl Button {
    /// Claim `pin` as an input with the given pull resistor.
    ///
    /// # Errors
    /// Returns an error if the pin cannot be claimed.
    pub fn new(driver: &dyn PinDriver, pin: u8, pull: PullResistance, name: &str) -> Result<Self> {
        Ok(Self {
            input: driver.digital_input(pin, pull, name)?,
        })
    }

    #[must_use]
    pub fn pin(&self) -> u8 {
        self.input.pin()
    }
}

impl PushButton for Button {
    fn state(&self) -> PinLevel {
        self.input.state()
    }

    fn on_change(&self, listener: InputListener) {
        self.input.add_listener(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBoard;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_edge_callbacks() {
        let (board, handle) = MockBoard::new();
        let button = Button::new(&board, 5, PullResistance::PullDown, "start").unwrap();

        let highs = Arc::new(AtomicUsize::new(0));
        let lows = Arc::new(AtomicUsize::new(0));
        let (h, l) = (Arc::clone(&highs), Arc::clone(&lows));
        button.add_listener(
            move || {
                h.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                l.fetch_add(1, Ordering::SeqCst);
            },
        );

        handle.set_input(5, PinLevel::High);
        handle.set_input(5, PinLevel::Low);
        handle.set_input(5, PinLevel::High);

        assert_eq!(highs.load(Ordering::SeqCst), 2);
        assert_eq!(lows.load(Ordering::SeqCst), 1);
        assert!(button.is_pressed());
    }

    #[test]
    fn test_raw_listener_sees_levels() {
        let (board, handle) = MockBoard::new();
        let button = Button::new(&board, 6, PullResistance::PullUp, "stop").unwrap();
        assert!(button.is_pressed());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        button.on_change(Arc::new(move |level| log.lock().unwrap().push(level)));

        handle.set_input(6, PinLevel::Low);
        assert_eq!(*seen.lock().unwrap(), vec![PinLevel::Low]);
    }
}
