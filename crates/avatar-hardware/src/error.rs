//! Error types for pin and bus operations.
//!
//! Errors here cover what can go wrong between a peripheral model and the
//! pin driver: acquiring a pin or bus address, and writing to or reading
//! from it once acquired.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Pin is already claimed or does not exist on this board.
    #[error("Pin unavailable: {pin}")]
    PinUnavailable { pin: u8 },

    /// No device answers at this bus address.
    #[error("I2C device unavailable: bus {bus}, address {address:#04x}")]
    BusUnavailable { bus: u8, address: u16 },

    /// A write or read on an acquired pin or bus failed.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },
}

impl HardwareError {
    /// Create a new pin unavailable error.
    pub fn pin_unavailable(pin: u8) -> Self {
        Self::PinUnavailable { pin }
    }

    /// Create a new bus unavailable error.
    pub fn bus_unavailable(bus: u8, address: u16) -> Self {
        Self::BusUnavailable { bus, address }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_unavailable_error() {
        let error = HardwareError::pin_unavailable(17);
        assert!(matches!(error, HardwareError::PinUnavailable { pin: 17 }));
        assert_eq!(error.to_string(), "Pin unavailable: 17");
    }

    #[test]
    fn test_bus_unavailable_error() {
        let error = HardwareError::bus_unavailable(1, 0x27);
        assert!(matches!(error, HardwareError::BusUnavailable { .. }));
        assert_eq!(
            error.to_string(),
            "I2C device unavailable: bus 1, address 0x27"
        );
    }

    #[test]
    fn test_communication_error() {
        let error = HardwareError::communication("NACK from 0x68");
        assert!(matches!(error, HardwareError::CommunicationError { .. }));
        assert_eq!(error.to_string(), "Communication error: NACK from 0x68");
    }
}
