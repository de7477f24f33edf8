//! Declarative body configuration.
//!
//! A configuration is a JSON document listing every peripheral wired to the
//! board, grouped by capability. Every list, and every entry inside a list,
//! may be `null`; unknown fields are ignored so documents written for newer
//! versions still load.
//!
//! ```
//! use avatar_core::{Capability, Configuration};
//!
//! let json = r#"{
//!     "configName": "desk",
//!     "hardwareType": "circuitboard",
//!     "leds": [{ "name": "red", "pin": 17 }, null, { "pin": 27 }],
//!     "distanceSensors": [{ "hardwareModel": "HC-SR04", "pinTrigger": 23, "pinEcho": 24 }]
//! }"#;
//!
//! let config = Configuration::from_json_str(json).unwrap();
//! let descriptors = config.descriptors();
//!
//! assert_eq!(descriptors.len(), 3);
//! assert_eq!(descriptors[0].capability, Capability::Led);
//! assert_eq!(descriptors[2].capability, Capability::DistanceSensor);
//! ```

use crate::constants::{DEFAULT_I2C_BUS, SEVEN_SEGMENT_PIN_COUNT};
use crate::error::{Error, Result};
use crate::types::Capability;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub config_name: Option<String>,
    pub config_description: Option<String>,
    pub config_version: Option<String>,
    pub hardware_model: Option<String>,
    pub hardware_type: Option<String>,
    pub leds: Option<Vec<Option<LedConfig>>>,
    pub buttons: Option<Vec<Option<ButtonConfig>>>,
    pub buzzers: Option<Vec<Option<BuzzerConfig>>>,
    pub distance_sensors: Option<Vec<Option<DistanceSensorConfig>>>,
    pub displays: Option<Vec<Option<DisplayConfig>>>,
    pub servos: Option<Vec<Option<ServoConfig>>>,
    pub position_sensors: Option<Vec<Option<PositionSensorConfig>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedConfig {
    pub name: Option<String>,
    pub pin: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuzzerConfig {
    pub name: Option<String>,
    pub pin: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ButtonConfig {
    pub name: Option<String>,
    pub pin: Option<u8>,
    /// `0` pull-down, `1` pull-up; anything else falls back to pull-down.
    pub pull_resistance: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DistanceSensorConfig {
    pub name: Option<String>,
    pub hardware_model: Option<String>,
    pub hardware_version: Option<String>,
    pub pin_trigger: Option<u8>,
    pub pin_echo: Option<u8>,
    pub installed_sensor_position: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayConfig {
    pub name: Option<String>,
    pub hardware_model: Option<String>,
    pub hardware_version: Option<String>,
    pub connection_type: Option<String>,
    pub pin01: Option<u8>,
    pub pin02: Option<u8>,
    pub pin03: Option<u8>,
    pub pin04: Option<u8>,
    pub pin05: Option<u8>,
    pub pin06: Option<u8>,
    pub pin07: Option<u8>,
    pub pin08: Option<u8>,
    pub pin09: Option<u8>,
    pub pin10: Option<u8>,
    pub pin11: Option<u8>,
    pub pin12: Option<u8>,
    pub i2c_bus: Option<u8>,
    pub address_hex_as_string: Option<String>,
    pub resolution_columns: Option<usize>,
    pub resolution_rows: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServoConfig {
    pub name: Option<String>,
    pub hardware_model: Option<String>,
    pub hardware_version: Option<String>,
    pub pin: Option<u8>,
    pub installed_servo_position: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionSensorConfig {
    pub name: Option<String>,
    pub hardware_model: Option<String>,
    pub hardware_version: Option<String>,
    pub i2c_bus: Option<u8>,
    pub address_hex_as_string: Option<String>,
    pub dlpf_cfg: Option<u8>,
    pub smplrt_div: Option<u8>,
}

/// Kind of body a configuration describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    CircuitBoard,
    WheelsRobot,
}

impl BodyKind {
    /// Identifier used in the `hardwareType` field.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::CircuitBoard => "circuitboard",
            Self::WheelsRobot => "wheelsrobot",
        }
    }
}

/// Input pull resistor of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PullResistance {
    PullDown,
    PullUp,
}

impl PullResistance {
    fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(1) => Self::PullUp,
            _ => Self::PullDown,
        }
    }
}

/// How a peripheral is wired.
///
/// Pins stay optional here; the registry decides which ones are required
/// for the model it resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinAssignment {
    /// One digital pin (LED, buzzer, servo PWM).
    Single { pin: Option<u8> },

    /// One digital input with a pull resistor (button).
    Pulled { pin: Option<u8>, pull: PullResistance },

    /// Trigger output and echo input (ultrasonic range finder).
    TriggerEcho {
        trigger: Option<u8>,
        echo: Option<u8>,
    },

    /// Twelve parallel pins, `pin01` first (seven-segment display).
    Parallel {
        pins: [Option<u8>; SEVEN_SEGMENT_PIN_COUNT],
    },

    /// Device on an I2C bus. `address` is the raw configured string.
    I2c { bus: u8, address: Option<String> },
}

/// Model-specific knobs carried through from the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub columns: Option<usize>,
    pub rows: Option<usize>,
    pub dlpf_cfg: Option<u8>,
    pub sample_rate_divider: Option<u8>,
}

/// One configured peripheral, flattened out of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralDescriptor {
    pub capability: Capability,

    /// Index of the entry in its configuration list.
    pub position: usize,

    pub name: Option<String>,
    pub hardware_model: Option<String>,
    pub connection_type: Option<String>,
    pub pins: PinAssignment,
    pub settings: DeviceSettings,
}

impl PeripheralDescriptor {
    fn new(capability: Capability, position: usize, pins: PinAssignment) -> Self {
        Self {
            capability,
            position,
            name: None,
            hardware_model: None,
            connection_type: None,
            pins,
            settings: DeviceSettings::default(),
        }
    }

    /// Display name, falling back to the capability name.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.capability.to_string().to_uppercase())
    }
}

impl Configuration {
    /// Parse a configuration from a JSON string.
    ///
    /// # Errors
    /// Returns `Error::Json` if the document is not valid JSON or a field
    /// has the wrong type.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read and `Error::Json` if
    /// it cannot be parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Kind of body this configuration describes.
    ///
    /// A missing `hardwareType` means a circuit board.
    ///
    /// # Errors
    /// Returns `Error::UnsupportedBody` for an unrecognised type name.
    pub fn body_kind(&self) -> Result<BodyKind> {
        let Some(raw) = self.hardware_type.as_deref() else {
            return Ok(BodyKind::CircuitBoard);
        };

        match raw.trim().to_lowercase().as_str() {
            "circuitboard" => Ok(BodyKind::CircuitBoard),
            "wheelsrobot" => Ok(BodyKind::WheelsRobot),
            other => Err(Error::UnsupportedBody(other.to_string())),
        }
    }

    /// Flatten the document into descriptors, capability by capability.
    ///
    /// Null entries are dropped. Within a capability, descriptors keep
    /// their declaration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<PeripheralDescriptor> {
        let mut out = Vec::new();

        for (index, led) in entries(&self.leds) {
            let mut d = PeripheralDescriptor::new(
                Capability::Led,
                index,
                PinAssignment::Single { pin: led.pin },
            );
            d.name = led.name.clone();
            out.push(d);
        }

        for (index, button) in entries(&self.buttons) {
            let mut d = PeripheralDescriptor::new(
                Capability::Button,
                index,
                PinAssignment::Pulled {
                    pin: button.pin,
                    pull: PullResistance::from_code(button.pull_resistance),
                },
            );
            d.name = button.name.clone();
            out.push(d);
        }

        for (index, buzzer) in entries(&self.buzzers) {
            let mut d = PeripheralDescriptor::new(
                Capability::Buzzer,
                index,
                PinAssignment::Single { pin: buzzer.pin },
            );
            d.name = buzzer.name.clone();
            out.push(d);
        }

        for (index, sensor) in entries(&self.distance_sensors) {
            let mut d = PeripheralDescriptor::new(
                Capability::DistanceSensor,
                index,
                PinAssignment::TriggerEcho {
                    trigger: sensor.pin_trigger,
                    echo: sensor.pin_echo,
                },
            );
            d.name = sensor.name.clone();
            d.hardware_model = sensor.hardware_model.clone();
            out.push(d);
        }

        for (index, display) in entries(&self.displays) {
            out.push(display_descriptor(index, display));
        }

        for (index, servo) in entries(&self.servos) {
            let mut d = PeripheralDescriptor::new(
                Capability::Servo,
                index,
                PinAssignment::Single { pin: servo.pin },
            );
            d.name = servo.name.clone();
            d.hardware_model = servo.hardware_model.clone();
            out.push(d);
        }

        for (index, sensor) in entries(&self.position_sensors) {
            let mut d = PeripheralDescriptor::new(
                Capability::OrientationSensor,
                index,
                PinAssignment::I2c {
                    bus: sensor.i2c_bus.unwrap_or(DEFAULT_I2C_BUS),
                    address: sensor.address_hex_as_string.clone(),
                },
            );
            d.name = sensor.name.clone();
            d.hardware_model = sensor.hardware_model.clone();
            d.settings.dlpf_cfg = sensor.dlpf_cfg;
            d.settings.sample_rate_divider = sensor.smplrt_div;
            out.push(d);
        }

        out
    }
}

/// Displays are either parallel-wired or on I2C, depending on `connectionType`.
fn display_descriptor(index: usize, display: &DisplayConfig) -> PeripheralDescriptor {
    let is_i2c = display
        .connection_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case(crate::constants::CONNECTION_TYPE_I2C));

    let pins = if is_i2c {
        PinAssignment::I2c {
            bus: display.i2c_bus.unwrap_or(DEFAULT_I2C_BUS),
            address: display.address_hex_as_string.clone(),
        }
    } else {
        PinAssignment::Parallel {
            pins: [
                display.pin01,
                display.pin02,
                display.pin03,
                display.pin04,
                display.pin05,
                display.pin06,
                display.pin07,
                display.pin08,
                display.pin09,
                display.pin10,
                display.pin11,
                display.pin12,
            ],
        }
    };

    let mut d = PeripheralDescriptor::new(Capability::Display, index, pins);
    d.name = display.name.clone();
    d.hardware_model = display.hardware_model.clone();
    d.connection_type = display.connection_type.clone();
    d.settings.columns = display.resolution_columns;
    d.settings.rows = display.resolution_rows;
    d
}

fn entries<T>(list: &Option<Vec<Option<T>>>) -> impl Iterator<Item = (usize, &T)> {
    list.iter()
        .flatten()
        .enumerate()
        .filter_map(|(index, entry)| entry.as_ref().map(|e| (index, e)))
}

/// Parse a bus address written as `0x27`, `#27` or plain decimal.
///
/// # Errors
/// Returns `Error::InvalidAddress` if the string is not a number that fits
/// in 16 bits.
pub fn parse_bus_address(raw: &str) -> Result<u16> {
    let trimmed = raw.trim();
    let parsed = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .or_else(|| trimmed.strip_prefix('#'))
    {
        u16::from_str_radix(hex, 16)
    } else {
        trimmed.parse::<u16>()
    };

    parsed.map_err(|_| Error::InvalidAddress(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    const FULL_CONFIG: &str = r#"{
        "configName": "lesson",
        "hardwareType": "circuitboard",
        "someFutureField": { "ignored": true },
        "leds": [{ "name": "red", "pin": 17 }, null, { "name": "green", "pin": null }],
        "buttons": [{ "name": "start", "pin": 5, "pullResistance": 1 }, { "pin": 6, "pullResistance": 7 }],
        "buzzers": [{ "pin": 22 }],
        "distanceSensors": [{ "name": "front", "hardwareModel": "HC-SR04", "pinTrigger": 23, "pinEcho": 24 }],
        "displays": [
            { "hardwareModel": "3461BS-1", "pin01": 1, "pin12": 12 },
            { "hardwareModel": "LCD 1602", "connectionType": "I2C", "addressHexAsString": "0x27", "resolutionColumns": 20 }
        ],
        "servos": [{ "hardwareModel": "sg-90", "pin": 18 }],
        "positionSensors": [{ "hardwareModel": "MPU-6050", "addressHexAsString": "0x68", "dlpfCfg": 3 }]
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config = Configuration::from_json_str(FULL_CONFIG).unwrap();
        assert_eq!(config.config_name.as_deref(), Some("lesson"));
        assert_eq!(config.leds.as_ref().unwrap().len(), 3);
        assert!(config.leds.as_ref().unwrap()[1].is_none());
    }

    #[test]
    fn test_descriptors_drop_null_entries() {
        let config = Configuration::from_json_str(FULL_CONFIG).unwrap();
        let leds: Vec<_> = config
            .descriptors()
            .into_iter()
            .filter(|d| d.capability == Capability::Led)
            .collect();

        assert_eq!(leds.len(), 2);
        assert_eq!(leds[0].position, 0);
        assert_eq!(leds[1].position, 2);
        assert_eq!(leds[1].pins, PinAssignment::Single { pin: None });
    }

    #[test]
    fn test_descriptors_capability_order() {
        let config = Configuration::from_json_str(FULL_CONFIG).unwrap();
        let order: Vec<_> = config.descriptors().iter().map(|d| d.capability).collect();
        assert_eq!(
            order,
            vec![
                Capability::Led,
                Capability::Led,
                Capability::Button,
                Capability::Button,
                Capability::Buzzer,
                Capability::DistanceSensor,
                Capability::Display,
                Capability::Display,
                Capability::Servo,
                Capability::OrientationSensor,
            ]
        );
    }

    #[test]
    fn test_button_pull_codes() {
        let config = Configuration::from_json_str(FULL_CONFIG).unwrap();
        let pulls: Vec<_> = config
            .descriptors()
            .into_iter()
            .filter_map(|d| match d.pins {
                PinAssignment::Pulled { pull, .. } => Some(pull),
                _ => None,
            })
            .collect();
        assert_eq!(pulls, vec![PullResistance::PullUp, PullResistance::PullDown]);
    }

    #[test]
    fn test_display_connection_types() {
        let config = Configuration::from_json_str(FULL_CONFIG).unwrap();
        let displays: Vec<_> = config
            .descriptors()
            .into_iter()
            .filter(|d| d.capability == Capability::Display)
            .collect();

        match &displays[0].pins {
            PinAssignment::Parallel { pins } => {
                assert_eq!(pins[0], Some(1));
                assert_eq!(pins[11], Some(12));
                assert_eq!(pins[5], None);
            }
            other => panic!("unexpected pins {other:?}"),
        }

        assert_eq!(
            displays[1].pins,
            PinAssignment::I2c {
                bus: DEFAULT_I2C_BUS,
                address: Some("0x27".to_string())
            }
        );
        assert_eq!(displays[1].settings.columns, Some(20));
        assert_eq!(displays[1].settings.rows, None);
    }

    #[test]
    fn test_empty_document() {
        let config = Configuration::from_json_str("{}").unwrap();
        assert!(config.descriptors().is_empty());
        assert_eq!(config.body_kind().unwrap(), BodyKind::CircuitBoard);
    }

    #[test]
    fn test_null_lists() {
        let config = Configuration::from_json_str(r#"{ "leds": null, "servos": [null] }"#).unwrap();
        assert!(config.descriptors().is_empty());
    }

    #[test]
    fn test_invalid_json() {
        let result = Configuration::from_json_str(r#"{ "leds": "nope" }"#);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[rstest]
    #[case("circuitboard", BodyKind::CircuitBoard)]
    #[case(" CircuitBoard ", BodyKind::CircuitBoard)]
    #[case("wheelsrobot", BodyKind::WheelsRobot)]
    fn test_body_kind(#[case] raw: &str, #[case] expected: BodyKind) {
        let config = Configuration {
            hardware_type: Some(raw.to_string()),
            ..Default::default()
        };
        assert_eq!(config.body_kind().unwrap(), expected);
    }

    #[test]
    fn test_body_kind_unknown() {
        let config = Configuration {
            hardware_type: Some("hovercraft".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.body_kind(), Err(Error::UnsupportedBody(_))));
    }

    #[rstest]
    #[case("0x27", 0x27)]
    #[case("0X68", 0x68)]
    #[case("#3c", 0x3c)]
    #[case("39", 39)]
    #[case(" 0x27 ", 0x27)]
    fn test_parse_bus_address(#[case] raw: &str, #[case] expected: u16) {
        assert_eq!(parse_bus_address(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("0xZZ")]
    #[case("seventy")]
    #[case("0x1FFFF")]
    fn test_parse_bus_address_invalid(#[case] raw: &str) {
        assert!(matches!(parse_bus_address(raw), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_CONFIG.as_bytes()).unwrap();

        let config = Configuration::from_path(file.path()).unwrap();
        assert_eq!(config.descriptors().len(), 10);
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = Configuration::from_path("/definitely/not/here.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_display_name_fallback() {
        let config = Configuration::from_json_str(FULL_CONFIG).unwrap();
        let descriptors = config.descriptors();
        assert_eq!(descriptors[0].display_name(), "red");
        assert_eq!(descriptors[4].display_name(), "BUZZER");
    }
}
