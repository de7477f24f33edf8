//! Device registry.
//!
//! Turns the descriptors of a [`Configuration`] into live devices, grouped
//! by capability. A descriptor that names an unknown model, lacks a required
//! pin, or carries an unusable bus address is skipped. A device whose pins
//! cannot be acquired fails on its own; the rest of the registry is still
//! built. Both outcomes end up in the [`BuildReport`].
//!
//! Positions are indices into the built collections: the n-th device of a
//! capability that was actually constructed sits at position n.

use avatar_core::constants::{
    LCD1602_DEFAULT_ADDRESS, MPU6050_DEFAULT_ADDRESS, SEVEN_SEGMENT_PIN_COUNT,
};
use avatar_core::config::parse_bus_address;
use avatar_core::{Capability, Configuration, PeripheralDescriptor, PinAssignment};
use avatar_hardware::devices::{
    AnyOrientationSensor, AnyPushButton, AnyRangeFinder, AnyRotaryActuator, AnySwitchableOutput,
    AnyTextOutput,
};
use avatar_hardware::parts::{
    Button, DigitalSwitch, HcSr04, Lcd1602, LcdGeometry, Mpu6050, Mpu6050Config,
    SevenSegment3461Bs1, Sg90,
};
use avatar_hardware::{
    DisplayModel, HardwareError, KnownModel, OrientationModel, PinDriver, RangeFinderModel,
    ServoModel,
};
use tracing::{debug, info, warn};

/// Why a descriptor produced no device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    /// The declared model string matches no supported model.
    #[error("Unknown hardware model: {}", .0.as_deref().unwrap_or("<none>"))]
    UnknownModel(Option<String>),

    /// A pin the resolved model needs is not configured.
    #[error("Missing pin assignment")]
    MissingPins,

    /// The configured bus address cannot be parsed.
    #[error("Invalid bus address: {0}")]
    InvalidAddress(String),

    /// The model cannot be driven over the configured connection.
    #[error("{model} cannot be driven over this connection")]
    UnsupportedConnection { model: String },
}

/// A descriptor that was left out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDevice {
    pub capability: Capability,
    pub position: usize,
    pub name: String,
    pub reason: SkipReason,
}

/// A device whose construction failed.
#[derive(Debug)]
pub struct FailedDevice {
    pub capability: Capability,
    pub position: usize,
    pub name: String,
    pub error: HardwareError,
}

/// Outcome of a registry build, besides the devices themselves.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub skipped: Vec<SkippedDevice>,
    pub failed: Vec<FailedDevice>,
}

impl BuildReport {
    /// Whether every descriptor produced a device.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

enum BuildIssue {
    Skipped(SkipReason),
    Failed(HardwareError),
}

impl From<HardwareError> for BuildIssue {
    fn from(error: HardwareError) -> Self {
        Self::Failed(error)
    }
}

impl From<SkipReason> for BuildIssue {
    fn from(reason: SkipReason) -> Self {
        Self::Skipped(reason)
    }
}

type Built<T> = std::result::Result<T, BuildIssue>;

/// Live devices of one body, one ordered collection per capability.
///
/// Built once; never resized afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) leds: Vec<AnySwitchableOutput>,
    pub(crate) buttons: Vec<AnyPushButton>,
    pub(crate) buzzers: Vec<AnySwitchableOutput>,
    pub(crate) distance_sensors: Vec<AnyRangeFinder>,
    pub(crate) displays: Vec<AnyTextOutput>,
    pub(crate) servos: Vec<AnyRotaryActuator>,
    pub(crate) orientation_sensors: Vec<AnyOrientationSensor>,
}

impl Registry {
    /// Build every device `config` describes on `driver`.
    ///
    /// Never fails as a whole; per-device problems are collected in the
    /// returned report and logged.
    pub fn build(config: &Configuration, driver: &dyn PinDriver) -> (Self, BuildReport) {
        let mut registry = Self::default();
        let mut report = BuildReport::default();

        for descriptor in config.descriptors() {
            let name = descriptor.display_name();
            match registry.add(&descriptor, &name, driver) {
                Ok(()) => debug!(
                    capability = %descriptor.capability,
                    position = descriptor.position,
                    name = %name,
                    "Peripheral constructed"
                ),
                Err(BuildIssue::Skipped(reason)) => {
                    warn!(
                        capability = %descriptor.capability,
                        position = descriptor.position,
                        name = %name,
                        reason = %reason,
                        "Peripheral skipped"
                    );
                    report.skipped.push(SkippedDevice {
                        capability: descriptor.capability,
                        position: descriptor.position,
                        name,
                        reason,
                    });
                }
                Err(BuildIssue::Failed(error)) => {
                    warn!(
                        capability = %descriptor.capability,
                        position = descriptor.position,
                        name = %name,
                        error = %error,
                        "Peripheral construction failed"
                    );
                    report.failed.push(FailedDevice {
                        capability: descriptor.capability,
                        position: descriptor.position,
                        name,
                        error,
                    });
                }
            }
        }

        info!(
            devices = registry.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Registry built"
        );
        (registry, report)
    }

    fn add(&mut self, d: &PeripheralDescriptor, name: &str, driver: &dyn PinDriver) -> Built<()> {
        match d.capability {
            Capability::Led => self.leds.push(switch(d, name, driver)?),
            Capability::Buzzer => self.buzzers.push(switch(d, name, driver)?),
            Capability::Button => self.buttons.push(button(d, name, driver)?),
            Capability::DistanceSensor => {
                self.distance_sensors.push(range_finder(d, name, driver)?);
            }
            Capability::Display => self.displays.push(display(d, name, driver)?),
            Capability::Servo => self.servos.push(servo(d, name, driver)?),
            Capability::OrientationSensor => {
                self.orientation_sensors
                    .push(orientation_sensor(d, name, driver)?);
            }
        }
        Ok(())
    }

    /// Number of devices of one capability.
    #[must_use]
    pub fn count(&self, capability: Capability) -> usize {
        match capability {
            Capability::Led => self.leds.len(),
            Capability::Button => self.buttons.len(),
            Capability::Buzzer => self.buzzers.len(),
            Capability::DistanceSensor => self.distance_sensors.len(),
            Capability::Display => self.displays.len(),
            Capability::Servo => self.servos.len(),
            Capability::OrientationSensor => self.orientation_sensors.len(),
        }
    }

    /// Total number of devices.
    #[must_use]
    pub fn len(&self) -> usize {
        Capability::ALL.iter().map(|&c| self.count(c)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn distance_sensors(&self) -> &[AnyRangeFinder] {
        &self.distance_sensors
    }

    #[must_use]
    pub fn displays(&self) -> &[AnyTextOutput] {
        &self.displays
    }

    #[must_use]
    pub fn servos(&self) -> &[AnyRotaryActuator] {
        &self.servos
    }

    #[must_use]
    pub fn orientation_sensors(&self) -> &[AnyOrientationSensor] {
        &self.orientation_sensors
    }
}

fn resolve<M: KnownModel>(d: &PeripheralDescriptor) -> Built<M> {
    d.hardware_model
        .as_deref()
        .and_then(M::resolve)
        .ok_or_else(|| SkipReason::UnknownModel(d.hardware_model.clone()).into())
}

fn i2c_address(raw: Option<&str>, default: u16) -> Built<u16> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => {
            parse_bus_address(raw).map_err(|_| SkipReason::InvalidAddress(raw.to_string()).into())
        }
        None => Ok(default),
    }
}

fn switch(d: &PeripheralDescriptor, name: &str, driver: &dyn PinDriver) -> Built<AnySwitchableOutput> {
    let PinAssignment::Single { pin: Some(pin) } = d.pins else {
        return Err(SkipReason::MissingPins.into());
    };
    Ok(AnySwitchableOutput::Digital(DigitalSwitch::new(driver, pin, name)?))
}

fn button(d: &PeripheralDescriptor, name: &str, driver: &dyn PinDriver) -> Built<AnyPushButton> {
    let PinAssignment::Pulled { pin: Some(pin), pull } = d.pins else {
        return Err(SkipReason::MissingPins.into());
    };
    Ok(AnyPushButton::Digital(Button::new(driver, pin, pull, name)?))
}

fn range_finder(
    d: &PeripheralDescriptor,
    name: &str,
    driver: &dyn PinDriver,
) -> Built<AnyRangeFinder> {
    match resolve::<RangeFinderModel>(d)? {
        RangeFinderModel::HcSr04 => {
            let PinAssignment::TriggerEcho {
                trigger: Some(trigger),
                echo: Some(echo),
            } = d.pins
            else {
                return Err(SkipReason::MissingPins.into());
            };
            Ok(AnyRangeFinder::HcSr04(HcSr04::new(driver, trigger, echo, name)?))
        }
    }
}

fn display(d: &PeripheralDescriptor, name: &str, driver: &dyn PinDriver) -> Built<AnyTextOutput> {
    let model = resolve::<DisplayModel>(d)?;
    match (model, &d.pins) {
        (DisplayModel::SevenSegment3461Bs1, PinAssignment::Parallel { pins }) => {
            let mut wired = [0u8; SEVEN_SEGMENT_PIN_COUNT];
            for (slot, pin) in wired.iter_mut().zip(pins) {
                *slot = pin.ok_or(SkipReason::MissingPins)?;
            }
            Ok(AnyTextOutput::SevenSegment(SevenSegment3461Bs1::new(
                driver, wired, name,
            )?))
        }
        (DisplayModel::Lcd1602, PinAssignment::I2c { bus, address }) => {
            let address = i2c_address(address.as_deref(), LCD1602_DEFAULT_ADDRESS)?;
            let geometry = LcdGeometry::from_config(d.settings.columns, d.settings.rows);
            Ok(AnyTextOutput::Lcd(Lcd1602::new(
                driver, *bus, address, geometry, name,
            )?))
        }
        (model, _) => Err(SkipReason::UnsupportedConnection {
            model: model.to_string(),
        }
        .into()),
    }
}

fn servo(d: &PeripheralDescriptor, name: &str, driver: &dyn PinDriver) -> Built<AnyRotaryActuator> {
    match resolve::<ServoModel>(d)? {
        ServoModel::Sg90 => {
            let PinAssignment::Single { pin: Some(pin) } = d.pins else {
                return Err(SkipReason::MissingPins.into());
            };
            Ok(AnyRotaryActuator::Sg90(Sg90::new(driver, pin, name)?))
        }
    }
}

fn orientation_sensor(
    d: &PeripheralDescriptor,
    name: &str,
    driver: &dyn PinDriver,
) -> Built<AnyOrientationSensor> {
    match resolve::<OrientationModel>(d)? {
        OrientationModel::Mpu6050 => {
            let PinAssignment::I2c { bus, address } = &d.pins else {
                return Err(SkipReason::UnsupportedConnection {
                    model: OrientationModel::Mpu6050.to_string(),
                }
                .into());
            };
            let address = i2c_address(address.as_deref(), MPU6050_DEFAULT_ADDRESS)?;
            let config = Mpu6050Config {
                dlpf_cfg: d.settings.dlpf_cfg,
                sample_rate_divider: d.settings.sample_rate_divider,
            };
            Ok(AnyOrientationSensor::Mpu6050(Mpu6050::new(
                driver, *bus, address, config, name,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_hardware::mock::{MockBoard, MockBoardHandle};
    use rstest::rstest;

    fn board() -> (MockBoard, MockBoardHandle) {
        let (board, handle) = MockBoard::new();
        handle.attach_i2c(1, 0x27);
        handle.attach_i2c(1, 0x68);
        (board, handle)
    }

    fn config(json: &str) -> Configuration {
        Configuration::from_json_str(json).unwrap()
    }

    #[test]
    fn test_build_every_capability() {
        let (board, _handle) = board();
        let config = config(
            r#"{
                "leds": [{"pin": 17}, null, {"pin": 27}],
                "buttons": [{"pin": 5, "pullResistance": 1}],
                "buzzers": [{"pin": 22}],
                "distanceSensors": [{"hardwareModel": "HC-SR04", "pinTrigger": 23, "pinEcho": 24}],
                "displays": [
                    {"hardwareModel": "3461BS-1",
                     "pin01": 1, "pin02": 2, "pin03": 3, "pin04": 4, "pin05": 9, "pin06": 10,
                     "pin07": 11, "pin08": 12, "pin09": 13, "pin10": 14, "pin11": 15, "pin12": 16},
                    {"hardwareModel": "LCD1602", "connectionType": "I2C", "i2cBus": 1}
                ],
                "servos": [{"hardwareModel": "sg90", "pin": 18}],
                "positionSensors": [{"hardwareModel": "MPU-6050", "i2cBus": 1, "addressHexAsString": "0x68"}]
            }"#,
        );

        let (registry, report) = Registry::build(&config, &board);

        assert!(report.is_clean(), "{report:?}");
        assert_eq!(registry.count(Capability::Led), 2);
        assert_eq!(registry.count(Capability::Button), 1);
        assert_eq!(registry.count(Capability::Buzzer), 1);
        assert_eq!(registry.count(Capability::DistanceSensor), 1);
        assert_eq!(registry.count(Capability::Display), 2);
        assert_eq!(registry.count(Capability::Servo), 1);
        assert_eq!(registry.count(Capability::OrientationSensor), 1);
        assert_eq!(registry.len(), 9);

        assert_eq!(registry.displays()[0].model(), DisplayModel::SevenSegment3461Bs1);
        assert_eq!(registry.displays()[1].model(), DisplayModel::Lcd1602);
    }

    #[rstest]
    #[case("HC-SR04")]
    #[case("hc sr04")]
    #[case("Ultrasonic HC_SR04, v2")]
    fn test_model_strings_resolve(#[case] declared: &str) {
        let (board, _handle) = board();
        let config = config(&format!(
            r#"{{"distanceSensors": [{{"hardwareModel": "{declared}", "pinTrigger": 23, "pinEcho": 24}}]}}"#
        ));

        let (registry, report) = Registry::build(&config, &board);
        assert!(report.is_clean());
        assert_eq!(registry.distance_sensors()[0].model(), RangeFinderModel::HcSr04);
    }

    #[rstest]
    #[case(r#"{"servos": [{"hardwareModel": "MG996R", "pin": 18}]}"#)]
    #[case(r#"{"servos": [{"pin": 18}]}"#)]
    #[case(r#"{"displays": [{"hardwareModel": "SSD1306", "connectionType": "i2c"}]}"#)]
    fn test_unknown_model_is_skipped(#[case] json: &str) {
        let (board, handle) = board();
        let (registry, report) = Registry::build(&config(json), &board);

        assert!(registry.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0].reason, SkipReason::UnknownModel(_)));
        assert!(!handle.is_claimed(18));
    }

    #[rstest]
    #[case(r#"{"leds": [{"name": "red"}]}"#)]
    #[case(r#"{"distanceSensors": [{"hardwareModel": "HC-SR04", "pinTrigger": 23}]}"#)]
    #[case(r#"{"displays": [{"hardwareModel": "3461BS-1", "pin01": 1}]}"#)]
    fn test_missing_pins_are_skipped(#[case] json: &str) {
        let (board, _handle) = board();
        let (registry, report) = Registry::build(&config(json), &board);

        assert!(registry.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::MissingPins);
    }

    #[test]
    fn test_lcd_requires_i2c() {
        let (board, _handle) = board();
        let (registry, report) = Registry::build(
            &config(r#"{"displays": [{"hardwareModel": "LCD1602", "pin01": 1}]}"#),
            &board,
        );

        assert!(registry.is_empty());
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::UnsupportedConnection {
                model: "LCD1602".into()
            }
        );
    }

    #[test]
    fn test_invalid_address_is_skipped() {
        let (board, _handle) = board();
        let (registry, report) = Registry::build(
            &config(
                r#"{"positionSensors": [{"hardwareModel": "MPU6050", "addressHexAsString": "zz"}]}"#,
            ),
            &board,
        );

        assert!(registry.is_empty());
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::InvalidAddress("zz".into())
        );
    }

    #[test]
    fn test_pin_failure_is_isolated() {
        let (board, handle) = board();
        handle.mark_unavailable(27);
        let config = config(r#"{"leds": [{"pin": 17}, {"name": "broken", "pin": 27}, {"pin": 22}]}"#);

        let (registry, report) = Registry::build(&config, &board);

        assert_eq!(registry.count(Capability::Led), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].position, 1);
        assert_eq!(report.failed[0].name, "broken");
        assert!(matches!(
            report.failed[0].error,
            HardwareError::PinUnavailable { pin: 27 }
        ));
        assert!(handle.is_claimed(22));
    }

    #[test]
    fn test_missing_i2c_device_fails() {
        let (board, _handle) = MockBoard::new();
        let (registry, report) = Registry::build(
            &config(r#"{"positionSensors": [{"hardwareModel": "MPU6050"}]}"#),
            &board,
        );

        assert!(registry.is_empty());
        assert!(matches!(
            report.failed[0].error,
            HardwareError::BusUnavailable { address: 0x68, .. }
        ));
    }

    #[test]
    fn test_skip_reason_messages() {
        assert_eq!(
            SkipReason::UnknownModel(None).to_string(),
            "Unknown hardware model: <none>"
        );
        assert_eq!(
            SkipReason::UnknownModel(Some("XY".into())).to_string(),
            "Unknown hardware model: XY"
        );
    }
}
