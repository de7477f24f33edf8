//! Hardware model identification.
//!
//! Configuration documents name models loosely (`"HC-SR04"`, `"hc sr04"`,
//! `"Ultrasonic HC_SR04 v2"`), so every declared string goes through
//! [`normalize_model`] and is matched by containment against the normalized
//! identifier of each known model. Matching happens once, when the registry
//! is built; afterwards the resolved model is an enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strip separators (`' '`, `'-'`, `'_'`, `','`, `'.'`) and lower-case.
///
/// # Examples
///
/// ```
/// use avatar_hardware::models::normalize_model;
///
/// assert_eq!(normalize_model("HC-SR04"), "hcsr04");
/// assert_eq!(normalize_model(" LCD_16.02 "), "lcd1602");
/// ```
#[must_use]
pub fn normalize_model(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | ',' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether a declared model string names the model with identifier `id`.
#[must_use]
pub fn model_matches(declared: &str, id: &str) -> bool {
    let id = normalize_model(id);
    !id.is_empty() && normalize_model(declared).contains(&id)
}

/// A closed set of models for one capability.
pub trait KnownModel: Sized + Copy + 'static {
    /// Every model, in matching priority order.
    const ALL: &'static [Self];

    /// Canonical identifier, as written on the part.
    fn identifier(self) -> &'static str;

    /// Resolve a declared model string. First match in [`Self::ALL`] wins.
    fn resolve(declared: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|model| model_matches(declared, model.identifier()))
    }
}

macro_rules! model_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $id:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl KnownModel for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn identifier(self) -> &'static str {
                match self {
                    $(Self::$variant => $id),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.identifier())
            }
        }
    };
}

model_enum! {
    /// Supported range finders.
    RangeFinderModel {
        /// Ultrasonic trigger/echo sensor.
        HcSr04 => "HC-SR04",
    }
}

model_enum! {
    /// Supported rotary actuators.
    ServoModel {
        /// 9 g hobby servo, 180° travel.
        Sg90 => "SG90",
    }
}

model_enum! {
    /// Supported text outputs.
    DisplayModel {
        /// Four-digit multiplexed seven-segment display.
        SevenSegment3461Bs1 => "3461BS-1",
        /// 16x2 character LCD behind a PCF8574 I2C backpack.
        Lcd1602 => "LCD1602",
    }
}

model_enum! {
    /// Supported orientation sensors.
    OrientationModel {
        /// Six-axis accelerometer and gyroscope.
        Mpu6050 => "MPU6050",
    }
}
