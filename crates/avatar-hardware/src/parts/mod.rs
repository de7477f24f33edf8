//! Concrete peripheral models.
//!
//! Every model claims its pins through a [`PinDriver`](crate::pins::PinDriver)
//! when constructed and owns them for the rest of the process.

mod button;
mod hcsr04;
mod lcd1602;
mod mpu6050;
mod seven_segment;
mod sg90;
mod switch;

pub use button::Button;
pub use hcsr04::HcSr04;
pub use lcd1602::{Lcd1602, LcdGeometry};
pub use mpu6050::{Mpu6050, Mpu6050Config};
pub use seven_segment::{SevenSegment3461Bs1, segment_levels};
pub use sg90::{Sg90, angle_to_duty};
pub use switch::DigitalSwitch;
