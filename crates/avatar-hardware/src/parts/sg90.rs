use crate::error::Result;
use crate::pins::{PinDriver, PwmOutput};
use crate::traits::RotaryActuator;
use avatar_core::constants::{
    SERVO_STEP_MILLIS, SG90_ANGLE_RANGE_DEG, SG90_MAX_PULSE_MICROS, SG90_MIN_PULSE_MICROS,
    SG90_PWM_FREQUENCY_HZ,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::trace;

const HALF_RANGE: f32 = SG90_ANGLE_RANGE_DEG / 2.0;

/// PWM duty cycle in percent commanding `angle` degrees.
///
/// The angle is clamped to ±90° first; NaN commands the centre.
///
/// # Examples
///
/// ```
/// use avatar_hardware::parts::angle_to_duty;
///
/// assert_eq!(angle_to_duty(0.0), 7.5);
/// assert_eq!(angle_to_duty(-90.0), 2.5);
/// assert_eq!(angle_to_duty(200.0), 12.5);
/// assert_eq!(angle_to_duty(f32::NAN), 7.5);
/// ```
#[must_use]
pub fn angle_to_duty(angle: f32) -> f32 {
    let angle = clamp_angle(angle).unwrap_or(0.0);
    let span = SG90_MAX_PULSE_MICROS - SG90_MIN_PULSE_MICROS;
    let pulse = SG90_MIN_PULSE_MICROS + (angle + HALF_RANGE) / SG90_ANGLE_RANGE_DEG * span;
    let frame_micros = 1_000_000.0 / SG90_PWM_FREQUENCY_HZ as f32;
    pulse * 100.0 / frame_micros
}

/// Clamp to ±90°. `None` for NaN, which has no position.
fn clamp_angle(angle: f32) -> Option<f32> {
    (!angle.is_nan()).then(|| angle.clamp(-HALF_RANGE, HALF_RANGE))
}

/// SG90 micro servo on a 50 Hz PWM channel.
///
/// A NaN target leaves the servo where it is.
#[derive(Debug)]
pub struct Sg90 {
    pwm: Box<dyn PwmOutput>,
    angle_bits: AtomicU32,
}

impl Sg90 {
    /// Claim `pin` as a 50 Hz PWM channel. The servo is not driven until
    /// the first move.
    ///
    /// # Errors
    /// Returns an error if the pin cannot be claimed.
    pub fn new(driver: &dyn PinDriver, pin: u8, name: &str) -> Result<Self> {
        Ok(Self {
            pwm: driver.pwm_output(pin, SG90_PWM_FREQUENCY_HZ, name)?,
            angle_bits: AtomicU32::new(0.0_f32.to_bits()),
        })
    }

    #[must_use]
    pub fn pin(&self) -> u8 {
        self.pwm.pin()
    }
}

impl RotaryActuator for Sg90 {
    fn current_angle(&self) -> f32 {
        f32::from_bits(self.angle_bits.load(Ordering::Acquire))
    }

    fn angle_limit(&self) -> f32 {
        SG90_ANGLE_RANGE_DEG
    }

    fn set_angle(&self, angle: f32) -> Result<f32> {
        let Some(angle) = clamp_angle(angle) else {
            return Ok(self.current_angle());
        };
        self.pwm.on(angle_to_duty(angle))?;
        self.angle_bits.store(angle.to_bits(), Ordering::Release);
        Ok(angle)
    }

    async fn move_to(&self, angle: f32, duration: Option<Duration>) -> Result<f32> {
        let Some(target) = clamp_angle(angle) else {
            return Ok(self.current_angle());
        };
        let step = Duration::from_millis(SERVO_STEP_MILLIS);

        let steps = match duration {
            Some(d) if d >= step => (d.as_millis() / step.as_millis()) as u32,
            _ => return self.set_angle(target),
        };

        let start = self.current_angle();
        trace!(start, target, steps, "Sweeping servo");

        for i in 1..=steps {
            tokio::time::sleep(step).await;
            let fraction = i as f32 / steps as f32;
            self.set_angle(start + (target - start) * fraction)?;
        }

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBoard;
    use rstest::rstest;

    #[rstest]
    #[case(200.0, 90.0)]
    #[case(-200.0, -90.0)]
    #[case(45.0, 45.0)]
    #[case(0.0, 0.0)]
    fn test_set_angle_clamps(#[case] requested: f32, #[case] applied: f32) {
        let (board, _handle) = MockBoard::new();
        let servo = Sg90::new(&board, 18, "neck").unwrap();
        assert_eq!(servo.set_angle(requested).unwrap(), applied);
        assert_eq!(servo.current_angle(), applied);
    }

    #[tokio::test]
    async fn test_nan_leaves_servo_in_place() {
        let (board, handle) = MockBoard::new();
        let servo = Sg90::new(&board, 18, "neck").unwrap();
        servo.set_angle(20.0).unwrap();

        assert_eq!(servo.set_angle(f32::NAN).unwrap(), 20.0);
        assert_eq!(servo.move_to(f32::NAN, None).await.unwrap(), 20.0);
        assert_eq!(
            servo.move_to(f32::NAN, Some(Duration::from_millis(100))).await.unwrap(),
            20.0
        );
        assert_eq!(servo.current_angle(), 20.0);
        assert_eq!(handle.pwm_history(18).len(), 1);
    }

    #[test]
    fn test_infinite_angles_clamp() {
        assert_eq!(angle_to_duty(f32::INFINITY), 12.5);
        assert_eq!(angle_to_duty(f32::NEG_INFINITY), 2.5);
    }

    #[test]
    fn test_new_servo_is_idle() {
        let (board, handle) = MockBoard::new();
        let servo = Sg90::new(&board, 18, "neck").unwrap();
        assert_eq!(servo.current_angle(), 0.0);
        assert_eq!(servo.angle_limit(), 180.0);
        assert_eq!(handle.pwm_frequency(18), Some(50));
        assert!(handle.pwm_history(18).is_empty());
    }

    #[tokio::test]
    async fn test_move_without_duration_is_immediate() {
        let (board, handle) = MockBoard::new();
        let servo = Sg90::new(&board, 18, "neck").unwrap();

        let applied = servo.move_to(90.0, None).await.unwrap();
        assert_eq!(applied, 90.0);
        assert_eq!(handle.pwm_history(18), vec![12.5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_move_interpolates() {
        let (board, handle) = MockBoard::new();
        let servo = Sg90::new(&board, 18, "neck").unwrap();

        let applied = servo
            .move_to(90.0, Some(Duration::from_millis(100)))
            .await
            .unwrap();

        assert_eq!(applied, 90.0);
        let history = handle.pwm_history(18);
        assert_eq!(history.len(), 5);
        assert!(history.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(history.last().copied(), Some(12.5));
    }
}
