use crate::error::Result;
use crate::pins::{I2cDevice, PinDriver};
use crate::traits::{MotionReading, OrientationSensor};
use avatar_core::Axes;
use avatar_core::constants::{
    MPU6050_ACCEL_SCALE, MPU6050_GYRO_SCALE, MPU6050_REG_ACCEL_XOUT_H, MPU6050_REG_CONFIG,
    MPU6050_REG_GYRO_XOUT_H, MPU6050_REG_PWR_MGMT_1, MPU6050_REG_SMPLRT_DIV,
};

/// Optional register settings applied at start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mpu6050Config {
    /// Digital low-pass filter setting (`CONFIG` register).
    pub dlpf_cfg: Option<u8>,

    /// Sample rate divider (`SMPLRT_DIV` register).
    pub sample_rate_divider: Option<u8>,
}

/// MPU6050 accelerometer and gyroscope at the default ±2 g / ±250 °/s range.
#[derive(Debug)]
pub struct Mpu6050 {
    device: Box<dyn I2cDevice>,
}

impl Mpu6050 {
    /// Open the sensor, wake it from sleep and apply `config`.
    ///
    /// # Errors
    /// Returns an error if the device cannot be opened or configured.
    pub fn new(
        driver: &dyn PinDriver,
        bus: u8,
        address: u16,
        config: Mpu6050Config,
        name: &str,
    ) -> Result<Self> {
        let device = driver.i2c_device(bus, address, name)?;
        device.write_register(MPU6050_REG_PWR_MGMT_1, 0)?;

        if let Some(dlpf) = config.dlpf_cfg {
            device.write_register(MPU6050_REG_CONFIG, dlpf)?;
        }
        if let Some(divider) = config.sample_rate_divider {
            device.write_register(MPU6050_REG_SMPLRT_DIV, divider)?;
        }

        Ok(Self { device })
    }

    fn read_axes(&self, first_register: u8, scale: f64) -> Result<Axes> {
        let mut values = [0.0; 3];
        for (i, value) in values.iter_mut().enumerate() {
            let raw = self.device.read_register_word(first_register + 2 * i as u8)?;
            *value = f64::from(raw) / scale;
        }
        Ok(Axes::new(values[0], values[1], values[2]))
    }
}

impl OrientationSensor for Mpu6050 {
    fn read_motion(&self) -> Result<MotionReading> {
        Ok(MotionReading {
            acceleration: self.read_axes(MPU6050_REG_ACCEL_XOUT_H, MPU6050_ACCEL_SCALE)?,
            rotation: self.read_axes(MPU6050_REG_GYRO_XOUT_H, MPU6050_GYRO_SCALE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBoard;

    #[test]
    fn test_wake_and_configure() {
        let (board, handle) = MockBoard::new();
        handle.attach_i2c(1, 0x68);
        let config = Mpu6050Config {
            dlpf_cfg: Some(3),
            sample_rate_divider: Some(7),
        };
        Mpu6050::new(&board, 1, 0x68, config, "imu").unwrap();

        assert_eq!(
            handle.i2c_register_writes(1, 0x68),
            vec![(0x6B, 0), (0x1A, 3), (0x19, 7)]
        );
    }

    #[test]
    fn test_read_motion_scales_words() {
        let (board, handle) = MockBoard::new();
        handle.attach_i2c(1, 0x68);
        handle.set_register_word(1, 0x68, 0x3F, 16384);
        handle.set_register_word(1, 0x68, 0x3B, -8192);
        handle.set_register_word(1, 0x68, 0x45, 131);

        let imu = Mpu6050::new(&board, 1, 0x68, Mpu6050Config::default(), "imu").unwrap();
        let reading = imu.read_motion().unwrap();

        assert_eq!(reading.acceleration, Axes::new(-0.5, 0.0, 1.0));
        assert_eq!(reading.rotation, Axes::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_missing_device() {
        let (board, _handle) = MockBoard::new();
        assert!(Mpu6050::new(&board, 1, 0x68, Mpu6050Config::default(), "imu").is_err());
    }
}
