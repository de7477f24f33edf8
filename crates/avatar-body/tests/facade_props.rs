//! Properties of the position-indexed facade.

use avatar_body::{BodySettings, CircuitBoard, Registry};
use avatar_core::{Configuration, PinLevel};
use avatar_hardware::mock::{MockBoard, MockBoardHandle};
use avatar_hardware::models::{RangeFinderModel, normalize_model};
use proptest::prelude::*;
use std::time::Duration;

const CONFIG: &str = r#"{
    "leds": [{"pin": 17}, {"pin": 27}],
    "buttons": [{"pin": 5}],
    "buzzers": [{"pin": 22}],
    "distanceSensors": [{"hardwareModel": "HC-SR04", "pinTrigger": 23, "pinEcho": 24}],
    "displays": [{"hardwareModel": "LCD1602", "connectionType": "i2c", "i2cBus": 1}],
    "servos": [{"hardwareModel": "SG90", "pin": 18}],
    "positionSensors": [{"hardwareModel": "MPU6050", "i2cBus": 1}]
}"#;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

fn body() -> (CircuitBoard, MockBoardHandle) {
    let (board, handle) = MockBoard::new();
    handle.attach_i2c(1, 0x27);
    handle.attach_i2c(1, 0x68);
    let config = Configuration::from_json_str(CONFIG).unwrap();
    let (body, _) = CircuitBoard::from_config(&config, &board, BodySettings::default()).unwrap();
    (body, handle)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invalid_positions_touch_nothing(offset in 0usize..1000, hold_ms in 0u64..5000) {
        runtime().block_on(async {
            let (body, handle) = body();
            let hold = Some(Duration::from_millis(hold_ms));
            let period = Some(Duration::from_millis(hold_ms.max(1)));
            let led = body.leds_count() + offset;
            let button = body.buttons_count() + offset;
            let buzzer = body.buzzers_count() + offset;
            let ranger = body.distance_sensors_count() + offset;
            let display = body.displays_count() + offset;
            let servo = body.servos_count() + offset;
            let imu = body.orientation_sensors_count() + offset;
            let lcd_bytes = handle.i2c_bytes(1, 0x27).len();

            prop_assert!(!body.led_on(led, hold));
            prop_assert!(!body.led_off(led));
            prop_assert_eq!(body.led_active(led), None);
            prop_assert!(!body.buzzer_on(buzzer, hold));
            prop_assert!(!body.buzzer_off(buzzer));
            prop_assert_eq!(body.buzzer_active(buzzer), None);
            let added = body.add_button_listener(button, || {}, || {});
            prop_assert!(!added);
            prop_assert_eq!(body.button_state(button), None);
            prop_assert!(!body.start_distance_measuring(ranger, period));
            prop_assert!(!body.stop_distance_measuring(ranger));
            prop_assert!(!body.distance_measuring_active(ranger));
            prop_assert!(!body.display_print(display, Some(1.0), None, hold));
            prop_assert!(!body.servo_move_to(servo, 45.0, None));
            prop_assert_eq!(body.servo_current_angle(servo), None);
            prop_assert_eq!(body.servo_angle_limit(servo), None);
            prop_assert!(body.read_orientation(imu).is_none());
            prop_assert!(!body.start_orientation_measuring(imu, period));
            prop_assert!(!body.stop_orientation_measuring(imu));
            prop_assert!(!body.orientation_measuring_active(imu));

            tokio::time::sleep(Duration::from_millis(10)).await;
            prop_assert_eq!(handle.output_history(17), vec![PinLevel::Low]);
            prop_assert_eq!(handle.output_history(27), vec![PinLevel::Low]);
            prop_assert_eq!(handle.output_history(22), vec![PinLevel::Low]);
            prop_assert_eq!(handle.output_history(23), vec![PinLevel::Low]);
            prop_assert_eq!(handle.pwm_history(18), Vec::<f32>::new());
            prop_assert_eq!(handle.i2c_bytes(1, 0x27).len(), lcd_bytes);
            prop_assert!(!body.distance_measuring_active(0));
            prop_assert!(!body.orientation_measuring_active(0));
            Ok(())
        })?;
    }

    #[test]
    fn last_on_wins(first_ms in 1u64..2000, second_ms in proptest::option::of(2u64..2000)) {
        runtime().block_on(async {
            let (body, handle) = body();

            body.led_on(0, Some(Duration::from_millis(first_ms)));
            body.led_on(0, second_ms.map(Duration::from_millis));
            tokio::time::sleep(Duration::from_millis(1)).await;
            prop_assert_eq!(handle.output_level(17), Some(PinLevel::High));

            tokio::time::sleep(Duration::from_millis(2000)).await;
            let expected = if second_ms.is_some() { PinLevel::Low } else { PinLevel::High };
            prop_assert_eq!(handle.output_level(17), Some(expected));
            // One activation only: the first request never ran.
            prop_assert_eq!(
                handle.output_history(17).iter().filter(|l| l.is_high()).count(),
                1
            );
            Ok(())
        })?;
    }

    #[test]
    fn decorated_model_strings_resolve(
        prefix in "[a-z ]{0,6}",
        suffix in "[a-z0-9 ()]{0,6}",
        upper in any::<bool>(),
    ) {
        let declared = format!("{prefix}HC-SR04{suffix}");
        let declared = if upper { declared.to_uppercase() } else { declared.to_lowercase() };
        let config = Configuration::from_json_str(&format!(
            r#"{{"distanceSensors": [{{"hardwareModel": "{declared}", "pinTrigger": 23, "pinEcho": 24}}]}}"#
        ))
        .unwrap();

        let (board, _handle) = MockBoard::new();
        let (registry, report) = Registry::build(&config, &board);
        prop_assert!(report.is_clean());
        prop_assert_eq!(registry.distance_sensors()[0].model(), RangeFinderModel::HcSr04);
    }

    #[test]
    fn other_model_strings_are_skipped(declared in "[a-zA-Z0-9 -]{1,16}") {
        prop_assume!(!normalize_model(&declared).contains("hcsr04"));
        let config = Configuration::from_json_str(&format!(
            r#"{{"distanceSensors": [{{"hardwareModel": "{declared}", "pinTrigger": 23, "pinEcho": 24}}]}}"#
        ))
        .unwrap();

        let (board, handle) = MockBoard::new();
        let (registry, report) = Registry::build(&config, &board);
        prop_assert!(registry.is_empty());
        prop_assert_eq!(report.skipped.len(), 1);
        prop_assert!(!handle.is_claimed(23));
    }
}
