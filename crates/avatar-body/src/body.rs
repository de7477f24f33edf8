//! Circuit-board body.
//!
//! [`CircuitBoard`] is the facade applications drive. Every command names a
//! capability and a position; a position outside the capability's collection
//! makes the command return `false` (or `None`) without touching any device.
//! Commands never block: anything that takes time is handed to the device's
//! [`ActionSlot`] and the call returns as soon as it is scheduled.
//!
//! # Examples
//!
//! ```
//! use avatar_body::{BodySettings, CircuitBoard};
//! use avatar_core::Configuration;
//! use avatar_hardware::mock::MockBoard;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (board, handle) = MockBoard::new();
//! let config = Configuration::from_json_str(r#"{"leds": [{"name": "status", "pin": 17}]}"#).unwrap();
//! let (body, report) = CircuitBoard::from_config(&config, &board, BodySettings::default()).unwrap();
//! assert!(report.is_clean());
//!
//! assert!(body.led_on(0, Some(Duration::from_millis(20))));
//! assert!(!body.led_on(1, None));
//!
//! body.idle().await;
//! assert_eq!(handle.output_level(17), Some(false.into()));
//! # }
//! ```

use crate::actuation::ActionSlot;
use crate::error::{BodyError, Result};
use crate::events::EventBus;
use crate::ranging::{self, EchoTiming};
use crate::registry::{BuildReport, Registry};
use crate::settings::BodySettings;
use crate::tracker::{DistanceTracker, ReadingSink};
use avatar_core::{
    BodyKind, ButtonEvent, Capability, Configuration, DistanceSample, OrientationSample, PinLevel,
};
use avatar_hardware::devices::{
    AnyOrientationSensor, AnyPushButton, AnyRangeFinder, AnyRotaryActuator, AnySwitchableOutput,
    AnyTextOutput,
};
use avatar_hardware::{
    OrientationSensor, PinDriver, PushButton, RangeFinder, RotaryActuator, SwitchableOutput,
    TextOutput,
};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A device together with the slot that serialises its actions.
#[derive(Debug)]
struct Actuated<D> {
    device: Arc<D>,
    slot: ActionSlot,
}

impl<D> Actuated<D> {
    fn new(device: D, slot_name: String, runtime: &Handle) -> Self {
        Self {
            device: Arc::new(device),
            slot: ActionSlot::new(slot_name, runtime.clone()),
        }
    }

    fn run<F, Fut>(&self, job: F)
    where
        F: FnOnce(Arc<D>, CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
        D: Send + Sync + 'static,
    {
        let device = Arc::clone(&self.device);
        self.slot.replace(move |token| job(device, token));
    }
}

/// Orientation sensors keep their own streaming flag.
#[derive(Debug)]
struct OrientationChannel {
    sensor: Arc<AnyOrientationSensor>,
    active: Arc<AtomicBool>,
    slot: ActionSlot,
}

fn wrap<D>(devices: Vec<D>, label: &str, runtime: &Handle) -> Vec<Actuated<D>> {
    devices
        .into_iter()
        .enumerate()
        .map(|(position, device)| Actuated::new(device, format!("{label}[{position}]"), runtime))
        .collect()
}

/// Body of a bare circuit board with GPIO peripherals.
///
/// Positions index each capability's collection in declaration order.
#[derive(Debug)]
pub struct CircuitBoard {
    name: String,
    runtime: Handle,
    settings: BodySettings,
    events: EventBus,
    leds: Vec<Actuated<AnySwitchableOutput>>,
    buttons: Vec<Arc<AnyPushButton>>,
    buzzers: Vec<Actuated<AnySwitchableOutput>>,
    distance_sensors: Vec<Actuated<AnyRangeFinder>>,
    displays: Vec<Actuated<AnyTextOutput>>,
    servos: Vec<Actuated<AnyRotaryActuator>>,
    orientation_sensors: Vec<OrientationChannel>,
    shut_down: AtomicBool,
}

impl CircuitBoard {
    /// Build a body from a configuration document.
    ///
    /// Devices that cannot be built are left out and listed in the returned
    /// report. Must be called inside a Tokio runtime; the body's actions run
    /// on it.
    ///
    /// # Errors
    /// Returns `BodyError::UnsupportedBody` if the configuration is not a
    /// circuit board, and `BodyError::NoRuntime` outside a runtime.
    pub fn from_config(
        config: &Configuration,
        driver: &dyn PinDriver,
        settings: BodySettings,
    ) -> Result<(Self, BuildReport)> {
        let kind = config.body_kind().map_err(|e| match e {
            avatar_core::Error::UnsupportedBody(name) => BodyError::UnsupportedBody(name),
            other => other.into(),
        })?;
        if kind != BodyKind::CircuitBoard {
            return Err(BodyError::UnsupportedBody(kind.type_name().to_string()));
        }

        let runtime = Handle::try_current()?;
        let (registry, report) = Registry::build(config, driver);
        let mut body = Self::from_registry(registry, settings, &runtime);
        if let Some(name) = &config.config_name {
            body.name.clone_from(name);
        }

        info!(body = %body.name, "Circuit board ready");
        Ok((body, report))
    }

    /// Wrap an already built registry.
    #[must_use]
    pub fn from_registry(registry: Registry, settings: BodySettings, runtime: &Handle) -> Self {
        let events = EventBus::new(settings.event_capacity);

        let buttons: Vec<_> = registry.buttons.into_iter().map(Arc::new).collect();
        for (position, button) in buttons.iter().enumerate() {
            let topic = events.buttons().clone();
            button.on_change(Arc::new(move |level: PinLevel| {
                topic.publish(ButtonEvent::new(position, level));
            }));
        }

        let orientation_sensors = registry
            .orientation_sensors
            .into_iter()
            .enumerate()
            .map(|(position, sensor)| OrientationChannel {
                sensor: Arc::new(sensor),
                active: Arc::new(AtomicBool::new(false)),
                slot: ActionSlot::new(format!("orientation[{position}]"), runtime.clone()),
            })
            .collect();

        Self {
            name: BodyKind::CircuitBoard.type_name().to_string(),
            runtime: runtime.clone(),
            leds: wrap(registry.leds, "led", runtime),
            buttons,
            buzzers: wrap(registry.buzzers, "buzzer", runtime),
            distance_sensors: wrap(registry.distance_sensors, "distance", runtime),
            displays: wrap(registry.displays, "display", runtime),
            servos: wrap(registry.servos, "servo", runtime),
            orientation_sensors,
            events,
            settings,
            shut_down: AtomicBool::new(false),
        }
    }

    fn live<'a, T>(&self, devices: &'a [T], position: usize) -> Option<&'a T> {
        if self.shut_down.load(Ordering::Acquire) {
            return None;
        }
        devices.get(position)
    }

    // Switchable outputs

    /// Turn an LED on, and off again after `hold` if one is given.
    pub fn led_on(&self, position: usize, hold: Option<Duration>) -> bool {
        self.switch_on(&self.leds, position, hold)
    }

    pub fn led_off(&self, position: usize) -> bool {
        self.switch_off(&self.leds, position)
    }

    /// Turn a buzzer on, and off again after `hold` if one is given.
    pub fn buzzer_on(&self, position: usize, hold: Option<Duration>) -> bool {
        self.switch_on(&self.buzzers, position, hold)
    }

    pub fn buzzer_off(&self, position: usize) -> bool {
        self.switch_off(&self.buzzers, position)
    }

    fn switch_on(
        &self,
        outputs: &[Actuated<AnySwitchableOutput>],
        position: usize,
        hold: Option<Duration>,
    ) -> bool {
        let Some(output) = self.live(outputs, position) else {
            return false;
        };
        let hold = hold.filter(|h| !h.is_zero());

        output.run(move |device, token| async move {
            if let Err(e) = device.activate() {
                warn!(position, error = %e, "Failed to switch output on");
                return;
            }
            let Some(hold) = hold else { return };

            tokio::select! {
                _ = sleep(hold) => {
                    if let Err(e) = device.deactivate() {
                        warn!(position, error = %e, "Failed to switch output off");
                    }
                }
                _ = token.cancelled() => debug!(position, "Hold cancelled"),
            }
        });
        true
    }

    fn switch_off(&self, outputs: &[Actuated<AnySwitchableOutput>], position: usize) -> bool {
        let Some(output) = self.live(outputs, position) else {
            return false;
        };

        output.run(move |device, _| async move {
            if let Err(e) = device.deactivate() {
                warn!(position, error = %e, "Failed to switch output off");
            }
        });
        true
    }

    #[must_use]
    pub fn led_active(&self, position: usize) -> Option<bool> {
        self.leds.get(position).map(|led| led.device.is_active())
    }

    #[must_use]
    pub fn buzzer_active(&self, position: usize) -> Option<bool> {
        self.buzzers.get(position).map(|b| b.device.is_active())
    }

    // Buttons

    /// Call `on_high` and `on_low` whenever the button changes level.
    pub fn add_button_listener(
        &self,
        position: usize,
        on_high: impl Fn() + Send + Sync + 'static,
        on_low: impl Fn() + Send + Sync + 'static,
    ) -> bool {
        let Some(button) = self.live(&self.buttons, position) else {
            return false;
        };
        button.add_listener(on_high, on_low);
        true
    }

    #[must_use]
    pub fn button_state(&self, position: usize) -> Option<PinLevel> {
        self.buttons.get(position).map(|button| button.state())
    }

    // Distance sensors

    /// Start sampling a range finder every `period` (default from settings).
    ///
    /// Samples go to the distance topic. Restarting a running sensor
    /// replaces its loop.
    pub fn start_distance_measuring(&self, position: usize, period: Option<Duration>) -> bool {
        let Some(sensor) = self.live(&self.distance_sensors, position) else {
            return false;
        };
        let period = period.unwrap_or(self.settings.measuring_period);
        let timing = EchoTiming {
            trigger_pulse: self.settings.trigger_pulse,
            echo_timeout: self.settings.echo_timeout,
        };
        let topic = self.events.distance().clone();

        sensor.device.set_active(true);
        sensor.run(move |finder, token| ranging::run(finder, position, period, timing, topic, token));
        true
    }

    /// Stop a range finder. Stopping an idle sensor also succeeds.
    pub fn stop_distance_measuring(&self, position: usize) -> bool {
        let Some(sensor) = self.distance_sensors.get(position) else {
            return false;
        };
        sensor.device.set_active(false);
        sensor.slot.cancel();
        true
    }

    #[must_use]
    pub fn distance_measuring_active(&self, position: usize) -> bool {
        self.distance_sensors
            .get(position)
            .is_some_and(|sensor| sensor.device.is_active())
    }

    // Displays

    /// Show a number, or text when no number is given.
    ///
    /// With a `hold` the display is cleared afterwards; without one the
    /// content stays until the next print. Returns `false` when there is
    /// nothing to show.
    pub fn display_print(
        &self,
        position: usize,
        number: Option<f64>,
        text: Option<&str>,
        hold: Option<Duration>,
    ) -> bool {
        let Some(display) = self.live(&self.displays, position) else {
            return false;
        };
        let Some(content) = display.device.render(number, text) else {
            return false;
        };

        display.run(move |device, token| async move {
            tokio::select! {
                result = device.show(&content, hold) => {
                    if let Err(e) = result {
                        warn!(position, error = %e, "Display update failed");
                    }
                }
                _ = token.cancelled() => {
                    if let Err(e) = device.clear() {
                        warn!(position, error = %e, "Failed to clear display");
                    }
                }
            }
        });
        true
    }

    // Servos

    #[must_use]
    pub fn servo_current_angle(&self, position: usize) -> Option<f32> {
        self.servos.get(position).map(|s| s.device.current_angle())
    }

    #[must_use]
    pub fn servo_angle_limit(&self, position: usize) -> Option<f32> {
        self.servos.get(position).map(|s| s.device.angle_limit())
    }

    /// Move a servo to `angle`, over `duration` if one is given.
    ///
    /// The angle is clamped to the servo's range; NaN is refused. A later
    /// move interrupts this one where it stands.
    pub fn servo_move_to(&self, position: usize, angle: f32, duration: Option<Duration>) -> bool {
        if angle.is_nan() {
            return false;
        }
        let Some(servo) = self.live(&self.servos, position) else {
            return false;
        };

        servo.run(move |device, token| async move {
            tokio::select! {
                result = device.move_to(angle, duration) => match result {
                    Ok(reached) => debug!(position, angle = reached, "Servo moved"),
                    Err(e) => warn!(position, error = %e, "Servo move failed"),
                },
                _ = token.cancelled() => debug!(position, "Servo move interrupted"),
            }
        });
        true
    }

    // Orientation sensors

    /// Take one orientation reading.
    #[must_use]
    pub fn read_orientation(&self, position: usize) -> Option<OrientationSample> {
        let channel = self.live(&self.orientation_sensors, position)?;
        read_sample(&channel.sensor, position)
    }

    /// Publish an orientation reading every `period` (default from settings).
    pub fn start_orientation_measuring(&self, position: usize, period: Option<Duration>) -> bool {
        let Some(channel) = self.live(&self.orientation_sensors, position) else {
            return false;
        };
        let period = period.unwrap_or(self.settings.measuring_period);
        let sensor = Arc::clone(&channel.sensor);
        let active = Arc::clone(&channel.active);
        let topic = self.events.orientation().clone();

        channel.active.store(true, Ordering::Release);
        channel.slot.replace(move |token| async move {
            while active.load(Ordering::Acquire) && !token.is_cancelled() {
                if let Some(sample) = read_sample(&sensor, position) {
                    topic.publish(sample);
                }
                tokio::select! {
                    _ = sleep(period) => {}
                    _ = token.cancelled() => break,
                }
            }
            debug!(position, "Orientation measuring stopped");
        });
        true
    }

    pub fn stop_orientation_measuring(&self, position: usize) -> bool {
        let Some(channel) = self.orientation_sensors.get(position) else {
            return false;
        };
        channel.active.store(false, Ordering::Release);
        channel.slot.cancel();
        true
    }

    #[must_use]
    pub fn orientation_measuring_active(&self, position: usize) -> bool {
        self.orientation_sensors
            .get(position)
            .is_some_and(|channel| channel.active.load(Ordering::Acquire))
    }

    // Counts and events

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

    #[must_use]
    pub fn leds_count(&self) -> usize {
        self.leds.len()
    }

    #[must_use]
    pub fn buttons_count(&self) -> usize {
        self.buttons.len()
    }

    #[must_use]
    pub fn buzzers_count(&self) -> usize {
        self.buzzers.len()
    }

    #[must_use]
    pub fn distance_sensors_count(&self) -> usize {
        self.distance_sensors.len()
    }

    #[must_use]
    pub fn displays_count(&self) -> usize {
        self.displays.len()
    }

    #[must_use]
    pub fn servos_count(&self) -> usize {
        self.servos.len()
    }

    #[must_use]
    pub fn orientation_sensors_count(&self) -> usize {
        self.orientation_sensors.len()
    }

    /// Every topic this body publishes on.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub fn subscribe_distance(&self) -> broadcast::Receiver<DistanceSample> {
        self.events.distance().subscribe()
    }

    #[must_use]
    pub fn subscribe_orientation(&self) -> broadcast::Receiver<OrientationSample> {
        self.events.orientation().subscribe()
    }

    #[must_use]
    pub fn subscribe_buttons(&self) -> broadcast::Receiver<ButtonEvent> {
        self.events.buttons().subscribe()
    }

    /// Tracker that forwards this body's distance readings to `sink`.
    #[must_use]
    pub fn distance_tracker(&self, sink: Arc<dyn ReadingSink>) -> DistanceTracker {
        DistanceTracker::new(
            self.name.clone(),
            self.events.distance().clone(),
            sink,
            self.runtime.clone(),
        )
    }

    /// Configuration name, or the body type when the document has none.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn settings(&self) -> &BodySettings {
        &self.settings
    }

    fn slots(&self) -> impl Iterator<Item = &ActionSlot> {
        self.leds
            .iter()
            .map(|d| &d.slot)
            .chain(self.buzzers.iter().map(|d| &d.slot))
            .chain(self.distance_sensors.iter().map(|d| &d.slot))
            .chain(self.displays.iter().map(|d| &d.slot))
            .chain(self.servos.iter().map(|d| &d.slot))
            .chain(self.orientation_sensors.iter().map(|c| &c.slot))
    }

    /// Wait until every action scheduled so far has finished.
    ///
    /// Pending forever while a sensor is streaming or a display shows
    /// content without a hold time.
    pub async fn idle(&self) {
        for slot in self.slots() {
            slot.idle().await;
        }
    }

    /// Stop every running action and leave outputs off.
    ///
    /// Afterwards every call that would start an action or touch a device
    /// returns `false` or `None`. State queries, counts and the stop calls
    /// keep answering, and the stops have nothing left to stop. Calling
    /// this twice is harmless.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Shutting down circuit board");

        for sensor in &self.distance_sensors {
            sensor.device.set_active(false);
        }
        for channel in &self.orientation_sensors {
            channel.active.store(false, Ordering::Release);
        }
        for slot in self.slots() {
            slot.cancel();
        }
        self.idle().await;

        for output in self.leds.iter().chain(&self.buzzers) {
            if let Err(e) = output.device.deactivate() {
                warn!(device = output.slot.name(), error = %e, "Failed to switch output off");
            }
        }
        for screen in &self.displays {
            if let Err(e) = screen.device.clear() {
                warn!(device = screen.slot.name(), error = %e, "Failed to clear display");
            }
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

fn read_sample(sensor: &AnyOrientationSensor, position: usize) -> Option<OrientationSample> {
    match sensor.read_motion() {
        Ok(reading) => Some(OrientationSample::from_motion(
            position,
            reading.acceleration,
            reading.rotation,
        )),
        Err(e) => {
            warn!(position, error = %e, "Orientation read failed");
            None
        }
    }
}
