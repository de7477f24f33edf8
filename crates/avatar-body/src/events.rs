//! Event broadcast bus.
//!
//! One [`Topic`] per data kind. Publishing never waits: a topic with no
//! subscribers drops the value, and a subscriber that falls more than the
//! topic capacity behind skips ahead (it sees `RecvError::Lagged`). Nothing
//! is replayed to subscribers that join late.

use avatar_core::{ButtonEvent, DistanceSample, OrientationSample, WeatherReport};
use tokio::sync::broadcast;
use tracing::trace;

/// Fan-out channel for one kind of event.
#[derive(Debug)]
pub struct Topic<T> {
    name: &'static str,
    sender: broadcast::Sender<T>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            sender: self.sender.clone(),
        }
    }
}

impl<T: Clone> Topic<T> {
    /// Create a topic buffering at most `capacity` values per subscriber.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { name, sender }
    }

    /// Deliver `value` to every current subscriber.
    ///
    /// Returns how many subscribers it was delivered to.
    pub fn publish(&self, value: T) -> usize {
        match self.sender.send(value) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!(topic = self.name, "No subscribers, event dropped");
                0
            }
        }
    }

    /// Receive every value published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// All topics of one body.
///
/// # Examples
///
/// ```
/// use avatar_body::EventBus;
/// use avatar_core::WeatherReport;
///
/// # #[tokio::main]
/// # async fn main() {
/// let bus = EventBus::new(8);
/// let mut reports = bus.weather().subscribe();
///
/// bus.weather().publish(WeatherReport { successful: true, http_code: 200, ..Default::default() });
/// assert_eq!(reports.recv().await.unwrap().http_code, 200);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    distance: Topic<DistanceSample>,
    orientation: Topic<OrientationSample>,
    buttons: Topic<ButtonEvent>,
    weather: Topic<WeatherReport>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            distance: Topic::new("distance", capacity),
            orientation: Topic::new("orientation", capacity),
            buttons: Topic::new("buttons", capacity),
            weather: Topic::new("weather", capacity),
        }
    }

    /// Range-finder samples, one per measurement cycle.
    #[must_use]
    pub fn distance(&self) -> &Topic<DistanceSample> {
        &self.distance
    }

    #[must_use]
    pub fn orientation(&self) -> &Topic<OrientationSample> {
        &self.orientation
    }

    /// Button level changes.
    #[must_use]
    pub fn buttons(&self) -> &Topic<ButtonEvent> {
        &self.buttons
    }

    /// Reports published by the weather-service collaborator.
    #[must_use]
    pub fn weather(&self) -> &Topic<WeatherReport> {
        &self.weather
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_core::PinLevel;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        assert_eq!(bus.distance().publish(DistanceSample::new(0, 0, 1_000)), 0);
    }

    #[tokio::test]
    async fn test_fan_out() {
        let bus = EventBus::new(4);
        let mut first = bus.buttons().subscribe();
        let mut second = bus.buttons().subscribe();

        let delivered = bus.buttons().publish(ButtonEvent::new(2, PinLevel::High));
        assert_eq!(delivered, 2);
        assert_eq!(first.recv().await.unwrap().position, 2);
        assert_eq!(second.recv().await.unwrap().position, 2);
    }

    #[tokio::test]
    async fn test_no_replay_for_late_subscribers() {
        let bus = EventBus::new(4);
        let _early = bus.distance().subscribe();
        bus.distance().publish(DistanceSample::new(0, 0, 1_000));

        let mut late = bus.distance().subscribe();
        assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let topic = Topic::new("test", 2);
        let mut rx = topic.subscribe();
        for i in 0..5 {
            topic.publish(i);
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(rx.recv().await.unwrap(), 3);
    }

    #[test]
    fn test_zero_capacity_is_usable() {
        let topic = Topic::new("tiny", 0);
        let _rx = topic.subscribe();
        assert_eq!(topic.publish(1), 1);
        assert_eq!(topic.subscriber_count(), 1);
        assert_eq!(topic.name(), "tiny");
    }
}
