//! Distance tracking.
//!
//! A [`DistanceTracker`] listens to a body's distance topic and forwards a
//! thinned-out stream of converted readings to a [`ReadingSink`], at most one
//! per logging period. Where the readings end up (a document store, a log)
//! is the sink's business.

use crate::actuation::ActionSlot;
use crate::events::Topic;
use avatar_core::constants::DEFAULT_LOGGING_PERIOD_MS;
use avatar_core::{Distance, DistanceSample, DistanceUnit};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Kind of data a tracker can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TrackedParameter {
    Distance,
}

impl TrackedParameter {
    /// Collection name readings of this kind are stored under.
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Distance => "distance_sensors",
        }
    }
}

impl fmt::Display for TrackedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// One reading handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedReading {
    pub config_name: String,
    pub parameter: TrackedParameter,
    pub position: usize,

    /// Echo timestamp the reading was derived from.
    pub captured_nanos: u64,

    pub unit: DistanceUnit,
    pub value: Distance,
    pub captured_at: DateTime<Utc>,
}

/// Destination of tracked readings.
pub trait ReadingSink: Send + Sync {
    fn record(&self, reading: &TrackedReading);
}

/// Sink that writes every reading to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReadingSink for TracingSink {
    fn record(&self, reading: &TrackedReading) {
        info!(
            config = %reading.config_name,
            parameter = %reading.parameter,
            position = reading.position,
            value = reading.value.as_f32(),
            unit = reading.unit.symbol(),
            "Tracked reading"
        );
    }
}

type TrackKey = (TrackedParameter, Option<usize>);

/// Forwards periodic distance readings to a sink.
pub struct DistanceTracker {
    config_name: String,
    distance: Topic<DistanceSample>,
    sink: Arc<dyn ReadingSink>,
    runtime: Handle,
    tracks: Mutex<HashMap<TrackKey, ActionSlot>>,
}

impl fmt::Debug for DistanceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistanceTracker")
            .field("config_name", &self.config_name)
            .field("tracks", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl DistanceTracker {
    pub fn new(
        config_name: impl Into<String>,
        distance: Topic<DistanceSample>,
        sink: Arc<dyn ReadingSink>,
        runtime: Handle,
    ) -> Self {
        Self {
            config_name: config_name.into(),
            distance,
            sink,
            runtime,
            tracks: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TrackKey, ActionSlot>> {
        self.tracks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start forwarding readings of `parameter`.
    ///
    /// `position` limits tracking to one sensor; `None` follows all of them
    /// through one shared period. `period` defaults to one second. Tracking
    /// the same key again restarts it.
    pub fn start_tracking(
        &self,
        parameter: TrackedParameter,
        position: Option<usize>,
        period: Option<Duration>,
    ) {
        let period = period.unwrap_or(Duration::from_millis(DEFAULT_LOGGING_PERIOD_MS));
        // Subscribe now so nothing published after this call is missed.
        let mut samples = self.distance.subscribe();
        let sink = Arc::clone(&self.sink);
        let config_name = self.config_name.clone();

        let mut tracks = self.lock();
        let slot = tracks.entry((parameter, position)).or_insert_with(|| {
            let label = position.map_or_else(|| "all".to_string(), |p| p.to_string());
            ActionSlot::new(format!("track:{parameter}[{label}]"), self.runtime.clone())
        });

        slot.replace(move |token| async move {
            let mut last = Instant::now();
            debug!(%parameter, ?position, "Tracking started");

            loop {
                let sample = tokio::select! {
                    received = samples.recv() => received,
                    _ = token.cancelled() => break,
                };

                let sample = match sample {
                    Ok(sample) => sample,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%parameter, skipped, "Tracker fell behind");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if position.is_some_and(|p| p != sample.position) {
                    continue;
                }
                let now = Instant::now();
                if now < last + period {
                    continue;
                }
                last = now;

                sink.record(&TrackedReading {
                    config_name: config_name.clone(),
                    parameter,
                    position: sample.position,
                    captured_nanos: sample.echo_rise_nanos,
                    unit: DistanceUnit::Centimeters,
                    value: sample.to_cm(),
                    captured_at: Utc::now(),
                });
            }

            debug!(%parameter, ?position, "Tracking stopped");
        });
    }

    /// Stop tracking. Returns whether the key was being tracked.
    pub fn stop_tracking(&self, parameter: TrackedParameter, position: Option<usize>) -> bool {
        // Dropping the slot cancels its action.
        self.lock().remove(&(parameter, position)).is_some()
    }

    #[must_use]
    pub fn is_tracking(&self, parameter: TrackedParameter, position: Option<usize>) -> bool {
        self.lock()
            .get(&(parameter, position))
            .is_some_and(ActionSlot::is_running)
    }
}
