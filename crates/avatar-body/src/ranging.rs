//! Distance-measurement engine.
//!
//! A measurement cycle pulses the trigger, then busy-waits on the echo pin
//! for its rising and falling edges. The two edge timestamps make up a
//! [`DistanceSample`]. Busy-waiting is CPU-bound, so each cycle runs on the
//! blocking pool and never occupies a worker that drives timed actions.
//!
//! Each edge wait is bounded by the echo timeout. A wait that runs out
//! produces an out-of-range sample instead of stalling the sensor.

use crate::events::Topic;
use avatar_core::{DistanceSample, PinLevel};
use avatar_hardware::devices::AnyRangeFinder;
use avatar_hardware::{RangeFinder, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timing parameters of one measurement cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoTiming {
    pub trigger_pulse: Duration,
    pub echo_timeout: Duration,
}

enum Edge {
    Reached(Instant),
    TimedOut(Instant),
    Stopped,
}

fn spin_for(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

fn wait_for_level(
    finder: &AnyRangeFinder,
    level: PinLevel,
    timeout: Duration,
    stopped: &dyn Fn() -> bool,
) -> Edge {
    let start = Instant::now();
    loop {
        if finder.echo_level() == level {
            return Edge::Reached(Instant::now());
        }
        if start.elapsed() >= timeout {
            return Edge::TimedOut(Instant::now());
        }
        if stopped() {
            return Edge::Stopped;
        }
        std::hint::spin_loop();
    }
}

fn nanos_since(origin: Instant, at: Instant) -> u64 {
    u64::try_from(at.saturating_duration_since(origin).as_nanos()).unwrap_or(u64::MAX)
}

/// Run one trigger/echo cycle. Blocks the calling thread.
///
/// Timestamps are nanoseconds since `origin`. Returns `Ok(None)` when
/// `stopped` reports true while waiting for an edge.
///
/// # Errors
/// Returns an error if a trigger write fails.
pub fn measure_once(
    finder: &AnyRangeFinder,
    position: usize,
    timing: EchoTiming,
    origin: Instant,
    stopped: &dyn Fn() -> bool,
) -> Result<Option<DistanceSample>> {
    finder.trigger_high()?;
    spin_for(timing.trigger_pulse);
    finder.trigger_low()?;

    let rise = match wait_for_level(finder, PinLevel::High, timing.echo_timeout, stopped) {
        Edge::Reached(at) => at,
        Edge::TimedOut(at) => {
            debug!(position, "Echo never rose");
            return Ok(Some(DistanceSample::timed_out(
                position,
                nanos_since(origin, at),
            )));
        }
        Edge::Stopped => return Ok(None),
    };

    let fall = match wait_for_level(finder, PinLevel::Low, timing.echo_timeout, stopped) {
        Edge::Reached(at) => at,
        Edge::TimedOut(at) => {
            debug!(position, "Echo never fell");
            return Ok(Some(DistanceSample::timed_out(
                position,
                nanos_since(origin, at),
            )));
        }
        Edge::Stopped => return Ok(None),
    };

    Ok(Some(DistanceSample::new(
        position,
        nanos_since(origin, rise),
        nanos_since(origin, fall),
    )))
}

/// Measurement loop for one sensor, run as the sensor's slot action.
///
/// The loop checks the sensor's active flag and the token at the top of
/// every cycle and while waiting between cycles.
pub(crate) async fn run(
    finder: Arc<AnyRangeFinder>,
    position: usize,
    period: Duration,
    timing: EchoTiming,
    topic: Topic<DistanceSample>,
    token: CancellationToken,
) {
    let origin = Instant::now();
    info!(position, period_ms = period.as_millis() as u64, "Distance measuring started");

    while finder.is_active() && !token.is_cancelled() {
        let cycle = {
            let finder = Arc::clone(&finder);
            let token = token.clone();
            tokio::task::spawn_blocking(move || {
                let stopped = || token.is_cancelled() || !finder.is_active();
                measure_once(&finder, position, timing, origin, &stopped)
            })
        };

        match cycle.await {
            Ok(Ok(Some(sample))) => {
                topic.publish(sample);
            }
            Ok(Ok(None)) => break,
            Ok(Err(e)) => warn!(position, error = %e, "Measurement cycle failed"),
            Err(e) => warn!(position, error = %e, "Measurement task failed"),
        }

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = token.cancelled() => break,
        }
    }

    info!(position, "Distance measuring stopped");
}
