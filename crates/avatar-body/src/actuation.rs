//! Timed-actuation controller.
//!
//! Every device that runs background work owns one [`ActionSlot`]. The slot
//! holds at most one running action. Starting a new action cancels the
//! current one, and the new action does not touch the device until the
//! cancelled one has finished, so two actions never write to the same pins
//! at once. The caller never waits for any of this: [`ActionSlot::replace`]
//! only spawns.
//!
//! Actions are cooperative. Each receives a [`CancellationToken`] and must
//! stop at its next suspension point once the token fires.
//!
//! # Examples
//!
//! ```
//! use avatar_body::ActionSlot;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let slot = ActionSlot::new("demo", tokio::runtime::Handle::current());
//! let last = Arc::new(AtomicU32::new(0));
//!
//! for n in 1..=3 {
//!     let last = Arc::clone(&last);
//!     slot.replace(move |token| async move {
//!         tokio::select! {
//!             _ = tokio::time::sleep(Duration::from_millis(10)) => last.store(n, Ordering::SeqCst),
//!             _ = token.cancelled() => {}
//!         }
//!     });
//! }
//!
//! slot.idle().await;
//! assert_eq!(last.load(Ordering::SeqCst), 3);
//! # }
//! ```

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug)]
struct RunningAction {
    cancel: CancellationToken,
    finished: CancellationToken,
    task: JoinHandle<()>,
}

/// Owner of the single in-flight action of one device.
#[derive(Debug)]
pub struct ActionSlot {
    name: String,
    runtime: Handle,
    current: Mutex<Option<RunningAction>>,
}

impl ActionSlot {
    /// Create an empty slot whose actions run on `runtime`.
    pub fn new(name: impl Into<String>, runtime: Handle) -> Self {
        Self {
            name: name.into(),
            runtime,
            current: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, Option<RunningAction>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel the running action, if any, and start `job` after it ends.
    ///
    /// Last request wins: if `replace` is called again before `job` gets to
    /// run, `job` is dropped without ever being polled.
    pub fn replace<F, Fut>(&self, job: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();

        let mut current = self.lock();
        let previous = current.take();
        if let Some(previous) = &previous {
            debug!(slot = %self.name, "Cancelling running action");
            previous.cancel.cancel();
        }

        let token = cancel.clone();
        let done = finished.clone().drop_guard();
        let name = self.name.clone();

        let task = self.runtime.spawn(async move {
            let _done = done;

            if let Some(previous) = previous
                && let Err(e) = previous.task.await
                && e.is_panic()
            {
                warn!(slot = %name, "Previous action panicked");
            }

            if token.is_cancelled() {
                return;
            }
            job(token).await;
        });

        *current = Some(RunningAction {
            cancel,
            finished,
            task,
        });
    }

    /// Request cancellation of the running action.
    ///
    /// Returns immediately; use [`idle`](Self::idle) to wait for the action
    /// to wind down.
    pub fn cancel(&self) {
        if let Some(action) = self.lock().as_ref() {
            action.cancel.cancel();
        }
    }

    /// Whether an action is still running (or waiting to run).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|action| !action.finished.is_cancelled())
    }

    /// Wait until the most recent action has finished.
    ///
    /// An action that never ends on its own (a display without a hold
    /// time, a measurement loop) keeps this pending until it is cancelled.
    pub async fn idle(&self) {
        let finished = self.lock().as_ref().map(|action| action.finished.clone());
        if let Some(finished) = finished {
            finished.cancelled().await;
        }
    }
}

impl Drop for ActionSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn slot() -> ActionSlot {
        ActionSlot::new("test", Handle::current())
    }

    #[tokio::test]
    async fn test_empty_slot() {
        let slot = slot();
        assert!(!slot.is_running());
        slot.cancel();
        slot.idle().await;
        assert_eq!(slot.name(), "test");
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_runs_to_completion() {
        let slot = slot();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        slot.replace(move |_| async move {
            sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
        });

        assert!(slot.is_running());
        slot.idle().await;
        assert!(ran.load(Ordering::SeqCst));
        assert!(!slot.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_cancels_previous() {
        let slot = slot();
        let completed = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let (completed, cancelled) = (Arc::clone(&completed), Arc::clone(&cancelled));
            slot.replace(move |token| async move {
                tokio::select! {
                    _ = sleep(Duration::from_millis(100)) => completed.fetch_add(1, Ordering::SeqCst),
                    _ = token.cancelled() => cancelled.fetch_add(1, Ordering::SeqCst),
                };
            });
            sleep(Duration::from_millis(10)).await;
        }

        slot.idle().await;
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_action_waits_for_previous() {
        let slot = slot();
        let writers = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicBool::new(false));

        for _ in 0..5 {
            let (writers, overlap) = (Arc::clone(&writers), Arc::clone(&overlap));
            slot.replace(move |token| async move {
                if writers.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlap.store(true, Ordering::SeqCst);
                }
                // Ignores cancellation for a while, like a write in progress.
                sleep(Duration::from_millis(5)).await;
                token.cancelled().await;
                writers.fetch_sub(1, Ordering::SeqCst);
            });
            sleep(Duration::from_millis(1)).await;
        }

        slot.cancel();
        slot.idle().await;
        assert!(!overlap.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_superseded_job_never_runs() {
        let slot = slot();
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let runs = Arc::clone(&runs);
            slot.replace(move |_| async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }

        slot.idle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_action() {
        let slot = slot();
        slot.replace(|token| async move {
            token.cancelled().await;
        });

        sleep(Duration::from_millis(1)).await;
        assert!(slot.is_running());
        slot.cancel();
        slot.idle().await;
        assert!(!slot.is_running());
    }

    #[tokio::test]
    async fn test_panicking_action_does_not_block_next() {
        let slot = slot();
        slot.replace(|_| async move {
            panic!("boom");
        });

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        tokio::task::yield_now().await;
        slot.replace(move |_| async move {
            flag.store(true, Ordering::SeqCst);
        });

        slot.idle().await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
