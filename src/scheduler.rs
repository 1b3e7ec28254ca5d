//! Deferred-Step Scheduling
//!
//! The playback chain advances through deferred callbacks: each step renders,
//! then asks the scheduler to run the next step after a delay. Blink loops
//! use the repeating variant. Both return a [`ScheduledTask`] handle the
//! engine owns, so a pending step can always be found and cancelled.
//!
//! # Cancellation
//!
//! Cancellation is advisory-cooperative: cancelling a handle prevents the
//! callback from firing, but a callback that already started runs to
//! completion (steps are atomic: render + schedule-next). Cancelling after
//! the callback fired, or cancelling twice, is a no-op. Dropping a handle
//! cancels it.
//!
//! # Usage
//!
//! ```ignore
//! use typewriter::scheduler::{Scheduler, TokioScheduler};
//!
//! let scheduler = TokioScheduler::new();
//! let task = scheduler.once(Duration::from_millis(100), Box::new(|| {
//!     // runs once, 100ms from now
//! }));
//! drop(task); // never mind
//! ```

use std::fmt;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

/// A cancellable handle to a scheduled callback.
///
/// At most one of these is outstanding per write/erase chain; the engine
/// stores it so `pause` can cancel mid-chain. Dropping the handle cancels
/// the callback as well.
pub struct ScheduledTask {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ScheduledTask {
    /// Wrap a cancellation thunk into a handle.
    ///
    /// Scheduler implementations call this with whatever undoes their
    /// scheduling (aborting a task, removing a queue entry).
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel the scheduled callback. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// The timer facility the engine schedules against.
///
/// Two operations, matching the two shapes of work the engine defers: a
/// single-shot callback for the next write/erase step, and a repeating
/// callback for a blink loop. Hosts with their own event loop can implement
/// this to keep all callbacks on one timeline; everyone else uses
/// [`TokioScheduler`].
pub trait Scheduler: Send + Sync {
    /// Run `callback` once, `delay` from now.
    fn once(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>) -> ScheduledTask;

    /// Run `callback` every `period`, first firing one period from now.
    fn repeating(&self, period: Duration, callback: Box<dyn FnMut() + Send>) -> ScheduledTask;
}

/// Scheduler backed by Tokio timers.
///
/// Each scheduled callback is a spawned task sleeping until its deadline;
/// cancellation aborts the task. Must be used from within a Tokio runtime.
/// Under a paused test clock (`start_paused`) the callbacks fire
/// deterministically in deadline order.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    /// Create a new Tokio-backed scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn once(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>) -> ScheduledTask {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        ScheduledTask::new(move || handle.abort())
    }

    fn repeating(&self, period: Duration, mut callback: Box<dyn FnMut() + Send>) -> ScheduledTask {
        // A zero period would busy-spin the interval; clamp to the smallest tick.
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a Tokio interval completes immediately;
            // consume it so the first callback lands one period from now.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                callback();
            }
        });
        ScheduledTask::new(move || handle.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook = {
            let count = Arc::clone(&count);
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            }
        };
        (count, hook)
    }

    #[tokio::test(start_paused = true)]
    async fn once_fires_after_delay() {
        let scheduler = TokioScheduler::new();
        let (count, hook) = counter();

        let _task = scheduler.once(Duration::from_millis(10), Box::new(hook));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(15)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Single-shot: nothing further.
        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let scheduler = TokioScheduler::new();
        let (count, hook) = counter();

        let mut task = scheduler.once(Duration::from_millis(10), Box::new(hook));
        task.cancel();
        task.cancel(); // idempotent

        sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let scheduler = TokioScheduler::new();
        let (count, hook) = counter();

        drop(scheduler.once(Duration::from_millis(10), Box::new(hook)));

        sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_fires_every_period() {
        let scheduler = TokioScheduler::new();
        let (count, hook) = counter();

        let _task = scheduler.repeating(Duration::from_millis(10), Box::new(hook));

        sleep(Duration::from_millis(35)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_repeating() {
        let scheduler = TokioScheduler::new();
        let (count, hook) = counter();

        let mut task = scheduler.repeating(Duration::from_millis(10), Box::new(hook));
        sleep(Duration::from_millis(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        task.cancel();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
