//! Cancellable Timers
//!
//! Every deferred callback in the core (transition commits, the reward grace
//! window, the heartbeat, the reveal animation) goes through this module.
//! A [`TimerHandle`] owns the spawned task; cancelling it is idempotent and
//! dropping it cancels too, so a timer can never outlive the slot that holds
//! it.
//!
//! Tests drive these timers with tokio's paused clock
//! (`#[tokio::test(start_paused = true)]` plus `tokio::time::advance`), which
//! makes every duration deterministic.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Handle to a scheduled one-shot or periodic callback
#[derive(Debug)]
pub struct TimerHandle {
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            task: Some(tokio::spawn(future)),
        }
    }

    /// Stop the timer. Calling this more than once is harmless.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Release the handle without stopping the task
    ///
    /// Used by a timer's own callback when it clears the slot holding it.
    pub fn detach(mut self) {
        self.task.take();
    }

    /// Whether the timer can still fire
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run `callback` once after `delay`
pub fn after<F>(delay: Duration, callback: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let deadline = Instant::now() + delay;
    TimerHandle::spawn(async move {
        time::sleep_until(deadline).await;
        callback();
    })
}

/// Run `callback` every `period`, first at `now + period`
pub fn every<F>(period: Duration, mut callback: F) -> TimerHandle
where
    F: FnMut() + Send + 'static,
{
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    TimerHandle::spawn(async move {
        loop {
            interval.tick().await;
            callback();
        }
    })
}

/// Like [`every`], but the callback can end the loop by returning `false`
pub fn every_until<F>(period: Duration, mut callback: F) -> TimerHandle
where
    F: FnMut() -> bool + Send + 'static,
{
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    TimerHandle::spawn(async move {
        loop {
            interval.tick().await;
            if !callback() {
                break;
            }
        }
    })
}

/// Await `future`, giving up after `limit` when one is set
///
/// Returns `None` if the limit elapsed first.
pub async fn bounded<F>(limit: Option<Duration>, future: F) -> Option<F::Output>
where
    F: Future,
{
    match limit {
        Some(limit) => time::timeout(limit, future).await.ok(),
        None => Some(future.await),
    }
}
