//! Device Notifier
//!
//! Fire-and-forget delivery of [`SignalCode`]s to a [`DeviceLink`].
//!
//! ```text
//!  MoodMachine ──emit──┐
//!                      ├──▶ bounded queue ──▶ worker task ──▶ DeviceLink
//!  heartbeat (5 s) ────┘        (drop when full)      (log failures)
//! ```
//!
//! One worker drains the queue, so the link sees signals in emission order:
//! a transition's mid signal always goes out before its steady signal.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::link::DeviceLink;
use crate::mood::{Mood, SignalCode, StateTable};
use crate::timer::{self, TimerHandle};

/// Anything that accepts signal codes without blocking
pub trait SignalSink: Send + Sync {
    /// Hand off a signal; never blocks and never fails
    fn emit(&self, code: SignalCode);
}

/// Notifier tuning
#[derive(Clone, Debug)]
pub struct NotifierConfig {
    /// Heartbeat period (default: 5 seconds)
    pub heartbeat_interval: Duration,
    /// Signals buffered ahead of the link before new ones are dropped
    pub queue_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            queue_capacity: 32,
        }
    }
}

struct NotifierInner {
    tx: mpsc::Sender<SignalCode>,
    heartbeat: Mutex<Option<TimerHandle>>,
    config: NotifierConfig,
}

/// Best-effort emitter of mood signals to the actuator
///
/// Cheap to clone; all clones share one queue and one heartbeat slot.
#[derive(Clone)]
pub struct DeviceNotifier {
    inner: Arc<NotifierInner>,
}

impl DeviceNotifier {
    /// Create a notifier and spawn its delivery worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(link: Arc<dyn DeviceLink>, config: NotifierConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        tokio::spawn(deliver(link, rx));

        Self {
            inner: Arc::new(NotifierInner {
                tx,
                heartbeat: Mutex::new(None),
                config,
            }),
        }
    }

    /// Start re-sending the current mood's steady signal every period
    ///
    /// A running heartbeat is cancelled first, so there is never more than
    /// one.
    pub fn start_heartbeat(&self, moods: watch::Receiver<Mood>, table: Arc<StateTable>) {
        let mut slot = self.inner.heartbeat.lock();
        if let Some(mut prior) = slot.take() {
            prior.cancel();
            debug!("Replacing running heartbeat");
        }

        let tx = self.inner.tx.clone();
        let period = self.inner.config.heartbeat_interval;
        *slot = Some(timer::every(period, move || {
            let mood = *moods.borrow();
            let code = table.steady(mood).signal;
            debug!(mood = %mood, code = code.as_u8(), "Heartbeat");
            enqueue(&tx, code);
        }));

        info!(interval_ms = period.as_millis(), "Device heartbeat started");
    }

    /// Stop the heartbeat; harmless when none is running
    pub fn stop_heartbeat(&self) {
        if let Some(mut heartbeat) = self.inner.heartbeat.lock().take() {
            heartbeat.cancel();
            info!("Device heartbeat stopped");
        }
    }

    /// Whether a heartbeat is currently scheduled
    #[must_use]
    pub fn heartbeat_active(&self) -> bool {
        self.inner
            .heartbeat
            .lock()
            .as_ref()
            .is_some_and(TimerHandle::is_active)
    }
}

impl SignalSink for DeviceNotifier {
    fn emit(&self, code: SignalCode) {
        enqueue(&self.inner.tx, code);
    }
}

fn enqueue(tx: &mpsc::Sender<SignalCode>, code: SignalCode) {
    match tx.try_send(code) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(code)) => {
            warn!(code = code.as_u8(), "Device queue full, signal dropped");
        }
        Err(mpsc::error::TrySendError::Closed(code)) => {
            warn!(code = code.as_u8(), "Device worker gone, signal dropped");
        }
    }
}

async fn deliver(link: Arc<dyn DeviceLink>, mut rx: mpsc::Receiver<SignalCode>) {
    while let Some(code) = rx.recv().await {
        match link.send(code).await {
            Ok(()) => debug!(link = link.name(), code = code.as_u8(), "Signal sent"),
            Err(e) => warn!(link = link.name(), code = code.as_u8(), error = %e, "Failed to send signal"),
        }
    }
    debug!(link = link.name(), "Device worker stopped");
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::time;

    use super::super::link::DeviceError;
    use super::*;

    #[derive(Default)]
    struct RecordingLink {
        sent: Mutex<Vec<SignalCode>>,
        fail: bool,
    }

    #[async_trait]
    impl DeviceLink for RecordingLink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, code: SignalCode) -> Result<(), DeviceError> {
            self.sent.lock().push(code);
            if self.fail {
                Err(DeviceError::Status { status: 503 })
            } else {
                Ok(())
            }
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_emissions_keep_order() {
        let link = Arc::new(RecordingLink::default());
        let notifier = DeviceNotifier::new(link.clone(), NotifierConfig::default());

        notifier.emit(SignalCode::SadTransition);
        notifier.emit(SignalCode::Sad);
        settle().await;

        assert_eq!(
            *link.sent.lock(),
            vec![SignalCode::SadTransition, SignalCode::Sad]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_swallowed() {
        let link = Arc::new(RecordingLink {
            fail: true,
            ..Default::default()
        });
        let notifier = DeviceNotifier::new(link.clone(), NotifierConfig::default());

        notifier.emit(SignalCode::Happy);
        notifier.emit(SignalCode::Neutral);
        settle().await;

        // Both attempted once, no retry
        assert_eq!(link.sent.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_follows_current_mood() {
        let link = Arc::new(RecordingLink::default());
        let notifier = DeviceNotifier::new(link.clone(), NotifierConfig::default());
        let (mood_tx, mood_rx) = watch::channel(Mood::Idle);

        notifier.start_heartbeat(mood_rx, Arc::new(StateTable::default()));
        assert!(notifier.heartbeat_active());

        time::advance(Duration::from_millis(5000)).await;
        settle().await;
        mood_tx.send_replace(Mood::Sad);
        time::advance(Duration::from_millis(5000)).await;
        settle().await;

        assert_eq!(*link.sent.lock(), vec![SignalCode::Neutral, SignalCode::Sad]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarting_heartbeat_keeps_one_timer() {
        let link = Arc::new(RecordingLink::default());
        let notifier = DeviceNotifier::new(link.clone(), NotifierConfig::default());
        let (_mood_tx, mood_rx) = watch::channel(Mood::Happy);
        let table = Arc::new(StateTable::default());

        notifier.start_heartbeat(mood_rx.clone(), table.clone());
        notifier.start_heartbeat(mood_rx, table);

        time::advance(Duration::from_millis(5000)).await;
        settle().await;
        assert_eq!(link.sent.lock().len(), 1);

        time::advance(Duration::from_millis(5000)).await;
        settle().await;
        assert_eq!(link.sent.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_heartbeat_is_idempotent() {
        let link = Arc::new(RecordingLink::default());
        let notifier = DeviceNotifier::new(link.clone(), NotifierConfig::default());
        let (_mood_tx, mood_rx) = watch::channel(Mood::Happy);

        notifier.start_heartbeat(mood_rx, Arc::new(StateTable::default()));
        notifier.stop_heartbeat();
        notifier.stop_heartbeat();
        assert!(!notifier.heartbeat_active());

        time::advance(Duration::from_millis(20_000)).await;
        settle().await;
        assert!(link.sent.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_drops_instead_of_blocking() {
        let link = Arc::new(RecordingLink::default());
        let notifier = DeviceNotifier::new(
            link.clone(),
            NotifierConfig {
                queue_capacity: 2,
                ..Default::default()
            },
        );

        // Worker has not run yet, so only two fit
        for _ in 0..5 {
            notifier.emit(SignalCode::Happy);
        }
        settle().await;
        assert_eq!(link.sent.lock().len(), 2);
    }
}
