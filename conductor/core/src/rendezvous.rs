//! Reveal Rendezvous
//!
//! Holds a reply back until two independent things have happened: the
//! "thinking" ellipsis has run through at least one full cycle, and the
//! network result has arrived. Whichever comes second triggers the reveal.
//!
//! ```text
//!                 deliver()                  first "..." tick
//!   Animating ───────────────▶ ResultReady ──────────────────┐
//!       │                                                    ▼
//!       │ first "..." tick                                  Done
//!       ▼                                                    ▲
//!   ResultPending ───────────────────────────────────────────┘
//!                              deliver()
//! ```
//!
//! The callback runs exactly once, always with a result, and the tick timer
//! is stopped before it runs. There is no built-in timeout: if the result
//! never arrives the ellipsis keeps cycling until [`RendezvousHandle::cancel`]
//! is called or every handle is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::display::TextTarget;
use crate::timer::{self, TimerHandle};

/// Default animation tick
pub const DEFAULT_TICK: Duration = Duration::from_millis(400);

/// Dot count whose first appearance marks a completed cycle
const CYCLE_COMPLETE_DOTS: usize = 3;

static NEXT_REVEAL_ID: AtomicU64 = AtomicU64::new(1);

type Completion<T> = Box<dyn FnOnce(T) + Send>;

/// Where a rendezvous currently stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendezvousPhase {
    /// Neither condition met yet
    Animating,
    /// Result stored, waiting for the first full cycle
    ResultReady,
    /// Cycle done, waiting for the result
    ResultPending,
    /// Callback has run (or the rendezvous was cancelled)
    Done,
}

/// Text shown for a given dot counter
fn frame(dots: usize) -> String {
    format!("> {}", ".".repeat(dots.max(1)))
}

struct Token<T> {
    id: u64,
    dots: usize,
    cycle_complete: bool,
    result: Option<T>,
    on_complete: Option<Completion<T>>,
    ticker: Option<TimerHandle>,
    done: bool,
}

impl<T> Token<T> {
    fn phase(&self) -> RendezvousPhase {
        match (self.done, self.cycle_complete, self.result.is_some()) {
            (true, _, _) => RendezvousPhase::Done,
            (false, false, true) => RendezvousPhase::ResultReady,
            (false, true, false) => RendezvousPhase::ResultPending,
            _ => RendezvousPhase::Animating,
        }
    }

    /// Take the callback and result once both conditions hold
    ///
    /// The caller invokes the returned callback after releasing the lock.
    fn attempt_completion(&mut self) -> Option<(Completion<T>, T)> {
        if self.done || !self.cycle_complete {
            return None;
        }
        let result = self.result.take()?;
        self.done = true;
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }
        debug!(reveal = self.id, "Reveal complete");
        self.on_complete.take().map(|callback| (callback, result))
    }
}

/// Entry point for starting reveals
pub struct Rendezvous;

impl Rendezvous {
    /// Start the ellipsis on `target` and return a handle for delivering the result
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<T, F>(target: Arc<dyn TextTarget>, tick: Duration, on_complete: F) -> RendezvousHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let id = NEXT_REVEAL_ID.fetch_add(1, Ordering::Relaxed);
        let token = Arc::new(Mutex::new(Token {
            id,
            dots: 0,
            cycle_complete: false,
            result: None,
            on_complete: Some(Box::new(on_complete)),
            ticker: None,
            done: false,
        }));

        target.set_text(&frame(0));

        let weak = Arc::downgrade(&token);
        let ticker = timer::every_until(tick, move || tick_once(&weak, target.as_ref()));
        token.lock().ticker = Some(ticker);

        debug!(reveal = id, tick_ms = tick.as_millis(), "Reveal started");
        RendezvousHandle { token }
    }
}

/// Advance the animation by one frame; `false` stops the ticker
fn tick_once<T>(weak: &Weak<Mutex<Token<T>>>, target: &dyn TextTarget) -> bool {
    let Some(token) = weak.upgrade() else {
        return false;
    };

    let completion = {
        let mut token = token.lock();
        if token.done {
            return false;
        }
        token.dots = (token.dots + 1) % 4;
        target.set_text(&frame(token.dots));

        if token.dots == CYCLE_COMPLETE_DOTS && !token.cycle_complete {
            token.cycle_complete = true;
            token.attempt_completion()
        } else {
            None
        }
    };

    match completion {
        Some((callback, result)) => {
            callback(result);
            false
        }
        None => true,
    }
}

/// Handle to a running reveal
///
/// Clones share the same token.
pub struct RendezvousHandle<T> {
    token: Arc<Mutex<Token<T>>>,
}

impl<T> Clone for RendezvousHandle<T> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
        }
    }
}

impl<T> RendezvousHandle<T> {
    /// Store the async result and reveal it if the animation has cycled
    ///
    /// Only the first delivery counts.
    pub fn deliver(&self, result: T) {
        let completion = {
            let mut token = self.token.lock();
            if token.done || token.result.is_some() {
                debug!(reveal = token.id, "Duplicate delivery ignored");
                return;
            }
            token.result = Some(result);
            token.attempt_completion()
        };

        if let Some((callback, result)) = completion {
            callback(result);
        }
    }

    /// Stop the animation without revealing anything
    pub fn cancel(&self) {
        let mut token = self.token.lock();
        if token.done {
            return;
        }
        token.done = true;
        token.result = None;
        token.on_complete = None;
        if let Some(mut ticker) = token.ticker.take() {
            ticker.cancel();
        }
        debug!(reveal = token.id, "Reveal cancelled");
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> RendezvousPhase {
        self.token.lock().phase()
    }

    /// Whether the reveal has finished or been cancelled
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.token.lock().done
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio::time;

    use super::*;

    #[derive(Default)]
    struct Line {
        history: Mutex<Vec<String>>,
    }

    impl TextTarget for Line {
        fn set_text(&self, text: &str) {
            self.history.lock().push(text.to_string());
        }
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    /// Step the paused clock one tick at a time so no frame is skipped
    async fn run_ticks(n: usize) {
        for _ in 0..n {
            time::advance(DEFAULT_TICK).await;
            settle().await;
        }
    }

    fn counting() -> (Arc<AtomicUsize>, Arc<Mutex<Option<String>>>) {
        (Arc::new(AtomicUsize::new(0)), Arc::new(Mutex::new(None)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_cycle_and_wrap() {
        let line = Arc::new(Line::default());
        let handle: RendezvousHandle<String> = Rendezvous::start(line.clone(), DEFAULT_TICK, |_| {});

        run_ticks(5).await;
        handle.cancel();

        assert_eq!(
            *line.history.lock(),
            vec!["> .", "> .", "> ..", "> ...", "> .", "> ."]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_result_waits_for_cycle() {
        let (calls, seen) = counting();
        let (c, s) = (calls.clone(), seen.clone());
        let line = Arc::new(Line::default());
        let handle = Rendezvous::start(line, DEFAULT_TICK, move |text: String| {
            c.fetch_add(1, Ordering::SeqCst);
            *s.lock() = Some(text);
        });

        handle.deliver("hi".to_string());
        assert_eq!(handle.phase(), RendezvousPhase::ResultReady);

        run_ticks(2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        run_ticks(1).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.lock().as_deref(), Some("hi"));
        assert_eq!(handle.phase(), RendezvousPhase::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_then_result() {
        let (calls, _) = counting();
        let c = calls.clone();
        let line = Arc::new(Line::default());
        let handle = Rendezvous::start(line.clone(), DEFAULT_TICK, move |_: u32| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        run_ticks(5).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(handle.phase(), RendezvousPhase::ResultPending);

        handle.deliver(7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Animation stops once revealed
        let frames = line.history.lock().len();
        run_ticks(5).await;
        assert_eq!(line.history.lock().len(), frames);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_delivery_fires_once() {
        let (calls, seen) = counting();
        let (c, s) = (calls.clone(), seen.clone());
        let handle = Rendezvous::start(Arc::new(Line::default()), DEFAULT_TICK, move |text: String| {
            c.fetch_add(1, Ordering::SeqCst);
            *s.lock() = Some(text);
        });

        handle.deliver("first".to_string());
        handle.deliver("second".to_string());
        run_ticks(3).await;
        handle.deliver("third".to_string());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.lock().as_deref(), Some("first"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_result_keeps_animating() {
        let (calls, _) = counting();
        let c = calls.clone();
        let line = Arc::new(Line::default());
        let handle = Rendezvous::start(line.clone(), DEFAULT_TICK, move |_: String| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        run_ticks(150).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!handle.is_done());

        handle.cancel();
        handle.deliver("late".to_string());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(handle.phase(), RendezvousPhase::Done);
    }
}
