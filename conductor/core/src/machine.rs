//! Mood State Machine
//!
//! Owns the current [`Mood`] and executes timed, animated transitions
//! between moods. Every change renders through a [`PetDisplay`] and emits
//! device signals through a [`SignalSink`].
//!
//! # Transition Lifecycle
//!
//! ```text
//! request_mood(target)
//!     │
//!     ├─ target == pending target ──────────▶ coalesced (no-op)
//!     ├─ target == current, nothing pending ─▶ no-op
//!     ├─ descriptor (current, target) exists
//!     │      emit mid signal, show transition clip, arm timer
//!     │      ...duration...
//!     │      show steady clip, commit mood, emit steady signal
//!     └─ no descriptor
//!            show steady clip, commit mood, emit steady signal (instant)
//! ```
//!
//! A pending transition carries a generation number; its timer commits only
//! if that generation is still the pending one, so a superseded timer can
//! never overwrite a newer request.
//!
//! # Reward Window
//!
//! [`MoodMachine::reward`] flips a sad pet to happy for a grace period and
//! then back to sad. While the window is open a second reward is refused,
//! and any external request (including [`MoodMachine::apply_health`]) closes
//! the window so the revert never fires.
//!
//! The display and signal sink are called while the machine's lock is held,
//! so they must not call back into the machine.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::device::SignalSink;
use crate::display::PetDisplay;
use crate::health::HealthReading;
use crate::mood::{Mood, StateTable};
use crate::timer::{self, TimerHandle};

/// Default length of the feeding reward before the pet turns sad again
pub const DEFAULT_REWARD_GRACE: Duration = Duration::from_millis(3000);

struct PendingTransition {
    target: Mood,
    generation: u64,
    timer: TimerHandle,
}

struct RewardWindow {
    generation: u64,
    timer: TimerHandle,
}

#[derive(Default)]
struct MachineState {
    current: Mood,
    pending: Option<PendingTransition>,
    generation: u64,
    reward: Option<RewardWindow>,
}

struct Shared {
    table: Arc<StateTable>,
    display: Arc<dyn PetDisplay>,
    signals: Arc<dyn SignalSink>,
    state: Mutex<MachineState>,
    mood_tx: watch::Sender<Mood>,
}

/// Handle to the mood state machine
///
/// Cheap to clone; all clones drive the same machine.
#[derive(Clone)]
pub struct MoodMachine {
    shared: Arc<Shared>,
}

impl MoodMachine {
    /// Create a machine in [`Mood::Idle`]
    ///
    /// Nothing is rendered or signalled until the first request.
    pub fn new(
        table: Arc<StateTable>,
        display: Arc<dyn PetDisplay>,
        signals: Arc<dyn SignalSink>,
    ) -> Self {
        let (mood_tx, _) = watch::channel(Mood::Idle);
        Self {
            shared: Arc::new(Shared {
                table,
                display,
                signals,
                state: Mutex::new(MachineState::default()),
                mood_tx,
            }),
        }
    }

    /// The committed mood
    #[must_use]
    pub fn current(&self) -> Mood {
        self.shared.state.lock().current
    }

    /// Target of the in-flight transition, if any
    #[must_use]
    pub fn pending_target(&self) -> Option<Mood> {
        self.shared.state.lock().pending.as_ref().map(|p| p.target)
    }

    /// Whether a reward window is open
    #[must_use]
    pub fn reward_active(&self) -> bool {
        self.shared
            .state
            .lock()
            .reward
            .as_ref()
            .is_some_and(|window| window.timer.is_active())
    }

    /// Watch committed moods (used by the device heartbeat)
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Mood> {
        self.shared.mood_tx.subscribe()
    }

    /// The table this machine renders from
    #[must_use]
    pub fn table(&self) -> Arc<StateTable> {
        self.shared.table.clone()
    }

    /// Ask for a mood
    ///
    /// Closes any open reward window, then transitions (or does nothing if
    /// the machine is already there or already heading there).
    pub fn request_mood(&self, target: Mood) {
        let mut state = self.shared.state.lock();
        if let Some(mut window) = state.reward.take() {
            window.timer.cancel();
            info!(mood = %target, "Reward window closed by mood request");
        }
        self.transition(&mut state, target);
    }

    /// Show a health reading and move to the mood it maps to
    pub fn apply_health(&self, health: HealthReading) {
        debug!(raw = health.raw(), shown = health.clamped(), "Applying health");
        self.shared.display.show_health(&health);
        self.request_mood(health.target_mood());
    }

    /// Turn happy for `grace`, then back to sad
    ///
    /// Returns `false` without doing anything if a window is already open.
    pub fn reward(&self, grace: Duration) -> bool {
        let mut state = self.shared.state.lock();
        if state.reward.is_some() {
            debug!("Reward already running");
            return false;
        }

        self.transition(&mut state, Mood::Happy);

        state.generation += 1;
        let generation = state.generation;
        let weak = Arc::downgrade(&self.shared);
        state.reward = Some(RewardWindow {
            generation,
            timer: timer::after(grace, move || finish_reward(&weak, generation)),
        });
        info!(grace_ms = grace.as_millis(), "Reward window opened");
        true
    }

    /// Cancel every timer and return to idle without signalling
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        if let Some(mut pending) = state.pending.take() {
            pending.timer.cancel();
        }
        if let Some(mut window) = state.reward.take() {
            window.timer.cancel();
        }
        state.current = Mood::Idle;
        self.shared.mood_tx.send_replace(Mood::Idle);
        self.shared
            .display
            .show_animation(&self.shared.table.steady(Mood::Idle).animation);
        debug!("Mood machine reset");
    }

    fn transition(&self, state: &mut MachineState, target: Mood) {
        match &state.pending {
            Some(pending) if pending.target == target => {
                debug!(mood = %target, "Transition already in progress");
                return;
            }
            None if state.current == target => return,
            _ => {}
        }

        if let Some(mut superseded) = state.pending.take() {
            superseded.timer.cancel();
            debug!(from = %superseded.target, to = %target, "Pending transition superseded");
        }

        if state.current == target {
            // Abandoned a transition away from the committed mood
            self.shared.enter_steady(state, target);
            return;
        }

        let Some(descriptor) = self.shared.table.transition(state.current, target) else {
            debug!(from = %state.current, to = %target, "No transition clip, switching instantly");
            self.shared.enter_steady(state, target);
            return;
        };

        self.shared.signals.emit(descriptor.signal);
        self.shared.display.show_animation(&descriptor.animation);

        state.generation += 1;
        let generation = state.generation;
        let weak = Arc::downgrade(&self.shared);
        let timer = timer::after(descriptor.duration, move || {
            if let Some(shared) = weak.upgrade() {
                shared.commit(generation);
            }
        });

        debug!(
            from = %state.current,
            to = %target,
            duration_ms = descriptor.duration.as_millis(),
            "Transition started"
        );
        state.pending = Some(PendingTransition {
            target,
            generation,
            timer,
        });
    }
}

impl Shared {
    fn commit(&self, generation: u64) {
        let mut state = self.state.lock();
        let is_current = state
            .pending
            .as_ref()
            .is_some_and(|p| p.generation == generation);
        if !is_current {
            return;
        }
        if let Some(pending) = state.pending.take() {
            let target = pending.target;
            pending.timer.detach();
            self.enter_steady(&mut state, target);
        }
    }

    fn enter_steady(&self, state: &mut MachineState, mood: Mood) {
        let steady = self.table.steady(mood);
        self.display.show_animation(&steady.animation);
        state.current = mood;
        self.mood_tx.send_replace(mood);
        self.signals.emit(steady.signal);
        info!(mood = %mood, "Mood committed");
    }
}

/// Revert to sad, unless window `generation` was closed while this timer
/// waited for the lock
fn finish_reward(weak: &Weak<Shared>, generation: u64) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let machine = MoodMachine { shared };
    let mut state = machine.shared.state.lock();
    let is_open = state
        .reward
        .as_ref()
        .is_some_and(|window| window.generation == generation);
    if !is_open {
        debug!(generation, "Reward window already closed");
        return;
    }
    if let Some(window) = state.reward.take() {
        window.timer.detach();
    }
    info!("Reward window over");
    machine.transition(&mut state, Mood::Sad);
}
