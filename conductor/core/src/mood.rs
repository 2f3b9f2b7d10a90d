//! Moods, Device Signal Codes, and the Transition Table
//!
//! The pet has three moods. Each mood has a steady-state animation and a
//! device signal, and most mood pairs have a timed transition animation
//! between them. Everything the [`MoodMachine`](crate::machine::MoodMachine)
//! needs to know about *what* to show lives here; *when* to show it is the
//! machine's job.
//!
//! # Stock Table
//!
//! ```text
//! mood    steady animation     signal     transitions in
//! ─────   ──────────────────   ────────   ─────────────────────────────────────
//! idle    tomo/3-idle.gif      NEUTRAL    happy→idle (31), sad→idle (32)
//! happy   tomo/1-happy.gif     HAPPY      idle→happy, sad→happy (31, HAPPY_T)
//! sad     tomo/2-sad.gif       SAD        idle→sad, happy→sad (32, SAD_T)
//! ```
//!
//! All stock transitions last 1500 ms.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default length of every stock transition animation
pub const DEFAULT_TRANSITION_DURATION: Duration = Duration::from_millis(1500);

/// The pet's discrete emotional state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// Initial mood, before any health value has been applied
    #[default]
    Idle,
    /// Healthy and content
    Happy,
    /// Health at or below the threshold
    Sad,
}

impl Mood {
    /// All moods, in declaration order
    pub const ALL: [Mood; 3] = [Mood::Idle, Mood::Happy, Mood::Sad];

    /// Lowercase name used in logs and configuration
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Happy => "happy",
            Self::Sad => "sad",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown mood name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown mood: {0}")]
pub struct UnknownMood(pub String);

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "happy" => Ok(Self::Happy),
            "sad" => Ok(Self::Sad),
            _ => Err(UnknownMood(s.to_string())),
        }
    }
}

/// Five-point affect scale understood by the external actuator
///
/// Purely a wire value: the core never compares codes to make decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignalCode {
    /// Fully sad face
    Sad = 0,
    /// Animating between neutral and sad
    SadTransition = 1,
    /// Neutral face
    Neutral = 2,
    /// Animating between neutral and happy
    HappyTransition = 3,
    /// Fully happy face
    Happy = 4,
}

impl SignalCode {
    /// The byte sent on the wire
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Error returned for a byte outside the signal scale
#[derive(Debug, Error, PartialEq, Eq)]
#[error("signal code out of range: {0}")]
pub struct InvalidSignalCode(pub u8);

impl TryFrom<u8> for SignalCode {
    type Error = InvalidSignalCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Sad),
            1 => Ok(Self::SadTransition),
            2 => Ok(Self::Neutral),
            3 => Ok(Self::HappyTransition),
            4 => Ok(Self::Happy),
            other => Err(InvalidSignalCode(other)),
        }
    }
}

/// Timed animation played while moving between two moods
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionDescriptor {
    /// Animation reference shown during the transition
    pub animation: String,
    /// How long the transition lasts before the target mood commits
    pub duration: Duration,
    /// Signal emitted when the transition starts
    pub signal: SignalCode,
}

impl TransitionDescriptor {
    /// Create a new descriptor
    pub fn new(animation: impl Into<String>, duration: Duration, signal: SignalCode) -> Self {
        Self {
            animation: animation.into(),
            duration,
            signal,
        }
    }
}

/// Steady-state presentation of a mood
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoodDisplay {
    /// Looping animation reference
    pub animation: String,
    /// Signal emitted when the mood commits, and on every heartbeat
    pub signal: SignalCode,
}

impl MoodDisplay {
    /// Create a new steady-state descriptor
    pub fn new(animation: impl Into<String>, signal: SignalCode) -> Self {
        Self {
            animation: animation.into(),
            signal,
        }
    }
}

/// Steady-state descriptors for every mood plus a sparse transition map
#[derive(Clone, Debug)]
pub struct StateTable {
    idle: MoodDisplay,
    happy: MoodDisplay,
    sad: MoodDisplay,
    transitions: HashMap<(Mood, Mood), TransitionDescriptor>,
}

impl StateTable {
    /// Build a table from steady-state descriptors with no transitions
    #[must_use]
    pub fn new(idle: MoodDisplay, happy: MoodDisplay, sad: MoodDisplay) -> Self {
        Self {
            idle,
            happy,
            sad,
            transitions: HashMap::new(),
        }
    }

    /// Add (or replace) the transition between two moods
    #[must_use]
    pub fn with_transition(mut self, from: Mood, to: Mood, descriptor: TransitionDescriptor) -> Self {
        self.transitions.insert((from, to), descriptor);
        self
    }

    /// Remove the transition between two moods, making that pair an instant switch
    #[must_use]
    pub fn without_transition(mut self, from: Mood, to: Mood) -> Self {
        self.transitions.remove(&(from, to));
        self
    }

    /// Set the same duration on every transition
    #[must_use]
    pub fn with_transition_duration(mut self, duration: Duration) -> Self {
        for descriptor in self.transitions.values_mut() {
            descriptor.duration = duration;
        }
        self
    }

    /// Steady-state descriptor for a mood
    ///
    /// Total over the closed [`Mood`] enumeration.
    #[must_use]
    pub fn steady(&self, mood: Mood) -> &MoodDisplay {
        match mood {
            Mood::Idle => &self.idle,
            Mood::Happy => &self.happy,
            Mood::Sad => &self.sad,
        }
    }

    /// Transition descriptor for a mood pair, if one exists
    #[must_use]
    pub fn transition(&self, from: Mood, to: Mood) -> Option<&TransitionDescriptor> {
        self.transitions.get(&(from, to))
    }
}

impl Default for StateTable {
    fn default() -> Self {
        let to_happy = || {
            TransitionDescriptor::new(
                "tomo/31-idle-to-happy.gif",
                DEFAULT_TRANSITION_DURATION,
                SignalCode::HappyTransition,
            )
        };
        let to_sad = || {
            TransitionDescriptor::new(
                "tomo/32-idle-to-sad.gif",
                DEFAULT_TRANSITION_DURATION,
                SignalCode::SadTransition,
            )
        };

        Self::new(
            MoodDisplay::new("tomo/3-idle.gif", SignalCode::Neutral),
            MoodDisplay::new("tomo/1-happy.gif", SignalCode::Happy),
            MoodDisplay::new("tomo/2-sad.gif", SignalCode::Sad),
        )
        .with_transition(Mood::Idle, Mood::Happy, to_happy())
        .with_transition(Mood::Idle, Mood::Sad, to_sad())
        .with_transition(Mood::Happy, Mood::Idle, to_happy())
        .with_transition(Mood::Happy, Mood::Sad, to_sad())
        .with_transition(Mood::Sad, Mood::Idle, to_sad())
        .with_transition(Mood::Sad, Mood::Happy, to_happy())
    }
}
