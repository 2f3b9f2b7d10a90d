//! Health Readings
//!
//! Upstream services report health as a bare integer. The display clamps it
//! to `0..=20`; the mood threshold works on the raw value.

use serde::{Deserialize, Serialize};

use crate::mood::Mood;

/// Top of the health scale
pub const MAX_HEALTH: i64 = 20;

/// Highest health that still maps to [`Mood::Sad`]
pub const SAD_THRESHOLD: i64 = 10;

/// A health value as reported by the backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReading {
    raw: i64,
}

impl HealthReading {
    /// Wrap a raw upstream value
    #[must_use]
    pub fn new(raw: i64) -> Self {
        Self { raw }
    }

    /// The value exactly as reported
    #[must_use]
    pub fn raw(self) -> i64 {
        self.raw
    }

    /// The value clamped to the displayable range
    #[must_use]
    pub fn clamped(self) -> i64 {
        self.raw.clamp(0, MAX_HEALTH)
    }

    /// Health bar fill in percent
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(self) -> f32 {
        self.clamped() as f32 / MAX_HEALTH as f32 * 100.0
    }

    /// Mood this health value asks for
    #[must_use]
    pub fn target_mood(self) -> Mood {
        if self.raw <= SAD_THRESHOLD {
            Mood::Sad
        } else {
            Mood::Happy
        }
    }
}

impl std::fmt::Display for HealthReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.clamped(), MAX_HEALTH)
    }
}
