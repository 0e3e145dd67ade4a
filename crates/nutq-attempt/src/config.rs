use std::time::Duration;

use nutq_eval::AcceptancePolicy;
use serde::{Deserialize, Serialize};

/// Recording stops on its own this long after listening begins.
pub const AUTO_STOP_MS: u64 = 5000;

/// Wait after stopping the recognizer for a trailing final result.
pub const FINAL_GRACE_MS: u64 = 600;

/// Delay before a passing attempt closes the dialog.
pub const AUTO_CLOSE_MS: u64 = 1200;

/// The reference sample is played this many times when the dialog opens.
pub const INTRO_REPETITIONS: u32 = 2;

/// Recognition language used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "ar-EG";

/// Fixed delays of the attempt lifecycle, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttemptTimings {
    /// Listening window length.
    pub auto_stop_ms: u64,
    /// Wait after the recognizer stop for a trailing result.
    pub final_grace_ms: u64,
    /// Delay before a passing attempt closes the dialog.
    pub auto_close_ms: u64,
    /// Times the sample plays when the dialog opens.
    pub intro_repetitions: u32,
}

impl Default for AttemptTimings {
    fn default() -> Self {
        Self {
            auto_stop_ms: AUTO_STOP_MS,
            final_grace_ms: FINAL_GRACE_MS,
            auto_close_ms: AUTO_CLOSE_MS,
            intro_repetitions: INTRO_REPETITIONS,
        }
    }
}

impl AttemptTimings {
    /// [`Self::auto_stop_ms`] as a [`Duration`].
    pub const fn auto_stop(&self) -> Duration {
        Duration::from_millis(self.auto_stop_ms)
    }

    /// [`Self::final_grace_ms`] as a [`Duration`].
    pub const fn final_grace(&self) -> Duration {
        Duration::from_millis(self.final_grace_ms)
    }

    /// [`Self::auto_close_ms`] as a [`Duration`].
    pub const fn auto_close(&self) -> Duration {
        Duration::from_millis(self.auto_close_ms)
    }
}

/// Everything a practice session needs besides the word itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// BCP 47 tag passed to the recognizer.
    pub language: String,
    /// Thresholds applied when an attempt is scored.
    pub policy: AcceptancePolicy,
    pub timings: AttemptTimings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            policy: AcceptancePolicy::default(),
            timings: AttemptTimings::default(),
        }
    }
}
