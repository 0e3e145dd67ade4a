//! Acceptance policy for pronunciation attempts.
//!
//! A recognizer can return a confident score for a word the learner never
//! said, and a low score for the right word said badly. The policy decides
//! whether a recognition result counts as a genuine attempt at the target
//! word and, if so, what score it earns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::similarity::similarity;

/// Vendor score at or above which an attempt is accepted outright.
pub const ACCEPT_SCORE_THRESHOLD: f64 = 45.0;

/// Similarity at or above which an attempt is accepted as the target word.
pub const ACCEPT_SIMILARITY_THRESHOLD: f64 = 0.55;

/// Below this similarity a rejection is reported as "no confident match".
pub const CONFIDENT_MATCH_FLOOR: f64 = 0.35;

/// Vendor error classification meaning no pronunciation error was detected.
pub const NO_ERROR_SENTINEL: &str = "None";

/// Scores reported by the speech-assessment service for one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorAssessment {
    /// Coarse 0-100 pronunciation score.
    pub score: Option<f64>,
    /// Richer aggregate (e.g. phoneme-level) score, preferred when present.
    pub pronunciation_score: Option<f64>,
    /// Error classification tag, [`NO_ERROR_SENTINEL`] when clean.
    pub error_type: Option<String>,
}

impl VendorAssessment {
    /// Whether the vendor explicitly reported no pronunciation error.
    pub fn no_error_reported(&self) -> bool {
        self.error_type.as_deref() == Some(NO_ERROR_SENTINEL)
    }

    /// The coarse score, zero when missing or not a number.
    fn coarse_score(&self) -> f64 {
        self.score.filter(|s| s.is_finite()).unwrap_or(0.0)
    }

    /// Final 0-100 score, preferring the richer score over the coarse one.
    pub fn final_score(&self) -> u8 {
        let raw = self
            .pronunciation_score
            .filter(|s| s.is_finite())
            .unwrap_or_else(|| self.coarse_score());

        raw.clamp(0.0, 100.0).round() as u8
    }
}

/// Which criterion accepted an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceBasis {
    /// Vendor score cleared the score threshold.
    VendorScore,
    /// Vendor reported no pronunciation error.
    NoErrorReported,
    /// Recognized text is close enough to the target.
    Similarity,
}

/// Why an attempt was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The recognized text was empty after normalization.
    NoSpeechDetected,
    /// No finalized recognition arrived after recording began.
    NoSpeechSinceStart,
    /// Speech was captured but does not resemble the target word.
    NoConfidentMatch,
    /// The target word was recognized but not pronounced well enough.
    RecognizedButMispronounced,
}

impl RejectReason {
    /// Learner-facing message for this reason.
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoSpeechDetected => "We heard nothing. Try again.",
            Self::NoSpeechSinceStart => "No speech detected since recording began. Try again.",
            Self::NoConfidentMatch => {
                "We heard a different word. Please repeat exactly the same word."
            }
            Self::RecognizedButMispronounced => {
                "Almost! We recognized the word but the pronunciation needs work. Try again."
            }
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of [`AcceptancePolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// The attempt counts; `score` is in `0..=100`.
    Accept {
        /// Score to record for the word.
        score: u8,
        /// Criterion that accepted the attempt.
        basis: AcceptanceBasis,
        /// Similarity of the recognized text to the target.
        similarity: f64,
    },
    /// The attempt does not count.
    Reject {
        /// Rejection tier shown to the learner.
        reason: RejectReason,
        /// Similarity of the recognized text to the target.
        similarity: f64,
    },
}

impl Decision {
    /// Whether the attempt was accepted.
    pub const fn is_accept(&self) -> bool {
        matches!(self, Self::Accept { .. })
    }

    /// Accepted score, `None` for a rejection.
    pub const fn score(&self) -> Option<u8> {
        match self {
            Self::Accept { score, .. } => Some(*score),
            Self::Reject { .. } => None,
        }
    }

    /// Similarity reported for diagnostics on both outcomes.
    pub const fn similarity(&self) -> f64 {
        match self {
            Self::Accept { similarity, .. } | Self::Reject { similarity, .. } => *similarity,
        }
    }
}

/// Thresholds used to accept or reject an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptancePolicy {
    /// Minimum coarse vendor score for outright acceptance.
    pub score_threshold: f64,
    /// Minimum similarity for acceptance by text match.
    pub similarity_threshold: f64,
    /// Similarity separating the two rejection tiers.
    pub confident_match_floor: f64,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            score_threshold: ACCEPT_SCORE_THRESHOLD,
            similarity_threshold: ACCEPT_SIMILARITY_THRESHOLD,
            confident_match_floor: CONFIDENT_MATCH_FLOOR,
        }
    }
}

impl AcceptancePolicy {
    /// Decide whether a recognition result is a genuine attempt at the target.
    ///
    /// Both texts must already be normalized. An empty recognized text is
    /// rejected as [`RejectReason::NoSpeechDetected`] without looking at any
    /// vendor score. Otherwise the attempt is accepted when any of these hold:
    ///
    /// * coarse vendor score `>= score_threshold`
    /// * vendor error type is [`NO_ERROR_SENTINEL`]
    /// * `similarity >= similarity_threshold`
    pub fn decide(
        &self,
        recognized_normalized: &str,
        target_normalized: &str,
        assessment: &VendorAssessment,
    ) -> Decision {
        if recognized_normalized.is_empty() {
            return Decision::Reject {
                reason: RejectReason::NoSpeechDetected,
                similarity: 0.0,
            };
        }

        let sim = similarity(recognized_normalized, target_normalized);

        let basis = if assessment.coarse_score() >= self.score_threshold {
            Some(AcceptanceBasis::VendorScore)
        } else if assessment.no_error_reported() {
            Some(AcceptanceBasis::NoErrorReported)
        } else if sim >= self.similarity_threshold {
            Some(AcceptanceBasis::Similarity)
        } else {
            None
        };

        let decision = match basis {
            Some(basis) => Decision::Accept {
                score: assessment.final_score(),
                basis,
                similarity: sim,
            },
            None => {
                let reason = if sim < self.confident_match_floor {
                    RejectReason::NoConfidentMatch
                } else {
                    RejectReason::RecognizedButMispronounced
                };
                Decision::Reject {
                    reason,
                    similarity: sim,
                }
            }
        };

        tracing::debug!(
            recognized = recognized_normalized,
            target = target_normalized,
            similarity = sim,
            ?decision,
            "pronunciation decision"
        );

        decision
    }

    /// Whether `score` is a genuine pass, the condition for auto-advancing.
    pub fn passes(&self, score: u8) -> bool {
        f64::from(score) >= self.score_threshold
    }
}
