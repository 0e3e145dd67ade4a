use nutq_eval::RejectReason;
use serde::Serialize;
use thiserror::Error;

/// Learner-facing errors raised while running pronunciation attempts.
///
/// All of them are recoverable: the learner can retry from the same dialog.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AttemptError {
    /// Microphone access was refused or no input device exists.
    #[error(
        "Microphone is blocked or not available. Please allow mic access in your browser/OS settings."
    )]
    MicrophoneUnavailable,
    /// The recognizer token is still being fetched.
    #[error("Token not ready. Please wait a moment and try again.")]
    TokenPending,
    /// The recognizer token could not be fetched.
    #[error("{0}")]
    TokenUnavailable(String),
    /// Recording waits until the reference sample has played.
    #[error("Wait until the sample finishes playing.")]
    IntroPlaying,
    /// A perfect score was already reached in this dialog.
    #[error("You already have a perfect score for this word.")]
    AlreadyMastered,
    /// Nothing usable was heard during the attempt.
    #[error("{0}")]
    NoSpeech(RejectReason),
    /// Speech was heard but did not match the target well enough.
    #[error("{0}")]
    Mismatch(RejectReason),
    /// An accepted score could not be stored; the attempt stays completed.
    #[error("Your score could not be saved: {0}")]
    Save(String),
    /// The recognizer cancelled or failed mid-attempt.
    #[error("{0}")]
    Transport(String),
}

impl AttemptError {
    /// Whether this error blocks recording until the environment changes.
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MicrophoneUnavailable
                | Self::TokenPending
                | Self::TokenUnavailable(_)
                | Self::IntroPlaying
                | Self::AlreadyMastered
        )
    }
}

impl From<RejectReason> for AttemptError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::NoSpeechDetected | RejectReason::NoSpeechSinceStart => {
                Self::NoSpeech(reason)
            }
            RejectReason::NoConfidentMatch | RejectReason::RecognizedButMispronounced => {
                Self::Mismatch(reason)
            }
        }
    }
}

/// Failure reported by a [`crate::ports::Recognizer`].
#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("recognizer failed to start: {0}")]
    Start(String),
    #[error("recognizer failed to stop: {0}")]
    Stop(String),
}

/// Failure reported by a [`crate::ports::AuthorizationProvider`].
#[derive(Error, Debug)]
pub enum AuthorizationError {
    /// The token endpoint answered with a non-success HTTP status.
    #[error("Token fetch failed: {0}")]
    Status(u16),
    #[error("Token fetch failed: {0}")]
    Transport(String),
    #[error("Token response was malformed: {0}")]
    Malformed(String),
}

/// Failure reported by a [`crate::ports::PersistenceGateway`].
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The store refused the score.
    #[error("score rejected: {0}")]
    Rejected(String),
    /// The store could not be reached.
    #[error("score request failed: {0}")]
    Transport(String),
}

/// Failure reported by a [`crate::ports::Microphone`].
#[derive(Error, Debug)]
pub enum MicrophoneError {
    #[error("microphone access denied")]
    Denied,
    #[error("no audio input device")]
    NotFound,
    #[error("microphone error: {0}")]
    Other(String),
}

/// Failure reported by a [`crate::ports::SamplePlayer`].
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The platform refused to play audio without a user gesture.
    #[error("autoplay was blocked")]
    Blocked,
    #[error("playback failed: {0}")]
    Failed(String),
}

/// The driver task is gone and no longer accepts commands.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("attempt driver has shut down")]
pub struct DriverClosed;
