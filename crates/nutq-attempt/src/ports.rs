//! Collaborators the attempt lifecycle talks to.
//!
//! Each trait is a capability the driver needs from the outside world. Any
//! speech-assessment backend, token service or score store can be plugged in
//! by implementing them; the lifecycle never sees a vendor's object model.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use nutq_eval::VendorAssessment;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{
    AuthorizationError, MicrophoneError, PersistenceError, PlaybackError, RecognizerError,
};

/// Short-lived credential for the recognizer service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
    pub region: String,
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// Parameters for one listening window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenRequest {
    /// Attempt counter within the open dialog.
    pub attempt: u64,
    /// Reference text the assessment is computed against.
    pub target_text: String,
    pub language: String,
    pub token: AuthToken,
}

/// A finalized (non-partial) recognition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognizedSpeech {
    /// Display text as recognized.
    pub text: String,
    pub assessment: VendorAssessment,
    /// Vendor payload kept for diagnostics; never interpreted by the lifecycle.
    pub raw: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    Recognized(RecognizedSpeech),
    /// The recognizer gave up, with the vendor's error details when known.
    Canceled { details: Option<String> },
}

/// Streaming speech recognizer with pronunciation assessment.
///
/// Implementations must tolerate `stop` being called when nothing is running
/// and must tolerate listening windows that produce no results at all. The
/// driver awaits the stop that releases a window before it starts the next
/// one, so a `stop` only ever ends the window that was open when it was issued.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Start listening; finalized results arrive on the returned channel.
    async fn start(
        &self,
        request: ListenRequest,
    ) -> Result<mpsc::Receiver<RecognizerEvent>, RecognizerError>;

    /// Stop listening. Resolves once the recognizer acknowledged the stop.
    async fn stop(&self) -> Result<(), RecognizerError>;
}

/// Issues recognizer tokens. Tokens are not cached by the lifecycle.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<AuthToken, AuthorizationError>;
}

/// An accepted score to store for the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub word_id: String,
    pub category_id: Option<String>,
    /// Score in `0..=100`.
    pub score: u8,
}

/// Aggregates returned after a score is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Rounded mean of the latest per-word scores in the category.
    pub overall: Option<u8>,
    /// Latest score per word in the category.
    pub per_word: BTreeMap<String, u8>,
}

/// Stores scores with "latest score wins" semantics.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn save_score(&self, submission: ScoreSubmission)
    -> Result<ScoreSummary, PersistenceError>;
}

#[async_trait]
pub trait Microphone: Send + Sync {
    /// Ask for microphone access; `Ok` means recording is possible.
    async fn acquire(&self) -> Result<(), MicrophoneError>;

    async fn release(&self);
}

/// Plays the reference pronunciation of a word.
#[async_trait]
pub trait SamplePlayer: Send + Sync {
    /// Play `url` back to back `repetitions` times, resolving when done.
    async fn play(&self, url: &str, repetitions: u32) -> Result<(), PlaybackError>;

    async fn stop(&self);
}
