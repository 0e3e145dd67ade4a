//! Attempt lifecycle state machine.
//!
//! [`AttemptSession`] is a plain value: [`AttemptSession::handle`] applies one
//! [`Input`] and returns the [`Effect`]s the caller must carry out (timers,
//! recognizer calls, persistence). It never performs I/O itself, which keeps
//! every transition deterministic and unit-testable.
//!
//! ```text
//! Idle ──start──▶ Listening ──stop / auto-stop──▶ Scoring ──grace──▶ Completed(score)
//!  ▲                  │                              │          └──▶ Rejected(reason)
//!  └──── cancel ──────┴──────────────────────────────┘
//! ```
//!
//! `Completed` and `Rejected` accept a new start, which begins the next attempt.

use std::time::Duration;

use chrono::{DateTime, Utc};
use nutq_eval::{AcceptancePolicy, Decision, RejectReason, VendorAssessment, normalize};
use serde::Serialize;

use crate::{
    config::SessionConfig,
    error::AttemptError,
    ports::{AuthToken, ListenRequest, RecognizedSpeech, ScoreSubmission, ScoreSummary},
};

/// Best score at which a word counts as mastered and recording is hidden.
pub const MASTERED_SCORE: u8 = 100;

/// The word being practised in an open dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordContext {
    pub word_id: String,
    pub category_id: Option<String>,
    /// Target text as shown to the learner, with full vocalization.
    pub text: String,
    /// Reference pronunciation, played twice when the dialog opens.
    pub sample_url: Option<String>,
}

/// Where the current attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptState {
    /// Waiting for the learner to start.
    Idle,
    /// The recognizer is listening.
    Listening,
    /// Stopped; waiting out the grace period before scoring.
    Scoring,
    /// Accepted with `score`.
    Completed { score: u8 },
    /// Not accepted; the learner may retry.
    Rejected { reason: RejectReason },
}

/// The latest finalized recognition received during an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalResult {
    pub text: String,
    pub assessment: VendorAssessment,
    pub raw: Option<serde_json::Value>,
    pub received_at: DateTime<Utc>,
}

impl FinalResult {
    pub fn new(speech: RecognizedSpeech, received_at: DateTime<Utc>) -> Self {
        Self {
            text: speech.text,
            assessment: speech.assessment,
            raw: speech.raw,
            received_at,
        }
    }
}

/// Microphone availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Readiness {
    Pending,
    Ready,
    Unavailable(String),
}

/// State of the recognizer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Pending,
    Ready(AuthToken),
    Failed(String),
}

/// Outcome of storing the most recent accepted score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "summary", rename_all = "snake_case")]
pub enum SaveStatus {
    NotRequested,
    Pending,
    Saved(ScoreSummary),
    Failed(String),
}

/// Something that happened: a learner action, a timer, or an I/O completion.
///
/// Inputs tagged with an `attempt` are ignored unless they belong to the
/// current attempt. `ScoreSaved` is matched against the latest save instead,
/// so its outcome still lands after the learner has moved on.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    MicrophoneChecked(Result<(), String>),
    TokenFetched(Result<AuthToken, String>),
    IntroFinished { autoplay_blocked: bool },
    StartRequested { at: DateTime<Utc> },
    StopRequested,
    AutoStopElapsed { attempt: u64 },
    RecognitionReceived { attempt: u64, result: FinalResult },
    RecognizerFailed { attempt: u64, details: Option<String> },
    GraceElapsed { attempt: u64 },
    ScoreSaved {
        attempt: u64,
        result: Result<ScoreSummary, String>,
    },
    AutoCloseElapsed { attempt: u64 },
    PlaySampleRequested,
    CloseRequested,
}

/// Work requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    CheckMicrophone,
    FetchToken,
    /// Play the reference sample; report back with `IntroFinished`.
    PlayIntro { url: String, repetitions: u32 },
    /// Replay the reference sample once, without blocking recording.
    PlaySample { url: String },
    StartRecognizer(ListenRequest),
    /// Report `AutoStopElapsed { attempt }` after `after`.
    ScheduleAutoStop { attempt: u64, after: Duration },
    CancelAutoStop,
    /// Stop the recognizer. With `finalize`, wait `grace` after the stop is
    /// acknowledged and report `GraceElapsed` for that attempt.
    StopRecognizer {
        finalize: Option<u64>,
        grace: Duration,
    },
    /// Stop forwarding recognizer events and stop the recognizer.
    ReleaseRecognizer,
    /// Store an accepted score; report back with `ScoreSaved`.
    PersistScore {
        attempt: u64,
        submission: ScoreSubmission,
    },
    /// Report `AutoCloseElapsed { attempt }` after `after`.
    ScheduleAutoClose { attempt: u64, after: Duration },
    /// Close the dialog, which ends this session.
    CloseDialog,
    /// Release the microphone and stop sample playback.
    Teardown,
}

/// One learner practising one word during one open dialog.
#[derive(Debug, Clone)]
pub struct AttemptSession {
    epoch: u64,
    context: WordContext,
    target_normalized: String,
    config: SessionConfig,

    state: AttemptState,
    attempt: u64,
    started_at: Option<DateTime<Utc>>,
    last_final_result: Option<FinalResult>,
    last_decision: Option<Decision>,
    best_score: Option<u8>,

    /// Re-entry guard: set while a stop/score sequence is in flight.
    finalizing: bool,
    /// Cleared when the dialog closes; nothing mutates the session afterwards.
    alive: bool,

    microphone: Readiness,
    authorization: Authorization,
    intro_playing: bool,
    autoplay_blocked: bool,

    error: Option<AttemptError>,
    save: SaveStatus,
    /// Attempt whose score `save` describes.
    save_attempt: Option<u64>,
}

impl AttemptSession {
    /// Open a fresh session for `context`.
    ///
    /// Returns the session together with the effects that prepare it: probing
    /// the microphone, fetching a recognizer token and playing the sample.
    pub fn open(epoch: u64, context: WordContext, config: SessionConfig) -> (Self, Vec<Effect>) {
        let target_normalized = normalize(&context.text);

        let mut effects = vec![Effect::CheckMicrophone, Effect::FetchToken];
        let intro_playing = match &context.sample_url {
            Some(url) if config.timings.intro_repetitions > 0 => {
                effects.push(Effect::PlayIntro {
                    url: url.clone(),
                    repetitions: config.timings.intro_repetitions,
                });
                true
            }
            _ => false,
        };

        tracing::debug!(
            epoch,
            word_id = %context.word_id,
            target = %target_normalized,
            "practice session opened"
        );

        let session = Self {
            epoch,
            context,
            target_normalized,
            config,
            state: AttemptState::Idle,
            attempt: 0,
            started_at: None,
            last_final_result: None,
            last_decision: None,
            best_score: None,
            finalizing: false,
            alive: true,
            microphone: Readiness::Pending,
            authorization: Authorization::Pending,
            intro_playing,
            autoplay_blocked: false,
            error: None,
            save: SaveStatus::NotRequested,
            save_attempt: None,
        };

        (session, effects)
    }

    /// Apply one input and return the effects to carry out.
    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        if !self.alive {
            tracing::debug!(epoch = self.epoch, ?input, "session closed, input ignored");
            return Vec::new();
        }

        match input {
            Input::MicrophoneChecked(result) => {
                self.microphone = match result {
                    Ok(()) => Readiness::Ready,
                    Err(message) => {
                        tracing::warn!(epoch = self.epoch, %message, "microphone unavailable");
                        Readiness::Unavailable(message)
                    }
                };
                Vec::new()
            }
            Input::TokenFetched(result) => {
                self.authorization = match result {
                    Ok(token) => Authorization::Ready(token),
                    Err(message) => {
                        tracing::warn!(epoch = self.epoch, %message, "recognizer token unavailable");
                        Authorization::Failed(message)
                    }
                };
                Vec::new()
            }
            Input::IntroFinished { autoplay_blocked } => {
                self.intro_playing = false;
                self.autoplay_blocked = autoplay_blocked;
                Vec::new()
            }
            Input::StartRequested { at } => self.start(at),
            Input::StopRequested => self.begin_scoring("learner"),
            Input::AutoStopElapsed { attempt } => {
                if attempt == self.attempt {
                    self.begin_scoring("timeout")
                } else {
                    self.ignore_stale("auto-stop", attempt)
                }
            }
            Input::RecognitionReceived { attempt, result } => {
                self.record_result(attempt, result);
                Vec::new()
            }
            Input::RecognizerFailed { attempt, details } => self.abort(attempt, details),
            Input::GraceElapsed { attempt } => self.finalize(attempt),
            Input::ScoreSaved { attempt, result } => {
                self.record_save(attempt, result);
                Vec::new()
            }
            Input::AutoCloseElapsed { attempt } => self.auto_close(attempt),
            Input::PlaySampleRequested => self
                .context
                .sample_url
                .clone()
                .map(|url| Effect::PlaySample { url })
                .into_iter()
                .collect(),
            Input::CloseRequested => self.close(),
        }
    }

    fn start(&mut self, at: DateTime<Utc>) -> Vec<Effect> {
        if self.finalizing || matches!(self.state, AttemptState::Listening | AttemptState::Scoring)
        {
            tracing::debug!(epoch = self.epoch, state = ?self.state, "start ignored, attempt in progress");
            return Vec::new();
        }

        let token = match self.check_preconditions() {
            Ok(token) => token,
            Err(error) => {
                tracing::info!(epoch = self.epoch, %error, "recording refused");
                self.error = Some(error);
                return Vec::new();
            }
        };

        self.attempt += 1;
        self.state = AttemptState::Listening;
        self.started_at = Some(at);
        self.last_final_result = None;
        self.last_decision = None;
        self.error = None;

        tracing::info!(epoch = self.epoch, attempt = self.attempt, "listening");

        vec![
            Effect::StartRecognizer(ListenRequest {
                attempt: self.attempt,
                target_text: self.context.text.clone(),
                language: self.config.language.clone(),
                token,
            }),
            Effect::ScheduleAutoStop {
                attempt: self.attempt,
                after: self.config.timings.auto_stop(),
            },
        ]
    }

    fn check_preconditions(&self) -> Result<AuthToken, AttemptError> {
        if self.intro_playing {
            return Err(AttemptError::IntroPlaying);
        }
        if self.is_mastered() {
            return Err(AttemptError::AlreadyMastered);
        }
        if self.microphone != Readiness::Ready {
            return Err(AttemptError::MicrophoneUnavailable);
        }
        match &self.authorization {
            Authorization::Ready(token) => Ok(token.clone()),
            Authorization::Pending => Err(AttemptError::TokenPending),
            Authorization::Failed(message) => Err(AttemptError::TokenUnavailable(message.clone())),
        }
    }

    fn begin_scoring(&mut self, trigger: &'static str) -> Vec<Effect> {
        // Checked before anything else so a second stop is a no-op.
        if self.finalizing || self.state != AttemptState::Listening {
            tracing::debug!(epoch = self.epoch, trigger, state = ?self.state, "stop ignored");
            return Vec::new();
        }

        self.finalizing = true;
        self.state = AttemptState::Scoring;

        tracing::debug!(epoch = self.epoch, attempt = self.attempt, trigger, "scoring");

        vec![
            Effect::CancelAutoStop,
            Effect::StopRecognizer {
                finalize: Some(self.attempt),
                grace: self.config.timings.final_grace(),
            },
        ]
    }

    fn record_result(&mut self, attempt: u64, result: FinalResult) {
        let receiving = matches!(self.state, AttemptState::Listening)
            || (self.finalizing && self.state == AttemptState::Scoring);
        if attempt != self.attempt || !receiving {
            self.ignore_stale("recognition", attempt);
            return;
        }

        tracing::debug!(epoch = self.epoch, attempt, text = %result.text, "final result buffered");
        self.last_final_result = Some(result);
    }

    fn abort(&mut self, attempt: u64, details: Option<String>) -> Vec<Effect> {
        if attempt != self.attempt
            || !matches!(self.state, AttemptState::Listening | AttemptState::Scoring)
        {
            return self.ignore_stale("recognizer failure", attempt);
        }

        let details = details.unwrap_or_else(|| "Speech recognition was canceled.".to_string());
        tracing::warn!(epoch = self.epoch, attempt, %details, "recognition aborted");

        self.state = AttemptState::Idle;
        self.finalizing = false;
        self.last_final_result = None;
        self.error = Some(AttemptError::Transport(details));

        vec![Effect::CancelAutoStop, Effect::ReleaseRecognizer]
    }

    fn finalize(&mut self, attempt: u64) -> Vec<Effect> {
        if attempt != self.attempt || !self.finalizing {
            return self.ignore_stale("grace period", attempt);
        }
        self.finalizing = false;

        let decision = match (self.last_final_result.take(), self.started_at) {
            (Some(result), Some(started_at)) if result.received_at >= started_at => {
                let recognized = normalize(&result.text);
                self.config
                    .policy
                    .decide(&recognized, &self.target_normalized, &result.assessment)
            }
            _ => Decision::Reject {
                reason: RejectReason::NoSpeechSinceStart,
                similarity: 0.0,
            },
        };
        self.last_decision = Some(decision);

        let mut effects = vec![Effect::ReleaseRecognizer];
        match decision {
            Decision::Accept { score, basis, .. } => {
                tracing::info!(epoch = self.epoch, attempt, score, ?basis, "attempt accepted");

                self.state = AttemptState::Completed { score };
                self.best_score = Some(self.best_score.map_or(score, |best| best.max(score)));
                self.save = SaveStatus::Pending;
                self.save_attempt = Some(attempt);
                if matches!(self.error, Some(AttemptError::Save(_))) {
                    self.error = None;
                }

                effects.push(Effect::PersistScore {
                    attempt,
                    submission: ScoreSubmission {
                        word_id: self.context.word_id.clone(),
                        category_id: self.context.category_id.clone(),
                        score,
                    },
                });
                if self.config.policy.passes(score) {
                    effects.push(Effect::ScheduleAutoClose {
                        attempt,
                        after: self.config.timings.auto_close(),
                    });
                }
            }
            Decision::Reject { reason, .. } => {
                tracing::info!(epoch = self.epoch, attempt, ?reason, "attempt rejected");

                self.state = AttemptState::Rejected { reason };
                self.error = Some(AttemptError::from(reason));
            }
        }

        effects
    }

    /// Apply the outcome of the most recent save, even when a newer attempt
    /// has started since. Outcomes of saves superseded by a later accepted
    /// score are dropped.
    fn record_save(&mut self, attempt: u64, result: Result<ScoreSummary, String>) {
        if self.save_attempt != Some(attempt) || self.save != SaveStatus::Pending {
            self.ignore_stale("score save", attempt);
            return;
        }

        // A failed save never reverts the accepted attempt.
        match result {
            Ok(summary) => self.save = SaveStatus::Saved(summary),
            Err(message) => {
                tracing::error!(epoch = self.epoch, attempt, %message, "failed to save score");
                self.error = Some(AttemptError::Save(message.clone()));
                self.save = SaveStatus::Failed(message);
            }
        }
    }

    fn auto_close(&mut self, attempt: u64) -> Vec<Effect> {
        match self.state {
            AttemptState::Completed { score }
                if attempt == self.attempt && self.config.policy.passes(score) =>
            {
                vec![Effect::CloseDialog]
            }
            _ => self.ignore_stale("auto-close", attempt),
        }
    }

    fn close(&mut self) -> Vec<Effect> {
        tracing::debug!(epoch = self.epoch, state = ?self.state, "practice session closed");

        self.alive = false;
        self.finalizing = false;
        self.state = AttemptState::Idle;

        vec![
            Effect::CancelAutoStop,
            Effect::ReleaseRecognizer,
            Effect::Teardown,
        ]
    }

    fn ignore_stale(&self, what: &'static str, attempt: u64) -> Vec<Effect> {
        tracing::debug!(
            epoch = self.epoch,
            current = self.attempt,
            attempt,
            state = ?self.state,
            "stale {what} ignored"
        );
        Vec::new()
    }

    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    pub const fn state(&self) -> AttemptState {
        self.state
    }

    pub const fn attempt(&self) -> u64 {
        self.attempt
    }

    pub const fn is_finalizing(&self) -> bool {
        self.finalizing
    }

    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub const fn best_score(&self) -> Option<u8> {
        self.best_score
    }

    pub const fn context(&self) -> &WordContext {
        &self.context
    }

    pub fn target_normalized(&self) -> &str {
        &self.target_normalized
    }

    pub const fn last_final_result(&self) -> Option<&FinalResult> {
        self.last_final_result.as_ref()
    }

    pub const fn last_decision(&self) -> Option<&Decision> {
        self.last_decision.as_ref()
    }

    pub const fn error(&self) -> Option<&AttemptError> {
        self.error.as_ref()
    }

    pub const fn save_status(&self) -> &SaveStatus {
        &self.save
    }

    pub const fn save_attempt(&self) -> Option<u64> {
        self.save_attempt
    }

    pub fn is_mastered(&self) -> bool {
        self.best_score.is_some_and(|best| best >= MASTERED_SCORE)
    }

    /// Persistent precondition problem to show until it is resolved.
    pub fn banner(&self) -> Option<AttemptError> {
        if let Readiness::Unavailable(_) = self.microphone {
            return Some(AttemptError::MicrophoneUnavailable);
        }
        match &self.authorization {
            Authorization::Failed(message) => Some(AttemptError::TokenUnavailable(message.clone())),
            _ => None,
        }
    }

    /// Whether a start request would currently begin listening.
    pub fn can_start(&self) -> bool {
        !self.finalizing
            && !matches!(self.state, AttemptState::Listening | AttemptState::Scoring)
            && self.check_preconditions().is_ok()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            epoch: self.epoch,
            word_id: self.context.word_id.clone(),
            state: self.state,
            attempt: self.attempt,
            best_score: self.best_score,
            similarity: self.last_decision.map(|decision| decision.similarity()),
            can_start: self.can_start(),
            mastered: self.is_mastered(),
            intro_playing: self.intro_playing,
            autoplay_blocked: self.autoplay_blocked,
            microphone: self.microphone.clone(),
            token_ready: matches!(self.authorization, Authorization::Ready(_)),
            error: self.error.clone(),
            banner: self.banner(),
            save: self.save.clone(),
            save_attempt: self.save_attempt,
        }
    }
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub epoch: u64,
    pub word_id: String,
    pub state: AttemptState,
    pub attempt: u64,
    pub best_score: Option<u8>,
    pub similarity: Option<f64>,
    pub can_start: bool,
    pub mastered: bool,
    pub intro_playing: bool,
    pub autoplay_blocked: bool,
    pub microphone: Readiness,
    pub token_ready: bool,
    pub error: Option<AttemptError>,
    pub banner: Option<AttemptError>,
    pub save: SaveStatus,
    pub save_attempt: Option<u64>,
}
