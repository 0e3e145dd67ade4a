//! Pronunciation attempt lifecycle for Nutq
//!
//! One open practice dialog runs a sequence of attempts at a single word:
//! listen for up to a few seconds, stop, wait briefly for a trailing result,
//! then score it with [`nutq_eval::AcceptancePolicy`] and save accepted scores.
//!
//! - [`session`]: the pure state machine, driven by [`session::Input`]s and
//!   answering with [`session::Effect`]s
//! - [`driver`]: a tokio task that executes effects against the [`ports`]
//! - [`memory`]: an in-process [`ports::PersistenceGateway`]

pub mod config;
pub mod driver;
pub mod error;
pub mod memory;
pub mod ports;
pub mod session;

pub use config::{AttemptTimings, SessionConfig};
pub use driver::{AttemptDriver, Command, DriverHandle, Ports};
pub use error::{AttemptError, DriverClosed};
pub use memory::InMemoryScoreStore;
pub use ports::{
    AuthToken, AuthorizationProvider, ListenRequest, Microphone, PersistenceGateway,
    RecognizedSpeech, Recognizer, RecognizerEvent, SamplePlayer, ScoreSubmission, ScoreSummary,
};
pub use session::{AttemptSession, AttemptState, Effect, Input, SessionSnapshot, WordContext};
