//! Async runtime for [`AttemptSession`].
//!
//! The driver owns the open session and a set of [`Ports`]. Learner commands
//! and I/O completions are fed into the session one at a time from a single
//! task, and the returned effects are carried out by spawning tasks that
//! report back through an inbox. Every report is tagged with the epoch of the
//! session that requested it, so work finishing after its dialog closed is
//! dropped instead of touching the next one.

use std::{fmt, sync::Arc};

use chrono::Utc;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    config::SessionConfig,
    error::{DriverClosed, PlaybackError},
    ports::{
        AuthorizationProvider, ListenRequest, Microphone, PersistenceGateway, Recognizer,
        RecognizerEvent, SamplePlayer,
    },
    session::{AttemptSession, AttemptState, Effect, FinalResult, Input, SessionSnapshot, WordContext},
};

const COMMAND_BUFFER: usize = 32;

/// External collaborators used by the driver.
#[derive(Clone)]
pub struct Ports {
    /// Streaming speech recognizer.
    pub recognizer: Arc<dyn Recognizer>,
    /// Source of recognizer tokens.
    pub authorization: Arc<dyn AuthorizationProvider>,
    /// Store for accepted scores.
    pub gateway: Arc<dyn PersistenceGateway>,
    pub microphone: Arc<dyn Microphone>,
    /// Player for the reference pronunciation.
    pub player: Arc<dyn SamplePlayer>,
}

impl fmt::Debug for Ports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ports").finish_non_exhaustive()
    }
}

/// Learner actions accepted by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the practice dialog for a word, closing any dialog already open.
    Open(WordContext),
    /// The microphone button: stops while listening, starts otherwise.
    ToggleMicrophone,
    /// Begin a new attempt.
    Start,
    /// Stop listening and score the attempt.
    Stop,
    /// Replay the reference sample once.
    PlaySample,
    /// Close the dialog, cancelling any attempt in progress.
    Close,
}

#[derive(Debug)]
struct Envelope {
    epoch: u64,
    input: Input,
}

/// Return address handed to spawned effect tasks.
#[derive(Debug, Clone)]
struct Mailbox {
    epoch: u64,
    inbox: mpsc::UnboundedSender<Envelope>,
}

impl Mailbox {
    fn post(&self, input: Input) -> bool {
        self.inbox
            .send(Envelope {
                epoch: self.epoch,
                input,
            })
            .is_ok()
    }
}

/// Runs practice sessions on a tokio task; controlled through a [`DriverHandle`].
pub struct AttemptDriver {
    ports: Ports,
    config: SessionConfig,
    session: Option<AttemptSession>,
    next_epoch: u64,
    inbox: mpsc::UnboundedSender<Envelope>,
    snapshots: watch::Sender<Option<SessionSnapshot>>,

    auto_stop: Option<JoinHandle<()>>,
    grace: Option<JoinHandle<()>>,
    auto_close: Option<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,

    /// Last recognizer release; the next listening window starts after it.
    release: Option<JoinHandle<()>>,
    /// Last teardown; the next microphone probe runs after it.
    teardown: Option<JoinHandle<()>>,
}

impl fmt::Debug for AttemptDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptDriver")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("next_epoch", &self.next_epoch)
            .finish_non_exhaustive()
    }
}

impl AttemptDriver {
    /// Spawn the driver on the current tokio runtime.
    pub fn spawn(ports: Ports, config: SessionConfig) -> DriverHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(None);

        let driver = Self {
            ports,
            config,
            session: None,
            next_epoch: 1,
            inbox: inbox_tx,
            snapshots: snapshot_tx,
            auto_stop: None,
            grace: None,
            auto_close: None,
            listener: None,
            release: None,
            teardown: None,
        };

        let task = tokio::spawn(driver.run(command_rx, inbox_rx));

        DriverHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut inbox: mpsc::UnboundedReceiver<Envelope>,
    ) {
        tracing::debug!("attempt driver started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                Some(envelope) = inbox.recv() => self.on_envelope(envelope),
            }
        }

        self.close_session();
        tracing::debug!("attempt driver stopped");
    }

    fn on_command(&mut self, command: Command) {
        tracing::debug!(?command, "command received");

        match command {
            Command::Open(context) => self.open_session(context),
            Command::ToggleMicrophone => {
                let listening = self
                    .session
                    .as_ref()
                    .is_some_and(|session| session.state() == AttemptState::Listening);
                if listening {
                    self.dispatch(Input::StopRequested);
                } else {
                    self.dispatch(Input::StartRequested { at: Utc::now() });
                }
            }
            Command::Start => self.dispatch(Input::StartRequested { at: Utc::now() }),
            Command::Stop => self.dispatch(Input::StopRequested),
            Command::PlaySample => self.dispatch(Input::PlaySampleRequested),
            Command::Close => self.close_session(),
        }
    }

    fn on_envelope(&mut self, envelope: Envelope) {
        let current = self
            .session
            .as_ref()
            .filter(|session| session.is_alive())
            .map(AttemptSession::epoch);

        if current == Some(envelope.epoch) {
            self.dispatch(envelope.input);
        } else {
            tracing::debug!(
                epoch = envelope.epoch,
                ?current,
                input = ?envelope.input,
                "completion for closed session dropped"
            );
        }
    }

    fn open_session(&mut self, context: WordContext) {
        self.close_session();

        let epoch = self.next_epoch;
        self.next_epoch += 1;

        let (session, effects) = AttemptSession::open(epoch, context, self.config.clone());
        self.session = Some(session);

        if self.execute(epoch, effects) {
            self.close_session();
        }
        self.publish();
    }

    fn close_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        let effects = session.handle(Input::CloseRequested);
        self.execute(session.epoch(), effects);
        self.abort_tasks();
        self.publish();
    }

    fn dispatch(&mut self, input: Input) {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!(?input, "no open session");
            return;
        };

        let epoch = session.epoch();
        let effects = session.handle(input);

        if self.execute(epoch, effects) {
            self.close_session();
        } else {
            self.publish();
        }
    }

    /// Carry out `effects`. Returns `true` when the session asked to close.
    fn execute(&mut self, epoch: u64, effects: Vec<Effect>) -> bool {
        let mailbox = Mailbox {
            epoch,
            inbox: self.inbox.clone(),
        };
        let mut close = false;

        for effect in effects {
            tracing::trace!(epoch, ?effect, "executing effect");

            match effect {
                Effect::CheckMicrophone => {
                    let microphone = Arc::clone(&self.ports.microphone);
                    let mailbox = mailbox.clone();
                    let teardown = self.teardown.take();
                    tokio::spawn(async move {
                        settle(teardown, "teardown").await;
                        let result = microphone.acquire().await.map_err(|e| e.to_string());
                        mailbox.post(Input::MicrophoneChecked(result));
                    });
                }
                Effect::FetchToken => {
                    let authorization = Arc::clone(&self.ports.authorization);
                    let mailbox = mailbox.clone();
                    tokio::spawn(async move {
                        let result = authorization.fetch_token().await.map_err(|e| e.to_string());
                        mailbox.post(Input::TokenFetched(result));
                    });
                }
                Effect::PlayIntro { url, repetitions } => {
                    let player = Arc::clone(&self.ports.player);
                    let mailbox = mailbox.clone();
                    tokio::spawn(async move {
                        let autoplay_blocked = match player.play(&url, repetitions).await {
                            Ok(()) => false,
                            Err(PlaybackError::Blocked) => true,
                            Err(e) => {
                                tracing::warn!(%url, error = %e, "intro playback failed");
                                false
                            }
                        };
                        mailbox.post(Input::IntroFinished { autoplay_blocked });
                    });
                }
                Effect::PlaySample { url } => {
                    let player = Arc::clone(&self.ports.player);
                    tokio::spawn(async move {
                        if let Err(e) = player.play(&url, 1).await {
                            tracing::warn!(%url, error = %e, "sample playback failed");
                        }
                    });
                }
                Effect::StartRecognizer(request) => {
                    abort(&mut self.listener);
                    self.listener = Some(tokio::spawn(listen(
                        Arc::clone(&self.ports.recognizer),
                        request,
                        self.release.take(),
                        mailbox.clone(),
                    )));
                }
                Effect::ScheduleAutoStop { attempt, after } => {
                    abort(&mut self.auto_stop);
                    let mailbox = mailbox.clone();
                    self.auto_stop = Some(tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        mailbox.post(Input::AutoStopElapsed { attempt });
                    }));
                }
                Effect::CancelAutoStop => abort(&mut self.auto_stop),
                Effect::StopRecognizer { finalize, grace } => {
                    let recognizer = Arc::clone(&self.ports.recognizer);
                    let mailbox = mailbox.clone();
                    abort(&mut self.grace);
                    self.grace = Some(tokio::spawn(async move {
                        if let Err(e) = recognizer.stop().await {
                            tracing::warn!(error = %e, "recognizer stop failed");
                        }
                        if let Some(attempt) = finalize {
                            tokio::time::sleep(grace).await;
                            mailbox.post(Input::GraceElapsed { attempt });
                        }
                    }));
                }
                Effect::ReleaseRecognizer => {
                    abort(&mut self.listener);
                    abort(&mut self.grace);
                    let recognizer = Arc::clone(&self.ports.recognizer);
                    let previous = self.release.take();
                    self.release = Some(tokio::spawn(async move {
                        settle(previous, "recognizer release").await;
                        if let Err(e) = recognizer.stop().await {
                            tracing::debug!(error = %e, "recognizer release failed");
                        }
                    }));
                }
                Effect::PersistScore {
                    attempt,
                    submission,
                } => {
                    let gateway = Arc::clone(&self.ports.gateway);
                    let mailbox = mailbox.clone();
                    tokio::spawn(async move {
                        let result = gateway.save_score(submission).await.map_err(|e| e.to_string());
                        mailbox.post(Input::ScoreSaved { attempt, result });
                    });
                }
                Effect::ScheduleAutoClose { attempt, after } => {
                    abort(&mut self.auto_close);
                    let mailbox = mailbox.clone();
                    self.auto_close = Some(tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        mailbox.post(Input::AutoCloseElapsed { attempt });
                    }));
                }
                Effect::CloseDialog => close = true,
                Effect::Teardown => {
                    let microphone = Arc::clone(&self.ports.microphone);
                    let player = Arc::clone(&self.ports.player);
                    let previous = self.teardown.take();
                    self.teardown = Some(tokio::spawn(async move {
                        settle(previous, "teardown").await;
                        player.stop().await;
                        microphone.release().await;
                    }));
                }
            }
        }

        close
    }

    fn abort_tasks(&mut self) {
        abort(&mut self.auto_stop);
        abort(&mut self.grace);
        abort(&mut self.auto_close);
        abort(&mut self.listener);
    }

    fn publish(&self) {
        self.snapshots
            .send_replace(self.session.as_ref().map(AttemptSession::snapshot));
    }
}

fn abort(task: &mut Option<JoinHandle<()>>) {
    if let Some(task) = task.take() {
        task.abort();
    }
}

/// Wait for earlier cleanup so it cannot act on newer work.
async fn settle(pending: Option<JoinHandle<()>>, what: &'static str) {
    if let Some(pending) = pending
        && let Err(e) = pending.await
    {
        tracing::warn!(error = %e, "{what} task failed");
    }
}

/// Forward recognizer events for one attempt into the inbox.
///
/// Listening begins only after `release`, the stop of the previous window,
/// has been acknowledged.
async fn listen(
    recognizer: Arc<dyn Recognizer>,
    request: ListenRequest,
    release: Option<JoinHandle<()>>,
    mailbox: Mailbox,
) {
    let attempt = request.attempt;
    settle(release, "recognizer release").await;

    let mut events = match recognizer.start(request).await {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(attempt, error = %e, "recognizer failed to start");
            mailbox.post(Input::RecognizerFailed {
                attempt,
                details: Some(e.to_string()),
            });
            return;
        }
    };

    while let Some(event) = events.recv().await {
        let input = match event {
            RecognizerEvent::Recognized(speech) => Input::RecognitionReceived {
                attempt,
                result: FinalResult::new(speech, Utc::now()),
            },
            RecognizerEvent::Canceled { details } => Input::RecognizerFailed { attempt, details },
        };
        if !mailbox.post(input) {
            break;
        }
    }
}

/// Handle to a running [`AttemptDriver`].
#[derive(Debug)]
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Option<SessionSnapshot>>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    /// Queue a learner command.
    pub async fn send(&self, command: Command) -> Result<(), DriverClosed> {
        self.commands.send(command).await.map_err(|_| DriverClosed)
    }

    /// Snapshot updates; `None` while no dialog is open.
    pub fn snapshots(&self) -> watch::Receiver<Option<SessionSnapshot>> {
        self.snapshots.clone()
    }

    /// Latest published snapshot.
    pub fn current(&self) -> Option<SessionSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Wait until the open session satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, DriverClosed> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|current| current.as_ref().is_some_and(&mut predicate))
            .await
            .map_err(|_| DriverClosed)?;
        let snapshot = snapshot.clone();
        snapshot.ok_or(DriverClosed)
    }

    /// Wait until no dialog is open.
    pub async fn wait_closed(&self) -> Result<(), DriverClosed> {
        let mut snapshots = self.snapshots.clone();
        snapshots
            .wait_for(Option::is_none)
            .await
            .map_err(|_| DriverClosed)?;
        Ok(())
    }

    /// Close any open dialog and stop the driver.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "attempt driver task failed");
        }
    }
}
