#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use nutq_attempt::{
    AttemptDriver, AuthToken, AuthorizationProvider, DriverHandle, InMemoryScoreStore,
    ListenRequest, Microphone, PersistenceGateway, Ports, RecognizedSpeech, Recognizer,
    RecognizerEvent, SamplePlayer, ScoreSubmission, ScoreSummary, SessionConfig, WordContext,
    error::{AuthorizationError, MicrophoneError, PersistenceError, PlaybackError, RecognizerError},
};
use nutq_eval::VendorAssessment;
use tokio::sync::{mpsc, oneshot};

/// Sample length reported by [`FakePlayer`] for one playback.
pub const SAMPLE_MS: u64 = 100;

/// Time [`FakeRecognizer`] takes to acknowledge a stop.
pub const STOP_ACK_MS: u64 = 50;

pub fn word() -> WordContext {
    WordContext {
        word_id: "w-kitab".to_string(),
        category_id: Some("school".to_string()),
        text: "كِتَابٌ".to_string(),
        sample_url: Some("https://cdn.example/school/kitab.mp3".to_string()),
    }
}

pub fn other_word() -> WordContext {
    WordContext {
        word_id: "w-qalam".to_string(),
        category_id: Some("school".to_string()),
        text: "قَلَمٌ".to_string(),
        sample_url: None,
    }
}

pub fn token() -> AuthToken {
    AuthToken {
        token: "test-token".to_string(),
        region: "westeurope".to_string(),
    }
}

pub fn recognized(text: &str, score: f64, error_type: Option<&str>) -> RecognizerEvent {
    RecognizerEvent::Recognized(RecognizedSpeech {
        text: text.to_string(),
        assessment: VendorAssessment {
            score: Some(score),
            pronunciation_score: None,
            error_type: error_type.map(String::from),
        },
        raw: None,
    })
}

/// Recognizer replaying one scripted list of `(delay, event)` per start.
///
/// Delays are measured from the start of listening. With [`Self::slow_stop`]
/// a stop takes longer to land and ends whichever window is open by then.
#[derive(Default)]
pub struct FakeRecognizer {
    scripts: Mutex<VecDeque<Vec<(Duration, RecognizerEvent)>>>,
    requests: Mutex<Vec<ListenRequest>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    slow_stop: Option<Duration>,
    window: Mutex<Option<oneshot::Sender<()>>>,
    ended_windows: AtomicUsize,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the events produced by the next listening window.
    pub fn script(self, events: Vec<(u64, RecognizerEvent)>) -> Self {
        let events = events
            .into_iter()
            .map(|(ms, event)| (Duration::from_millis(ms), event))
            .collect();
        self.scripts.lock().unwrap().push_back(events);
        self
    }

    pub fn slow_stop(mut self, ms: u64) -> Self {
        self.slow_stop = Some(Duration::from_millis(ms));
        self
    }

    /// Windows that a stop ended while they were still listening.
    pub fn ended_windows(&self) -> usize {
        self.ended_windows.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ListenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn start(
        &self,
        request: ListenRequest,
    ) -> Result<mpsc::Receiver<RecognizerEvent>, RecognizerError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        let events = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let (tx, rx) = mpsc::channel(8);
        let (end_tx, end_rx) = oneshot::channel();
        *self.window.lock().unwrap() = Some(end_tx);
        tokio::spawn(async move {
            let replay = async {
                let mut elapsed = Duration::ZERO;
                for (at, event) in events {
                    tokio::time::sleep(at.saturating_sub(elapsed)).await;
                    elapsed = at;
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                // Keep the window open like a live recognizer would.
                std::future::pending::<()>().await;
            };
            tokio::select! {
                () = replay => {}
                _ = end_rx => {}
            }
        });
        Ok(rx)
    }

    async fn stop(&self) -> Result<(), RecognizerError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        match self.slow_stop {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                let window = self.window.lock().unwrap().take();
                if let Some(end) = window
                    && end.send(()).is_ok()
                {
                    self.ended_windows.fetch_add(1, Ordering::SeqCst);
                }
            }
            None => tokio::time::sleep(Duration::from_millis(STOP_ACK_MS)).await,
        }
        Ok(())
    }
}

/// Token provider answering each call from a queue, then with a valid token.
#[derive(Default)]
pub struct FakeAuthorization {
    responses: Mutex<VecDeque<(Duration, Result<AuthToken, u16>)>>,
    calls: AtomicUsize,
}

impl FakeAuthorization {
    pub fn respond(self, delay_ms: u64, result: Result<AuthToken, u16>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back((Duration::from_millis(delay_ms), result));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationProvider for FakeAuthorization {
    async fn fetch_token(&self) -> Result<AuthToken, AuthorizationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result.map_err(AuthorizationError::Status)
            }
            None => Ok(token()),
        }
    }
}

/// In-memory gateway counting calls, optionally failing every save.
#[derive(Default)]
pub struct CountingGateway {
    store: InMemoryScoreStore,
    calls: AtomicUsize,
    fail: bool,
    delay: Duration,
}

impl CountingGateway {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Answer every save only after `ms`.
    pub fn delayed(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &InMemoryScoreStore {
        &self.store
    }
}

#[async_trait]
impl PersistenceGateway for CountingGateway {
    async fn save_score(
        &self,
        submission: ScoreSubmission,
    ) -> Result<ScoreSummary, PersistenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(PersistenceError::Transport("503 Service Unavailable".to_string()));
        }
        self.store.save_score(submission).await
    }
}

/// Microphone logging `"acquire"` and `"release"` in completion order.
#[derive(Default)]
pub struct FakeMicrophone {
    denied: bool,
    releases: AtomicUsize,
    release_delay: Duration,
    log: Mutex<Vec<&'static str>>,
}

impl FakeMicrophone {
    pub fn slow_release(ms: u64) -> Self {
        Self {
            release_delay: Duration::from_millis(ms),
            ..Self::default()
        }
    }

    pub fn log(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }

    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::default()
        }
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Microphone for FakeMicrophone {
    async fn acquire(&self) -> Result<(), MicrophoneError> {
        self.log.lock().unwrap().push("acquire");
        if self.denied {
            Err(MicrophoneError::Denied)
        } else {
            Ok(())
        }
    }

    async fn release(&self) {
        if !self.release_delay.is_zero() {
            tokio::time::sleep(self.release_delay).await;
        }
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push("release");
    }
}

#[derive(Default)]
pub struct FakePlayer {
    blocked: bool,
    plays: Mutex<Vec<(String, u32)>>,
    stops: AtomicUsize,
}

impl FakePlayer {
    pub fn blocked() -> Self {
        Self {
            blocked: true,
            ..Self::default()
        }
    }

    pub fn plays(&self) -> Vec<(String, u32)> {
        self.plays.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SamplePlayer for FakePlayer {
    async fn play(&self, url: &str, repetitions: u32) -> Result<(), PlaybackError> {
        self.plays.lock().unwrap().push((url.to_string(), repetitions));
        if self.blocked {
            return Err(PlaybackError::Blocked);
        }
        tokio::time::sleep(Duration::from_millis(SAMPLE_MS * u64::from(repetitions))).await;
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fakes wired into a running driver.
pub struct TestHarness {
    pub driver: DriverHandle,
    pub recognizer: Arc<FakeRecognizer>,
    pub authorization: Arc<FakeAuthorization>,
    pub gateway: Arc<CountingGateway>,
    pub microphone: Arc<FakeMicrophone>,
    pub player: Arc<FakePlayer>,
}

/// Builder for [`TestHarness`], defaulting every collaborator to a happy fake.
#[derive(Default)]
pub struct TestHarnessBuilder {
    recognizer: FakeRecognizer,
    authorization: FakeAuthorization,
    gateway: CountingGateway,
    microphone: FakeMicrophone,
    player: FakePlayer,
}

impl TestHarnessBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recognizer(mut self, recognizer: FakeRecognizer) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn authorization(mut self, authorization: FakeAuthorization) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn gateway(mut self, gateway: CountingGateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn microphone(mut self, microphone: FakeMicrophone) -> Self {
        self.microphone = microphone;
        self
    }

    pub fn player(mut self, player: FakePlayer) -> Self {
        self.player = player;
        self
    }

    pub fn spawn(self) -> TestHarness {
        let recognizer = Arc::new(self.recognizer);
        let authorization = Arc::new(self.authorization);
        let gateway = Arc::new(self.gateway);
        let microphone = Arc::new(self.microphone);
        let player = Arc::new(self.player);

        let ports = Ports {
            recognizer: recognizer.clone(),
            authorization: authorization.clone(),
            gateway: gateway.clone(),
            microphone: microphone.clone(),
            player: player.clone(),
        };

        TestHarness {
            driver: AttemptDriver::spawn(ports, SessionConfig::default()),
            recognizer,
            authorization,
            gateway,
            microphone,
            player,
        }
    }
}

/// Sleep on the (paused) test clock.
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
