//! Shared fixtures for the integration tests
//!
//! Everything here records what the core did so tests can assert on it:
//! a display that keeps every animation and reply frame, a device link that
//! keeps every signal, and a scripted pet server with per-call latency.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time;

use tomo_conductor::{
    AuthService, ChatRequest, ChatResponse, ChatService, Conductor, ConductorConfig, DeviceError,
    DeviceLink, DeviceNotifier, FeedRequest, FeedResponse, FeedService, HealthReading,
    LoginRequest, LoginResponse, NotifierConfig, PetDisplay, ServiceError, Services, SignalCode,
    SignalSink, StateTable, TextTarget,
};

/// Step granularity for the paused clock; every duration in the tests is a
/// multiple of this, so no interval tick is ever skipped
pub const STEP_MS: u64 = 100;

/// Let spawned tasks run without moving the clock
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock by `ms`, one step at a time
pub async fn run_for(ms: u64) {
    assert_eq!(ms % STEP_MS, 0, "durations must be multiples of {STEP_MS} ms");
    settle().await;
    for _ in 0..ms / STEP_MS {
        time::advance(Duration::from_millis(STEP_MS)).await;
        settle().await;
    }
}

// =============================================================================
// Display
// =============================================================================

/// One reply slot
#[derive(Default)]
pub struct RecordingLine {
    pub history: Mutex<Vec<String>>,
}

impl RecordingLine {
    pub fn last(&self) -> Option<String> {
        self.history.lock().last().cloned()
    }
}

impl TextTarget for RecordingLine {
    fn set_text(&self, text: &str) {
        self.history.lock().push(text.to_string());
    }
}

#[derive(Default)]
pub struct RecordingDisplay {
    pub animations: Mutex<Vec<String>>,
    pub health: Mutex<Vec<i64>>,
    pub greetings: Mutex<Vec<String>>,
    pub upload_prompt: Mutex<Vec<bool>>,
    pub user_inputs: Mutex<Vec<String>>,
    pub replies: Mutex<Vec<Arc<RecordingLine>>>,
    /// Block the calling thread this long on every upload prompt change
    pub upload_prompt_stall: Mutex<Option<Duration>>,
}

impl RecordingDisplay {
    pub fn reply(&self, index: usize) -> Arc<RecordingLine> {
        self.replies.lock()[index].clone()
    }

    pub fn last_animation(&self) -> Option<String> {
        self.animations.lock().last().cloned()
    }
}

impl PetDisplay for RecordingDisplay {
    fn show_animation(&self, animation: &str) {
        self.animations.lock().push(animation.to_string());
    }

    fn show_health(&self, health: &HealthReading) {
        self.health.lock().push(health.clamped());
    }

    fn show_greeting(&self, greeting: &str) {
        self.greetings.lock().push(greeting.to_string());
    }

    fn set_upload_prompt(&self, visible: bool) {
        self.upload_prompt.lock().push(visible);
        let stall = *self.upload_prompt_stall.lock();
        if let Some(stall) = stall {
            std::thread::sleep(stall);
        }
    }

    fn show_user_input(&self, text: &str) {
        self.user_inputs.lock().push(text.to_string());
    }

    fn open_reply(&self) -> Arc<dyn TextTarget> {
        let line = Arc::new(RecordingLine::default());
        self.replies.lock().push(line.clone());
        line
    }
}

// =============================================================================
// Device
// =============================================================================

/// Signal sink that records synchronously (machine-level tests)
#[derive(Default)]
pub struct RecordingSink {
    pub signals: Mutex<Vec<SignalCode>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<SignalCode> {
        std::mem::take(&mut *self.signals.lock())
    }
}

impl SignalSink for RecordingSink {
    fn emit(&self, code: SignalCode) {
        self.signals.lock().push(code);
    }
}

/// Device link that records what reached the "board"
#[derive(Default)]
pub struct RecordingLink {
    pub sent: Mutex<Vec<SignalCode>>,
}

impl RecordingLink {
    pub fn take(&self) -> Vec<SignalCode> {
        std::mem::take(&mut *self.sent.lock())
    }
}

#[async_trait]
impl DeviceLink for RecordingLink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, code: SignalCode) -> Result<(), DeviceError> {
        self.sent.lock().push(code);
        Ok(())
    }
}

// =============================================================================
// Pet server
// =============================================================================

/// What a scripted call does
pub enum Outcome<T> {
    Reply(T),
    Fail,
    Hang,
}

/// A scripted call: wait `delay`, then do `outcome`
pub struct Scripted<T> {
    pub delay: Duration,
    pub outcome: Outcome<T>,
}

impl<T> Scripted<T> {
    pub fn reply(delay_ms: u64, value: T) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            outcome: Outcome::Reply(value),
        }
    }

    pub fn fail(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            outcome: Outcome::Fail,
        }
    }

    pub fn hang() -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::Hang,
        }
    }

    async fn run(self) -> Result<T, ServiceError> {
        if !self.delay.is_zero() {
            time::sleep(self.delay).await;
        }
        match self.outcome {
            Outcome::Reply(value) => Ok(value),
            Outcome::Fail => Err(ServiceError::Status {
                status: 500,
                body: "boom".to_string(),
            }),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    pub logins: Mutex<VecDeque<Scripted<LoginResponse>>>,
    pub chats: Mutex<VecDeque<Scripted<ChatResponse>>>,
    pub feeds: Mutex<VecDeque<Scripted<FeedResponse>>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub feed_requests: Mutex<Vec<FeedRequest>>,
}

impl ScriptedBackend {
    pub fn push_login(&self, script: Scripted<LoginResponse>) {
        self.logins.lock().push_back(script);
    }

    pub fn push_chat(&self, script: Scripted<ChatResponse>) {
        self.chats.lock().push_back(script);
    }

    pub fn push_feed(&self, script: Scripted<FeedResponse>) {
        self.feeds.lock().push_back(script);
    }
}

#[async_trait]
impl AuthService for ScriptedBackend {
    async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse, ServiceError> {
        let script = self.logins.lock().pop_front().unwrap_or_else(|| Scripted::fail(0));
        script.run().await
    }
}

#[async_trait]
impl ChatService for ScriptedBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        self.chat_requests.lock().push(request.clone());
        let script = self.chats.lock().pop_front().unwrap_or_else(|| Scripted::fail(0));
        script.run().await
    }
}

#[async_trait]
impl FeedService for ScriptedBackend {
    async fn feed(&self, request: &FeedRequest) -> Result<FeedResponse, ServiceError> {
        self.feed_requests.lock().push(request.clone());
        let script = self.feeds.lock().pop_front().unwrap_or_else(|| Scripted::fail(0));
        script.run().await
    }
}

/// Successful login reporting `health`
pub fn login_ok(health: Option<i64>) -> LoginResponse {
    LoginResponse {
        success: true,
        message: Some("Welcome back!".to_string()),
        user_id: Some(1),
        health,
        chat_greeting: Some("Squeak! Missed you.".to_string()),
    }
}

pub fn chat_reply(text: &str) -> ChatResponse {
    ChatResponse {
        response: Some(text.to_string()),
        ..Default::default()
    }
}

pub fn feed_reply(text: &str, health: Option<i64>, healthy: Option<bool>) -> FeedResponse {
    FeedResponse {
        response: Some(text.to_string()),
        health,
        is_healthy_food: healthy,
    }
}

// =============================================================================
// Full stack
// =============================================================================

pub struct Harness {
    pub conductor: Conductor,
    pub display: Arc<RecordingDisplay>,
    pub link: Arc<RecordingLink>,
    pub backend: Arc<ScriptedBackend>,
}

/// Heartbeat long enough to stay out of scenario assertions
pub const QUIET_HEARTBEAT: Duration = Duration::from_secs(3600);

/// Build a conductor over recording fakes; must run inside a runtime
pub fn harness(config: ConductorConfig, heartbeat_interval: Duration) -> Harness {
    let display = Arc::new(RecordingDisplay::default());
    let link = Arc::new(RecordingLink::default());
    let backend = Arc::new(ScriptedBackend::default());

    let notifier = DeviceNotifier::new(
        link.clone(),
        NotifierConfig {
            heartbeat_interval,
            ..Default::default()
        },
    );
    let conductor = Conductor::new(
        config,
        Services::from_backend(backend.clone()),
        display.clone(),
        notifier,
        Arc::new(StateTable::default()),
    );

    Harness {
        conductor,
        display,
        link,
        backend,
    }
}
