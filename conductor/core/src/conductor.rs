//! Conductor - Session Orchestration
//!
//! The Conductor ties the pet together. It talks to the pet server, keeps the
//! session, drives the [`MoodMachine`], runs the device heartbeat and wraps
//! every server round trip in a reveal so the "thinking" ellipsis always
//! plays at least one full cycle.
//!
//! # Flows
//!
//! ```text
//! login(name)  ──▶ AuthService ──▶ session, greeting, health mood, heartbeat
//! chat(text)   ──▶ reveal + ChatService ──▶ flow marker, upload prompt, reply
//! feed(photo)  ──▶ reveal + FeedService ──▶ reply, health, maybe reward
//! logout()     ──▶ stop heartbeat, cancel reveals, reset mood, drop session
//! ```
//!
//! The Conductor is surface-agnostic: everything visible goes through the
//! [`PetDisplay`] it was built with.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{
    AuthService, ChatRequest, ChatService, FeedRequest, FeedService, LoginRequest,
};
use crate::device::DeviceNotifier;
use crate::display::PetDisplay;
use crate::health::{HealthReading, MAX_HEALTH, SAD_THRESHOLD};
use crate::machine::{MoodMachine, DEFAULT_REWARD_GRACE};
use crate::mood::{Mood, StateTable};
use crate::rendezvous::{Rendezvous, RendezvousHandle, DEFAULT_TICK};
use crate::session::{Session, SessionId};
use crate::timer;

/// Reply shown when the chat request fails
pub const CHAT_FALLBACK: &str = " ｢('◉⌓◉')ﾂ  Your question makes my head spin! ";

/// Reply shown when the photo upload fails
pub const FEED_FALLBACK: &str = "Error uploading image";

/// Reply shown when the server answers without any text
pub const NO_RESPONSE: &str = "No response";

/// Echo shown for a photo upload
const FEED_ECHO: &str = "I can see it!";

/// Conductor configuration
#[derive(Clone, Debug)]
pub struct ConductorConfig {
    /// Health assumed when the server does not report one
    pub default_health: i64,
    /// How long a feeding reward keeps the pet happy
    pub reward_grace: Duration,
    /// Reveal animation tick
    pub reveal_tick: Duration,
    /// Give up on a server reply after this long (`None` waits forever)
    pub reveal_timeout: Option<Duration>,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            default_health: MAX_HEALTH,
            reward_grace: DEFAULT_REWARD_GRACE,
            reveal_tick: DEFAULT_TICK,
            reveal_timeout: None,
        }
    }
}

/// The server-side collaborators
#[derive(Clone)]
pub struct Services {
    /// Account login
    pub auth: Arc<dyn AuthService>,
    /// Chat replies
    pub chat: Arc<dyn ChatService>,
    /// Photo feeding
    pub feed: Arc<dyn FeedService>,
}

impl Services {
    /// Use one backend for all three services
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AuthService + ChatService + FeedService + 'static,
    {
        Self {
            auth: backend.clone(),
            chat: backend.clone(),
            feed: backend,
        }
    }
}

/// Errors from conductor operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConductorError {
    /// Login attempted with a blank name
    #[error("username must not be empty")]
    EmptyUsername,

    /// Chat attempted with blank text
    #[error("message must not be empty")]
    EmptyInput,

    /// Operation needs a logged-in session
    #[error("no active session")]
    NoSession,
}

/// Result of a login attempt the server answered
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Session started
    Accepted {
        /// New session ID
        session_id: SessionId,
        /// Short status line from the server
        message: String,
    },
    /// Server refused, or could not be reached
    Rejected(String),
}

/// The Conductor - headless orchestration core
pub struct Conductor {
    config: ConductorConfig,
    services: Services,
    display: Arc<dyn PetDisplay>,
    machine: MoodMachine,
    notifier: DeviceNotifier,
    session: Arc<Mutex<Option<Session>>>,
    reveals: Mutex<Vec<RendezvousHandle<String>>>,
}

impl Conductor {
    /// Create a new Conductor
    ///
    /// Mood signals flow to `notifier`; everything visible goes to `display`.
    pub fn new(
        config: ConductorConfig,
        services: Services,
        display: Arc<dyn PetDisplay>,
        notifier: DeviceNotifier,
        table: Arc<StateTable>,
    ) -> Self {
        let machine = MoodMachine::new(table, display.clone(), Arc::new(notifier.clone()));
        Self {
            config,
            services,
            display,
            machine,
            notifier,
            session: Arc::new(Mutex::new(None)),
            reveals: Mutex::new(Vec::new()),
        }
    }

    /// The mood machine
    pub fn machine(&self) -> &MoodMachine {
        &self.machine
    }

    /// The device notifier
    pub fn notifier(&self) -> &DeviceNotifier {
        &self.notifier
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Option<Session> {
        self.session.lock().clone()
    }

    /// Whether someone is logged in
    pub fn is_logged_in(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Log in (or register) and start the game
    ///
    /// Server refusals and transport errors come back as
    /// [`LoginOutcome::Rejected`]; only a blank name is an error.
    pub async fn login(&self, username: &str) -> Result<LoginOutcome, ConductorError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ConductorError::EmptyUsername);
        }

        let request = LoginRequest {
            username: username.to_string(),
        };
        let response = match self.services.auth.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(username, error = %e, "Login request failed");
                return Ok(LoginOutcome::Rejected("Connection error".to_string()));
            }
        };

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "Login failed".to_string());
            info!(username, reason = %message, "Login rejected");
            return Ok(LoginOutcome::Rejected(message));
        }

        self.logout();

        let health = HealthReading::new(response.health.unwrap_or(self.config.default_health));
        let session = Session::new(username, response.user_id, health);
        let session_id = session.id.clone();
        *self.session.lock() = Some(session);

        if let Some(greeting) = &response.chat_greeting {
            self.display.show_greeting(&format!("> {greeting}"));
        }
        // The reading picks the opening mood, so a sad pet never flashes happy
        self.machine.apply_health(health);
        self.notifier
            .start_heartbeat(self.machine.subscribe(), self.machine.table());

        info!(
            session = %session_id,
            username,
            health = health.raw(),
            "Session started"
        );
        Ok(LoginOutcome::Accepted {
            session_id,
            message: response.message.unwrap_or_default(),
        })
    }

    /// Send a chat message; the reply is revealed on a new reply line
    ///
    /// Returns immediately. The returned handle can be used to cancel the
    /// reveal; dropping it does not.
    pub fn chat(&self, text: &str) -> Result<RendezvousHandle<String>, ConductorError> {
        if text.trim().is_empty() {
            return Err(ConductorError::EmptyInput);
        }

        let (request, session_id) = {
            let guard = self.session.lock();
            let session = guard.as_ref().ok_or(ConductorError::NoSession)?;
            let request = ChatRequest {
                input: text.to_string(),
                conversation_state: session.conversation_state,
                username: session.username.clone(),
            };
            (request, session.id.clone())
        };

        self.display.show_user_input(&format!("> {text}"));
        let reveal = self.start_reveal();

        let chat = self.services.chat.clone();
        let sessions = self.session.clone();
        let display = self.display.clone();
        let timeout = self.config.reveal_timeout;
        let handle = reveal.clone();

        tokio::spawn(async move {
            let reply = match timer::bounded(timeout, chat.chat(&request)).await {
                Some(Ok(response)) => {
                    let changed = with_session(&sessions, &session_id, |session| {
                        session.apply_chat_flags(
                            response.conversation_state,
                            response.show_upload,
                            response.hide_upload,
                        )
                    })
                    .flatten();
                    if let Some(visible) = changed {
                        display.set_upload_prompt(visible);
                    }
                    response
                        .response
                        .unwrap_or_else(|| NO_RESPONSE.to_string())
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Chat request failed");
                    CHAT_FALLBACK.to_string()
                }
                None => {
                    warn!(timeout_ms = ?timeout.map(|t| t.as_millis()), "Chat request timed out");
                    CHAT_FALLBACK.to_string()
                }
            };
            handle.deliver(reply);
        });

        Ok(reveal)
    }

    /// Feed the pet a photo
    ///
    /// Returns immediately, like [`Conductor::chat`]. When the pet was sad,
    /// the food is healthy and health is still in the sad range, the pet gets
    /// a short happy reward before turning sad again.
    pub fn feed(
        &self,
        image: Vec<u8>,
        filename: impl Into<String>,
    ) -> Result<RendezvousHandle<String>, ConductorError> {
        let (request, session_id) = {
            let guard = self.session.lock();
            let session = guard.as_ref().ok_or(ConductorError::NoSession)?;
            let request = FeedRequest {
                image,
                filename: filename.into(),
                username: session.username.clone(),
            };
            (request, session.id.clone())
        };

        self.display.show_user_input(&format!("> {FEED_ECHO}"));
        let reveal = self.start_reveal();

        let feed = self.services.feed.clone();
        let sessions = self.session.clone();
        let display = self.display.clone();
        let machine = self.machine.clone();
        let timeout = self.config.reveal_timeout;
        let grace = self.config.reward_grace;
        let handle = reveal.clone();

        tokio::spawn(async move {
            let outcome = timer::bounded(timeout, feed.feed(&request)).await;

            let response = match outcome {
                Some(Ok(response)) => {
                    handle.deliver(
                        response
                            .response
                            .clone()
                            .unwrap_or_else(|| NO_RESPONSE.to_string()),
                    );
                    Some(response)
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Feed request failed");
                    handle.deliver(FEED_FALLBACK.to_string());
                    None
                }
                None => {
                    warn!(timeout_ms = ?timeout.map(|t| t.as_millis()), "Feed request timed out");
                    handle.deliver(FEED_FALLBACK.to_string());
                    None
                }
            };

            // Runs under the session lock: logout takes that lock before it
            // resets the machine, so a stale reply can never outlive it
            let applied = with_session(&sessions, &session_id, |session| {
                session.finish_feeding();
                display.set_upload_prompt(false);

                let Some(response) = response else {
                    return;
                };
                let was_sad = machine.current() == Mood::Sad;
                if let Some(raw) = response.health {
                    session.health = HealthReading::new(raw);
                    machine.apply_health(session.health);
                }
                let deserves_reward = was_sad
                    && response.is_healthy_food == Some(true)
                    && response.health.is_some_and(|h| h <= SAD_THRESHOLD);
                if deserves_reward {
                    info!(health = ?response.health, "Healthy food while sad, rewarding");
                    machine.reward(grace);
                }
            });
            if applied.is_none() {
                debug!("Session ended before feed reply, ignoring");
            }
        });

        Ok(reveal)
    }

    /// End the session
    ///
    /// Harmless when nobody is logged in.
    pub fn logout(&self) {
        let Some(session) = self.session.lock().take() else {
            return;
        };

        self.notifier.stop_heartbeat();
        for reveal in self.reveals.lock().drain(..) {
            reveal.cancel();
        }
        self.machine.reset();
        info!(session = %session.id, username = %session.username, "Session ended");
    }

    fn start_reveal(&self) -> RendezvousHandle<String> {
        let line = self.display.open_reply();
        let target = line.clone();
        let reveal = Rendezvous::start(line, self.config.reveal_tick, move |text: String| {
            target.finish(&format!("> {text}"));
        });

        let mut reveals = self.reveals.lock();
        reveals.retain(|r| !r.is_done());
        reveals.push(reveal.clone());
        reveal
    }
}

impl Drop for Conductor {
    fn drop(&mut self) {
        self.logout();
    }
}

/// Run `f` on the session only if it is still the one identified by `id`
fn with_session<R>(
    sessions: &Mutex<Option<Session>>,
    id: &SessionId,
    f: impl FnOnce(&mut Session) -> R,
) -> Option<R> {
    let mut guard = sessions.lock();
    match guard.as_mut() {
        Some(session) if &session.id == id => Some(f(session)),
        _ => None,
    }
}
