//! Session State
//!
//! A session is the span between a successful login and logout. It holds
//! everything the conductor remembers about the logged-in user; nothing is
//! persisted, the server owns durable state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::ConversationState;
use crate::health::HealthReading;

/// Session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new unique session ID
    pub fn new() -> Self {
        Self(format!("session_{}", Uuid::new_v4()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A logged-in user's state
#[derive(Clone, Debug)]
pub struct Session {
    /// Unique session ID
    pub id: SessionId,
    /// Account name
    pub username: String,
    /// Server-side user id, if reported
    pub user_id: Option<i64>,
    /// Last health applied to the pet
    pub health: HealthReading,
    /// Chat flow marker sent with the next chat request
    pub conversation_state: ConversationState,
    /// Whether the upload prompt is showing
    pub upload_prompt: bool,
    /// When the session started (Unix timestamp ms)
    pub created_at: u64,
}

impl Session {
    /// Start a session for `username`
    pub fn new(username: impl Into<String>, user_id: Option<i64>, health: HealthReading) -> Self {
        Self {
            id: SessionId::new(),
            username: username.into(),
            user_id,
            health,
            conversation_state: ConversationState::Initial,
            upload_prompt: false,
            created_at: now_ms(),
        }
    }

    /// Adopt the fields a chat reply carries; absent fields leave state alone
    ///
    /// Returns the new upload prompt visibility when it changed.
    pub fn apply_chat_flags(
        &mut self,
        conversation_state: Option<ConversationState>,
        show_upload: Option<bool>,
        hide_upload: Option<bool>,
    ) -> Option<bool> {
        if let Some(state) = conversation_state {
            self.conversation_state = state;
        }

        let before = self.upload_prompt;
        if show_upload == Some(true) {
            self.upload_prompt = true;
        }
        if hide_upload == Some(true) {
            self.upload_prompt = false;
        }
        (self.upload_prompt != before).then_some(self.upload_prompt)
    }

    /// Reset the chat flow after a photo upload
    pub fn finish_feeding(&mut self) {
        self.conversation_state = ConversationState::Initial;
        self.upload_prompt = false;
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
