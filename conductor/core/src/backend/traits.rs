//! Service Traits and Wire Types
//!
//! The pet's server owns accounts, chat generation, food classification and
//! health storage. The conductor only talks to it through these three traits,
//! so tests (and alternative servers) can stand in for the HTTP client.
//!
//! Optional response fields stay `None` when the server omits them. Callers
//! treat `None` as "no change", never as zero or false.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors talking to the pet server
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport failure (connect, timeout, TLS)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status with a body that is not a service response
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Success status but the body did not parse
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where the chat flow currently is
///
/// The server drives this marker; the conductor just hands it back on the
/// next chat request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Free conversation
    #[default]
    Initial,
    /// Pet asked what the user ate
    AwaitingDescription,
    /// Pet asked for a photo
    AwaitingImage,
}

impl ConversationState {
    /// Wire name of the marker
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::AwaitingDescription => "awaiting_description",
            Self::AwaitingImage => "awaiting_image",
        }
    }

    fn from_marker(marker: &str) -> Self {
        match marker {
            "awaiting_description" => Self::AwaitingDescription,
            "awaiting_image" => Self::AwaitingImage,
            _ => Self::Initial,
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unknown markers fall back to the start of the flow instead of failing the
// whole response.
impl<'de> Deserialize<'de> for ConversationState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let marker = String::deserialize(deserializer)?;
        Ok(Self::from_marker(&marker))
    }
}

/// Login (or first-time registration) request
#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest {
    /// Account name
    pub username: String,
}

/// Login response
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoginResponse {
    /// Whether the login succeeded
    #[serde(default)]
    pub success: bool,
    /// Short status line for the login screen
    #[serde(default)]
    pub message: Option<String>,
    /// Server-side user id
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Stored health, if the server reports one
    #[serde(default)]
    pub health: Option<i64>,
    /// Longer greeting for the conversation view
    #[serde(default)]
    pub chat_greeting: Option<String>,
}

/// One chat turn
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    /// What the user typed
    pub input: String,
    /// Flow marker from the previous response
    pub conversation_state: ConversationState,
    /// Account name
    pub username: String,
}

/// The pet's chat reply
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatResponse {
    /// Reply text
    #[serde(default)]
    pub response: Option<String>,
    /// New flow marker, if it changed
    #[serde(default)]
    pub conversation_state: Option<ConversationState>,
    /// Ask the surface to show the upload prompt
    #[serde(default)]
    pub show_upload: Option<bool>,
    /// Ask the surface to hide the upload prompt
    #[serde(default)]
    pub hide_upload: Option<bool>,
}

/// A food photo for the pet
#[derive(Clone, Debug)]
pub struct FeedRequest {
    /// Raw image bytes
    pub image: Vec<u8>,
    /// Original file name (used for the multipart part)
    pub filename: String,
    /// Account name
    pub username: String,
}

/// Result of feeding the pet
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FeedResponse {
    /// Reply text
    #[serde(default)]
    pub response: Option<String>,
    /// Updated health, if the server changed it
    #[serde(default)]
    pub health: Option<i64>,
    /// Classifier verdict on the food
    #[serde(default)]
    pub is_healthy_food: Option<bool>,
}

/// Account login
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Log in, registering the account on first use
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ServiceError>;
}

/// Conversational replies
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Send one chat turn
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError>;
}

/// Food photo classification and health update
#[async_trait]
pub trait FeedService: Send + Sync {
    /// Upload a photo
    async fn feed(&self, request: &FeedRequest) -> Result<FeedResponse, ServiceError>;
}
