//! HTTP Client for the Pet Server
//!
//! # Routes
//!
//! - `POST /api/login` - JSON `{username}`
//! - `POST /api/gemini` - JSON `{input, conversation_state, username}`
//! - `POST /api/feed` - multipart with an `image` file part and `username`
//!
//! The server reports user-facing errors as JSON bodies on 4xx/5xx responses
//! (`{"response": "No input provided."}`), so a body that parses is returned
//! even when the status is not a success. Only an undecodable error body
//! becomes [`ServiceError::Status`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::traits::{
    AuthService, ChatRequest, ChatResponse, ChatService, FeedRequest, FeedResponse, FeedService,
    LoginRequest, LoginResponse, ServiceError,
};

/// reqwest-backed implementation of all three services
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Server base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.base_url)
    }
}

async fn decode<T: DeserializeOwned>(
    route: &str,
    response: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<T>(&body) {
        Ok(parsed) => {
            if !status.is_success() {
                warn!(route, status = status.as_u16(), "Server reported an error");
            }
            Ok(parsed)
        }
        Err(_) if !status.is_success() => Err(ServiceError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(ServiceError::Decode(e)),
    }
}

#[async_trait]
impl AuthService for HttpBackend {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ServiceError> {
        debug!(username = %request.username, "POST /api/login");
        let response = self
            .http_client
            .post(self.url("/api/login"))
            .json(request)
            .send()
            .await?;
        decode("/api/login", response).await
    }
}

#[async_trait]
impl ChatService for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        debug!(state = %request.conversation_state, "POST /api/gemini");
        let response = self
            .http_client
            .post(self.url("/api/gemini"))
            .json(request)
            .send()
            .await?;
        decode("/api/gemini", response).await
    }
}

#[async_trait]
impl FeedService for HttpBackend {
    async fn feed(&self, request: &FeedRequest) -> Result<FeedResponse, ServiceError> {
        debug!(
            filename = %request.filename,
            bytes = request.image.len(),
            "POST /api/feed"
        );
        let image = Part::bytes(request.image.clone()).file_name(request.filename.clone());
        let form = Form::new()
            .part("image", image)
            .text("username", request.username.clone());

        let response = self
            .http_client
            .post(self.url("/api/feed"))
            .multipart(form)
            .send()
            .await?;
        decode("/api/feed", response).await
    }
}
