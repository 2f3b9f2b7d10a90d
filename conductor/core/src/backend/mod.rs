//! Pet Server Integration
//!
//! Access to the externally owned services (accounts, chat, feeding) through
//! a common set of async traits.
//!
//! # Usage
//!
//! ```ignore
//! use tomo_conductor::backend::{AuthService, HttpBackend, LoginRequest};
//!
//! let backend = HttpBackend::new("http://localhost:5000", Duration::from_secs(30))?;
//! let response = backend.login(&LoginRequest { username: "rat".into() }).await?;
//! ```

mod http;
mod traits;

pub use http::HttpBackend;
pub use traits::{
    AuthService, ChatRequest, ChatResponse, ChatService, ConversationState, FeedRequest,
    FeedResponse, FeedService, LoginRequest, LoginResponse, ServiceError,
};
