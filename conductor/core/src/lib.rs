//! Conductor Core - Headless Mood Engine for the tomo Virtual Pet
//!
//! This crate holds everything the pet does that is not drawing: the mood
//! state machine with its timed transition animations, the best-effort
//! device notifier that mirrors mood to the physical actuator, and the
//! reveal rendezvous that keeps the "thinking" ellipsis honest.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Surfaces (PetDisplay)                      │
//! │           terminal daemon  │  web view  │  test recorders        │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │ show_animation / open_reply / ...
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                       CONDUCTOR CORE                             │
//! │  ┌───────────────────────────┴────────────────────────────────┐  │
//! │  │                         Conductor                          │  │
//! │  │  ┌──────────┐  ┌─────────────┐  ┌────────────┐  ┌────────┐  │  │
//! │  │  │ Session  │  │ MoodMachine │  │ Rendezvous │  │Services│  │  │
//! │  │  └──────────┘  └──────┬──────┘  └────────────┘  └────────┘  │  │
//! │  └───────────────────────┼────────────────────────────────────┘  │
//! │                          │ SignalCode                            │
//! │                  ┌───────┴────────┐                              │
//! │                  │ DeviceNotifier │──▶ DeviceLink (udp / relay)  │
//! │                  └────────────────┘                              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tomo_conductor::{
//!     load_config, Conductor, DeviceNotifier, HttpBackend, Services,
//! };
//!
//! let config = load_config()?;
//! let backend = Arc::new(HttpBackend::new(&config.backend_url, config.backend_timeout)?);
//! let notifier = DeviceNotifier::new(config.device_link()?, config.notifier_config());
//! let conductor = Conductor::new(
//!     config.conductor_config(),
//!     Services::from_backend(backend),
//!     display,
//!     notifier,
//!     Arc::new(config.state_table()),
//! );
//!
//! conductor.login("rat").await?;
//! conductor.chat("what should I eat?")?;
//! ```
//!
//! # Module Overview
//!
//! - [`mood`]: Moods, signal codes, and the transition table
//! - [`health`]: Health readings and the mood threshold
//! - [`timer`]: Cancellable timers (the only place that sleeps)
//! - [`display`]: Rendering sinks implemented by surfaces
//! - [`machine`]: The mood state machine
//! - [`device`]: Actuator links and the device notifier
//! - [`rendezvous`]: The two-condition reveal primitive
//! - [`backend`]: Pet server traits and the HTTP client
//! - [`session`]: Logged-in session state
//! - [`conductor`]: Main Conductor struct
//! - [`config`]: TOML/env/CLI configuration
//!
//! # No UI Dependencies
//!
//! Nothing here draws. Surfaces implement [`PetDisplay`] and render however
//! they like.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod conductor;
pub mod config;
pub mod device;
pub mod display;
pub mod health;
pub mod machine;
pub mod mood;
pub mod rendezvous;
pub mod session;
pub mod timer;

// Re-exports for convenience
pub use backend::{
    AuthService, ChatRequest, ChatResponse, ChatService, ConversationState, FeedRequest,
    FeedResponse, FeedService, HttpBackend, LoginRequest, LoginResponse, ServiceError,
};
pub use conductor::{
    Conductor, ConductorConfig, ConductorError, LoginOutcome, Services, CHAT_FALLBACK,
    FEED_FALLBACK, NO_RESPONSE,
};
pub use device::{
    DeviceError, DeviceLink, DeviceNotifier, DisabledLink, HttpRelayLink, NotifierConfig,
    SignalSink, UdpLink,
};
pub use display::{PetDisplay, TextTarget};
pub use health::{HealthReading, MAX_HEALTH, SAD_THRESHOLD};
pub use machine::{MoodMachine, DEFAULT_REWARD_GRACE};
pub use mood::{
    InvalidSignalCode, Mood, MoodDisplay, SignalCode, StateTable, TransitionDescriptor,
    UnknownMood, DEFAULT_TRANSITION_DURATION,
};
pub use rendezvous::{Rendezvous, RendezvousHandle, RendezvousPhase, DEFAULT_TICK};
pub use session::{Session, SessionId};
pub use timer::TimerHandle;

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with_env,
    ConfigError, ConfigOverrides, ConfigSource, LinkKind, TomoConfig, TomoToml,
};
