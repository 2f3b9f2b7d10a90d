//! TOML Configuration File Support
//!
//! Centralized configuration loading for the pet, from a TOML file at
//! `~/.config/tomo/conductor.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables (`TOMO_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/tomo/conductor.toml` (typically `~/.config/tomo/conductor.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [device]
//! address = "10.87.41.107"
//! port = 5005
//! link = "relay"                # udp | relay | disabled
//! heartbeat_interval_ms = 5000
//!
//! [backend]
//! base_url = "http://localhost:5000"
//! timeout_ms = 30000
//!
//! [timing]
//! tick_ms = 400
//! transition_ms = 1500
//! reward_grace_ms = 3000
//!
//! [session]
//! default_health = 20
//! reveal_timeout_ms = 0         # 0 = wait forever
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conductor::ConductorConfig;
use crate::device::{DeviceError, DeviceLink, DisabledLink, HttpRelayLink, NotifierConfig, UdpLink};
use crate::health::MAX_HEALTH;
use crate::mood::{StateTable, DEFAULT_TRANSITION_DURATION};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// How signals reach the actuator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Single-byte datagrams straight to the board
    Udp,
    /// Through the pet server's relay endpoint
    #[default]
    Relay,
    /// Signals are discarded
    Disabled,
}

impl FromStr for LinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(Self::Udp),
            "relay" | "http" => Ok(Self::Relay),
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            other => Err(ConfigError::ValidationError(format!(
                "unknown device link '{other}' (expected udp, relay or disabled)"
            ))),
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Udp => "udp",
            Self::Relay => "relay",
            Self::Disabled => "disabled",
        })
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Device section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceToml {
    /// Actuator address
    pub address: Option<String>,
    /// Actuator port
    pub port: Option<u16>,
    /// Link kind
    pub link: Option<LinkKind>,
    /// Heartbeat period in milliseconds
    pub heartbeat_interval_ms: Option<u64>,
    /// Signals buffered ahead of the link
    pub queue_capacity: Option<usize>,
}

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Pet server base URL
    pub base_url: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Timing section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingToml {
    /// Reveal animation tick in milliseconds
    pub tick_ms: Option<u64>,
    /// Duration applied to every transition in milliseconds
    pub transition_ms: Option<u64>,
    /// Feeding reward length in milliseconds
    pub reward_grace_ms: Option<u64>,
}

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Health assumed when login reports none
    pub default_health: Option<i64>,
    /// Reveal timeout in milliseconds (0 = wait forever)
    pub reveal_timeout_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomoToml {
    /// Device section
    pub device: DeviceToml,
    /// Backend section
    pub backend: BackendToml,
    /// Timing section
    pub timing: TimingToml,
    /// Session section
    pub session: SessionToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration
///
/// Use [`load_config`] to load it with proper priority handling.
#[derive(Clone, Debug)]
pub struct TomoConfig {
    /// Actuator address
    pub device_address: String,
    /// Actuator port
    pub device_port: u16,
    /// How signals reach the actuator
    pub device_link: LinkKind,
    /// Heartbeat period
    pub heartbeat_interval: Duration,
    /// Signals buffered ahead of the link
    pub queue_capacity: usize,

    /// Pet server base URL
    pub backend_url: String,
    /// Pet server request timeout
    pub backend_timeout: Duration,

    /// Reveal animation tick
    pub tick: Duration,
    /// Transition duration
    pub transition: Duration,
    /// Feeding reward length
    pub reward_grace: Duration,

    /// Health assumed when login reports none
    pub default_health: i64,
    /// Reveal timeout (`None` = wait forever)
    pub reveal_timeout: Option<Duration>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for TomoConfig {
    fn default() -> Self {
        let notifier = NotifierConfig::default();
        let conductor = ConductorConfig::default();
        Self {
            device_address: "10.87.41.107".to_string(),
            device_port: 5005,
            device_link: LinkKind::default(),
            heartbeat_interval: notifier.heartbeat_interval,
            queue_capacity: notifier.queue_capacity,
            backend_url: "http://localhost:5000".to_string(),
            backend_timeout: Duration::from_secs(30),
            tick: conductor.reveal_tick,
            transition: DEFAULT_TRANSITION_DURATION,
            reward_grace: conductor.reward_grace,
            default_health: MAX_HEALTH,
            reveal_timeout: conductor.reveal_timeout,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl TomoConfig {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that would break timers or links
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero_periods = [
            ("device.heartbeat_interval_ms", self.heartbeat_interval),
            ("backend.timeout_ms", self.backend_timeout),
            ("timing.tick_ms", self.tick),
        ];
        for (key, value) in zero_periods {
            if value.is_zero() {
                return Err(ConfigError::ValidationError(format!("{key} must be greater than 0")));
            }
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "device.queue_capacity must be greater than 0".to_string(),
            ));
        }
        if self.device_link != LinkKind::Disabled {
            if self.device_address.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "device.address must not be empty".to_string(),
                ));
            }
            if self.device_port == 0 {
                return Err(ConfigError::ValidationError(
                    "device.port must not be 0".to_string(),
                ));
            }
        }
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                self.backend_url
            )));
        }
        Ok(())
    }

    /// Notifier settings
    #[must_use]
    pub fn notifier_config(&self) -> NotifierConfig {
        NotifierConfig {
            heartbeat_interval: self.heartbeat_interval,
            queue_capacity: self.queue_capacity,
        }
    }

    /// Conductor settings
    #[must_use]
    pub fn conductor_config(&self) -> ConductorConfig {
        ConductorConfig {
            default_health: self.default_health,
            reward_grace: self.reward_grace,
            reveal_tick: self.tick,
            reveal_timeout: self.reveal_timeout,
        }
    }

    /// Stock state table with the configured transition duration
    #[must_use]
    pub fn state_table(&self) -> StateTable {
        StateTable::default().with_transition_duration(self.transition)
    }

    /// Build the configured actuator link
    pub fn device_link(&self) -> Result<Arc<dyn DeviceLink>, DeviceError> {
        Ok(match self.device_link {
            LinkKind::Udp => Arc::new(UdpLink::new(self.device_address.clone(), self.device_port)),
            LinkKind::Relay => Arc::new(HttpRelayLink::new(
                &self.backend_url,
                self.device_address.clone(),
                self.device_port,
                self.backend_timeout,
            )?),
            LinkKind::Disabled => Arc::new(DisabledLink),
        })
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/tomo/conductor.toml` or
/// `~/.config/tomo/conductor.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tomo").join("conductor.toml"))
}

/// Load configuration from the default path and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<TomoConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<TomoConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration, reading environment variables through `env`
pub fn load_config_with_env<E>(path: Option<PathBuf>, env: E) -> Result<TomoConfig, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let mut config = TomoConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: TomoToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env)?;

    Ok(config)
}

fn reveal_timeout(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn apply_toml_config(config: &mut TomoConfig, toml: &TomoToml) {
    if let Some(ref address) = toml.device.address {
        config.device_address = address.clone();
    }
    if let Some(port) = toml.device.port {
        config.device_port = port;
    }
    if let Some(link) = toml.device.link {
        config.device_link = link;
    }
    if let Some(ms) = toml.device.heartbeat_interval_ms {
        config.heartbeat_interval = Duration::from_millis(ms);
    }
    if let Some(capacity) = toml.device.queue_capacity {
        config.queue_capacity = capacity;
    }

    if let Some(ref url) = toml.backend.base_url {
        config.backend_url = url.clone();
    }
    if let Some(ms) = toml.backend.timeout_ms {
        config.backend_timeout = Duration::from_millis(ms);
    }

    if let Some(ms) = toml.timing.tick_ms {
        config.tick = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.timing.transition_ms {
        config.transition = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.timing.reward_grace_ms {
        config.reward_grace = Duration::from_millis(ms);
    }

    if let Some(health) = toml.session.default_health {
        config.default_health = health;
    }
    if let Some(ms) = toml.session.reveal_timeout_ms {
        config.reveal_timeout = reveal_timeout(ms);
    }
}

fn apply_env_config<E>(config: &mut TomoConfig, env: E) -> Result<(), ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let millis = |key: &str| env(key).and_then(|v| v.trim().parse::<u64>().ok());
    let mut touched = false;

    if let Some(url) = env("TOMO_BACKEND_URL") {
        config.backend_url = url;
        touched = true;
    }
    if let Some(ms) = millis("TOMO_BACKEND_TIMEOUT_MS") {
        config.backend_timeout = Duration::from_millis(ms);
        touched = true;
    }
    if let Some(address) = env("TOMO_DEVICE_ADDR") {
        config.device_address = address;
        touched = true;
    }
    if let Some(port) = env("TOMO_DEVICE_PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
        config.device_port = port;
        touched = true;
    }
    if let Some(link) = env("TOMO_DEVICE_LINK") {
        config.device_link = link.parse()?;
        touched = true;
    }
    if let Some(ms) = millis("TOMO_HEARTBEAT_INTERVAL_MS") {
        config.heartbeat_interval = Duration::from_millis(ms);
        touched = true;
    }
    if let Some(ms) = millis("TOMO_TICK_MS") {
        config.tick = Duration::from_millis(ms);
        touched = true;
    }
    if let Some(ms) = millis("TOMO_TRANSITION_MS") {
        config.transition = Duration::from_millis(ms);
        touched = true;
    }
    if let Some(ms) = millis("TOMO_REWARD_GRACE_MS") {
        config.reward_grace = Duration::from_millis(ms);
        touched = true;
    }
    if let Some(health) = env("TOMO_DEFAULT_HEALTH").and_then(|v| v.trim().parse::<i64>().ok()) {
        config.default_health = health;
        touched = true;
    }
    if let Some(ms) = millis("TOMO_REVEAL_TIMEOUT_MS") {
        config.reveal_timeout = reveal_timeout(ms);
        touched = true;
    }

    if touched {
        config.source = ConfigSource::Env;
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend URL override
    pub backend_url: Option<String>,
    /// Device address override
    pub device_address: Option<String>,
    /// Device port override
    pub device_port: Option<u16>,
    /// Device link override
    pub device_link: Option<LinkKind>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set backend URL override
    #[must_use]
    pub fn with_backend_url(mut self, url: String) -> Self {
        self.backend_url = Some(url);
        self
    }

    /// Set device address override
    #[must_use]
    pub fn with_device_address(mut self, address: String) -> Self {
        self.device_address = Some(address);
        self
    }

    /// Set device port override
    #[must_use]
    pub fn with_device_port(mut self, port: u16) -> Self {
        self.device_port = Some(port);
        self
    }

    /// Set device link override
    #[must_use]
    pub fn with_device_link(mut self, link: LinkKind) -> Self {
        self.device_link = Some(link);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut TomoConfig) {
        if self.backend_url.is_some()
            || self.device_address.is_some()
            || self.device_port.is_some()
            || self.device_link.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(ref address) = self.device_address {
            config.device_address = address.clone();
        }
        if let Some(port) = self.device_port {
            config.device_port = port;
        }
        if let Some(link) = self.device_link {
            config.device_link = link;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
