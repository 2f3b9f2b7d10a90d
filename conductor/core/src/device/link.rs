//! Actuator Links
//!
//! A [`DeviceLink`] moves one [`SignalCode`] to the board. Links report
//! failures; the notifier decides to swallow them.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;

use crate::mood::SignalCode;

/// Errors a link can report for a single send
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Socket-level failure
    #[error("device socket error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failure talking to the relay
    #[error("relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Relay answered with a non-success status
    #[error("relay returned HTTP {status}")]
    Status {
        /// Status code returned by the relay
        status: u16,
    },
}

/// Transport that delivers a signal code to the actuator
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Short link name for logs
    fn name(&self) -> &str;

    /// Deliver one signal code
    async fn send(&self, code: SignalCode) -> Result<(), DeviceError>;
}

/// Sends each code as a single-byte UDP datagram
pub struct UdpLink {
    address: String,
    port: u16,
    socket: OnceCell<UdpSocket>,
}

impl UdpLink {
    /// Target the board at `address:port`
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            socket: OnceCell::new(),
        }
    }

    async fn socket(&self) -> Result<&UdpSocket, DeviceError> {
        let socket = self
            .socket
            .get_or_try_init(|| UdpSocket::bind(("0.0.0.0", 0)))
            .await?;
        Ok(socket)
    }
}

#[async_trait]
impl DeviceLink for UdpLink {
    fn name(&self) -> &str {
        "udp"
    }

    async fn send(&self, code: SignalCode) -> Result<(), DeviceError> {
        let socket = self.socket().await?;
        socket
            .send_to(&[code.as_u8()], (self.address.as_str(), self.port))
            .await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    emotion: u8,
    ip: &'a str,
    port: u16,
}

/// Posts each code to the backend's relay endpoint
pub struct HttpRelayLink {
    relay_url: String,
    address: String,
    port: u16,
    http_client: reqwest::Client,
}

impl HttpRelayLink {
    /// Relay through `base_url` to the board at `address:port`
    pub fn new(
        base_url: &str,
        address: impl Into<String>,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            relay_url: format!("{}/api/esp32", base_url.trim_end_matches('/')),
            address: address.into(),
            port,
            http_client,
        })
    }

    /// Full URL of the relay endpoint
    #[must_use]
    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }
}

#[async_trait]
impl DeviceLink for HttpRelayLink {
    fn name(&self) -> &str {
        "relay"
    }

    async fn send(&self, code: SignalCode) -> Result<(), DeviceError> {
        let response = self
            .http_client
            .post(&self.relay_url)
            .json(&RelayPayload {
                emotion: code.as_u8(),
                ip: &self.address,
                port: self.port,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeviceError::Status {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// Link used when no actuator is configured
#[derive(Debug, Default)]
pub struct DisabledLink;

#[async_trait]
impl DeviceLink for DisabledLink {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn send(&self, code: SignalCode) -> Result<(), DeviceError> {
        tracing::trace!(code = code.as_u8(), "device link disabled, signal discarded");
        Ok(())
    }
}
