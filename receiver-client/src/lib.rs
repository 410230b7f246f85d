//! HTTP client for the URRI receiver volume API
//!
//! The receiver exposes two POST endpoints on port 9032:
//!
//! | Command | Path | Response |
//! |---|---|---|
//! | read volume | `/getVolume` | decimal integer 0-100 |
//! | set volume | `/setVolume/{value}` | ignored |
//!
//! Every call is a single attempt. There is no session state, no retry and,
//! unless [`ReceiverClient::with_timeout`] is used, no timeout beyond what the
//! network stack enforces.

mod error;

pub use error::TransportError;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

/// Fixed port the receiver listens on
pub const RECEIVER_PORT: u16 = 9032;

/// Highest volume the receiver reports
pub const MAX_VOLUME: u8 = 100;

/// A single request understood by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverCommand {
    GetVolume,
    SetVolume(u8),
}

impl ReceiverCommand {
    /// Request path for this command
    pub fn path(&self) -> String {
        match self {
            ReceiverCommand::GetVolume => "/getVolume".to_string(),
            ReceiverCommand::SetVolume(value) => format!("/setVolume/{}", value),
        }
    }
}

impl fmt::Display for ReceiverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POST {}", self.path())
    }
}

/// Parse a `/getVolume` response body
///
/// Surrounding whitespace is ignored; anything other than a decimal integer
/// in 0-100 is a [`TransportError::Protocol`].
pub fn parse_volume(body: &str) -> Result<u8, TransportError> {
    let trimmed = body.trim();
    let volume: u8 = trimmed
        .parse()
        .map_err(|_| TransportError::Protocol(format!("expected volume, got {:?}", trimmed)))?;

    if volume > MAX_VOLUME {
        return Err(TransportError::Protocol(format!(
            "volume {} out of range 0-{}",
            volume, MAX_VOLUME
        )));
    }

    Ok(volume)
}

/// Request/response channel to the receiver
///
/// Implemented by [`ReceiverClient`] for real devices. The typed helpers are
/// provided so that substitute transports only need to answer raw commands.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one command and return the full response body
    async fn send(&self, command: ReceiverCommand) -> Result<String, TransportError>;

    /// Read the current volume
    async fn get_volume(&self) -> Result<u8, TransportError> {
        let body = self.send(ReceiverCommand::GetVolume).await?;
        parse_volume(&body)
    }

    /// Set the volume; the response body is not inspected
    async fn set_volume(&self, volume: u8) -> Result<(), TransportError> {
        self.send(ReceiverCommand::SetVolume(volume)).await?;
        Ok(())
    }
}

/// Client for one receiver
#[derive(Debug, Clone)]
pub struct ReceiverClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl ReceiverClient {
    /// Create a client for the receiver at `address` on [`RECEIVER_PORT`]
    pub fn new(address: &str) -> Self {
        Self::with_base_url(format!("http://{}:{}", address, RECEIVER_PORT))
    }

    /// Create a client for an explicit base URL such as `http://127.0.0.1:9032`
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            timeout: None,
        }
    }

    /// Fail requests that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl Transport for ReceiverClient {
    async fn send(&self, command: ReceiverCommand) -> Result<String, TransportError> {
        let url = format!("{}{}", self.base_url, command.path());

        let mut request = self.http.post(&url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let result = async {
            let response = request.send().await?.error_for_status()?;
            let body = response.text().await?;
            Ok::<_, TransportError>(body)
        }
        .await;

        match &result {
            Ok(body) => debug!(%command, body = %body.trim(), "receiver responded"),
            Err(e) => warn!(%command, error = %e, "problem with request"),
        }

        result
    }
}
