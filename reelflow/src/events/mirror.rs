//! Best-effort external mirror for run events.

use crate::core::RunEvent;
use crate::utils::format_row_timestamp;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One row sent to the mirror: `[timestamp, message, level]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRow {
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    pub timestamp: String,
    /// Event message.
    pub message: String,
    /// Event level name.
    pub level: String,
}

impl MirrorRow {
    /// Returns the row as an ordered list of cells.
    #[must_use]
    pub fn cells(&self) -> [&str; 3] {
        [&self.timestamp, &self.message, &self.level]
    }
}

impl From<&RunEvent> for MirrorRow {
    fn from(event: &RunEvent) -> Self {
        Self {
            timestamp: format_row_timestamp(&event.timestamp),
            message: event.message.clone(),
            level: event.level.to_string(),
        }
    }
}

/// Why a mirror write failed. Never escapes the event log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    /// The endpoint answered with a non-success status.
    #[error("mirror returned HTTP {0}")]
    Status(u16),
    /// The request could not be sent.
    #[error("mirror transport error: {0}")]
    Transport(String),
    /// The write did not complete in time.
    #[error("mirror write timed out after {0:?}")]
    Timeout(Duration),
}

/// An external, row-oriented destination for events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventMirror: Send + Sync {
    /// Appends one row.
    async fn append_row(&self, row: &MirrorRow) -> Result<(), MirrorError>;
}

/// Posts rows as `{"values": [[timestamp, message, level]]}` to an HTTP endpoint.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpRowMirror {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

#[cfg(feature = "http")]
impl HttpRowMirror {
    /// Creates a mirror posting to `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token: None,
        }
    }

    /// Sends `token` as a bearer credential.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Uses a preconfigured client.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl EventMirror for HttpRowMirror {
    async fn append_row(&self, row: &MirrorRow) -> Result<(), MirrorError> {
        let body = serde_json::json!({ "values": [row.cells()] });
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MirrorError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(MirrorError::Status(status.as_u16()))
        }
    }
}
