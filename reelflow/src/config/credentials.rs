//! Credentials resolved from the environment.

use crate::errors::ConfigError;
use std::fmt;

/// API key for the caption service.
pub const CAPTION_API_KEY_VAR: &str = "CAPTION_API_KEY";
/// API key for the stock video search service.
pub const STOCK_VIDEO_API_KEY_VAR: &str = "STOCK_VIDEO_API_KEY";
/// Platform account name for publishing.
pub const PUBLISH_USERNAME_VAR: &str = "PUBLISH_USERNAME";
/// Platform account password for publishing.
pub const PUBLISH_PASSWORD_VAR: &str = "PUBLISH_PASSWORD";
/// Optional event mirror endpoint.
pub const EVENT_MIRROR_URL_VAR: &str = "EVENT_MIRROR_URL";
/// Optional bearer token for the event mirror.
pub const EVENT_MIRROR_TOKEN_VAR: &str = "EVENT_MIRROR_TOKEN";

const REQUIRED: [&str; 4] = [
    CAPTION_API_KEY_VAR,
    STOCK_VIDEO_API_KEY_VAR,
    PUBLISH_USERNAME_VAR,
    PUBLISH_PASSWORD_VAR,
];

/// Secrets the adapters need. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Caption service key.
    pub caption_api_key: String,
    /// Stock video service key.
    pub stock_video_api_key: String,
    /// Publish account name.
    pub publish_username: String,
    /// Publish account password.
    pub publish_password: String,
    /// Event mirror endpoint, if mirroring is enabled.
    pub mirror_url: Option<String>,
    /// Event mirror token.
    pub mirror_token: Option<String>,
}

impl Credentials {
    /// Reads credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariables`] listing every required
    /// variable that is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads credentials through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariables`] listing every required
    /// variable that is unset or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let missing: Vec<String> = REQUIRED
            .into_iter()
            .filter(|&key| get(key).is_none())
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing));
        }

        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingVariables(vec![key.to_string()]));

        Ok(Self {
            caption_api_key: required(CAPTION_API_KEY_VAR)?,
            stock_video_api_key: required(STOCK_VIDEO_API_KEY_VAR)?,
            publish_username: required(PUBLISH_USERNAME_VAR)?,
            publish_password: required(PUBLISH_PASSWORD_VAR)?,
            mirror_url: get(EVENT_MIRROR_URL_VAR),
            mirror_token: get(EVENT_MIRROR_TOKEN_VAR),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("caption_api_key", &"<redacted>")
            .field("stock_video_api_key", &"<redacted>")
            .field("publish_username", &self.publish_username)
            .field("publish_password", &"<redacted>")
            .field("mirror_url", &self.mirror_url)
            .field("mirror_token", &self.mirror_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
