//! Resolved settings for the adapters and the event log.
//!
//! These are plain `Deserialize` types with defaults; where they are loaded
//! from is up to the caller.

use crate::adapters::CommandSpec;
use crate::core::AcquireQuery;
use crate::errors::ConfigError;
use crate::observability::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding comma-separated stock search queries.
pub const SEARCH_QUERIES_VAR: &str = "SEARCH_QUERIES";
/// Environment variable holding comma-separated channel identifiers.
pub const SOURCE_CHANNELS_VAR: &str = "SOURCE_CHANNELS";

/// Settings for every stage plus the event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Acquire adapter settings.
    #[serde(default)]
    pub acquire: AcquireSettings,
    /// Transform adapter settings.
    #[serde(default)]
    pub transform: TransformSettings,
    /// Transcribe adapter settings.
    #[serde(default)]
    pub transcribe: TranscribeSettings,
    /// Caption adapter settings.
    #[serde(default)]
    pub caption: CaptionSettings,
    /// Publish adapter settings.
    #[serde(default)]
    pub publish: PublishSettings,
    /// Event log settings.
    #[serde(default)]
    pub events: EventLogSettings,
    /// Process log output.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl PipelineSettings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks every timeout and concurrency value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_concurrency("acquire.concurrency", self.acquire.concurrency)?;
        check_concurrency("transform.concurrency", self.transform.concurrency)?;
        check_concurrency("transcribe.concurrency", self.transcribe.concurrency)?;
        check_concurrency("caption.concurrency", self.caption.concurrency)?;
        check_concurrency("publish.concurrency", self.publish.concurrency)?;

        optional_seconds("acquire.item_timeout_seconds", self.acquire.item_timeout_seconds)?;
        optional_seconds("transform.item_timeout_seconds", self.transform.item_timeout_seconds)?;
        optional_seconds("transcribe.item_timeout_seconds", self.transcribe.item_timeout_seconds)?;
        optional_seconds("caption.item_timeout_seconds", self.caption.item_timeout_seconds)?;
        optional_seconds("publish.item_timeout_seconds", self.publish.item_timeout_seconds)?;
        seconds("events.mirror_timeout_seconds", self.events.mirror_timeout_seconds)?;

        if self.caption.max_hashtags == 0 {
            return Err(ConfigError::invalid("caption.max_hashtags", "must be at least 1"));
        }
        Ok(())
    }

    /// Fills the Acquire seed lists from `SEARCH_QUERIES` and `SOURCE_CHANNELS`.
    #[must_use]
    pub fn with_env_lists<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(queries) = lookup(SEARCH_QUERIES_VAR) {
            self.acquire.search_queries = split_list(&queries);
        }
        if let Some(channels) = lookup(SOURCE_CHANNELS_VAR) {
            self.acquire.channels = split_list(&channels);
        }
        self
    }
}

/// Splits a comma-separated list, dropping blank entries.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

/// Converts a seconds value into a duration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for negative, zero or non-finite values.
pub fn seconds(key: &str, value: f64) -> Result<Duration, ConfigError> {
    if value <= 0.0 {
        return Err(ConfigError::invalid(key, format!("expected a positive number of seconds, got {value}")));
    }
    Duration::try_from_secs_f64(value).map_err(|e| ConfigError::invalid(key, e.to_string()))
}

/// Like [`seconds`], for an optional value.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if the value is present and invalid.
pub fn optional_seconds(key: &str, value: Option<f64>) -> Result<Option<Duration>, ConfigError> {
    value.map(|v| seconds(key, v)).transpose()
}

fn check_concurrency(key: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::invalid(key, "must be at least 1"))
    } else {
        Ok(())
    }
}

/// Acquire adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquireSettings {
    /// Where downloaded videos are written.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    /// Stock footage search queries.
    #[serde(default)]
    pub search_queries: Vec<String>,
    /// Channel identifiers to download from.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Results requested per search query.
    #[serde(default = "default_per_query_limit")]
    pub per_query_limit: usize,
    /// Stock video search endpoint.
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// Channel URL, with `{channel}` replaced by the identifier.
    #[serde(default = "default_channel_url")]
    pub channel_url: String,
    /// Downloader invocation.
    #[serde(default = "default_downloader")]
    pub downloader: CommandSpec,
    /// Maximum parallel downloads.
    #[serde(default = "default_acquire_concurrency")]
    pub concurrency: usize,
    /// Per-item time limit.
    #[serde(default)]
    pub item_timeout_seconds: Option<f64>,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_per_query_limit() -> usize {
    5
}

fn default_search_url() -> String {
    "https://api.pexels.com/videos/search".to_string()
}

fn default_channel_url() -> String {
    "https://www.youtube.com/channel/{channel}".to_string()
}

fn default_downloader() -> CommandSpec {
    CommandSpec::new("yt-dlp").with_args([
        "--format",
        "best[height<=1080]",
        "--playlist-items",
        "1",
        "--output",
        "{output_template}",
        "--print",
        "after_move:filepath",
        "--quiet",
        "--no-warnings",
        "{channel_url}",
    ])
}

fn default_acquire_concurrency() -> usize {
    2
}

impl Default for AcquireSettings {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            search_queries: Vec::new(),
            channels: Vec::new(),
            per_query_limit: default_per_query_limit(),
            search_url: default_search_url(),
            channel_url: default_channel_url(),
            downloader: default_downloader(),
            concurrency: default_acquire_concurrency(),
            item_timeout_seconds: None,
        }
    }
}

impl AcquireSettings {
    /// Returns the seed query these settings describe.
    #[must_use]
    pub fn query(&self) -> AcquireQuery {
        AcquireQuery {
            search_queries: self.search_queries.clone(),
            channels: self.channels.clone(),
            per_query_limit: self.per_query_limit,
        }
    }

    /// Sets the content directory.
    #[must_use]
    pub fn with_content_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.content_dir = dir.into();
        self
    }

    /// Adds a search query.
    #[must_use]
    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_queries.push(query.into());
        self
    }

    /// Adds a channel.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channels.push(channel.into());
        self
    }
}

/// Transform adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSettings {
    /// Where processed videos are written.
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    /// Watermark text drawn in the bottom-right corner.
    #[serde(default = "default_watermark")]
    pub watermark: String,
    /// Encoder invocation.
    #[serde(default = "default_encoder")]
    pub command: CommandSpec,
    /// Maximum parallel encodes.
    #[serde(default = "default_transform_concurrency")]
    pub concurrency: usize,
    /// Per-item time limit.
    #[serde(default)]
    pub item_timeout_seconds: Option<f64>,
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("processed")
}

fn default_watermark() -> String {
    "@YourHandle".to_string()
}

fn default_encoder() -> CommandSpec {
    CommandSpec::new("ffmpeg").with_args([
        "-y",
        "-loglevel",
        "error",
        "-i",
        "{input}",
        "-vf",
        "drawtext=text='{watermark}':fontcolor=white:fontsize=h/24:borderw=2:bordercolor=black:x=w-tw-10:y=h-th-10",
        "-c:a",
        "copy",
        "{output}",
    ])
}

fn default_transform_concurrency() -> usize {
    2
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            processed_dir: default_processed_dir(),
            watermark: default_watermark(),
            command: default_encoder(),
            concurrency: default_transform_concurrency(),
            item_timeout_seconds: None,
        }
    }
}

impl TransformSettings {
    /// Sets the output directory.
    #[must_use]
    pub fn with_processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.processed_dir = dir.into();
        self
    }

    /// Sets the watermark text.
    #[must_use]
    pub fn with_watermark(mut self, text: impl Into<String>) -> Self {
        self.watermark = text.into();
        self
    }

    /// Sets the encoder command.
    #[must_use]
    pub fn with_command(mut self, command: CommandSpec) -> Self {
        self.command = command;
        self
    }
}

/// Transcribe adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscribeSettings {
    /// Where transcripts are written.
    #[serde(default = "default_subtitles_dir")]
    pub subtitles_dir: PathBuf,
    /// Speech model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Speech-to-text invocation. Must write `<stem>.json` into `{output_dir}`.
    #[serde(default = "default_transcriber")]
    pub command: CommandSpec,
    /// Also write `<stem>.srt` from the segments.
    #[serde(default)]
    pub write_srt: bool,
    /// Maximum parallel transcriptions.
    #[serde(default = "default_transcribe_concurrency")]
    pub concurrency: usize,
    /// Per-item time limit.
    #[serde(default)]
    pub item_timeout_seconds: Option<f64>,
}

fn default_subtitles_dir() -> PathBuf {
    PathBuf::from("subtitles")
}

fn default_model() -> String {
    "base".to_string()
}

fn default_transcriber() -> CommandSpec {
    CommandSpec::new("whisper").with_args([
        "{input}",
        "--model",
        "{model}",
        "--output_format",
        "json",
        "--output_dir",
        "{output_dir}",
        "--verbose",
        "False",
    ])
}

fn default_transcribe_concurrency() -> usize {
    1
}

impl Default for TranscribeSettings {
    fn default() -> Self {
        Self {
            subtitles_dir: default_subtitles_dir(),
            model: default_model(),
            command: default_transcriber(),
            write_srt: false,
            concurrency: default_transcribe_concurrency(),
            item_timeout_seconds: None,
        }
    }
}

impl TranscribeSettings {
    /// Sets the output directory.
    #[must_use]
    pub fn with_subtitles_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.subtitles_dir = dir.into();
        self
    }

    /// Sets the speech-to-text command.
    #[must_use]
    pub fn with_command(mut self, command: CommandSpec) -> Self {
        self.command = command;
        self
    }

    /// Enables SRT output.
    #[must_use]
    pub fn with_srt(mut self, enabled: bool) -> Self {
        self.write_srt = enabled;
        self
    }
}

/// Caption adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSettings {
    /// Chat completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Model identifier sent with each request.
    #[serde(default = "default_caption_model")]
    pub model: String,
    /// Completion length cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Hashtags kept per caption.
    #[serde(default = "default_max_hashtags")]
    pub max_hashtags: usize,
    /// Maximum parallel requests.
    #[serde(default = "default_caption_concurrency")]
    pub concurrency: usize,
    /// Per-item time limit.
    #[serde(default = "default_caption_timeout")]
    pub item_timeout_seconds: Option<f64>,
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_caption_model() -> String {
    "openrouter/auto".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_hashtags() -> usize {
    5
}

fn default_caption_concurrency() -> usize {
    2
}

#[allow(clippy::unnecessary_wraps)]
fn default_caption_timeout() -> Option<f64> {
    Some(60.0)
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_caption_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_hashtags: default_max_hashtags(),
            concurrency: default_caption_concurrency(),
            item_timeout_seconds: default_caption_timeout(),
        }
    }
}

impl CaptionSettings {
    /// Sets the endpoint.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Publish adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishSettings {
    /// Interpreter used to run the script.
    #[serde(default = "default_publish_program")]
    pub program: String,
    /// Publish helper script.
    #[serde(default = "default_publish_script")]
    pub script: PathBuf,
    /// Maximum parallel uploads.
    #[serde(default = "default_publish_concurrency")]
    pub concurrency: usize,
    /// Per-item time limit.
    #[serde(default)]
    pub item_timeout_seconds: Option<f64>,
}

fn default_publish_program() -> String {
    "node".to_string()
}

fn default_publish_script() -> PathBuf {
    PathBuf::from("scripts/upload.js")
}

fn default_publish_concurrency() -> usize {
    1
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            program: default_publish_program(),
            script: default_publish_script(),
            concurrency: default_publish_concurrency(),
            item_timeout_seconds: None,
        }
    }
}

impl PublishSettings {
    /// Sets the helper script.
    #[must_use]
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = script.into();
        self
    }

    /// Sets the interpreter.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

/// Event log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogSettings {
    /// JSON-lines file receiving every event.
    #[serde(default = "default_event_path")]
    pub local_path: PathBuf,
    /// Time allowed for one mirror write.
    #[serde(default = "default_mirror_timeout")]
    pub mirror_timeout_seconds: f64,
}

fn default_event_path() -> PathBuf {
    PathBuf::from("logs/events.jsonl")
}

fn default_mirror_timeout() -> f64 {
    10.0
}

impl Default for EventLogSettings {
    fn default() -> Self {
        Self {
            local_path: default_event_path(),
            mirror_timeout_seconds: default_mirror_timeout(),
        }
    }
}

/// Process log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Line format.
    #[serde(default)]
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}
