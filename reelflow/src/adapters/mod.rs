//! Concrete stage adapters and the factories that wire them from settings.
//!
//! Every adapter runs its per-item work through a [`BatchRunner`], so item
//! failures are isolated and survivors keep input order. A stage-level
//! [`StageFault`](crate::errors::StageFault) is only returned when the adapter
//! cannot work at all (unwritable output directory, missing publish script).

mod acquire;
mod caption;
mod command;
mod publish;
mod srt;
mod transcribe;
mod transform;

#[cfg(feature = "http")]
pub use acquire::StockVideoAcquirer;
pub use acquire::{stock_file_name, ChainedAcquirer, ChannelDownloadAcquirer, LocalDirAcquirer, VIDEO_EXTENSIONS};
#[cfg(feature = "http")]
pub use caption::ChatCompletionsClient;
pub use caption::{build_prompt, parse_caption_reply, ChatCaptioner, TextGenerator, DEFAULT_MAX_HASHTAGS};
pub use command::{run_command, CommandOutput, CommandSpec};
pub use publish::{PublishCredentials, ScriptPublisher};
pub use srt::{format_srt_timestamp, render_srt, Segment};
pub use transcribe::{CommandTranscriber, RecognizerOutput};
pub use transform::{escape_drawtext, CommandTransformer};

use crate::config::{optional_seconds, seconds, Credentials, EventLogSettings};
use crate::errors::ConfigError;
#[cfg(feature = "http")]
use crate::errors::ServiceUnavailable;
use crate::events::{EventLog, FileEventStore};
use crate::stages::BatchRunner;
use std::sync::Arc;

/// Marks connection and timeout failures as [`ServiceUnavailable`] so a batch
/// where every request failed that way faults the stage.
#[cfg(feature = "http")]
fn transport_error(service: &str, err: reqwest::Error) -> anyhow::Error {
    if err.is_connect() || err.is_timeout() {
        ServiceUnavailable::new(service, err).into()
    } else {
        err.into()
    }
}

fn runner(key: &str, concurrency: usize, timeout: Option<f64>) -> Result<BatchRunner, ConfigError> {
    Ok(BatchRunner::new(concurrency).with_optional_timeout(optional_seconds(key, timeout)?))
}

/// Builds the event log: a JSON-lines file, mirrored when a mirror URL is
/// configured and HTTP support is compiled in.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for a bad mirror timeout.
pub fn standard_event_log(settings: &EventLogSettings, credentials: &Credentials) -> Result<EventLog, ConfigError> {
    let timeout = seconds("events.mirror_timeout_seconds", settings.mirror_timeout_seconds)?;
    let log = EventLog::new(Arc::new(FileEventStore::new(&settings.local_path))).with_mirror_timeout(timeout);

    #[cfg(feature = "http")]
    if let Some(url) = &credentials.mirror_url {
        let mut mirror = crate::events::HttpRowMirror::new(url);
        if let Some(token) = &credentials.mirror_token {
            mirror = mirror.with_token(token);
        }
        return Ok(log.with_mirror(Arc::new(mirror)));
    }

    #[cfg(not(feature = "http"))]
    if credentials.mirror_url.is_some() {
        tracing::warn!("event mirror configured but HTTP support is disabled");
    }

    Ok(log)
}

#[cfg(feature = "http")]
pub use standard::{standard_orchestrator, standard_stages};

#[cfg(feature = "http")]
mod standard {
    use super::{
        runner, standard_event_log, ChainedAcquirer, ChannelDownloadAcquirer, ChatCaptioner, ChatCompletionsClient,
        CommandTranscriber, CommandTransformer, PublishCredentials, ScriptPublisher, StockVideoAcquirer,
    };
    use crate::config::{Credentials, PipelineSettings};
    use crate::errors::ConfigError;
    use crate::pipeline::{Orchestrator, StageSet};
    use std::sync::Arc;
    use tracing::info;

    /// Builds the production adapters.
    ///
    /// Acquire chains the channel downloader and the stock search, so either
    /// source may fail without aborting the stage.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any setting is invalid.
    pub fn standard_stages(settings: &PipelineSettings, credentials: &Credentials) -> Result<StageSet, ConfigError> {
        settings.validate()?;

        let a = &settings.acquire;
        let acquire_runner = runner("acquire.item_timeout_seconds", a.concurrency, a.item_timeout_seconds)?;
        let acquire = ChainedAcquirer::new()
            .with_source(Arc::new(
                ChannelDownloadAcquirer::new(a.downloader.clone(), a.channel_url.clone(), &a.content_dir)
                    .with_runner(acquire_runner),
            ))
            .with_source(Arc::new(
                StockVideoAcquirer::new(a.search_url.clone(), credentials.stock_video_api_key.clone(), &a.content_dir)
                    .with_runner(acquire_runner),
            ));

        let t = &settings.transform;
        let transform = CommandTransformer::new(
            t.command.clone(),
            a.content_dir.join(&t.processed_dir),
            t.watermark.clone(),
        )
        .with_runner(runner("transform.item_timeout_seconds", t.concurrency, t.item_timeout_seconds)?);

        let s = &settings.transcribe;
        let transcribe = CommandTranscriber::new(s.command.clone(), a.content_dir.join(&s.subtitles_dir), s.model.clone())
            .with_srt(s.write_srt)
            .with_runner(runner("transcribe.item_timeout_seconds", s.concurrency, s.item_timeout_seconds)?);

        let c = &settings.caption;
        let client = ChatCompletionsClient::new(c.api_url.clone(), credentials.caption_api_key.clone(), c.model.clone())
            .with_sampling(c.max_tokens, c.temperature);
        let caption = ChatCaptioner::new(Arc::new(client))
            .with_max_hashtags(c.max_hashtags)
            .with_runner(runner("caption.item_timeout_seconds", c.concurrency, c.item_timeout_seconds)?);

        let p = &settings.publish;
        let publish = ScriptPublisher::new(
            p.program.clone(),
            p.script.clone(),
            PublishCredentials::new(credentials.publish_username.clone(), credentials.publish_password.clone()),
        )
        .with_runner(runner("publish.item_timeout_seconds", p.concurrency, p.item_timeout_seconds)?);

        Ok(StageSet {
            acquire: Arc::new(acquire),
            transform: Arc::new(transform),
            transcribe: Arc::new(transcribe),
            caption: Arc::new(caption),
            publish: Arc::new(publish),
        })
    }

    /// Builds an orchestrator with the production adapters and event log,
    /// seeded from the Acquire settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any setting is invalid.
    pub fn standard_orchestrator(
        settings: &PipelineSettings,
        credentials: &Credentials,
    ) -> Result<Orchestrator, ConfigError> {
        let stages = standard_stages(settings, credentials)?;
        let events = standard_event_log(&settings.events, credentials)?;
        info!(
            queries = settings.acquire.search_queries.len(),
            channels = settings.acquire.channels.len(),
            mirrored = events.has_mirror(),
            "orchestrator configured"
        );
        Ok(Orchestrator::new(stages, settings.acquire.query(), Arc::new(events)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EVENT_MIRROR_URL_VAR, PUBLISH_PASSWORD_VAR, PUBLISH_USERNAME_VAR};

    fn credentials(mirror: Option<&str>) -> Credentials {
        Credentials::from_lookup(|key: &str| match key {
            PUBLISH_USERNAME_VAR => Some("reel_account".into()),
            PUBLISH_PASSWORD_VAR => Some("hunter2".into()),
            EVENT_MIRROR_URL_VAR => mirror.map(String::from),
            _ => Some("key".into()),
        })
        .unwrap()
    }

    #[test]
    fn test_event_log_without_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let settings = EventLogSettings {
            local_path: dir.path().join("events.jsonl"),
            ..EventLogSettings::default()
        };
        let log = standard_event_log(&settings, &credentials(None)).unwrap();
        assert!(!log.has_mirror());
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_event_log_with_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let settings = EventLogSettings {
            local_path: dir.path().join("events.jsonl"),
            ..EventLogSettings::default()
        };
        let log = standard_event_log(&settings, &credentials(Some("https://rows.example/append"))).unwrap();
        assert!(log.has_mirror());
    }

    #[test]
    fn test_event_log_rejects_bad_timeout() {
        let settings = EventLogSettings {
            mirror_timeout_seconds: 0.0,
            ..EventLogSettings::default()
        };
        assert!(standard_event_log(&settings, &credentials(None)).is_err());
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_standard_stages_wiring() {
        use crate::config::PipelineSettings;

        let stages = standard_stages(&PipelineSettings::new(), &credentials(None)).unwrap();
        assert_eq!(stages.acquire.name(), "chained");
        assert_eq!(stages.transform.name(), "watermark");
        assert_eq!(stages.transcribe.name(), "speech_to_text");
        assert_eq!(stages.caption.name(), "chat_caption");
        assert_eq!(stages.publish.name(), "script_upload");
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_standard_stages_validates() {
        use crate::config::PipelineSettings;

        let mut settings = PipelineSettings::new();
        settings.publish.concurrency = 0;
        assert!(standard_stages(&settings, &credentials(None)).is_err());
    }
}
