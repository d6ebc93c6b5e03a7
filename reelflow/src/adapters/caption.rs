//! Caption generation through a chat-completions text model.

use crate::core::{Caption, CaptionResult, Hashtag, HashtagSet, TranscriptRef, VideoRef};
use crate::errors::StageFault;
use crate::stages::{BatchRunner, CaptionStage};
use anyhow::{bail, Context};
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Default number of hashtags kept per caption.
pub const DEFAULT_MAX_HASHTAGS: usize = 5;

#[allow(clippy::expect_used)]
static LABELED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[*_\s]*(caption|hashtags)[*_\s]*:[*_\s]*(.*?)[*_\s]*$").expect("valid regex")
});

#[allow(clippy::expect_used)]
static HASHTAG_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#*\w+").expect("valid regex"));

/// A text model that answers a single prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model's reply to `prompt`.
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Builds the caption request for one video.
#[must_use]
pub fn build_prompt(video_name: &str, transcript: &str, max_hashtags: usize) -> String {
    format!(
        "Based on the following video transcription, create an engaging short-form video caption and relevant hashtags.\n\n\
         Video: {video_name}\n\
         Transcription: {transcript}\n\n\
         Please provide:\n\
         1. A catchy caption that will engage viewers\n\
         2. A list of relevant hashtags (max {max_hashtags})\n\n\
         Format the response as:\n\
         CAPTION: [your caption here]\n\
         HASHTAGS: #tag1 #tag2 #tag3"
    )
}

/// Extracts the caption and hashtags from a model reply.
///
/// The last `CAPTION:` and `HASHTAGS:` lines win. Hashtags are normalized,
/// de-duplicated and capped at `max_hashtags`.
///
/// # Errors
///
/// Fails when the caption or the hashtag list is missing or empty.
///
/// ```
/// use reelflow::adapters::parse_caption_reply;
///
/// let (caption, tags) =
///     parse_caption_reply("CAPTION: Sunset surf\nHASHTAGS: #Surf #ocean #surf", 5).unwrap();
/// assert_eq!(caption.as_str(), "Sunset surf");
/// assert_eq!(tags.to_string(), "#surf #ocean");
/// ```
pub fn parse_caption_reply(reply: &str, max_hashtags: usize) -> anyhow::Result<(Caption, HashtagSet)> {
    let mut caption = None;
    let mut hashtags = HashtagSet::new();

    for line in reply.lines() {
        let Some(captures) = LABELED_LINE.captures(line) else {
            continue;
        };
        let value = captures.get(2).map_or("", |m| m.as_str());
        if captures[1].eq_ignore_ascii_case("caption") {
            caption = Some(Caption::new(value));
        } else {
            hashtags = HASHTAG_TOKEN
                .find_iter(value)
                .filter_map(|token| Hashtag::parse(token.as_str()))
                .collect();
        }
    }

    let caption = caption.filter(|c| !c.is_empty()).context("reply has no caption")?;
    if hashtags.is_empty() {
        bail!("reply has no hashtags");
    }
    hashtags.truncate(max_hashtags);
    Ok((caption, hashtags))
}

/// Captions each video from its transcript with a [`TextGenerator`].
#[derive(Clone)]
pub struct ChatCaptioner {
    generator: Arc<dyn TextGenerator>,
    max_hashtags: usize,
    runner: BatchRunner,
}

impl fmt::Debug for ChatCaptioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCaptioner")
            .field("max_hashtags", &self.max_hashtags)
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}

impl ChatCaptioner {
    /// Creates a captioner over `generator`.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_hashtags: DEFAULT_MAX_HASHTAGS,
            runner: BatchRunner::default(),
        }
    }

    /// Sets the hashtag cap (minimum 1).
    #[must_use]
    pub fn with_max_hashtags(mut self, max: usize) -> Self {
        self.max_hashtags = max.max(1);
        self
    }

    /// Sets the batch runner.
    #[must_use]
    pub fn with_runner(mut self, runner: BatchRunner) -> Self {
        self.runner = runner;
        self
    }

    async fn caption(&self, video: &VideoRef, transcript: &TranscriptRef) -> anyhow::Result<CaptionResult> {
        let text = tokio::fs::read_to_string(&transcript.location)
            .await
            .with_context(|| format!("cannot read transcript {}", transcript.location.display()))?;

        let prompt = build_prompt(&video.file_name(), text.trim(), self.max_hashtags);
        let reply = self.generator.complete(&prompt).await?;
        let (caption, hashtags) = parse_caption_reply(&reply, self.max_hashtags)?;

        Ok(CaptionResult {
            video: video.clone(),
            caption,
            hashtags,
        })
    }
}

#[async_trait]
impl CaptionStage for ChatCaptioner {
    fn name(&self) -> &str {
        "chat_caption"
    }

    async fn run_batch(&self, pairs: &[(VideoRef, TranscriptRef)]) -> Result<Vec<CaptionResult>, StageFault> {
        self
            .runner
            .try_survivors(self.name(), pairs, |(video, transcript)| self.caption(video, transcript))
            .await
    }
}

#[cfg(feature = "http")]
pub use http::ChatCompletionsClient;

#[cfg(feature = "http")]
mod http {
    use super::TextGenerator;
    use crate::adapters::transport_error;
    use anyhow::{bail, Context};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::fmt;

    #[derive(Debug, Deserialize)]
    struct ChatResponse {
        #[serde(default)]
        choices: Vec<ChatChoice>,
    }

    #[derive(Debug, Deserialize)]
    struct ChatChoice {
        message: ChatMessage,
    }

    #[derive(Debug, Deserialize)]
    struct ChatMessage {
        #[serde(default)]
        content: Option<String>,
    }

    /// [`TextGenerator`] over an OpenAI-compatible chat-completions endpoint.
    #[derive(Clone)]
    pub struct ChatCompletionsClient {
        client: reqwest::Client,
        api_url: String,
        api_key: String,
        model: String,
        max_tokens: u32,
        temperature: f32,
    }

    impl fmt::Debug for ChatCompletionsClient {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("ChatCompletionsClient")
                .field("api_url", &self.api_url)
                .field("model", &self.model)
                .finish_non_exhaustive()
        }
    }

    impl ChatCompletionsClient {
        /// Creates a client.
        #[must_use]
        pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                api_url: api_url.into(),
                api_key: api_key.into(),
                model: model.into(),
                max_tokens: 500,
                temperature: 0.7,
            }
        }

        /// Sets sampling parameters.
        #[must_use]
        pub const fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
            self.max_tokens = max_tokens;
            self.temperature = temperature;
            self
        }

        /// Uses a preconfigured HTTP client.
        #[must_use]
        pub fn with_client(mut self, client: reqwest::Client) -> Self {
            self.client = client;
            self
        }
    }

    #[async_trait]
    impl TextGenerator for ChatCompletionsClient {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            let body = json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
            });

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|err| transport_error("caption service", err))
                .context("caption request failed")?;

            let status = response.status();
            if !status.is_success() {
                bail!("caption service returned HTTP {}", status.as_u16());
            }

            let parsed: ChatResponse = response.json().await.context("malformed caption response")?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .context("caption response has no choices")
        }
    }
}
