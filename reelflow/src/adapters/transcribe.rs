//! Speech-to-text transcription backed by an external recognizer.

use super::command::{run_command, CommandSpec};
use super::srt::{render_srt, Segment};
use crate::core::{TranscriptRef, VideoRef};
use crate::errors::StageFault;
use crate::stages::{BatchRunner, TranscribeStage};
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

/// JSON document the recognizer writes for each input.
#[derive(Debug, Clone, Deserialize)]
pub struct RecognizerOutput {
    /// Full transcript text.
    pub text: String,
    /// Timed segments.
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// Runs the recognizer per video and keeps `<stem>.txt` (and optionally
/// `<stem>.srt`) in the subtitles directory.
#[derive(Debug, Clone)]
pub struct CommandTranscriber {
    command: CommandSpec,
    subtitles_dir: PathBuf,
    model: String,
    write_srt: bool,
    runner: BatchRunner,
}

impl CommandTranscriber {
    /// Creates a transcriber.
    #[must_use]
    pub fn new(command: CommandSpec, subtitles_dir: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            command,
            subtitles_dir: subtitles_dir.into(),
            model: model.into(),
            write_srt: false,
            runner: BatchRunner::sequential(),
        }
    }

    /// Also writes SRT subtitles.
    #[must_use]
    pub const fn with_srt(mut self, enabled: bool) -> Self {
        self.write_srt = enabled;
        self
    }

    /// Sets the batch runner.
    #[must_use]
    pub fn with_runner(mut self, runner: BatchRunner) -> Self {
        self.runner = runner;
        self
    }

    async fn transcribe(&self, video: &VideoRef) -> anyhow::Result<TranscriptRef> {
        if !tokio::fs::try_exists(video.as_path()).await.unwrap_or(false) {
            bail!("input {video} not found");
        }

        let output_dir = self.subtitles_dir.to_string_lossy();
        run_command(
            &self.command,
            &[
                ("input", video.as_str()),
                ("model", self.model.as_str()),
                ("output_dir", output_dir.as_ref()),
            ],
            &[],
        )
        .await?;

        let stem = video.file_stem();
        let json_path = self.subtitles_dir.join(format!("{stem}.json"));
        let raw = tokio::fs::read_to_string(&json_path)
            .await
            .with_context(|| format!("recognizer wrote no {}", json_path.display()))?;
        let parsed: RecognizerOutput =
            serde_json::from_str(&raw).with_context(|| format!("malformed {}", json_path.display()))?;

        let text = parsed.text.trim();
        if text.is_empty() {
            bail!("empty transcript for {video}");
        }

        let txt_path = self.subtitles_dir.join(format!("{stem}.txt"));
        tokio::fs::write(&txt_path, text).await?;
        if self.write_srt {
            let srt_path = self.subtitles_dir.join(format!("{stem}.srt"));
            tokio::fs::write(&srt_path, render_srt(&parsed.segments)).await?;
        }

        Ok(TranscriptRef::new(video.clone(), txt_path))
    }
}

#[async_trait]
impl TranscribeStage for CommandTranscriber {
    fn name(&self) -> &str {
        "speech_to_text"
    }

    async fn run_batch(&self, videos: &[VideoRef]) -> Result<Vec<TranscriptRef>, StageFault> {
        tokio::fs::create_dir_all(&self.subtitles_dir).await.map_err(|e| {
            StageFault::new(format!("cannot create {}", self.subtitles_dir.display())).with_source(e)
        })?;

        self
            .runner
            .try_survivors(self.name(), videos, |video| self.transcribe(video))
            .await
    }
}
