//! Watermarking transform backed by an external encoder.

use super::command::{run_command, CommandSpec};
use crate::core::VideoRef;
use crate::errors::StageFault;
use crate::stages::{BatchRunner, TransformStage};
use anyhow::bail;
use async_trait::async_trait;
use std::path::PathBuf;

/// Escapes text for use inside an ffmpeg `drawtext` filter value.
#[must_use]
pub fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | ':' | '\'' | '%') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Runs the encoder once per video, writing `processed_<name>` into the
/// output directory.
#[derive(Debug, Clone)]
pub struct CommandTransformer {
    command: CommandSpec,
    processed_dir: PathBuf,
    watermark: String,
    runner: BatchRunner,
}

impl CommandTransformer {
    /// Creates a transformer.
    #[must_use]
    pub fn new(command: CommandSpec, processed_dir: impl Into<PathBuf>, watermark: impl Into<String>) -> Self {
        Self {
            command,
            processed_dir: processed_dir.into(),
            watermark: watermark.into(),
            runner: BatchRunner::default(),
        }
    }

    /// Sets the batch runner.
    #[must_use]
    pub fn with_runner(mut self, runner: BatchRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Output path for `video`.
    #[must_use]
    pub fn output_path(&self, video: &VideoRef) -> PathBuf {
        self.processed_dir.join(format!("processed_{}", video.file_name()))
    }

    async fn transform(&self, video: &VideoRef) -> anyhow::Result<VideoRef> {
        if !tokio::fs::try_exists(video.as_path()).await.unwrap_or(false) {
            bail!("input {video} not found");
        }

        let output = self.output_path(video);
        let output_str = output.to_string_lossy();
        let watermark = escape_drawtext(&self.watermark);
        run_command(
            &self.command,
            &[
                ("input", video.as_str()),
                ("output", output_str.as_ref()),
                ("watermark", watermark.as_str()),
            ],
            &[],
        )
        .await?;

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            bail!("encoder produced no file at {}", output.display());
        }
        Ok(VideoRef::from_path(output))
    }
}

#[async_trait]
impl TransformStage for CommandTransformer {
    fn name(&self) -> &str {
        "watermark"
    }

    async fn run_batch(&self, videos: &[VideoRef]) -> Result<Vec<VideoRef>, StageFault> {
        tokio::fs::create_dir_all(&self.processed_dir).await.map_err(|e| {
            StageFault::new(format!("cannot create {}", self.processed_dir.display())).with_source(e)
        })?;

        self
            .runner
            .try_survivors(self.name(), videos, |video| self.transform(video))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_drawtext() {
        assert_eq!(escape_drawtext("@handle"), "@handle");
        assert_eq!(escape_drawtext("it's 5:00"), "it\\'s 5\\:00");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_input_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("clip_a.mp4");
        std::fs::write(&raw, b"raw").unwrap();

        let transformer = CommandTransformer::new(
            CommandSpec::new("cp").with_args(["{input}", "{output}"]),
            dir.path().join("processed"),
            "@reelflow",
        );

        let inputs = vec![VideoRef::from_path(&raw), VideoRef::from_path(dir.path().join("gone.mp4"))];
        let outputs = transformer.run_batch(&inputs).await.unwrap();

        assert_eq!(outputs, vec![VideoRef::from_path(dir.path().join("processed/processed_clip_a.mp4"))]);
        assert_eq!(std::fs::read(outputs[0].as_path()).unwrap(), b"raw");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_encoder_failure_is_item_failure() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("clip.mp4");
        std::fs::write(&raw, b"raw").unwrap();

        let transformer = CommandTransformer::new(
            CommandSpec::new("sh").with_args(["-c", "exit 1"]),
            dir.path().join("processed"),
            "@reelflow",
        );

        let outputs = transformer.run_batch(&[VideoRef::from_path(&raw)]).await.unwrap();
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_output_dir_is_fault() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        let transformer = CommandTransformer::new(CommandSpec::new("true"), blocker.join("processed"), "@x");
        let fault = transformer.run_batch(&[VideoRef::new("a.mp4")]).await.unwrap_err();
        assert!(fault.message().starts_with("cannot create"));
    }

    #[tokio::test]
    async fn test_missing_encoder_is_fault() {
        let dir = tempfile::tempdir().unwrap();
        let clips: Vec<VideoRef> = ["a.mp4", "b.mp4"]
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                std::fs::write(&path, b"raw").unwrap();
                VideoRef::from_path(path)
            })
            .collect();

        let transformer = CommandTransformer::new(
            CommandSpec::new("reelflow-no-such-encoder"),
            dir.path().join("processed"),
            "@x",
        );
        let fault = transformer.run_batch(&clips).await.unwrap_err();
        assert!(fault.message().starts_with("all 2 items failed"));
        assert!(fault.message().contains("reelflow-no-such-encoder is unavailable"));
    }
}
