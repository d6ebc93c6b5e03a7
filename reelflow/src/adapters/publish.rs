//! Publishing through an out-of-process helper script.

use super::command::{run_command, CommandSpec};
use crate::core::{PublishItem, PublishOutcome};
use crate::errors::StageFault;
use crate::stages::{BatchRunner, PublishStage};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// Account credentials handed to the publish helper.
#[derive(Clone, PartialEq, Eq)]
pub struct PublishCredentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl PublishCredentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for PublishCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Runs `program script` once per item with the item in the environment.
///
/// The helper reads `VIDEO_PATH`, `CAPTION`, `HASHTAGS` (space separated),
/// `PUBLISH_USERNAME` and `PUBLISH_PASSWORD`. Exit status 0 means published;
/// its last stdout line, if any, becomes the confirmation.
#[derive(Debug, Clone)]
pub struct ScriptPublisher {
    program: String,
    script: PathBuf,
    credentials: PublishCredentials,
    runner: BatchRunner,
}

impl ScriptPublisher {
    /// Creates a publisher that uploads one item at a time.
    #[must_use]
    pub fn new(program: impl Into<String>, script: impl Into<PathBuf>, credentials: PublishCredentials) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            credentials,
            runner: BatchRunner::sequential(),
        }
    }

    /// Sets the batch runner.
    #[must_use]
    pub fn with_runner(mut self, runner: BatchRunner) -> Self {
        self.runner = runner;
        self
    }

    async fn publish(&self, command: &CommandSpec, item: &PublishItem) -> anyhow::Result<PublishOutcome> {
        let hashtags = item.hashtags.to_string();
        let output = run_command(
            command,
            &[],
            &[
                ("VIDEO_PATH", item.video.as_str()),
                ("CAPTION", item.caption.as_str()),
                ("HASHTAGS", hashtags.as_str()),
                ("PUBLISH_USERNAME", self.credentials.username.as_str()),
                ("PUBLISH_PASSWORD", self.credentials.password.as_str()),
            ],
        )
        .await?;

        Ok(PublishOutcome {
            video: item.video.clone(),
            confirmation: output.last_line().unwrap_or("published").to_string(),
        })
    }
}

#[async_trait]
impl PublishStage for ScriptPublisher {
    fn name(&self) -> &str {
        "script_upload"
    }

    async fn run_batch(&self, items: &[PublishItem]) -> Result<Vec<PublishOutcome>, StageFault> {
        if !tokio::fs::try_exists(&self.script).await.unwrap_or(false) {
            return Err(StageFault::new(format!(
                "publish script {} not found",
                self.script.display()
            )));
        }

        let command = CommandSpec::new(&self.program).with_arg(self.script.to_string_lossy());
        self
            .runner
            .try_survivors(self.name(), items, |item| self.publish(&command, item))
            .await
    }
}
