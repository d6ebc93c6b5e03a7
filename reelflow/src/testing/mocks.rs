//! Mock stages for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;

use crate::core::{
    AcquireQuery, Caption, CaptionResult, Hashtag, HashtagSet, PublishItem, PublishOutcome,
    TranscriptRef, VideoRef,
};
use crate::errors::StageFault;
use crate::stages::{AcquireStage, CaptionStage, PublishStage, TranscribeStage, TransformStage};

/// What a [`ScriptedStage`] does with the batch it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Return one output per input.
    KeepAll,
    /// Drop the outputs at these input positions.
    Drop(Vec<usize>),
    /// Return nothing.
    DropAll,
    /// Fail the whole batch with this message.
    Fault(String),
    /// Return the outputs in reverse order.
    Reverse,
    /// Return every output twice.
    Duplicate,
}

impl Script {
    fn apply<T: Clone>(&self, produced: Vec<T>) -> Result<Vec<T>, StageFault> {
        match self {
            Self::KeepAll => Ok(produced),
            Self::Drop(indices) => {
                let dropped: HashSet<usize> = indices.iter().copied().collect();
                Ok(produced
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| !dropped.contains(i))
                    .map(|(_, item)| item)
                    .collect())
            }
            Self::DropAll => Ok(Vec::new()),
            Self::Fault(message) => Err(StageFault::new(message.clone())),
            Self::Reverse => Ok(produced.into_iter().rev().collect()),
            Self::Duplicate => Ok(produced.iter().chain(produced.iter()).cloned().collect()),
        }
    }
}

/// A mock that implements every stage contract.
///
/// Each stage derives a plausible output from its input, then applies its
/// [`Script`]. Calls and input labels are recorded.
#[derive(Debug)]
pub struct ScriptedStage {
    name: String,
    script: Script,
    delay: Option<Duration>,
    acquire_items: Option<usize>,
    call_count: Mutex<usize>,
    inputs: Mutex<Vec<Vec<String>>>,
}

impl ScriptedStage {
    /// Creates a stage that keeps every item.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Script::KeepAll,
            delay: None,
            acquire_items: None,
            call_count: Mutex::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Sets the script.
    #[must_use]
    pub fn with_script(mut self, script: Script) -> Self {
        self.script = script;
        self
    }

    /// Drops the items at `indices`.
    #[must_use]
    pub fn dropping(self, indices: &[usize]) -> Self {
        self.with_script(Script::Drop(indices.to_vec()))
    }

    /// Drops every item.
    #[must_use]
    pub fn dropping_all(self) -> Self {
        self.with_script(Script::DropAll)
    }

    /// Faults with `message`.
    #[must_use]
    pub fn faulting(self, message: impl Into<String>) -> Self {
        self.with_script(Script::Fault(message.into()))
    }

    /// Sleeps for `delay` inside every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// As an Acquire stage, produces `count` videos instead of one per seed entry.
    #[must_use]
    pub fn with_items(mut self, count: usize) -> Self {
        self.acquire_items = Some(count);
        self
    }

    /// Returns the number of times the stage was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }

    /// Returns the input labels of each call.
    #[must_use]
    pub fn recorded_inputs(&self) -> Vec<Vec<String>> {
        self.inputs.lock().clone()
    }

    /// Returns the input labels of the most recent call.
    #[must_use]
    pub fn last_inputs(&self) -> Option<Vec<String>> {
        self.inputs.lock().last().cloned()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        *self.call_count.lock() = 0;
        self.inputs.lock().clear();
    }

    async fn record(&self, labels: Vec<String>) {
        *self.call_count.lock() += 1;
        self.inputs.lock().push(labels);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn finish<T: Clone>(&self, produced: Vec<T>) -> Result<Vec<T>, StageFault> {
        self.script.apply(produced)
    }
}

#[async_trait]
impl AcquireStage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_batch(&self, query: &AcquireQuery) -> Result<Vec<VideoRef>, StageFault> {
        let labels: Vec<String> = query
            .search_queries
            .iter()
            .chain(query.channels.iter())
            .cloned()
            .collect();
        self.record(labels).await;

        let count = self.acquire_items.unwrap_or_else(|| query.len());
        let produced = (0..count)
            .map(|i| VideoRef::new(format!("content/clip_{i}.mp4")))
            .collect();
        self.finish(produced)
    }
}

#[async_trait]
impl TransformStage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_batch(&self, videos: &[VideoRef]) -> Result<Vec<VideoRef>, StageFault> {
        self.record(videos.iter().map(ToString::to_string).collect()).await;

        let produced = videos
            .iter()
            .map(|video| VideoRef::new(format!("content/processed/processed_{}", video.file_name())))
            .collect();
        self.finish(produced)
    }
}

#[async_trait]
impl TranscribeStage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_batch(&self, videos: &[VideoRef]) -> Result<Vec<TranscriptRef>, StageFault> {
        self.record(videos.iter().map(ToString::to_string).collect()).await;

        let produced = videos
            .iter()
            .map(|video| {
                TranscriptRef::new(
                    video.clone(),
                    format!("content/subtitles/{}.txt", video.file_stem()),
                )
            })
            .collect();
        self.finish(produced)
    }
}

#[async_trait]
impl CaptionStage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_batch(
        &self,
        pairs: &[(VideoRef, TranscriptRef)],
    ) -> Result<Vec<CaptionResult>, StageFault> {
        self.record(pairs.iter().map(|(video, _)| video.to_string()).collect())
            .await;

        let produced = pairs
            .iter()
            .map(|(video, _)| CaptionResult {
                video: video.clone(),
                caption: Caption::new(format!("Caption for {}", video.file_stem())),
                hashtags: Hashtag::parse("#reelflow").into_iter().collect::<HashtagSet>(),
            })
            .collect();
        self.finish(produced)
    }
}

#[async_trait]
impl PublishStage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_batch(&self, items: &[PublishItem]) -> Result<Vec<PublishOutcome>, StageFault> {
        self.record(items.iter().map(|item| item.video.to_string()).collect())
            .await;

        let produced = items
            .iter()
            .map(|item| PublishOutcome {
                video: item.video.clone(),
                confirmation: "published".to_string(),
            })
            .collect();
        self.finish(produced)
    }
}
