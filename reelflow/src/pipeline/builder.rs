//! Orchestrator builder with validation.

use super::orchestrator::{Orchestrator, StageSet};
use crate::core::{AcquireQuery, StageName};
use crate::errors::ConfigError;
use crate::events::EventLog;
use crate::stages::{AcquireStage, CaptionStage, PublishStage, TranscribeStage, TransformStage};
use std::sync::Arc;

/// Builder for [`Orchestrator`].
///
/// Every stage must be supplied; [`build`](Self::build) reports the first
/// missing one.
#[derive(Debug, Clone)]
pub struct OrchestratorBuilder {
    events: Arc<EventLog>,
    seed: AcquireQuery,
    acquire: Option<Arc<dyn AcquireStage>>,
    transform: Option<Arc<dyn TransformStage>>,
    transcribe: Option<Arc<dyn TranscribeStage>>,
    caption: Option<Arc<dyn CaptionStage>>,
    publish: Option<Arc<dyn PublishStage>>,
}

impl OrchestratorBuilder {
    /// Creates a builder recording to `events`.
    #[must_use]
    pub fn new(events: Arc<EventLog>) -> Self {
        Self {
            events,
            seed: AcquireQuery::new(),
            acquire: None,
            transform: None,
            transcribe: None,
            caption: None,
            publish: None,
        }
    }

    /// Sets the Acquire seed.
    #[must_use]
    pub fn seed(mut self, seed: AcquireQuery) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the Acquire adapter.
    #[must_use]
    pub fn acquire(mut self, stage: Arc<dyn AcquireStage>) -> Self {
        self.acquire = Some(stage);
        self
    }

    /// Sets the Transform adapter.
    #[must_use]
    pub fn transform(mut self, stage: Arc<dyn TransformStage>) -> Self {
        self.transform = Some(stage);
        self
    }

    /// Sets the Transcribe adapter.
    #[must_use]
    pub fn transcribe(mut self, stage: Arc<dyn TranscribeStage>) -> Self {
        self.transcribe = Some(stage);
        self
    }

    /// Sets the Caption adapter.
    #[must_use]
    pub fn caption(mut self, stage: Arc<dyn CaptionStage>) -> Self {
        self.caption = Some(stage);
        self
    }

    /// Sets the Publish adapter.
    #[must_use]
    pub fn publish(mut self, stage: Arc<dyn PublishStage>) -> Self {
        self.publish = Some(stage);
        self
    }

    /// Sets all five adapters at once.
    #[must_use]
    pub fn stages(self, stages: StageSet) -> Self {
        self.acquire(stages.acquire)
            .transform(stages.transform)
            .transcribe(stages.transcribe)
            .caption(stages.caption)
            .publish(stages.publish)
    }

    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingStage`] naming the first stage without an adapter.
    pub fn build(self) -> Result<Orchestrator, ConfigError> {
        let stages = StageSet {
            acquire: self.acquire.ok_or(ConfigError::MissingStage(StageName::Acquire))?,
            transform: self.transform.ok_or(ConfigError::MissingStage(StageName::Transform))?,
            transcribe: self.transcribe.ok_or(ConfigError::MissingStage(StageName::Transcribe))?,
            caption: self.caption.ok_or(ConfigError::MissingStage(StageName::Caption))?,
            publish: self.publish.ok_or(ConfigError::MissingStage(StageName::Publish))?,
        };
        Ok(Orchestrator::new(stages, self.seed, self.events))
    }
}
