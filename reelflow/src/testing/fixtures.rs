//! Test fixtures for pipeline testing.

use std::sync::Arc;

use super::mocks::ScriptedStage;
use crate::core::{AcquireQuery, StageName};
use crate::events::{EventLog, MemoryEventStore};
use crate::pipeline::{Orchestrator, StageSet};

/// Five scripted stages wired to an in-memory event log.
///
/// Acquire produces one video per seed query, so `MockPipeline::new(3)` runs
/// three items through every stage.
#[derive(Debug)]
pub struct MockPipeline {
    /// Acquire mock.
    pub acquire: Arc<ScriptedStage>,
    /// Transform mock.
    pub transform: Arc<ScriptedStage>,
    /// Transcribe mock.
    pub transcribe: Arc<ScriptedStage>,
    /// Caption mock.
    pub caption: Arc<ScriptedStage>,
    /// Publish mock.
    pub publish: Arc<ScriptedStage>,
    /// Backing store of the event log.
    pub store: Arc<MemoryEventStore>,
    /// The event log handed to orchestrators.
    pub events: Arc<EventLog>,
    seed: AcquireQuery,
}

impl MockPipeline {
    /// Creates a pipeline whose Acquire stage yields `items` videos.
    #[must_use]
    pub fn new(items: usize) -> Self {
        let (log, store) = EventLog::in_memory();
        let seed = (0..items).fold(AcquireQuery::new(), |query, i| query.with_search(format!("query {i}")));

        Self {
            acquire: Arc::new(ScriptedStage::new("acquire")),
            transform: Arc::new(ScriptedStage::new("transform")),
            transcribe: Arc::new(ScriptedStage::new("transcribe")),
            caption: Arc::new(ScriptedStage::new("caption")),
            publish: Arc::new(ScriptedStage::new("publish")),
            store,
            events: Arc::new(log),
            seed,
        }
    }

    /// Replaces one stage's mock.
    #[must_use]
    pub fn with_stage(mut self, name: StageName, stage: ScriptedStage) -> Self {
        let stage = Arc::new(stage);
        match name {
            StageName::Acquire => self.acquire = stage,
            StageName::Transform => self.transform = stage,
            StageName::Transcribe => self.transcribe = stage,
            StageName::Caption => self.caption = stage,
            StageName::Publish => self.publish = stage,
        }
        self
    }

    /// Returns the mock for `name`.
    #[must_use]
    pub fn stage(&self, name: StageName) -> &Arc<ScriptedStage> {
        match name {
            StageName::Acquire => &self.acquire,
            StageName::Transform => &self.transform,
            StageName::Transcribe => &self.transcribe,
            StageName::Caption => &self.caption,
            StageName::Publish => &self.publish,
        }
    }

    /// Returns the seed query.
    #[must_use]
    pub fn seed(&self) -> &AcquireQuery {
        &self.seed
    }

    /// Returns the stages as a [`StageSet`].
    #[must_use]
    pub fn stage_set(&self) -> StageSet {
        StageSet {
            acquire: self.acquire.clone(),
            transform: self.transform.clone(),
            transcribe: self.transcribe.clone(),
            caption: self.caption.clone(),
            publish: self.publish.clone(),
        }
    }

    /// Builds an orchestrator over the mocks.
    #[must_use]
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.stage_set(), self.seed.clone(), Arc::clone(&self.events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_pipeline_seed() {
        let pipeline = MockPipeline::new(3);
        assert_eq!(pipeline.seed().len(), 3);
        assert!(pipeline.store.is_empty());
    }

    #[test]
    fn test_with_stage_replaces_mock() {
        let pipeline = MockPipeline::new(1)
            .with_stage(StageName::Caption, ScriptedStage::new("caption").dropping_all());
        assert_eq!(pipeline.stage(StageName::Caption).call_count(), 0);
    }
}
