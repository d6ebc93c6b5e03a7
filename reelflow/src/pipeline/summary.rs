//! Run summary returned to the caller.

use crate::core::{EventLevel, RunEvent, RunStatus, StageName};
use crate::utils::generate_run_id;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Item counts and timing for one stage invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    /// The stage.
    pub stage: StageName,
    /// Items handed to the stage.
    pub input: usize,
    /// Items the stage returned.
    pub surviving: usize,
    /// Wall time spent in the stage.
    pub duration_ms: u64,
}

impl StageCount {
    /// Number of items the stage dropped.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.input.saturating_sub(self.surviving)
    }
}

/// The outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: Uuid,
    /// Final status.
    pub status: RunStatus,
    /// Per-stage counts, in execution order. A stage that faulted reports no
    /// survivors; stages that never ran are absent.
    pub stages: Vec<StageCount>,
    /// Events emitted by the run, in order.
    pub events: Vec<RunEvent>,
    /// Whether any warning was emitted.
    pub warned: bool,
    /// Total wall time of the run.
    pub duration_ms: u64,
}

impl RunSummary {
    /// Creates a summary for a run that has not done anything.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            run_id: generate_run_id(),
            status: RunStatus::Running,
            stages: Vec::new(),
            events: Vec::new(),
            warned: false,
            duration_ms: 0,
        }
    }

    /// Returns the counts for `stage`, if it ran.
    #[must_use]
    pub fn stage(&self, stage: StageName) -> Option<&StageCount> {
        self.stages.iter().find(|count| count.stage == stage)
    }

    /// Number of items the Publish stage confirmed.
    #[must_use]
    pub fn published(&self) -> usize {
        self.stage(StageName::Publish).map_or(0, |count| count.surviving)
    }

    /// Returns the events at `level`.
    pub fn events_at(&self, level: EventLevel) -> impl Iterator<Item = &RunEvent> {
        self.events.iter().filter(move |event| event.level == level)
    }

    /// Returns the warning events.
    #[must_use]
    pub fn warnings(&self) -> Vec<&RunEvent> {
        self.events_at(EventLevel::Warning).collect()
    }

    /// Returns the event messages in order.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.events.iter().map(|event| event.message.as_str()).collect()
    }

    /// Returns the last event, if any.
    #[must_use]
    pub fn last_event(&self) -> Option<&RunEvent> {
        self.events.last()
    }
}
