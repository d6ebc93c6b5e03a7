//! Per-run state machine.

use super::summary::{RunSummary, StageCount};
use crate::core::{RunEvent, RunStatus};
use crate::errors::ReelflowError;
use crate::utils::generate_run_id;
use std::time::Instant;
use uuid::Uuid;

/// Mutable state of one pipeline execution.
///
/// Owned by the orchestrator for the duration of a run. The status starts at
/// [`RunStatus::Running`] and moves to exactly one terminal state.
#[derive(Debug)]
pub struct PipelineRun {
    run_id: Uuid,
    status: RunStatus,
    warned: bool,
    stages: Vec<StageCount>,
    events: Vec<RunEvent>,
    started: Instant,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    /// Starts a new run.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: generate_run_id(),
            status: RunStatus::Running,
            warned: false,
            stages: Vec::new(),
            events: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns true if a warning has been emitted.
    #[must_use]
    pub fn warned(&self) -> bool {
        self.warned
    }

    /// Records that a warning was emitted.
    pub fn mark_warned(&mut self) {
        self.warned = true;
    }

    /// Appends an emitted event.
    pub fn record_event(&mut self, event: RunEvent) {
        self.events.push(event);
    }

    /// Appends a stage's counts.
    pub fn record_stage(&mut self, count: StageCount) {
        self.stages.push(count);
    }

    /// Moves to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ReelflowError::InvalidTransition`] if the run is already
    /// terminal or `to` is not a terminal status.
    pub fn transition(&mut self, to: RunStatus) -> Result<(), ReelflowError> {
        if !self.status.can_transition_to(to) {
            return Err(ReelflowError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Finishes a run that published at least one item.
    ///
    /// # Errors
    ///
    /// Returns [`ReelflowError::InvalidTransition`] if the run is already terminal.
    pub fn complete(&mut self) -> Result<RunStatus, ReelflowError> {
        let status = if self.warned {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Succeeded
        };
        self.transition(status)?;
        Ok(status)
    }

    /// Returns a snapshot of the run.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            status: self.status,
            stages: self.stages.clone(),
            events: self.events.clone(),
            warned: self.warned,
            duration_ms: elapsed_ms(self.started),
        }
    }

    /// Consumes the run, returning its summary.
    #[must_use]
    pub fn into_summary(self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            status: self.status,
            duration_ms: elapsed_ms(self.started),
            stages: self.stages,
            events: self.events,
            warned: self.warned,
        }
    }
}

/// Milliseconds since `started`, saturating.
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_without_warning() {
        let mut run = PipelineRun::new();
        assert_eq!(run.complete().unwrap(), RunStatus::Succeeded);
        assert_eq!(run.status(), RunStatus::Succeeded);
    }

    #[test]
    fn test_complete_with_warning() {
        let mut run = PipelineRun::new();
        run.mark_warned();
        assert_eq!(run.complete().unwrap(), RunStatus::PartialSuccess);
    }

    #[test]
    fn test_terminal_states_never_transition() {
        let mut run = PipelineRun::new();
        run.transition(RunStatus::Aborted).unwrap();

        let err = run.transition(RunStatus::Failed).unwrap_err();
        assert!(matches!(
            err,
            ReelflowError::InvalidTransition {
                from: RunStatus::Aborted,
                to: RunStatus::Failed
            }
        ));
        assert!(run.complete().is_err());
        assert_eq!(run.status(), RunStatus::Aborted);
    }

    #[test]
    fn test_cannot_transition_back_to_running() {
        let mut run = PipelineRun::new();
        assert!(run.transition(RunStatus::Running).is_err());
    }

    #[test]
    fn test_summary_snapshot() {
        let mut run = PipelineRun::new();
        run.record_event(RunEvent::info("run started"));
        let snapshot = run.summary();
        let owned = run.into_summary();

        assert_eq!(snapshot.run_id, owned.run_id);
        assert_eq!(snapshot.events, owned.events);
        assert_eq!(owned.status, RunStatus::Running);
    }
}
